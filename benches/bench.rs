use criterion::{black_box, criterion_group, criterion_main, Criterion};
use segpool::{RawAlloc, SubAllocator, SyncSubAllocator, SystemAlloc};

const SIZES: [usize; 4] = [8, 24, 64, 128];

fn alloc_free<A: RawAlloc>(alloc: &A) {
    for n in SIZES {
        let ptr = alloc.allocate(black_box(n)).unwrap();
        unsafe { alloc.deallocate(ptr, n) };
    }
}

fn alloc_batch<A: RawAlloc>(alloc: &A, ptrs: &mut Vec<(std::ptr::NonNull<u8>, usize)>) {
    for i in 0..256 {
        let n = SIZES[i % SIZES.len()];
        ptrs.push((alloc.allocate(black_box(n)).unwrap(), n));
    }

    for (ptr, n) in ptrs.drain(..) {
        unsafe { alloc.deallocate(ptr, n) };
    }
}

fn small_allocs(c: &mut Criterion) {
    let pool = SubAllocator::new();
    let sync_pool = SyncSubAllocator::new();
    let system = SystemAlloc;

    c.bench_function("sub alloc/free", |b| b.iter(|| alloc_free(&pool)));
    c.bench_function("sync sub alloc/free", |b| b.iter(|| alloc_free(&sync_pool)));
    c.bench_function("system alloc/free", |b| b.iter(|| alloc_free(&system)));

    let mut ptrs = Vec::with_capacity(256);
    c.bench_function("sub alloc 256 then free", |b| b.iter(|| alloc_batch(&pool, &mut ptrs)));
    c.bench_function("system alloc 256 then free", |b| {
        b.iter(|| alloc_batch(&system, &mut ptrs))
    });
}

criterion_group!(benches, small_allocs);
criterion_main!(benches);
