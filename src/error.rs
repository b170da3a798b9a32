use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AllocError {
    /// The request can never be satisfied: zero bytes, an overflowing
    /// element count, an unsupported alignment or an invalid config.
    BadRequest,
    /// The system allocator is out of memory and no larger size class had a
    /// spare block to scavenge.
    OOM,
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::BadRequest => write!(f, "bad allocation request"),
            AllocError::OOM => write!(f, "out of memory"),
        }
    }
}

impl std::error::Error for AllocError {}
