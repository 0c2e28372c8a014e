use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identifier of a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out strictly increasing link ids, starting at 1.
///
/// The registry that tracks live links owns one of these and passes it to
/// every link it constructs.
#[derive(Debug)]
pub struct LinkIdAllocator {
    next: AtomicU64,
}

impl Default for LinkIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkIdAllocator {
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    pub fn next_id(&self) -> LinkId {
        LinkId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}
