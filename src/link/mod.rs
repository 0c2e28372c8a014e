pub mod endpoint;
pub mod error;
pub mod rate;
pub mod tcp_link;
mod worker;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use endpoint::ConnectionEndpoint;
pub use error::{ErrorCategory, LinkError};
pub use rate::{RateSample, RateTracker};
pub use tcp_link::TcpLink;
pub use worker::LinkState;

/// A panicking holder cannot leave the guarded data half-updated here, so a
/// poisoned lock is simply taken over.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
