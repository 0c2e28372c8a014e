pub mod config;
pub mod identity;
pub mod link;
pub mod link_log;
pub mod message;

/* Re-exports */
pub use config::LinkConfig;
pub use identity::{LinkId, LinkIdAllocator};
pub use link::{
    ConnectionEndpoint, ErrorCategory, LinkError, LinkState, RateSample, RateTracker, TcpLink,
};
pub use message::{LinkEvent, StateKind};
