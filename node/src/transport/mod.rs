mod fair_queue;
mod message_publisher;
mod rate_limiter;

pub use fair_queue::{FairQueue, Origin};
pub use message_publisher::{MessagePublisher, NullMessagePublisher};
pub use rate_limiter::RateLimiter;

/// Identifies the network channel a request came in on. The transport itself
/// lives outside the core; the core only uses the id for queue partitioning.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Hash)]
pub struct ChannelId(usize);

impl ChannelId {
    pub const LOOPBACK: Self = Self(0);
    pub const MIN: Self = Self(usize::MIN);
    pub const MAX: Self = Self(usize::MAX);

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl From<usize> for ChannelId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
