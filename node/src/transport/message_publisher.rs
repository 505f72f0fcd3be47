use super::ChannelId;
use rsvelo_core::{BlockEnum, BlockHash, Root};

/// Seam to the gossip transport. The core publishes winner blocks and batched
/// confirmation requests through this interface; the transport implementation
/// lives outside the core.
pub trait MessagePublisher: Send + Sync {
    /// Flood a block to a fanout of peers
    fn flood_block(&self, block: &BlockEnum);

    /// Send a batched confirm_req for the given roots and winner hashes to one channel
    fn send_confirm_req(&self, channel_id: ChannelId, roots_hashes: &[(Root, BlockHash)]);

    /// Forget a block in the duplicate publish filter so it can be flooded again
    fn clear_filter(&self, _block: &BlockEnum) {}
}

/// Publisher that drops everything, used in tests and in detached setups
#[derive(Default)]
pub struct NullMessagePublisher {}

impl NullMessagePublisher {
    pub fn new() -> Self {
        Default::default()
    }
}

impl MessagePublisher for NullMessagePublisher {
    fn flood_block(&self, _block: &BlockEnum) {}

    fn send_confirm_req(&self, _channel_id: ChannelId, _roots_hashes: &[(Root, BlockHash)]) {}
}
