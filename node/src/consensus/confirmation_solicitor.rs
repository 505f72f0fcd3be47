use super::ElectionData;
use crate::config::NetworkConstants;
use crate::representatives::PeeredRep;
use crate::transport::{ChannelId, MessagePublisher};
use rsvelo_core::{Block, BlockHash, Root};
use std::collections::HashMap;

/// Batches winner rebroadcasts and confirm_req messages to principal
/// representatives during a request loop pass
pub struct ConfirmationSolicitor<'a> {
    message_publisher: &'a dyn MessagePublisher,
    /// Maximum number of block broadcasts per pass
    max_block_broadcasts: usize,
    /// Maximum number of requests to be queued per representative
    max_election_requests: usize,
    representatives: Vec<PeeredRep>,
    requests: HashMap<ChannelId, Vec<(Root, BlockHash)>>,
    requests_per_channel: HashMap<ChannelId, usize>,
    rebroadcasted: usize,
    prepared: bool,
}

/// Maximum number of (root, hash) pairs in a single confirm_req message
const MAX_CONFIRM_REQ_HASHES: usize = 7;

impl<'a> ConfirmationSolicitor<'a> {
    pub fn new(
        network_constants: &NetworkConstants,
        message_publisher: &'a dyn MessagePublisher,
    ) -> Self {
        let max_block_broadcasts = if network_constants.is_dev_network() {
            4
        } else {
            30
        };
        Self {
            message_publisher,
            max_block_broadcasts,
            max_election_requests: 50,
            representatives: Vec::new(),
            requests: HashMap::new(),
            requests_per_channel: HashMap::new(),
            rebroadcasted: 0,
            prepared: false,
        }
    }

    /// Prepare the solicitor for a new round of requests
    pub fn prepare(&mut self, representatives: &[PeeredRep]) {
        debug_assert!(!self.prepared || self.requests.is_empty());
        self.representatives = representatives.to_vec();
        self.requests_per_channel.clear();
        self.rebroadcasted = 0;
        self.prepared = true;
    }

    /// Broadcast the winner of an election to the network. Returns Err if the
    /// maximum number of broadcasts for this pass was already reached.
    pub fn broadcast(&mut self, guard: &ElectionData) -> Result<(), ()> {
        debug_assert!(self.prepared);
        self.rebroadcasted += 1;
        if self.rebroadcasted >= self.max_block_broadcasts {
            return Err(());
        }

        let winner = guard.status.winner.as_ref().ok_or(())?;
        self.message_publisher.flood_block(winner);
        Ok(())
    }

    /// Queue a confirmation request for the election to all prepared
    /// representatives. Returns true on error (nothing was queued).
    pub fn add(&mut self, root: Root, guard: &ElectionData) -> bool {
        debug_assert!(self.prepared);
        let Some(winner) = guard.status.winner.as_ref() else {
            return true;
        };
        let winner_hash = winner.hash();

        let mut count = 0;
        for rep in &self.representatives {
            // Skip representatives that already voted for the winner
            if let Some(existing) = guard.last_votes.get(&rep.account) {
                if existing.hash == winner_hash {
                    continue;
                }
            }

            let queued = self
                .requests_per_channel
                .entry(rep.channel_id)
                .or_insert(0);
            if *queued >= self.max_election_requests {
                continue;
            }
            *queued += 1;

            let batch = self.requests.entry(rep.channel_id).or_default();
            batch.push((root, winner_hash));
            if batch.len() >= MAX_CONFIRM_REQ_HASHES {
                self.message_publisher.send_confirm_req(rep.channel_id, batch);
                batch.clear();
            }
            count += 1;
        }

        count == 0
    }

    /// Dispatch the remaining partially filled batches
    pub fn flush(&mut self) {
        debug_assert!(self.prepared);
        for (&channel_id, batch) in &self.requests {
            if !batch.is_empty() {
                self.message_publisher.send_confirm_req(channel_id, batch);
            }
        }
        self.requests.clear();
        self.prepared = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{Election, ElectionBehavior};
    use crate::transport::NullMessagePublisher;
    use rsvelo_core::{Account, BlockBuilder, BlockEnum};
    use std::sync::{Arc, Mutex};

    struct RecordingPublisher {
        confirm_reqs: Mutex<Vec<(ChannelId, usize)>>,
    }

    impl MessagePublisher for RecordingPublisher {
        fn flood_block(&self, _block: &BlockEnum) {}

        fn send_confirm_req(&self, channel_id: ChannelId, roots_hashes: &[(Root, BlockHash)]) {
            self.confirm_reqs
                .lock()
                .unwrap()
                .push((channel_id, roots_hashes.len()));
        }
    }

    fn new_election(block: BlockEnum) -> Election {
        Election::new(
            1,
            Arc::new(block),
            ElectionBehavior::Priority,
            Box::new(|_| {}),
            Box::new(|_| {}),
        )
    }

    #[test]
    fn request_is_queued_and_flushed() {
        let publisher = RecordingPublisher {
            confirm_reqs: Mutex::new(Vec::new()),
        };
        let constants = NetworkConstants::dev();
        let mut solicitor = ConfirmationSolicitor::new(&constants, &publisher);
        solicitor.prepare(&[PeeredRep {
            account: Account::from(1),
            channel_id: ChannelId::from(7),
        }]);

        let election = new_election(BlockBuilder::state().build());
        let guard = election.mutex.lock().unwrap();
        let error = solicitor.add(election.root, &guard);
        drop(guard);
        assert!(!error);

        solicitor.flush();
        let reqs = publisher.confirm_reqs.lock().unwrap();
        assert_eq!(reqs.len(), 1);
        assert_eq!(reqs[0].0, ChannelId::from(7));
        assert_eq!(reqs[0].1, 1);
    }

    #[test]
    fn no_representatives_is_an_error() {
        let publisher = NullMessagePublisher::new();
        let constants = NetworkConstants::dev();
        let mut solicitor = ConfirmationSolicitor::new(&constants, &publisher);
        solicitor.prepare(&[]);

        let election = new_election(BlockBuilder::state().build());
        let guard = election.mutex.lock().unwrap();
        assert!(solicitor.add(election.root, &guard));
    }
}
