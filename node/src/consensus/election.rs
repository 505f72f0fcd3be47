use super::{ElectionStatus, ElectionStatusType};
use crate::stats::DetailType;
use rsvelo_core::{Account, Amount, Block, BlockEnum, BlockHash, QualifiedRoot, Root};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicUsize},
        Arc, Mutex,
    },
    time::{Duration, Instant, SystemTime},
};

pub static NEXT_ELECTION_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ElectionBehavior {
    Manual,
    Priority,
    /// Elections started from vote-cache hints for blocks we have not inserted ourselves
    Hinted,
    /// Elections for accounts far above the confirmed height
    Optimistic,
}

impl From<ElectionBehavior> for DetailType {
    fn from(value: ElectionBehavior) -> Self {
        match value {
            ElectionBehavior::Manual => DetailType::Manual,
            ElectionBehavior::Priority => DetailType::Priority,
            ElectionBehavior::Hinted => DetailType::Hinted,
            ElectionBehavior::Optimistic => DetailType::Optimistic,
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ElectionState {
    /// Only listening for incoming votes
    Passive,
    /// Actively requesting confirmations
    Active,
    /// Confirmed but still listening for votes
    Confirmed,
    ExpiredConfirmed,
    ExpiredUnconfirmed,
    /// Terminated externally, e.g. by a bucket trim
    Cancelled,
}

impl ElectionState {
    fn valid_change(expected: ElectionState, desired: ElectionState) -> bool {
        match expected {
            ElectionState::Passive => matches!(
                desired,
                ElectionState::Active
                    | ElectionState::Confirmed
                    | ElectionState::ExpiredUnconfirmed
                    | ElectionState::Cancelled
            ),
            ElectionState::Active => matches!(
                desired,
                ElectionState::Confirmed
                    | ElectionState::ExpiredUnconfirmed
                    | ElectionState::Cancelled
            ),
            ElectionState::Confirmed => matches!(desired, ElectionState::ExpiredConfirmed),
            ElectionState::ExpiredConfirmed
            | ElectionState::ExpiredUnconfirmed
            | ElectionState::Cancelled => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteInfo {
    pub time: SystemTime,
    pub timestamp: u64,
    pub hash: BlockHash,
}

impl VoteInfo {
    pub fn new(timestamp: u64, hash: BlockHash) -> Self {
        Self {
            time: SystemTime::now(),
            timestamp,
            hash,
        }
    }
}

impl Default for VoteInfo {
    fn default() -> Self {
        Self::new(0, BlockHash::zero())
    }
}

pub type EraseCallback = Box<dyn Fn(&QualifiedRoot) + Send + Sync>;

pub struct ElectionData {
    pub status: ElectionStatus,
    pub state: ElectionState,
    /// Candidate blocks sharing this election's root, keyed by hash
    pub last_blocks: HashMap<BlockHash, Arc<BlockEnum>>,
    /// The latest vote seen from each representative
    pub last_votes: HashMap<Account, VoteInfo>,
    /// The tally as of the last quorum check
    pub last_tally: HashMap<BlockHash, Amount>,
    /// Accumulated final vote weight for the winner
    pub final_weight: Amount,
    pub last_vote: Option<Instant>,
    /// Winner hash as of the last broadcast
    pub last_block_hash: BlockHash,
}

impl ElectionData {
    pub fn state_change(
        &mut self,
        expected: ElectionState,
        desired: ElectionState,
    ) -> Result<(), ()> {
        if self.state == expected && ElectionState::valid_change(expected, desired) {
            self.state = desired;
            Ok(())
        } else {
            Err(())
        }
    }

    pub fn last_vote_elapsed(&self) -> Duration {
        self.last_vote
            .map(|instant| instant.elapsed())
            .unwrap_or(Duration::MAX)
    }

    pub fn set_last_vote(&mut self) {
        self.last_vote = Some(Instant::now());
    }

    pub fn update_status_to_confirmed(&mut self, election: &Election) {
        self.status.election_end = Some(SystemTime::now());
        self.status.election_duration = election.election_start.elapsed();
        self.status.confirmation_request_count = election
            .confirmation_request_count
            .load(std::sync::atomic::Ordering::SeqCst);
        self.status.block_count = self.last_blocks.len() as u32;
        self.status.voter_count = self.last_votes.len() as u32;
        self.status.election_status_type = ElectionStatusType::ActiveConfirmedQuorum;
    }
}

/// A running voting round over competing blocks sharing one root
pub struct Election {
    pub id: usize,
    pub mutex: Mutex<ElectionData>,
    pub qualified_root: QualifiedRoot,
    pub root: Root,
    pub behavior: ElectionBehavior,
    pub election_start: Instant,
    pub confirmation_request_count: AtomicU32,
    /// Set once a quorum was first observed, used to request final votes exactly once
    pub is_quorum: AtomicBool,
    last_block: Mutex<Option<Instant>>,
    last_req: Mutex<Option<Instant>>,
    pub confirmation_action: Box<dyn Fn(Arc<BlockEnum>) + Send + Sync>,
    pub live_vote_action: Box<dyn Fn(Account) + Send + Sync>,
    /// Invoked when the election is erased from the active set
    pub erased_callback: Option<EraseCallback>,
}

impl Election {
    pub const PASSIVE_DURATION_FACTOR: u32 = 5;

    pub fn new(
        id: usize,
        block: Arc<BlockEnum>,
        behavior: ElectionBehavior,
        confirmation_action: Box<dyn Fn(Arc<BlockEnum>) + Send + Sync>,
        live_vote_action: Box<dyn Fn(Account) + Send + Sync>,
    ) -> Self {
        let root = block.root();
        let qualified_root = block.qualified_root();
        let mut last_blocks = HashMap::new();
        last_blocks.insert(block.hash(), Arc::clone(&block));

        Self {
            id,
            mutex: Mutex::new(ElectionData {
                status: ElectionStatus {
                    winner: Some(block),
                    election_end: Some(SystemTime::now()),
                    block_count: 1,
                    election_status_type: ElectionStatusType::Ongoing,
                    ..Default::default()
                },
                state: ElectionState::Passive,
                last_blocks,
                last_votes: HashMap::new(),
                last_tally: HashMap::new(),
                final_weight: Amount::zero(),
                last_vote: None,
                last_block_hash: BlockHash::zero(),
            }),
            qualified_root,
            root,
            behavior,
            election_start: Instant::now(),
            confirmation_request_count: AtomicU32::new(0),
            is_quorum: AtomicBool::new(false),
            last_block: Mutex::new(None),
            last_req: Mutex::new(None),
            confirmation_action,
            live_vote_action,
            erased_callback: None,
        }
    }

    pub fn with_erased_callback(mut self, callback: EraseCallback) -> Self {
        self.erased_callback = Some(callback);
        self
    }

    pub fn duration(&self) -> Duration {
        self.election_start.elapsed()
    }

    /// How long an unconfirmed election is kept alive
    pub fn time_to_live(&self) -> Duration {
        match self.behavior {
            ElectionBehavior::Manual | ElectionBehavior::Priority => Duration::from_secs(60 * 5),
            ElectionBehavior::Hinted | ElectionBehavior::Optimistic => Duration::from_secs(30),
        }
    }

    pub fn failed(&self) -> bool {
        self.mutex.lock().unwrap().state == ElectionState::ExpiredUnconfirmed
    }

    pub fn last_req_elapsed(&self) -> Duration {
        self.last_req
            .lock()
            .unwrap()
            .map(|instant| instant.elapsed())
            .unwrap_or(Duration::MAX)
    }

    pub fn set_last_req(&self) {
        *self.last_req.lock().unwrap() = Some(Instant::now());
    }

    pub fn last_block_elapsed(&self) -> Duration {
        self.last_block
            .lock()
            .unwrap()
            .map(|instant| instant.elapsed())
            .unwrap_or(Duration::MAX)
    }

    pub fn set_last_block(&self) {
        *self.last_block.lock().unwrap() = Some(Instant::now());
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.mutex.lock().unwrap().last_blocks.contains_key(hash)
    }

    pub fn winner_hash(&self) -> Option<BlockHash> {
        self.mutex
            .lock()
            .unwrap()
            .status
            .winner
            .as_ref()
            .map(|block| block.hash())
    }
}

impl std::fmt::Debug for Election {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Election")
            .field("id", &self.id)
            .field("qualified_root", &self.qualified_root)
            .field("behavior", &self.behavior)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvelo_core::BlockBuilder;

    fn new_election() -> Election {
        Election::new(
            1,
            Arc::new(BlockBuilder::state().build()),
            ElectionBehavior::Priority,
            Box::new(|_| {}),
            Box::new(|_| {}),
        )
    }

    #[test]
    fn starts_passive_with_single_candidate_winner() {
        let election = new_election();
        let data = election.mutex.lock().unwrap();
        assert_eq!(data.state, ElectionState::Passive);
        assert_eq!(data.last_blocks.len(), 1);
        assert!(data.status.winner.is_some());
    }

    #[test]
    fn state_moves_forward_only() {
        let election = new_election();
        let mut data = election.mutex.lock().unwrap();

        assert!(data
            .state_change(ElectionState::Passive, ElectionState::Active)
            .is_ok());
        assert!(data
            .state_change(ElectionState::Passive, ElectionState::Active)
            .is_err());
        assert!(data
            .state_change(ElectionState::Active, ElectionState::Confirmed)
            .is_ok());
        // Once confirmed, only expiration is possible
        assert!(data
            .state_change(ElectionState::Confirmed, ElectionState::Cancelled)
            .is_err());
        assert!(data
            .state_change(ElectionState::Confirmed, ElectionState::ExpiredConfirmed)
            .is_ok());
        assert!(data
            .state_change(ElectionState::ExpiredConfirmed, ElectionState::Passive)
            .is_err());
    }

    #[test]
    fn cancel_is_terminal() {
        let election = new_election();
        let mut data = election.mutex.lock().unwrap();
        assert!(data
            .state_change(ElectionState::Passive, ElectionState::Cancelled)
            .is_ok());
        assert!(data
            .state_change(ElectionState::Cancelled, ElectionState::Active)
            .is_err());
    }
}
