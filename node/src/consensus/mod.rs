mod active_elections;
mod confirmation_solicitor;
mod election;
mod election_schedulers;
mod election_status;
mod local_vote_history;
mod process_live_dispatcher;
mod recently_confirmed;
mod vote_cache;
mod vote_generator;

pub use active_elections::{
    ActiveElections, ActiveElectionsConfig, ActiveElectionsExt, ElectionEndCallback, TallyKey,
};
pub use confirmation_solicitor::ConfirmationSolicitor;
pub use election::{
    Election, ElectionBehavior, ElectionData, ElectionState, EraseCallback, VoteInfo,
    NEXT_ELECTION_ID,
};
pub use election_schedulers::{
    Bucket, BucketExt, ElectionSchedulers, HintedScheduler, HintedSchedulerConfig,
    ManualScheduler, OptimisticScheduler, OptimisticSchedulerConfig, PriorityBucketConfig,
    PriorityScheduler,
};
pub use election_status::{ElectionStatus, ElectionStatusType};
pub use local_vote_history::LocalVoteHistory;
pub use process_live_dispatcher::ProcessLiveDispatcher;
pub use recently_confirmed::{RecentlyCementedCache, RecentlyConfirmedCache};
pub use vote_cache::{VoteCache, VoteCacheConfig};
pub use vote_generator::{NullVoteGenerator, VoteGenerator};
