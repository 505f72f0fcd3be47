use crate::{
    Block, BlockDetails, BlockEnum, BlockType, Difficulty, DifficultyV1, Epoch, Networks, Root,
    StubDifficulty, WorkVersion,
};
use once_cell::sync::Lazy;
use std::cmp::{max, min};

pub static WORK_THRESHOLDS_STUB: Lazy<WorkThresholds> = Lazy::new(WorkThresholds::new_stub);

pub struct WorkThresholds {
    pub epoch_1: u64,
    pub epoch_2: u64,
    pub epoch_2_receive: u64,

    // Automatically calculated. The base threshold is the maximum of all thresholds and is used for all work multiplier calculations
    pub base: u64,

    // Automatically calculated. The entry threshold is the minimum of all thresholds and defines the required work to enter the node, but does not guarantee a block is processed
    pub entry: u64,
    pub difficulty: Box<dyn Difficulty>,
}

impl Clone for WorkThresholds {
    fn clone(&self) -> Self {
        Self {
            epoch_1: self.epoch_1,
            epoch_2: self.epoch_2,
            epoch_2_receive: self.epoch_2_receive,
            base: self.base,
            entry: self.entry,
            difficulty: self.difficulty.clone(),
        }
    }
}

impl PartialEq for WorkThresholds {
    fn eq(&self, other: &Self) -> bool {
        self.epoch_1 == other.epoch_1
            && self.epoch_2 == other.epoch_2
            && self.epoch_2_receive == other.epoch_2_receive
            && self.base == other.base
            && self.entry == other.entry
    }
}

impl std::fmt::Debug for WorkThresholds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkThresholds")
            .field("epoch_1", &self.epoch_1)
            .field("epoch_2", &self.epoch_2)
            .field("epoch_2_receive", &self.epoch_2_receive)
            .field("base", &self.base)
            .field("entry", &self.entry)
            .finish()
    }
}

static PUBLISH_FULL: Lazy<WorkThresholds> = Lazy::new(|| {
    WorkThresholds::new(
        0xffffffc000000000,
        0xfffffff800000000, // 8x higher than epoch_1
        0xfffffe0000000000, // 8x lower than epoch_1
    )
});

static PUBLISH_BETA: Lazy<WorkThresholds> = Lazy::new(|| {
    WorkThresholds::new(
        0xfffff00000000000, // 64x lower than publish_full.epoch_1
        0xfffff00000000000, // same as epoch_1
        0xffffe00000000000, // 2x lower than epoch_1
    )
});

static PUBLISH_DEV: Lazy<WorkThresholds> = Lazy::new(|| {
    WorkThresholds::new(
        0xfe00000000000000, // Very low for tests
        0xffc0000000000000, // 8x higher than epoch_1
        0xf000000000000000, // 8x lower than epoch_1
    )
});

impl WorkThresholds {
    pub fn publish_full() -> &'static WorkThresholds {
        &PUBLISH_FULL
    }

    pub fn publish_beta() -> &'static WorkThresholds {
        &PUBLISH_BETA
    }

    pub fn publish_dev() -> &'static WorkThresholds {
        &PUBLISH_DEV
    }
}

impl WorkThresholds {
    pub fn new(epoch_1: u64, epoch_2: u64, epoch_2_receive: u64) -> Self {
        Self::with_difficulty(
            Box::<DifficultyV1>::default(),
            epoch_1,
            epoch_2,
            epoch_2_receive,
        )
    }

    /// The dev network uses the stub difficulty so tests never grind proof-of-work
    pub fn default_for(network: Networks) -> Self {
        match network {
            Networks::VeloDevNetwork => Self::new_stub(),
            Networks::VeloBetaNetwork => Self::publish_beta().clone(),
            Networks::VeloLiveNetwork => Self::publish_full().clone(),
            Networks::Invalid => {
                panic!("no default network set")
            }
        }
    }

    pub fn new_stub() -> Self {
        WorkThresholds::with_difficulty(
            Box::new(StubDifficulty::new()),
            0xfe00000000000000, // Very low for tests
            0xffc0000000000000, // 8x higher than epoch_1
            0xf000000000000000, // 8x lower than epoch_1
        )
    }

    pub fn with_difficulty(
        difficulty: Box<dyn Difficulty>,
        epoch_1: u64,
        epoch_2: u64,
        epoch_2_receive: u64,
    ) -> Self {
        Self {
            epoch_1,
            epoch_2,
            epoch_2_receive,
            base: max(max(epoch_1, epoch_2), epoch_2_receive),
            entry: min(min(epoch_1, epoch_2), epoch_2_receive),
            difficulty,
        }
    }

    pub fn threshold_entry(&self, block_type: BlockType, work_version: WorkVersion) -> u64 {
        match block_type {
            BlockType::State => match work_version {
                WorkVersion::Work1 => self.entry,
                _ => {
                    debug_assert!(false, "Invalid version specified to work_threshold_entry");
                    u64::MAX
                }
            },
            _ => self.epoch_1,
        }
    }

    pub fn threshold(&self, details: &BlockDetails) -> u64 {
        match details.epoch {
            Epoch::Epoch2 => {
                if details.is_receive || details.is_epoch {
                    self.epoch_2_receive
                } else {
                    self.epoch_2
                }
            }
            Epoch::Epoch1 | Epoch::Epoch0 => self.epoch_1,
            _ => {
                debug_assert!(
                    false,
                    "Invalid epoch specified to work_v1 ledger work_threshold"
                );
                u64::MAX
            }
        }
    }

    pub fn threshold2(&self, work_version: WorkVersion, details: &BlockDetails) -> u64 {
        match work_version {
            WorkVersion::Work1 => self.threshold(details),
            _ => {
                debug_assert!(false, "Invalid version specified to ledger work_threshold");
                u64::MAX
            }
        }
    }

    pub fn threshold_base(&self, work_version: WorkVersion) -> u64 {
        match work_version {
            WorkVersion::Work1 => self.base,
            _ => {
                debug_assert!(false, "Invalid version specified to work_threshold_base");
                u64::MAX
            }
        }
    }

    pub fn difficulty(&self, work_version: WorkVersion, root: &Root, work: u64) -> u64 {
        match work_version {
            WorkVersion::Work1 => self.difficulty.get_difficulty(root, work),
            _ => {
                debug_assert!(false, "Invalid version specified to work_difficulty");
                0
            }
        }
    }

    pub fn difficulty_block(&self, block: &BlockEnum) -> u64 {
        self.difficulty(WorkVersion::Work1, &block.root(), block.work())
    }

    pub fn validate_entry_block(&self, block: &BlockEnum) -> bool {
        let difficulty = self.difficulty_block(block);
        let threshold = self.threshold_entry(block.block_type(), WorkVersion::Work1);
        difficulty >= threshold
    }

    pub fn is_valid_pow(&self, block: &BlockEnum, details: &BlockDetails) -> bool {
        self.difficulty_block(block) >= self.threshold2(WorkVersion::Work1, details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockBuilder;

    #[test]
    fn threshold_epoch0_send() {
        assert_eq!(
            WorkThresholds::publish_full().threshold2(
                WorkVersion::Work1,
                &BlockDetails {
                    epoch: Epoch::Epoch0,
                    is_send: true,
                    is_receive: false,
                    is_epoch: false
                }
            ),
            0xffffffc000000000
        );
    }

    #[test]
    fn threshold_epoch2_send() {
        assert_eq!(
            WorkThresholds::publish_full().threshold2(
                WorkVersion::Work1,
                &BlockDetails {
                    epoch: Epoch::Epoch2,
                    is_send: true,
                    is_receive: false,
                    is_epoch: false
                }
            ),
            0xfffffff800000000
        );
    }

    #[test]
    fn threshold_epoch2_receive() {
        assert_eq!(
            WorkThresholds::publish_full().threshold2(
                WorkVersion::Work1,
                &BlockDetails {
                    epoch: Epoch::Epoch2,
                    is_send: false,
                    is_receive: true,
                    is_epoch: false
                }
            ),
            0xfffffe0000000000
        );
    }

    #[test]
    fn stub_thresholds_use_work_value_as_difficulty() {
        let thresholds = WorkThresholds::new_stub();
        let valid = BlockBuilder::state().work(u64::MAX).build();
        let invalid = BlockBuilder::state().work(3).build();
        assert!(thresholds.validate_entry_block(&valid));
        assert!(!thresholds.validate_entry_block(&invalid));
    }
}
