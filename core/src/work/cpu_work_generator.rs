use crate::{Difficulty, DifficultyV1, Root};
use rand::Rng;

/// Finds a work nonce for a root so that the resulting difficulty meets a threshold.
/// Only suitable for dev/test difficulty levels.
pub struct CpuWorkGenerator {
    difficulty: DifficultyV1,
}

impl CpuWorkGenerator {
    pub fn new() -> Self {
        Self {
            difficulty: DifficultyV1::default(),
        }
    }

    pub fn create(&self, root: &Root, min_difficulty: u64) -> u64 {
        let mut nonce: u64 = rand::thread_rng().gen();
        loop {
            if self.difficulty.get_difficulty(root, nonce) >= min_difficulty {
                return nonce;
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}

impl Default for CpuWorkGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::WorkThresholds;

    #[test]
    fn generated_work_meets_threshold() {
        let generator = CpuWorkGenerator::new();
        let thresholds = WorkThresholds::publish_dev();
        let root = Root::from(123);
        let work = generator.create(&root, thresholds.base);
        assert!(thresholds.difficulty.get_difficulty(&root, work) >= thresholds.base);
    }
}
