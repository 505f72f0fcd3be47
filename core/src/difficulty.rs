use crate::Root;
use blake2::{
    digest::{Update, VariableOutput},
    Blake2bVar,
};
use std::collections::HashMap;
use std::mem::size_of;

#[derive(Clone, Copy, FromPrimitive, PartialEq, Eq, Debug)]
pub enum WorkVersion {
    Unspecified,
    Work1,
}

impl WorkVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkVersion::Work1 => "work_1",
            WorkVersion::Unspecified => "unspecified",
        }
    }
}

pub trait Difficulty: Send + Sync {
    fn get_difficulty(&self, root: &Root, work: u64) -> u64;
    fn clone(&self) -> Box<dyn Difficulty>;
}

#[derive(Clone, Default)]
pub struct DifficultyV1 {}

impl Difficulty for DifficultyV1 {
    fn get_difficulty(&self, root: &Root, work: u64) -> u64 {
        let mut buffer = [0; size_of::<u64>()];
        let mut hasher = Blake2bVar::new(buffer.len()).unwrap();
        hasher.update(&work.to_le_bytes());
        hasher.update(root.as_bytes());
        hasher.finalize_variable(&mut buffer).unwrap();
        u64::from_le_bytes(buffer)
    }

    fn clone(&self) -> Box<dyn Difficulty> {
        Box::<DifficultyV1>::default()
    }
}

/// Difficulty stub for tests: the difficulty of a work value is the value itself
#[derive(Clone, Default)]
pub struct StubDifficulty {
    preset_difficulties: HashMap<(Root, u64), u64>,
}

impl StubDifficulty {
    pub fn new() -> Self {
        Self {
            preset_difficulties: HashMap::new(),
        }
    }

    pub fn set_difficulty(&mut self, root: Root, work: u64, difficulty: u64) {
        self.preset_difficulties.insert((root, work), difficulty);
    }
}

impl Difficulty for StubDifficulty {
    fn get_difficulty(&self, root: &Root, work: u64) -> u64 {
        self.preset_difficulties
            .get(&(*root, work))
            .cloned()
            .unwrap_or(work)
    }

    fn clone(&self) -> Box<dyn Difficulty> {
        Box::new(StubDifficulty {
            preset_difficulties: self.preset_difficulties.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_difficulty() {
        let mut difficulty = StubDifficulty::new();
        assert_eq!(difficulty.get_difficulty(&Root::from(1), 2), 2);

        difficulty.set_difficulty(Root::from(1), 2, 3);
        assert_eq!(difficulty.get_difficulty(&Root::from(1), 2), 3);
    }

    #[test]
    fn difficulty_is_deterministic() {
        let difficulty = DifficultyV1::default();
        let a = difficulty.get_difficulty(&Root::from(123), 456);
        let b = difficulty.get_difficulty(&Root::from(123), 456);
        assert_eq!(a, b);
        assert_ne!(a, difficulty.get_difficulty(&Root::from(123), 457));
    }
}
