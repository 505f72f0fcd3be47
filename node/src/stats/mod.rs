mod stats;

pub use stats::{DetailType, Direction, Sample, StatType, Stats};
