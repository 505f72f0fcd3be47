mod online_reps;

pub use online_reps::{OnlineReps, PeeredRep};
