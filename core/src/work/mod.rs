mod cpu_work_generator;
mod work_thresholds;

pub use cpu_work_generator::CpuWorkGenerator;
pub use work_thresholds::{WorkThresholds, WORK_THRESHOLDS_STUB};
