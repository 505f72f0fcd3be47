mod backlog_population;
mod block_processor;
mod unchecked_map;

pub use backlog_population::{BacklogPopulation, BacklogPopulationConfig};
pub use block_processor::{
    BlockProcessor, BlockProcessorConfig, BlockProcessorContext, BlockSource,
};
pub use unchecked_map::UncheckedMap;
