#[macro_use]
extern crate num_derive;

pub mod block_processing;
pub mod cementation;
pub mod config;
pub mod consensus;
pub mod representatives;
pub mod stats;
pub mod transport;
pub mod utils;

mod node;
pub use node::Node;
