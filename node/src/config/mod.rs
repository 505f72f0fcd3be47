mod network_constants;
mod node_config;
mod node_flags;
mod node_toml;

pub use network_constants::NetworkConstants;
pub use node_config::NodeConfig;
pub use node_flags::NodeFlags;
pub use node_toml::NodeToml;
