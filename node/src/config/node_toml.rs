use super::NodeConfig;
use serde::{Deserialize, Serialize};

/// TOML representation of the recognized config file sections
#[derive(Default, Serialize, Deserialize)]
pub struct NodeToml {
    pub active_elections: Option<ActiveElectionsToml>,
    pub block_processor: Option<BlockProcessorToml>,
}

#[derive(Default, Serialize, Deserialize)]
pub struct ActiveElectionsToml {
    /// Number of active elections. Elections beyond this limit have limited survival time. [250..]
    pub size: Option<usize>,
    /// Limit of hinted elections as percentage of `size`
    pub hinted_limit_percentage: Option<usize>,
    /// Limit of optimistic elections as percentage of `size`
    pub optimistic_limit_percentage: Option<usize>,
    /// Maximum confirmation history size
    pub confirmation_history_size: Option<usize>,
    /// Maximum number of confirmed elections kept in cache to prevent restarting an election
    pub confirmation_cache: Option<usize>,
    /// Elections over this limit in a bucket get trimmed by the cleanup loop
    pub max_per_bucket: Option<usize>,
}

#[derive(Default, Serialize, Deserialize)]
pub struct BlockProcessorToml {
    pub max_peer_queue: Option<usize>,
    pub max_system_queue: Option<usize>,
    pub priority_live: Option<usize>,
    pub priority_bootstrap: Option<usize>,
    pub priority_local: Option<usize>,
}

impl NodeToml {
    pub fn apply_to(&self, config: &mut NodeConfig) {
        if let Some(toml) = &self.active_elections {
            if let Some(size) = toml.size {
                config.active_elections.size = size.max(250);
            }
            if let Some(value) = toml.hinted_limit_percentage {
                config.active_elections.hinted_limit_percentage = value;
            }
            if let Some(value) = toml.optimistic_limit_percentage {
                config.active_elections.optimistic_limit_percentage = value;
            }
            if let Some(value) = toml.confirmation_history_size {
                config.active_elections.confirmation_history_size = value;
            }
            if let Some(value) = toml.confirmation_cache {
                config.active_elections.confirmation_cache = value;
            }
            if let Some(value) = toml.max_per_bucket {
                config.active_elections.max_per_bucket = value;
            }
        }
        if let Some(toml) = &self.block_processor {
            if let Some(value) = toml.max_peer_queue {
                config.block_processor.max_peer_queue = value;
            }
            if let Some(value) = toml.max_system_queue {
                config.block_processor.max_system_queue = value;
            }
            if let Some(value) = toml.priority_live {
                config.block_processor.priority_live = value;
            }
            if let Some(value) = toml.priority_bootstrap {
                config.block_processor.priority_bootstrap = value;
            }
            if let Some(value) = toml.priority_local {
                config.block_processor.priority_local = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_toml_overrides() {
        let toml_str = r#"
            [active_elections]
            size = 300
            confirmation_cache = 1024

            [block_processor]
            max_peer_queue = 64
        "#;
        let parsed: NodeToml = toml::from_str(toml_str).unwrap();
        let mut config = NodeConfig::new_test_instance();
        parsed.apply_to(&mut config);
        assert_eq!(config.active_elections.size, 300);
        assert_eq!(config.active_elections.confirmation_cache, 1024);
        assert_eq!(config.block_processor.max_peer_queue, 64);
    }

    #[test]
    fn size_has_minimum() {
        let toml_str = r#"
            [active_elections]
            size = 10
        "#;
        let parsed: NodeToml = toml::from_str(toml_str).unwrap();
        let mut config = NodeConfig::new_test_instance();
        parsed.apply_to(&mut config);
        assert_eq!(config.active_elections.size, 250);
    }
}
