//! Configuration management for the community detector

/// Default configuration for the community detector
pub struct Config {
    /// Merges performed between two progress reports
    pub progress_interval: usize,

    /// Prefix for generated cluster names ("C" yields "C1", "C2", ...)
    pub cluster_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            progress_interval: 100,
            cluster_name_prefix: "C".to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration with custom values
    pub fn new(progress_interval: usize, cluster_name_prefix: &str) -> Self {
        Self {
            progress_interval,
            cluster_name_prefix: cluster_name_prefix.to_string(),
        }
    }
}
