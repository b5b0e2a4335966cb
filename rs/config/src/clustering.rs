use std::fs;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::enums::{DataType, EmptyClusterPolicy, HardwareType};

pub const DEFAULT_MAX_ITERATIONS: usize = 256;
pub const DEFAULT_SEED: u64 = 1024;

/// Config for a clustering run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Maximum number of reassignment passes before giving up on convergence.
    /// Default: 256
    pub max_iterations: usize,

    /// Element type of the data points. Only `float` can use the vector kernels.
    /// Default: float
    pub data_type: DataType,

    /// Kernel preference. `auto` picks the widest vector kernel that fits the row layout.
    /// Default: auto
    pub hardware: HardwareType,

    /// Behaviour when a centroid loses all of its points.
    /// Default: skip
    pub empty_cluster_policy: EmptyClusterPolicy,

    /// Seed for sampling initial centroids from the data points.
    /// Default: 1024
    pub seed: u64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            data_type: DataType::Float,
            hardware: HardwareType::Auto,
            empty_cluster_policy: EmptyClusterPolicy::Skip,
            seed: DEFAULT_SEED,
        }
    }
}

impl ClusteringConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_hardware(mut self, hardware: HardwareType) -> Self {
        self.hardware = hardware;
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_empty_cluster_policy(mut self, policy: EmptyClusterPolicy) -> Self {
        self.empty_cluster_policy = policy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be at least 1"));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: ClusteringConfig = serde_yaml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClusteringConfig::default();
        assert_eq!(config.max_iterations, 256);
        assert_eq!(config.data_type, DataType::Float);
        assert_eq!(config.hardware, HardwareType::Auto);
        assert_eq!(config.empty_cluster_policy, EmptyClusterPolicy::Skip);
        assert!(config.validate().is_ok());
        assert!(config.with_max_iterations(0).validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempdir::TempDir::new("clustering_config_test")
            .expect("Failed to create temporary directory");
        let path = temp_dir.path().join("config.yaml");

        let config = ClusteringConfig::default()
            .with_max_iterations(12)
            .with_hardware(HardwareType::Scalar)
            .with_seed(7);
        config.save(&path).expect("Failed to save config");

        let loaded = ClusteringConfig::load(&path).expect("Failed to load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: ClusteringConfig =
            serde_yaml::from_str("hardware: vector\nempty_cluster_policy: error\n")
                .expect("Failed to parse yaml");
        assert_eq!(config.hardware, HardwareType::Vector);
        assert_eq!(config.empty_cluster_policy, EmptyClusterPolicy::Error);
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.seed, DEFAULT_SEED);
    }
}
