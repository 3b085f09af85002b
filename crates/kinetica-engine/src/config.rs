//! # Configuration Loading
//!
//! Simulation parameters with serde defaults and TOML file loading.

use serde::{Deserialize, Serialize};

/// How certificate removals are attributed when the node reports at least
/// as many structural changes as there were removals.
///
/// When removals exceed the node's reported change count, the surplus is
/// always counted as internal events and the reported count as external.
/// This policy only governs the other branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationPolicy {
    /// Attribute every removal in the instant as an external event.
    #[default]
    AllExternal,
    /// Leave both counters untouched for the instant.
    Skip,
}

/// Root configuration schema for a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_start_time")]
    pub start_time: f64,

    #[serde(default = "default_end_time")]
    pub end_time: f64,

    /// Step width used when the scheduler falls back to discrete stepping.
    #[serde(default = "default_time_step")]
    pub time_step: f64,

    /// Divergence tolerance between a predicted and a freshly observed
    /// position before the whole point is refitted.
    #[serde(default = "default_trajectory_epsilon")]
    pub trajectory_epsilon: f64,

    /// Ring-buffer capacity per axis; predictions fit degree `history - 1`.
    #[serde(default = "default_history")]
    pub history: usize,

    #[serde(default = "default_axis_count")]
    pub axis_count: usize,

    #[serde(default)]
    pub enable_predictions: bool,

    #[serde(default)]
    pub classification: ClassificationPolicy,
}

fn default_start_time() -> f64 {
    0.0
}

fn default_end_time() -> f64 {
    1800.0
}

fn default_time_step() -> f64 {
    1.0
}

fn default_trajectory_epsilon() -> f64 {
    20.0
}

fn default_history() -> usize {
    3
}

fn default_axis_count() -> usize {
    2
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_time: default_start_time(),
            end_time: default_end_time(),
            time_step: default_time_step(),
            trajectory_epsilon: default_trajectory_epsilon(),
            history: default_history(),
            axis_count: default_axis_count(),
            enable_predictions: false,
            classification: ClassificationPolicy::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a TOML file path.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|_| anyhow::anyhow!("Could not find config file: {}", path))?;

        toml::from_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse config: {}", e))
    }
}
