use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HarnessConfig {
    /// Number of browsers launched eagerly at startup.
    #[serde(default = "default_pool_size")]
    #[validate(range(min = 1))]
    pub pool_size: usize,

    /// Process-wide cap on simultaneous executions across all targets.
    /// Independent of `pool_size`; the effective ceiling is the minimum of
    /// the two (executions queue on whichever runs out first).
    #[serde(default = "default_max_concurrency")]
    #[validate(range(min = 1))]
    pub max_concurrency: usize,

    #[serde(default = "default_duration_secs")]
    #[validate(range(min = 1))]
    pub duration_secs: u64,

    /// Delay between execution *starts* within a batch.
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,

    #[serde(default = "default_monitor_interval_secs")]
    #[validate(range(min = 1))]
    pub monitor_interval_secs: u64,

    /// RSS above this logs a warning from the resource monitor.
    #[serde(default = "default_memory_warn_mb")]
    pub memory_warn_mb: u64,

    #[validate]
    pub targets: Vec<TargetSpec>,
}

/// One endpoint under test. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TargetSpec {
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(url)]
    pub url: String,

    /// A batch is fired every `interval_secs`, measured from batch start.
    #[serde(default = "default_interval_secs")]
    #[validate(range(min = 1))]
    pub interval_secs: u64,

    /// Executions launched per batch.
    #[serde(default = "default_batch_count")]
    #[validate(range(min = 1))]
    pub batch_count: u32,

    #[serde(default)]
    pub actions: Vec<Action>,
}

/// A page action. An unrecognized `type` fails deserialization, so bad
/// configs are rejected at load rather than mid-run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Fill {
        selector: String,
        value: String,
        #[serde(default = "default_action_timeout_ms")]
        timeout_ms: u64,
    },
    Click {
        selector: String,
        #[serde(default = "default_action_timeout_ms")]
        timeout_ms: u64,
    },
    Wait {
        selector: String,
        #[serde(default = "default_action_timeout_ms")]
        timeout_ms: u64,
    },
    WaitForLoad {
        #[serde(default = "default_load_timeout_ms")]
        timeout_ms: u64,
    },
}

impl Action {
    pub fn timeout(&self) -> Duration {
        let ms = match self {
            Action::Fill { timeout_ms, .. }
            | Action::Click { timeout_ms, .. }
            | Action::Wait { timeout_ms, .. }
            | Action::WaitForLoad { timeout_ms } => *timeout_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Fill { .. } => "fill",
            Action::Click { .. } => "click",
            Action::Wait { .. } => "wait",
            Action::WaitForLoad { .. } => "wait_for_load",
        }
    }
}

fn default_pool_size() -> usize {
    5
}

fn default_max_concurrency() -> usize {
    10
}

fn default_duration_secs() -> u64 {
    1800
}

fn default_stagger_ms() -> u64 {
    100
}

fn default_monitor_interval_secs() -> u64 {
    30
}

fn default_memory_warn_mb() -> u64 {
    1000
}

fn default_interval_secs() -> u64 {
    10
}

fn default_batch_count() -> u32 {
    1
}

fn default_action_timeout_ms() -> u64 {
    5000
}

fn default_load_timeout_ms() -> u64 {
    10_000
}
