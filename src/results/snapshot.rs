use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetStats {
    pub name: String,
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub avg_response_secs: f64,
    pub min_response_secs: f64,
    pub max_response_secs: f64,
    /// Most recent errors, oldest first (at most 5).
    pub recent_errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessSnapshot {
    pub elapsed_seconds: f64,
    pub total: u64,
    pub success: u64,
    pub failed: u64,
    pub success_rate: f64,
    /// Completed executions per second of wall-clock time.
    pub throughput_rps: f64,
    pub targets: Vec<TargetStats>,
}

#[derive(Debug, Clone)]
pub struct FinalReport {
    pub finished_at: DateTime<Local>,
    pub duration_secs: u64,
    pub stats: HarnessSnapshot,
}

impl fmt::Display for FinalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = "=".repeat(80);
        writeln!(f, "{frame}")?;
        writeln!(f, "Load test final report")?;
        writeln!(f, "Finished: {}", self.finished_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(
            f,
            "Configured duration: {}s (elapsed {:.1}s)",
            self.duration_secs, self.stats.elapsed_seconds
        )?;
        writeln!(f, "{frame}")?;
        writeln!(f)?;
        writeln!(f, "Overall:")?;
        writeln!(f, "  Total executions: {}", self.stats.total)?;
        writeln!(f, "  Succeeded: {}", self.stats.success)?;
        writeln!(f, "  Failed: {}", self.stats.failed)?;
        writeln!(f, "  Success rate: {:.2}%", self.stats.success_rate)?;
        writeln!(f, "  Average throughput: {:.2} exec/s", self.stats.throughput_rps)?;

        writeln!(f)?;
        writeln!(f, "Per target:")?;
        for target in &self.stats.targets {
            writeln!(f)?;
            writeln!(f, "[{}]", target.name)?;
            writeln!(f, "  Total: {}", target.total)?;
            writeln!(f, "  Succeeded: {}", target.success)?;
            writeln!(f, "  Failed: {}", target.failed)?;
            writeln!(f, "  Success rate: {:.2}%", target.success_rate)?;
            writeln!(f, "  Avg response: {:.2}s", target.avg_response_secs)?;
            writeln!(f, "  Max response: {:.2}s", target.max_response_secs)?;
            writeln!(f, "  Min response: {:.2}s", target.min_response_secs)?;
            if !target.recent_errors.is_empty() {
                writeln!(f, "  Recent errors (up to 5):")?;
                for error in &target.recent_errors {
                    writeln!(f, "    - {error}")?;
                }
            }
        }

        write!(f, "\n{frame}")
    }
}
