use crate::executor::ExecutionOutcome;
use crate::results::snapshot::{FinalReport, HarnessSnapshot, TargetStats};
use chrono::Local;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// FIFO cap on retained error strings per target.
const ERROR_CAP: usize = 100;

/// Errors surfaced per target in snapshots and the final report.
const REPORT_ERRORS: usize = 5;

struct TargetEntry {
    success_count: AtomicU64,
    failed_count: AtomicU64,
    samples: Mutex<Vec<Duration>>,
    errors: Mutex<VecDeque<String>>,
}

impl TargetEntry {
    fn new() -> Self {
        Self {
            success_count: AtomicU64::new(0),
            failed_count: AtomicU64::new(0),
            samples: Mutex::new(Vec::new()),
            errors: Mutex::new(VecDeque::new()),
        }
    }
}

/// Concurrency-safe per-target counters, timing samples and a capped error
/// log. The entry set is fixed at construction; `record` never inserts, so
/// arbitrary concurrent callers only ever touch one entry's atomics and
/// short-lived locks (never held across an await).
pub struct ResultsAggregator {
    order: Vec<String>,
    entries: HashMap<String, TargetEntry>,
    started: Instant,
}

impl ResultsAggregator {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = names.into_iter().map(Into::into).collect();
        let entries = order
            .iter()
            .map(|name| (name.clone(), TargetEntry::new()))
            .collect();

        Self {
            order,
            entries,
            started: Instant::now(),
        }
    }

    pub fn record(&self, target: &str, outcome: &ExecutionOutcome) {
        let Some(entry) = self.entries.get(target) else {
            // Entries are created from the same config the schedulers run
            // from, so this indicates a wiring bug.
            log::warn!("dropping result for unknown target '{target}'");
            return;
        };

        if outcome.success {
            entry.success_count.fetch_add(1, Ordering::SeqCst);
            entry.samples.lock().unwrap().push(outcome.elapsed);
        } else {
            entry.failed_count.fetch_add(1, Ordering::SeqCst);
            let message = outcome
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            let mut errors = entry.errors.lock().unwrap();
            if errors.len() == ERROR_CAP {
                errors.pop_front();
            }
            errors.push_back(format!(
                "{}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                message
            ));
        }
    }

    pub fn snapshot(&self) -> HarnessSnapshot {
        let mut targets = Vec::with_capacity(self.order.len());
        let mut total_success = 0u64;
        let mut total_failed = 0u64;

        for name in &self.order {
            let entry = &self.entries[name];
            let success = entry.success_count.load(Ordering::SeqCst);
            let failed = entry.failed_count.load(Ordering::SeqCst);
            let total = success + failed;
            total_success += success;
            total_failed += failed;

            let (avg, min, max) = {
                let samples = entry.samples.lock().unwrap();
                if samples.is_empty() {
                    (0.0, 0.0, 0.0)
                } else {
                    let sum: Duration = samples.iter().sum();
                    let min = samples.iter().min().copied().unwrap_or_default();
                    let max = samples.iter().max().copied().unwrap_or_default();
                    (
                        sum.as_secs_f64() / samples.len() as f64,
                        min.as_secs_f64(),
                        max.as_secs_f64(),
                    )
                }
            };

            let recent_errors: Vec<String> = {
                let errors = entry.errors.lock().unwrap();
                let skip = errors.len().saturating_sub(REPORT_ERRORS);
                errors.iter().skip(skip).cloned().collect()
            };

            targets.push(TargetStats {
                name: name.clone(),
                total,
                success,
                failed,
                success_rate: rate(success, total),
                avg_response_secs: avg,
                min_response_secs: min,
                max_response_secs: max,
                recent_errors,
            });
        }

        let total = total_success + total_failed;
        let elapsed = self.started.elapsed().as_secs_f64();

        HarnessSnapshot {
            elapsed_seconds: elapsed,
            total,
            success: total_success,
            failed: total_failed,
            success_rate: rate(total_success, total),
            throughput_rps: if elapsed > 0.0 {
                total as f64 / elapsed
            } else {
                0.0
            },
            targets,
        }
    }

    pub fn final_report(&self, duration_secs: u64) -> FinalReport {
        FinalReport {
            finished_at: Local::now(),
            duration_secs,
            stats: self.snapshot(),
        }
    }
}

fn rate(success: u64, total: u64) -> f64 {
    if total > 0 {
        success as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ok(secs: u64) -> ExecutionOutcome {
        ExecutionOutcome::ok(Duration::from_secs(secs))
    }

    fn failed(message: &str) -> ExecutionOutcome {
        ExecutionOutcome::failed(Duration::from_millis(10), message.to_string())
    }

    #[test]
    fn computes_per_target_stats() {
        let aggregator = ResultsAggregator::new(["login"]);
        aggregator.record("login", &ok(1));
        aggregator.record("login", &ok(2));
        aggregator.record("login", &ok(3));

        let snapshot = aggregator.snapshot();
        let stats = &snapshot.targets[0];
        assert_eq!(stats.total, 3);
        assert_eq!(stats.success, 3);
        assert_eq!(stats.success_rate, 100.0);
        assert_eq!(stats.avg_response_secs, 2.0);
        assert_eq!(stats.min_response_secs, 1.0);
        assert_eq!(stats.max_response_secs, 3.0);
    }

    #[test]
    fn caps_errors_and_reports_most_recent() {
        let aggregator = ResultsAggregator::new(["t"]);
        for i in 0..150 {
            aggregator.record("t", &failed(&format!("boom {i}")));
        }

        let entry = &aggregator.entries["t"];
        assert_eq!(entry.errors.lock().unwrap().len(), ERROR_CAP);

        let snapshot = aggregator.snapshot();
        let stats = &snapshot.targets[0];
        assert_eq!(stats.failed, 150);
        assert_eq!(stats.recent_errors.len(), REPORT_ERRORS);
        assert!(stats.recent_errors[4].contains("boom 149"));
    }

    #[test]
    fn unknown_target_is_dropped_without_panic() {
        let aggregator = ResultsAggregator::new(["t"]);
        aggregator.record("ghost", &ok(1));
        assert_eq!(aggregator.snapshot().total, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_records_are_not_lost() {
        let aggregator = Arc::new(ResultsAggregator::new(["a", "b"]));

        let mut handles = Vec::new();
        for i in 0..200 {
            let aggregator = Arc::clone(&aggregator);
            handles.push(tokio::spawn(async move {
                let target = if i % 2 == 0 { "a" } else { "b" };
                if i % 4 == 0 {
                    aggregator.record(target, &failed("boom"));
                } else {
                    aggregator.record(target, &ok(1));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = aggregator.snapshot();
        assert_eq!(snapshot.total, 200);
        assert_eq!(snapshot.failed, 50);
        assert_eq!(
            snapshot.targets.iter().map(|t| t.total).sum::<u64>(),
            200
        );
    }
}
