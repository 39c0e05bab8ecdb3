use crate::pool::ResourcePool;
use crate::results::{HarnessSnapshot, ResultsAggregator};
use chrono::Local;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tokio::sync::watch;
use tokio::time::sleep;

/// Periodic self-observation: samples own-process CPU and RSS, combines them
/// with an aggregator snapshot and emits a status block. Sampling failures
/// are logged and the loop continues; the monitor never terminates a run.
pub struct ResourceMonitor {
    results: Arc<ResultsAggregator>,
    pool: Arc<ResourcePool>,
    period: Duration,
    memory_warn_mb: u64,
    duration_secs: u64,
    running: watch::Receiver<bool>,
}

impl ResourceMonitor {
    pub fn new(
        results: Arc<ResultsAggregator>,
        pool: Arc<ResourcePool>,
        period: Duration,
        memory_warn_mb: u64,
        duration_secs: u64,
        running: watch::Receiver<bool>,
    ) -> Self {
        Self {
            results,
            pool,
            period,
            memory_warn_mb,
            duration_secs,
            running,
        }
    }

    pub async fn run(mut self) {
        let refresh = ProcessRefreshKind::nothing().with_memory().with_cpu();
        let mut system =
            System::new_with_specifics(RefreshKind::nothing().with_processes(refresh));
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                log::warn!("[monitor] cannot resolve own pid: {e}");
                None
            }
        };

        loop {
            tokio::select! {
                _ = sleep(self.period) => {}
                _ = self.running.wait_for(|running| !*running) => break,
            }
            self.sample(&mut system, pid, refresh);
        }

        log::debug!("[monitor] stopped");
    }

    fn sample(&self, system: &mut System, pid: Option<Pid>, refresh: ProcessRefreshKind) {
        let process_stats = pid.and_then(|pid| {
            system.refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, refresh);
            system
                .process(pid)
                .map(|process| (process.cpu_usage(), process.memory() / 1024 / 1024))
        });

        let snapshot = self.results.snapshot();
        self.emit_status(process_stats, &snapshot);

        if let Some((_, memory_mb)) = process_stats {
            if memory_mb > self.memory_warn_mb {
                // Sessions are torn down deterministically per execution;
                // this is purely an early-warning signal.
                log::warn!(
                    "[monitor] memory usage {memory_mb}MB exceeds {}MB threshold",
                    self.memory_warn_mb
                );
            }
        }
    }

    fn emit_status(&self, process_stats: Option<(f32, u64)>, snapshot: &HarnessSnapshot) {
        let mut block = String::new();
        let frame = "=".repeat(80);
        let _ = writeln!(block, "\n{frame}");
        let _ = writeln!(
            block,
            "[{}] harness status",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(
            block,
            "Elapsed: {:.1}m / {:.1}m",
            snapshot.elapsed_seconds / 60.0,
            self.duration_secs as f64 / 60.0
        );
        match process_stats {
            Some((cpu, memory_mb)) => {
                let _ = writeln!(block, "Process - CPU: {cpu:.1}%, memory: {memory_mb}MB");
            }
            None => {
                let _ = writeln!(block, "Process - stats unavailable");
            }
        }
        let _ = writeln!(
            block,
            "Pool - {}/{} resources checked out",
            self.pool.checked_out(),
            self.pool.size()
        );
        let _ = writeln!(
            block,
            "Totals - executions: {}, success: {}, failed: {}, success rate: {:.1}%",
            snapshot.total, snapshot.success, snapshot.failed, snapshot.success_rate
        );
        for target in &snapshot.targets {
            if target.total > 0 {
                let _ = writeln!(
                    block,
                    "  {}: success {}, failed {}, success rate {:.1}%",
                    target.name, target.success, target.failed, target.success_rate
                );
            }
        }
        block.push_str(&frame);

        log::info!("{block}");
    }
}
