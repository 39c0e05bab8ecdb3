use crate::config::HarnessConfig;
use crate::driver::Driver;
use crate::error::Result;
use crate::monitor::ResourceMonitor;
use crate::pool::ResourcePool;
use crate::results::{FinalReport, HarnessSnapshot, ResultsAggregator};
use crate::scheduler::TargetScheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::sleep;

/// Wires the pool, gate, schedulers and monitor together and runs them for a
/// bounded duration. Shutdown is a cooperative flag: every unit observes it
/// at its next suspension point and drains its in-flight work.
pub struct HarnessEngine {
    config: Arc<HarnessConfig>,
    results: Arc<ResultsAggregator>,
    running: watch::Sender<bool>,
}

impl HarnessEngine {
    pub fn new(config: HarnessConfig) -> Self {
        let results = Arc::new(ResultsAggregator::new(
            config.targets.iter().map(|target| target.name.clone()),
        ));
        let (running, _) = watch::channel(false);

        Self {
            config: Arc::new(config),
            results,
            running,
        }
    }

    /// Requests a graceful stop: no new batch launches, in-flight work
    /// finishes and is recorded.
    pub fn shutdown(&self) {
        self.running.send_replace(false);
    }

    pub fn snapshot(&self) -> HarnessSnapshot {
        self.results.snapshot()
    }

    /// Streams aggregator snapshots on a 500ms tick for live displays.
    /// The feeder task exits when the receiver is dropped.
    pub fn watch_stats(&self) -> watch::Receiver<HarnessSnapshot> {
        let (tx, rx) = watch::channel(self.results.snapshot());
        let results = Arc::clone(&self.results);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(500));
            loop {
                interval.tick().await;
                if tx.send(results.snapshot()).is_err() {
                    break;
                }
            }
        });
        rx
    }

    pub async fn run(&self, driver: Arc<dyn Driver>) -> Result<FinalReport> {
        let config = &self.config;
        log::info!(
            "starting load run: {} targets, pool={}, gate={}, duration={}s",
            config.targets.len(),
            config.pool_size,
            config.max_concurrency,
            config.duration_secs
        );
        log::info!(
            "effective concurrency ceiling: {} (min of pool size {} and gate capacity {})",
            config.pool_size.min(config.max_concurrency),
            config.pool_size,
            config.max_concurrency
        );

        // Fatal on any launch failure — no partial pool.
        let pool = Arc::new(ResourcePool::init(config.pool_size, driver.as_ref()).await?);
        let gate = Arc::new(Semaphore::new(config.max_concurrency));

        self.running.send_replace(true);

        let mut units: JoinSet<()> = JoinSet::new();

        let monitor = ResourceMonitor::new(
            Arc::clone(&self.results),
            Arc::clone(&pool),
            Duration::from_secs(config.monitor_interval_secs),
            config.memory_warn_mb,
            config.duration_secs,
            self.running.subscribe(),
        );
        units.spawn(monitor.run());

        for target in &config.targets {
            let scheduler = TargetScheduler::new(
                Arc::new(target.clone()),
                Arc::clone(&pool),
                Arc::clone(&gate),
                Arc::clone(&self.results),
                Duration::from_millis(config.stagger_ms),
                self.running.subscribe(),
            );
            units.spawn(scheduler.run());
        }

        let mut cancel = self.running.subscribe();
        tokio::select! {
            _ = sleep(Duration::from_secs(config.duration_secs)) => {
                log::info!("run duration reached, draining");
            }
            _ = cancel.wait_for(|running| !*running) => {
                log::info!("cancellation requested, draining");
            }
        }
        self.running.send_replace(false);

        while let Some(joined) = units.join_next().await {
            if let Err(e) = joined {
                log::error!("worker unit panicked: {e}");
            }
        }

        pool.close_all().await;

        Ok(self.results.final_report(config.duration_secs))
    }
}
