use crate::config::TargetSpec;
use crate::executor::{self, ExecutionOutcome};
use crate::pool::ResourcePool;
use crate::results::ResultsAggregator;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    BatchRunning,
    Sleeping,
    Stopped,
}

/// Per-target control loop: fires a batch of concurrent executions every
/// `interval_secs`, measured from batch start. Batches of different targets
/// are fully independent and contend only on the shared gate and pool.
pub struct TargetScheduler {
    target: Arc<TargetSpec>,
    pool: Arc<ResourcePool>,
    gate: Arc<Semaphore>,
    results: Arc<ResultsAggregator>,
    stagger: Duration,
    running: watch::Receiver<bool>,
    state: SchedulerState,
}

impl TargetScheduler {
    pub fn new(
        target: Arc<TargetSpec>,
        pool: Arc<ResourcePool>,
        gate: Arc<Semaphore>,
        results: Arc<ResultsAggregator>,
        stagger: Duration,
        running: watch::Receiver<bool>,
    ) -> Self {
        Self {
            target,
            pool,
            gate,
            results,
            stagger,
            running,
            state: SchedulerState::Idle,
        }
    }

    pub async fn run(mut self) {
        log::info!(
            "[{}] scheduler starting: {} executions every {}s",
            self.target.name,
            self.target.batch_count,
            self.target.interval_secs
        );

        while *self.running.borrow() {
            self.set_state(SchedulerState::BatchRunning);
            let batch_start = Instant::now();

            let batch = self.launch_batch().await;
            let (succeeded, completed, mean_secs) = self.join_batch(batch).await;
            log::info!(
                "[{}] batch complete: {}/{} succeeded, avg response {:.2}s",
                self.target.name,
                succeeded,
                completed,
                mean_secs
            );

            // Next batch starts interval seconds after this one started.
            // An overrunning batch rolls straight into the next one; there
            // is no catch-up or skip logic.
            let interval = Duration::from_secs(self.target.interval_secs);
            if let Some(pause) = interval.checked_sub(batch_start.elapsed()) {
                self.set_state(SchedulerState::Sleeping);
                tokio::select! {
                    _ = sleep(pause) => {}
                    _ = self.running.wait_for(|running| !*running) => {}
                }
            }
        }

        self.set_state(SchedulerState::Stopped);
        log::info!("[{}] scheduler stopped", self.target.name);
    }

    /// Spawns `batch_count` executions, staggering the starts to avoid a
    /// thundering herd. The whole batch launches even if the stop flag
    /// clears mid-launch; the loop condition drains it afterwards.
    async fn launch_batch(&self) -> JoinSet<ExecutionOutcome> {
        let mut batch = JoinSet::new();
        for i in 0..self.target.batch_count {
            if i > 0 {
                sleep(self.stagger).await;
            }

            let target = Arc::clone(&self.target);
            let pool = Arc::clone(&self.pool);
            let gate = Arc::clone(&self.gate);
            let results = Arc::clone(&self.results);
            batch.spawn(async move { run_one(&target, &pool, &gate, &results).await });
        }
        batch
    }

    /// Joins every execution of the batch. A failing execution is just a
    /// failed outcome; a panicking one is recorded as failed so counters
    /// still add up. Neither touches its siblings.
    async fn join_batch(&self, mut batch: JoinSet<ExecutionOutcome>) -> (u64, u64, f64) {
        let mut succeeded = 0u64;
        let mut completed = 0u64;
        let mut total_elapsed = Duration::ZERO;

        while let Some(joined) = batch.join_next().await {
            completed += 1;
            match joined {
                Ok(outcome) => {
                    if outcome.success {
                        succeeded += 1;
                        total_elapsed += outcome.elapsed;
                    }
                }
                Err(e) => {
                    log::error!("[{}] execution task panicked: {e}", self.target.name);
                    self.results.record(
                        &self.target.name,
                        &ExecutionOutcome::failed(
                            Duration::ZERO,
                            format!("execution task panicked: {e}"),
                        ),
                    );
                }
            }
        }

        let mean_secs = if succeeded > 0 {
            total_elapsed.as_secs_f64() / succeeded as f64
        } else {
            0.0
        };
        (succeeded, completed, mean_secs)
    }

    fn set_state(&mut self, state: SchedulerState) {
        self.state = state;
        log::debug!("[{}] state -> {:?}", self.target.name, self.state);
    }
}

/// One execution: gate slot, then pool resource, then the executor. Both
/// guards release on every path by drop order — resource back to the pool
/// first, then the gate slot, mirroring acquisition.
async fn run_one(
    target: &TargetSpec,
    pool: &ResourcePool,
    gate: &Semaphore,
    results: &ResultsAggregator,
) -> ExecutionOutcome {
    let _permit = match gate.acquire().await {
        Ok(permit) => permit,
        Err(_) => {
            let outcome =
                ExecutionOutcome::failed(Duration::ZERO, "concurrency gate closed".to_string());
            results.record(&target.name, &outcome);
            return outcome;
        }
    };

    let resource = match pool.acquire().await {
        Ok(resource) => resource,
        Err(e) => {
            let outcome = ExecutionOutcome::failed(Duration::ZERO, e.to_string());
            results.record(&target.name, &outcome);
            return outcome;
        }
    };

    let outcome = executor::execute(&*resource, target).await;
    results.record(&target.name, &outcome);

    drop(resource);
    drop(_permit);
    outcome
}
