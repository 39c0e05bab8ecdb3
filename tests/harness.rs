mod common;

use common::MockDriver;
use stampede::config::{HarnessConfig, TargetSpec};
use stampede::harness::HarnessEngine;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::{sleep, timeout};

fn target(name: &str, interval_secs: u64, batch_count: u32) -> TargetSpec {
    TargetSpec {
        name: name.to_string(),
        url: format!("https://example.com/{name}"),
        interval_secs,
        batch_count,
        actions: Vec::new(),
    }
}

fn config(pool_size: usize, max_concurrency: usize, targets: Vec<TargetSpec>) -> HarnessConfig {
    HarnessConfig {
        pool_size,
        max_concurrency,
        duration_secs: 1,
        stagger_ms: 10,
        monitor_interval_secs: 30,
        memory_warn_mb: 1000,
        targets,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn gate_bounds_in_flight_executions_across_targets() {
    let driver = MockDriver::new(Duration::from_millis(50));
    let stats = Arc::clone(&driver.stats);

    // pool is larger than the gate: the gate is the binding limit
    let engine = HarnessEngine::new(config(
        4,
        2,
        vec![target("a", 1, 4), target("b", 1, 4)],
    ));
    let report = engine.run(Arc::new(driver)).await.unwrap();

    assert!(stats.max_live_sessions.load(Ordering::SeqCst) <= 2);
    assert!(report.stats.total > 0);
    assert_eq!(report.stats.total as usize, stats.completed.load(Ordering::SeqCst));
    assert_eq!(report.stats.success_rate, 100.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_bounds_in_flight_executions_when_smaller_than_gate() {
    let driver = MockDriver::new(Duration::from_millis(50));
    let stats = Arc::clone(&driver.stats);

    let engine = HarnessEngine::new(config(2, 8, vec![target("a", 1, 6)]));
    let report = engine.run(Arc::new(driver)).await.unwrap();

    assert!(stats.max_live_sessions.load(Ordering::SeqCst) <= 2);
    assert!(report.stats.total > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failures_are_recorded_not_dropped() {
    let mut driver = MockDriver::new(Duration::from_millis(10));
    driver.fail_navigation = true;
    let stats = Arc::clone(&driver.stats);

    let engine = HarnessEngine::new(config(2, 2, vec![target("a", 1, 3)]));
    let report = engine.run(Arc::new(driver)).await.unwrap();

    assert!(report.stats.total > 0);
    assert_eq!(report.stats.success, 0);
    assert_eq!(report.stats.failed as usize, stats.completed.load(Ordering::SeqCst));

    let target_stats = &report.stats.targets[0];
    assert!(!target_stats.recent_errors.is_empty());
    assert!(target_stats.recent_errors.len() <= 5);
    assert!(target_stats.recent_errors[0].contains("connection refused"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancellation_drains_in_flight_work() {
    let driver = MockDriver::new(Duration::from_millis(100));
    let stats = Arc::clone(&driver.stats);

    let mut cfg = config(2, 4, vec![target("a", 1, 4)]);
    cfg.duration_secs = 30;
    let engine = Arc::new(HarnessEngine::new(cfg));

    let runner = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.run(Arc::new(driver)).await })
    };

    sleep(Duration::from_millis(250)).await;
    engine.shutdown();

    let report = timeout(Duration::from_secs(5), runner)
        .await
        .expect("run did not drain after shutdown")
        .unwrap()
        .unwrap();

    // the launched batch drained: nothing is still in flight, and every
    // completed execution made it into the report
    assert_eq!(stats.live_sessions.load(Ordering::SeqCst), 0);
    assert_eq!(report.stats.total as usize, stats.completed.load(Ordering::SeqCst));
    assert!(report.stats.total > 0);
}

#[tokio::test]
async fn pool_init_failure_is_fatal() {
    let mut driver = MockDriver::new(Duration::ZERO);
    driver.fail_launch_after = Some(1);

    let engine = HarnessEngine::new(config(3, 3, vec![target("a", 1, 1)]));
    let result = engine.run(Arc::new(driver)).await;

    assert!(matches!(result, Err(stampede::Error::ResourceInit(_))));
}
