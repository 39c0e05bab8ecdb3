#![allow(dead_code)]

use async_trait::async_trait;
use stampede::config::Action;
use stampede::driver::{Driver, DriverError, DriverResource, Session};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Counters shared between a [`MockDriver`] and the test observing it.
#[derive(Default)]
pub struct MockStats {
    pub launched: AtomicUsize,
    /// Sessions currently alive (created, not yet closed).
    pub live_sessions: AtomicUsize,
    /// High-water mark of `live_sessions` — a session lives for exactly one
    /// execution, so this observes the in-flight concurrency ceiling.
    pub max_live_sessions: AtomicUsize,
    /// Sessions closed, i.e. executions fully finished.
    pub completed: AtomicUsize,
    /// Wall-clock start of every navigate call, for cadence assertions.
    pub navigate_starts: Mutex<Vec<Instant>>,
}

pub struct MockDriver {
    pub stats: Arc<MockStats>,
    pub session_delay: Duration,
    pub fail_navigation: bool,
    /// Refuse to launch once this many resources exist.
    pub fail_launch_after: Option<usize>,
}

impl MockDriver {
    pub fn new(session_delay: Duration) -> Self {
        Self {
            stats: Arc::new(MockStats::default()),
            session_delay,
            fail_navigation: false,
            fail_launch_after: None,
        }
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn launch(&self) -> Result<Box<dyn DriverResource>, DriverError> {
        let already = self.stats.launched.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_launch_after {
            if already >= limit {
                return Err(DriverError::Launch("browser refused to start".to_string()));
            }
        }

        Ok(Box::new(MockResource {
            stats: Arc::clone(&self.stats),
            session_delay: self.session_delay,
            fail_navigation: self.fail_navigation,
        }))
    }
}

pub struct MockResource {
    stats: Arc<MockStats>,
    session_delay: Duration,
    fail_navigation: bool,
}

#[async_trait]
impl DriverResource for MockResource {
    async fn new_session(&self) -> Result<Box<dyn Session>, DriverError> {
        let live = self.stats.live_sessions.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_live_sessions.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(MockSession {
            stats: Arc::clone(&self.stats),
            delay: self.session_delay,
            fail_navigation: self.fail_navigation,
        }))
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

pub struct MockSession {
    stats: Arc<MockStats>,
    delay: Duration,
    fail_navigation: bool,
}

#[async_trait]
impl Session for MockSession {
    async fn navigate(&mut self, _url: &str, _timeout: Duration) -> Result<(), DriverError> {
        self.stats.navigate_starts.lock().unwrap().push(Instant::now());
        sleep(self.delay).await;
        if self.fail_navigation {
            return Err(DriverError::Navigation("connection refused".to_string()));
        }
        Ok(())
    }

    async fn perform(&mut self, _action: &Action) -> Result<(), DriverError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        self.stats.live_sessions.fetch_sub(1, Ordering::SeqCst);
        self.stats.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
