use crate::config::TargetSpec;
use crate::driver::{DriverError, DriverResource, Session};
use std::time::{Duration, Instant};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl ExecutionOutcome {
    pub fn ok(elapsed: Duration) -> Self {
        Self {
            success: true,
            elapsed,
            error: None,
        }
    }

    pub fn failed(elapsed: Duration, error: String) -> Self {
        Self {
            success: false,
            elapsed,
            error: Some(error),
        }
    }
}

/// Runs one action sequence against one target using one checked-out
/// resource. Every driver failure is converted into a failed outcome here;
/// nothing propagates to the scheduler. The session is closed on every path.
pub async fn execute(resource: &dyn DriverResource, target: &TargetSpec) -> ExecutionOutcome {
    let started = Instant::now();

    let mut session = match resource.new_session().await {
        Ok(session) => session,
        Err(e) => return ExecutionOutcome::failed(started.elapsed(), e.to_string()),
    };

    let result = drive(session.as_mut(), target).await;
    // Elapsed covers session creation through outcome determination;
    // teardown is excluded.
    let elapsed = started.elapsed();

    if let Err(e) = session.close().await {
        log::warn!("[{}] session close failed: {}", target.name, e);
    }

    match result {
        Ok(()) => ExecutionOutcome::ok(elapsed),
        Err(e) => ExecutionOutcome::failed(elapsed, e.to_string()),
    }
}

/// Navigate, then run the configured actions strictly in order. The first
/// failure aborts the rest; already-applied actions are not rolled back.
async fn drive(session: &mut dyn Session, target: &TargetSpec) -> Result<(), DriverError> {
    session.navigate(&target.url, NAVIGATION_TIMEOUT).await?;

    for action in &target.actions {
        session.perform(action).await?;
    }

    Ok(())
}
