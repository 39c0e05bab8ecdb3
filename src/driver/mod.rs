//! The driving contract consumed by the pool and the executor.
//!
//! A [`Driver`] launches long-lived [`DriverResource`]s (one browser process
//! each); a resource carves out short-lived [`Session`]s (one tab per
//! execution). The harness core only talks to these traits — the shipped
//! Chromium adapter lives in [`chrome`].

pub mod chrome;

use crate::config::Action;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("launch failed: {0}")]
    Launch(String),

    /// Navigation timeout or network failure. Terminal for one execution.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// A page action failed or timed out. Aborts the remaining actions of
    /// that execution only.
    #[error("action failed: {0}")]
    Action(String),

    #[error("session error: {0}")]
    Session(String),
}

#[async_trait]
pub trait Driver: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn DriverResource>, DriverError>;
}

/// An expensive, reusable driving handle. Owned by the pool except while
/// checked out to exactly one execution.
#[async_trait]
pub trait DriverResource: Send + Sync {
    async fn new_session(&self) -> Result<Box<dyn Session>, DriverError>;

    async fn close(&self) -> Result<(), DriverError>;
}

/// A lightweight per-execution handle. Never reused across executions.
#[async_trait]
pub trait Session: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    async fn perform(&mut self, action: &Action) -> Result<(), DriverError>;

    async fn close(&mut self) -> Result<(), DriverError>;
}
