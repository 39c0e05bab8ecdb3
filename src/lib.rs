pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod harness;
pub mod monitor;
pub mod pool;
pub mod results;
pub mod scheduler;

pub use config::{Action, ConfigLoader, HarnessConfig, TargetSpec};
pub use driver::{Driver, DriverError, DriverResource, Session};
pub use error::{Error, Result};
pub use executor::ExecutionOutcome;
pub use harness::HarnessEngine;
pub use results::{FinalReport, HarnessSnapshot, ResultsAggregator};
