pub mod aggregator;
pub mod snapshot;

pub use aggregator::ResultsAggregator;
pub use snapshot::{FinalReport, HarnessSnapshot, TargetStats};
