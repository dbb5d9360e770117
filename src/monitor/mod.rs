//! Event routing, counters and console reports

pub mod dispatcher;
pub mod report;
pub mod stats;

pub use dispatcher::EventDispatcher;
pub use report::{ReportFormat, Reporter};
pub use stats::{SourceCounts, StatsAggregator, StatsSnapshot};
