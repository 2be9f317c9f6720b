//! Read-only views over a record collection: the history list, the summary
//! figures and the per-metric chart series.

pub mod history;
pub mod summary;
pub mod table;
pub mod trend;

pub use history::{DateRange, history};
pub use summary::Summary;
pub use table::RecordTable;
pub use trend::{Metric, TrendPoint, trend};
