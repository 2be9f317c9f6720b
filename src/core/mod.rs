pub mod error;
pub mod record;

pub use error::{ErrorKind, Result, StoreError};
pub use record::{HealthRecord, MAX_SLEEP_HOURS, MAX_WEIGHT_KG, sort_newest_first};
