// ============================================================================
// healthtrack Library
// ============================================================================

//! Durable local storage for daily health records.
//!
//! The collection lives in a single JSON file. [`RecordStore`] loads and
//! saves the whole collection with advisory locking, an atomic temp-file
//! replace and a backup copy that heals a corrupt file on the next load.
//! [`HealthSession`] holds the caller's working copy and the upsert-by-date
//! policy; [`report`] turns a collection into the list, summary and chart
//! series a dashboard shows.
//!
//! # Examples
//!
//! ```
//! use chrono::NaiveDate;
//! use healthtrack::{HealthRecord, HealthSession, OverwritePolicy, RecordStore, StoreConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let dir = tempfile::TempDir::new()?;
//! let store = RecordStore::open(StoreConfig::new(dir.path()))?;
//! let mut session = HealthSession::open(store);
//!
//! let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
//! let record = HealthRecord::new(day).weight(70.5).steps(8000).sleep_hours(7.5);
//! session.upsert(record, OverwritePolicy::Ask)?;
//! session.commit()?;
//!
//! let reloaded = session.store().load_all();
//! assert_eq!(reloaded.records.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod facade;
pub mod report;
pub mod storage;

// Re-export main types for convenience
pub use crate::core::{ErrorKind, HealthRecord, Result, StoreError};
pub use facade::{HealthSession, OverwritePolicy, UpsertOutcome};
pub use storage::{
    FileLock, LoadReport, LoadSource, LockMode, RecordStore, StoreConfig, StorePaths, WriteObserver,
    WriteStage,
};
