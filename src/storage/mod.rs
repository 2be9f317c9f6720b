pub mod config;
pub mod lock;
pub mod paths;
pub mod persistence;

pub use config::StoreConfig;
pub use lock::{FileLock, LockMode};
pub use paths::StorePaths;
pub use persistence::{LoadReport, LoadSource, RecordStore, WriteObserver, WriteStage};
