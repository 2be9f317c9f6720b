use crate::core::{Result, StoreError};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DATA_DIR: &str = "HEALTHTRACK_DATA_DIR";
pub const ENV_FILE: &str = "HEALTHTRACK_FILE";
pub const ENV_LOCK_TIMEOUT_MS: &str = "HEALTHTRACK_LOCK_TIMEOUT_MS";

/// Record store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the data file and its backup, temp and lock siblings
    pub data_dir: PathBuf,

    /// File name of the primary data file inside `data_dir`
    pub file_name: String,

    /// Longest time a load or save waits for the advisory lock
    pub lock_timeout: Duration,

    /// Delay between lock attempts while waiting
    pub lock_poll_interval: Duration,

    /// Sync the directory after the rename so the new entry is durable (Unix only)
    pub sync_directory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("data")
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            file_name: "health_data.json".to_string(),
            lock_timeout: Duration::from_secs(5),
            lock_poll_interval: Duration::from_millis(25),
            sync_directory: true,
        }
    }

    /// Set the data file name
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = name.to_string();
        self
    }

    /// Set the lock wait bound
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Set the lock polling interval
    pub fn lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }

    pub fn sync_directory(mut self, enabled: bool) -> Self {
        self.sync_directory = enabled;
        self
    }

    /// Build a configuration from `HEALTHTRACK_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup(ENV_DATA_DIR) {
            Some(dir) if !dir.trim().is_empty() => Self::new(dir.trim()),
            _ => Self::default(),
        };

        if let Some(file) = lookup(ENV_FILE) {
            config = config.file_name(file.trim());
        }

        if let Some(raw) = lookup(ENV_LOCK_TIMEOUT_MS) {
            let millis = raw.trim().parse::<u64>().map_err(|_| {
                StoreError::InvalidConfig(format!(
                    "{} must be a whole number of milliseconds, got '{}'",
                    ENV_LOCK_TIMEOUT_MS, raw
                ))
            })?;
            config = config.lock_timeout(Duration::from_millis(millis));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() {
            return Err(StoreError::InvalidConfig(
                "file name must not be empty".to_string(),
            ));
        }
        if self.file_name.contains(['/', '\\']) || self.file_name == "." || self.file_name == ".." {
            return Err(StoreError::InvalidConfig(format!(
                "file name '{}' must be a plain file name, not a path",
                self.file_name
            )));
        }
        if self.lock_poll_interval.is_zero() {
            return Err(StoreError::InvalidConfig(
                "lock poll interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn primary_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.primary_path(), PathBuf::from("data/health_data.json"));
        assert_eq!(config.lock_timeout, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = StoreConfig::new("/var/lib/health")
            .file_name("metrics.json")
            .lock_timeout(Duration::from_millis(200))
            .lock_poll_interval(Duration::from_millis(5))
            .sync_directory(false);
        assert_eq!(config.primary_path(), PathBuf::from("/var/lib/health/metrics.json"));
        assert_eq!(config.lock_poll_interval, Duration::from_millis(5));
        assert!(!config.sync_directory);
    }

    #[test]
    fn test_from_env_values() {
        let config = StoreConfig::from_lookup(lookup_from(&[
            (ENV_DATA_DIR, "/srv/health"),
            (ENV_FILE, "log.json"),
            (ENV_LOCK_TIMEOUT_MS, "750"),
        ]))
        .unwrap();
        assert_eq!(config.primary_path(), PathBuf::from("/srv/health/log.json"));
        assert_eq!(config.lock_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_from_env_rejects_bad_timeout() {
        let err = StoreConfig::from_lookup(lookup_from(&[(ENV_LOCK_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_path_like_file_name() {
        assert!(StoreConfig::default().file_name("../escape.json").validate().is_err());
        assert!(StoreConfig::default().file_name("").validate().is_err());
        assert!(
            StoreConfig::default()
                .lock_poll_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
