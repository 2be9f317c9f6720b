use super::StoreConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// The data file and its siblings. All live in one directory so the final
/// rename never crosses a filesystem boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub dir: PathBuf,
    pub primary: PathBuf,
    pub backup: PathBuf,
    /// Staging file for refreshing `backup`.
    pub backup_temp: PathBuf,
    pub temp: PathBuf,
    pub lock: PathBuf,
}

impl StorePaths {
    pub fn new(dir: impl AsRef<Path>, file_name: &str) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let primary = dir.join(file_name);
        Self::around(dir, primary)
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::around(config.data_dir.clone(), config.primary_path())
    }

    fn around(dir: PathBuf, primary: PathBuf) -> Self {
        Self {
            backup: with_suffix(&primary, ".bak"),
            backup_temp: with_suffix(&primary, ".bak.tmp"),
            temp: with_suffix(&primary, ".tmp"),
            lock: with_suffix(&primary, ".lock"),
            primary,
            dir,
        }
    }
}

// Appends rather than replacing the extension: `health_data.json.bak`.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_paths() {
        let paths = StorePaths::new("data", "health_data.json");
        assert_eq!(paths.primary, PathBuf::from("data/health_data.json"));
        assert_eq!(paths.backup, PathBuf::from("data/health_data.json.bak"));
        assert_eq!(paths.backup_temp, PathBuf::from("data/health_data.json.bak.tmp"));
        assert_eq!(paths.temp, PathBuf::from("data/health_data.json.tmp"));
        assert_eq!(paths.lock, PathBuf::from("data/health_data.json.lock"));
        assert_eq!(paths.temp.parent(), paths.primary.parent());
    }

    #[test]
    fn test_from_config_matches_new() {
        let config = StoreConfig::new("/srv/health").file_name("log.json");
        let paths = StorePaths::from_config(&config);
        assert_eq!(paths, StorePaths::new("/srv/health", "log.json"));
        assert_eq!(paths.primary, config.primary_path());
    }
}
