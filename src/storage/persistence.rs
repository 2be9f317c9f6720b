//! Durable JSON persistence for the health record collection.
//!
//! The whole collection lives in one pretty-printed JSON array. Writes go to a
//! temp file in the same directory, are synced, and are renamed over the
//! primary file, so readers see either the old or the new content. The
//! previous primary is copied to a `.bak` sibling before every write and is
//! used to heal a corrupt primary on load or to roll back a failed write.

use crate::core::{HealthRecord, Result, StoreError, sort_newest_first};
use crate::storage::lock::{FileLock, LockMode};
use crate::storage::{StoreConfig, StorePaths};
use log::{debug, error, info, warn};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

// ============================================================================
// Write attempt state machine
// ============================================================================

/// Stages of one `save_all` attempt.
///
/// `Idle -> BackingUp -> WritingTemp -> Fsyncing -> Renaming -> Done`, or,
/// when one of `WritingTemp | Fsyncing | Renaming` fails,
/// `RestoringFromBackup -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Idle,
    BackingUp,
    WritingTemp,
    Fsyncing,
    Renaming,
    Done,
    RestoringFromBackup,
    Failed,
}

impl WriteStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, WriteStage::Done | WriteStage::Failed)
    }

    /// Stages whose failure triggers a restore from the backup copy.
    pub fn rolls_back_on_error(self) -> bool {
        matches!(
            self,
            WriteStage::WritingTemp | WriteStage::Fsyncing | WriteStage::Renaming
        )
    }
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WriteStage::Idle => "idle",
            WriteStage::BackingUp => "backing up",
            WriteStage::WritingTemp => "writing temp file",
            WriteStage::Fsyncing => "syncing temp file",
            WriteStage::Renaming => "renaming temp file",
            WriteStage::Done => "done",
            WriteStage::RestoringFromBackup => "restoring from backup",
            WriteStage::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Hook invoked on every stage transition of a write attempt.
///
/// Returning an error from a non-terminal stage fails the attempt at that
/// stage, exactly as an I/O error would.
pub trait WriteObserver {
    fn on_stage(&mut self, stage: WriteStage, paths: &StorePaths) -> io::Result<()>;
}

impl<F> WriteObserver for F
where
    F: FnMut(WriteStage, &StorePaths) -> io::Result<()>,
{
    fn on_stage(&mut self, stage: WriteStage, paths: &StorePaths) -> io::Result<()> {
        self(stage, paths)
    }
}

struct NoopObserver;

impl WriteObserver for NoopObserver {
    fn on_stage(&mut self, _stage: WriteStage, _paths: &StorePaths) -> io::Result<()> {
        Ok(())
    }
}

struct WriteAttempt<'a, 'o> {
    stage: WriteStage,
    paths: &'a StorePaths,
    observer: &'o mut (dyn WriteObserver + 'o),
}

impl<'a, 'o> WriteAttempt<'a, 'o> {
    fn new(paths: &'a StorePaths, observer: &'o mut (dyn WriteObserver + 'o)) -> Self {
        Self {
            stage: WriteStage::Idle,
            paths,
            observer,
        }
    }

    fn advance(&mut self, next: WriteStage) -> io::Result<()> {
        if self.stage.is_terminal() {
            return Err(io::Error::other(format!(
                "write attempt already {}, cannot move to {}",
                self.stage, next
            )));
        }
        debug!(
            "write '{}': {} -> {}",
            self.paths.primary.display(),
            self.stage,
            next
        );
        self.stage = next;
        self.observer.on_stage(next, self.paths)
    }

    /// Moves to `Done` or `Failed`. The outcome is already decided, so an
    /// observer error here is only logged.
    fn finish(&mut self, outcome: WriteStage) {
        if let Err(err) = self.advance(outcome) {
            debug!("observer error on {}: {}", outcome, err);
        }
    }
}

/// What the backup stage of one write attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackupOutcome {
    /// `.bak` now holds the primary as it was when the attempt started.
    Refreshed,
    /// There was no primary to copy.
    NoPrimary,
    /// The copy was skipped or failed; `.bak` is whatever an earlier attempt left.
    KeptPrevious,
}

/// State of the primary file after a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrimaryState {
    Intact,
    Missing,
    Damaged,
}

// ============================================================================
// Load report
// ============================================================================

/// Where the records returned by `load_all` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Nothing usable on disk; the collection is empty.
    Empty,
    Primary,
    /// Primary was corrupt and the backup was used (and written back).
    Backup,
}

/// Outcome of `load_all`. Loading never fails outright: problems are
/// collected in `warnings` and the records fall back to empty.
#[derive(Debug)]
pub struct LoadReport {
    pub records: Vec<HealthRecord>,
    pub source: LoadSource,
    pub warnings: Vec<StoreError>,
}

impl LoadReport {
    fn empty() -> Self {
        Self {
            records: Vec::new(),
            source: LoadSource::Empty,
            warnings: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_records(self) -> Vec<HealthRecord> {
        self.records
    }
}

// ============================================================================
// Record store
// ============================================================================

pub struct RecordStore {
    config: StoreConfig,
    paths: StorePaths,
}

impl RecordStore {
    /// Validates the configuration. No file is touched until the first load
    /// or save.
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let paths = StorePaths::from_config(&config);
        Ok(Self { config, paths })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Loads every record, newest first.
    pub fn load_all(&self) -> LoadReport {
        let mut report = LoadReport::empty();

        if let Err(err) = self.ensure_dir() {
            warn!("load skipped: {}", err);
            report.warnings.push(err);
            return report;
        }

        if !self.paths.primary.exists() {
            debug!("no data file at '{}'", self.paths.primary.display());
            return report;
        }

        let bytes = match self.read_primary() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("load failed: {}", err);
                report.warnings.push(err);
                return report;
            }
        };

        match decode(&self.paths.primary, &bytes) {
            Ok(records) => {
                report.records = records;
                report.source = LoadSource::Primary;
            }
            Err(corrupt) => {
                warn!("{}", corrupt);
                report.warnings.push(corrupt);
                if let Some((records, source)) = self.recover_from_backup(&mut report.warnings) {
                    report.records = records;
                    report.source = source;
                }
            }
        }

        report
    }

    /// Replaces the persisted collection with `records` and returns the
    /// collection as written (sorted newest first).
    ///
    /// Records are stored verbatim: two records sharing a date are both kept.
    pub fn save_all(&self, records: &[HealthRecord]) -> Result<Vec<HealthRecord>> {
        self.save_all_observed(records, &mut NoopObserver)
    }

    /// Like [`RecordStore::save_all`], reporting each stage transition to
    /// `observer`.
    pub fn save_all_observed(
        &self,
        records: &[HealthRecord],
        observer: &mut dyn WriteObserver,
    ) -> Result<Vec<HealthRecord>> {
        for record in records {
            record.validate()?;
        }

        let mut sorted = records.to_vec();
        sort_newest_first(&mut sorted);
        let bytes = encode(&sorted)?;

        self.ensure_dir()?;
        let _lock = self.lock(LockMode::Exclusive)?;

        let mut attempt = WriteAttempt::new(&self.paths, observer);
        if let Err(err) = attempt.advance(WriteStage::BackingUp) {
            attempt.finish(WriteStage::Failed);
            return Err(StoreError::WriteFailed {
                stage: WriteStage::BackingUp,
                reason: err.to_string(),
                restored: false,
            });
        }
        let backup = self.back_up_primary();

        match self.write_and_swap(&mut attempt, &bytes) {
            Ok(()) => {
                attempt.finish(WriteStage::Done);
                info!(
                    "saved {} records to '{}'",
                    sorted.len(),
                    self.paths.primary.display()
                );
                Ok(sorted)
            }
            Err((stage, reason)) => {
                warn!(
                    "write to '{}' failed while {}: {}",
                    self.paths.primary.display(),
                    stage,
                    reason
                );
                let restored = match attempt.advance(WriteStage::RestoringFromBackup) {
                    Ok(()) => self.restore_after_failure(backup),
                    Err(err) => {
                        error!("restore from backup skipped: {}", err);
                        self.remove_temp();
                        false
                    }
                };
                attempt.finish(WriteStage::Failed);
                Err(StoreError::WriteFailed {
                    stage,
                    reason,
                    restored,
                })
            }
        }
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.paths.dir)
            .map_err(|e| StoreError::io("Failed to create data directory", &self.paths.dir, e))
    }

    fn lock(&self, mode: LockMode) -> Result<FileLock> {
        FileLock::acquire(
            &self.paths.lock,
            mode,
            self.config.lock_timeout,
            self.config.lock_poll_interval,
        )
    }

    fn read_primary(&self) -> Result<Vec<u8>> {
        let _lock = self.lock(LockMode::Shared)?;
        fs::read(&self.paths.primary)
            .map_err(|e| StoreError::io("Failed to read data file", &self.paths.primary, e))
    }

    fn recover_from_backup(
        &self,
        warnings: &mut Vec<StoreError>,
    ) -> Option<(Vec<HealthRecord>, LoadSource)> {
        let _lock = match self.lock(LockMode::Exclusive) {
            Ok(lock) => lock,
            Err(err) => {
                warn!("cannot recover from backup: {}", err);
                warnings.push(err);
                return None;
            }
        };

        // A writer may have replaced the primary between our read and this lock.
        if let Ok(bytes) = fs::read(&self.paths.primary) {
            if let Ok(records) = decode(&self.paths.primary, &bytes) {
                info!(
                    "'{}' was repaired by another writer",
                    self.paths.primary.display()
                );
                warnings.retain(|warning| {
                    !matches!(warning, StoreError::Corrupt { path, .. } if *path == self.paths.primary)
                });
                return Some((records, LoadSource::Primary));
            }
        }

        if !self.paths.backup.exists() {
            warn!(
                "no backup at '{}'; starting with an empty collection",
                self.paths.backup.display()
            );
            return None;
        }

        let records = match fs::read(&self.paths.backup)
            .map_err(|e| StoreError::io("Failed to read backup file", &self.paths.backup, e))
            .and_then(|bytes| decode(&self.paths.backup, &bytes))
        {
            Ok(records) => records,
            Err(err) => {
                warn!("backup unusable: {}", err);
                warnings.push(err);
                return None;
            }
        };

        match encode(&records).and_then(|bytes| self.replace_primary(&bytes)) {
            Ok(()) => info!(
                "restored {} records from '{}'",
                records.len(),
                self.paths.backup.display()
            ),
            Err(err) => {
                warn!("could not write recovered records back: {}", err);
                warnings.push(err);
            }
        }

        Some((records, LoadSource::Backup))
    }

    /// Best effort. A primary that does not parse is left out so the existing
    /// backup stays the last good copy.
    fn back_up_primary(&self) -> BackupOutcome {
        let primary = &self.paths.primary;
        if !primary.exists() {
            debug!("nothing to back up at '{}'", primary.display());
            return BackupOutcome::NoPrimary;
        }

        let bytes = match fs::read(primary) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("backup skipped, cannot read '{}': {}", primary.display(), err);
                return BackupOutcome::KeptPrevious;
            }
        };

        if let Err(err) = decode(primary, &bytes) {
            warn!("backup skipped, current data file is unreadable: {}", err);
            return BackupOutcome::KeptPrevious;
        }

        match self.atomic_write(&self.paths.backup, &self.paths.backup_temp, &bytes) {
            Ok(()) => BackupOutcome::Refreshed,
            Err(err) => {
                warn!("backup failed: {}", err);
                BackupOutcome::KeptPrevious
            }
        }
    }

    fn write_and_swap(
        &self,
        attempt: &mut WriteAttempt<'_, '_>,
        bytes: &[u8],
    ) -> std::result::Result<(), (WriteStage, String)> {
        let temp = &self.paths.temp;
        let failed = |stage: WriteStage| move |err: io::Error| (stage, err.to_string());

        attempt
            .advance(WriteStage::WritingTemp)
            .map_err(failed(WriteStage::WritingTemp))?;
        let mut writer = File::create(temp)
            .map(BufWriter::new)
            .map_err(failed(WriteStage::WritingTemp))?;
        writer
            .write_all(bytes)
            .and_then(|_| writer.flush())
            .map_err(failed(WriteStage::WritingTemp))?;

        attempt
            .advance(WriteStage::Fsyncing)
            .map_err(failed(WriteStage::Fsyncing))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(failed(WriteStage::Fsyncing))?;
        drop(writer);

        attempt
            .advance(WriteStage::Renaming)
            .map_err(failed(WriteStage::Renaming))?;
        fs::rename(temp, &self.paths.primary).map_err(failed(WriteStage::Renaming))?;

        self.sync_dir();
        Ok(())
    }

    /// Atomic replace of the primary file, used when healing from backup.
    fn replace_primary(&self, bytes: &[u8]) -> Result<()> {
        self.atomic_write(&self.paths.primary, &self.paths.temp, bytes)
    }

    /// Writes `bytes` to `temp`, syncs it and renames it onto `target`.
    /// `target` keeps its old content if any step fails.
    fn atomic_write(&self, target: &Path, temp: &Path, bytes: &[u8]) -> Result<()> {
        let written = File::create(temp).and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        });
        if let Err(err) = written {
            let _ = fs::remove_file(temp);
            return Err(StoreError::io("Failed to write temp file", temp, err));
        }

        fs::rename(temp, target).map_err(|e| {
            let _ = fs::remove_file(temp);
            StoreError::io("Failed to rename temp file onto", target, e)
        })?;
        self.sync_dir();
        Ok(())
    }

    fn remove_temp(&self) {
        if self.paths.temp.exists() {
            if let Err(err) = fs::remove_file(&self.paths.temp) {
                warn!(
                    "could not remove temp file '{}': {}",
                    self.paths.temp.display(),
                    err
                );
            }
        }
    }

    fn primary_state(&self) -> PrimaryState {
        match fs::read(&self.paths.primary) {
            Ok(bytes) if decode(&self.paths.primary, &bytes).is_ok() => PrimaryState::Intact,
            Ok(_) => PrimaryState::Damaged,
            Err(err) if err.kind() == io::ErrorKind::NotFound => PrimaryState::Missing,
            Err(_) => PrimaryState::Damaged,
        }
    }

    /// Cleans up after a failed write. The backup is copied back only when the
    /// primary no longer holds readable data and the backup itself decodes.
    /// Returns whether the primary was replaced with the backup's content.
    fn restore_after_failure(&self, backup: BackupOutcome) -> bool {
        self.remove_temp();

        match self.primary_state() {
            PrimaryState::Intact => {
                info!(
                    "'{}' was not replaced, keeping its current content",
                    self.paths.primary.display()
                );
                return false;
            }
            PrimaryState::Missing if backup == BackupOutcome::NoPrimary => {
                debug!("no data file existed before the write, nothing to restore");
                return false;
            }
            PrimaryState::Missing | PrimaryState::Damaged => {}
        }

        if !self.paths.backup.exists() {
            error!(
                "'{}' is unreadable and there is no backup to restore",
                self.paths.primary.display()
            );
            return false;
        }

        let bytes = match fs::read(&self.paths.backup)
            .map_err(|e| StoreError::io("Failed to read backup file", &self.paths.backup, e))
            .and_then(|bytes| decode(&self.paths.backup, &bytes).map(|_| bytes))
        {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("backup unusable, primary left as is: {}", err);
                return false;
            }
        };

        if backup == BackupOutcome::KeptPrevious {
            warn!(
                "'{}' predates this write, restoring older content",
                self.paths.backup.display()
            );
        }

        match self.replace_primary(&bytes) {
            Ok(()) => {
                info!(
                    "restored '{}' from '{}'",
                    self.paths.primary.display(),
                    self.paths.backup.display()
                );
                true
            }
            Err(err) => {
                error!("restore from backup failed: {}", err);
                false
            }
        }
    }

    #[cfg(unix)]
    fn sync_dir(&self) {
        if !self.config.sync_directory {
            return;
        }
        match File::open(&self.paths.dir).and_then(|dir| dir.sync_all()) {
            Ok(()) => {}
            Err(err) => debug!(
                "directory sync of '{}' failed: {}",
                self.paths.dir.display(),
                err
            ),
        }
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) {}
}

// ============================================================================
// JSON codec
// ============================================================================

fn encode(records: &[HealthRecord]) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(records)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parses and range-checks a data file. Anything that fails either step is
/// reported as corruption of `path`.
fn decode(path: &Path, bytes: &[u8]) -> Result<Vec<HealthRecord>> {
    let corrupt = |reason: String| StoreError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let mut records: Vec<HealthRecord> =
        serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
    for record in &records {
        record.validate().map_err(|e| corrupt(e.to_string()))?;
    }
    sort_newest_first(&mut records);
    Ok(records)
}
