use crate::core::{HealthRecord, Result, StoreError};
use crate::storage::{LoadSource, RecordStore};
use chrono::NaiveDate;
use log::{debug, warn};

/// What `upsert` does when the date already has a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    /// Leave the working copy alone and report the conflict so the caller can
    /// ask the user.
    #[default]
    Ask,
    Overwrite,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced { previous: HealthRecord },
    Conflict { existing: HealthRecord },
}

impl UpsertOutcome {
    pub fn is_conflict(&self) -> bool {
        matches!(self, UpsertOutcome::Conflict { .. })
    }
}

/// The caller-owned working copy of the record collection.
///
/// Changes stay in memory until [`HealthSession::commit`], which submits the
/// whole collection to the store and adopts what was persisted.
pub struct HealthSession {
    store: RecordStore,
    records: Vec<HealthRecord>,
    load_source: LoadSource,
    load_warnings: Vec<StoreError>,
    dirty: bool,
}

impl HealthSession {
    pub fn open(store: RecordStore) -> Self {
        let mut session = Self {
            store,
            records: Vec::new(),
            load_source: LoadSource::Empty,
            load_warnings: Vec::new(),
            dirty: false,
        };
        session.reload();
        session
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Newest first.
    pub fn records(&self) -> &[HealthRecord] {
        &self.records
    }

    pub fn find(&self, date: NaiveDate) -> Option<&HealthRecord> {
        self.records.iter().find(|record| record.date == date)
    }

    pub fn load_source(&self) -> LoadSource {
        self.load_source
    }

    /// Problems met by the most recent load; empty when it was clean.
    pub fn load_warnings(&self) -> &[StoreError] {
        &self.load_warnings
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn upsert(&mut self, record: HealthRecord, policy: OverwritePolicy) -> Result<UpsertOutcome> {
        record.validate()?;

        let existing = self.records.iter().position(|r| r.date == record.date);
        let outcome = match (existing, policy) {
            (Some(index), OverwritePolicy::Ask) => {
                return Ok(UpsertOutcome::Conflict {
                    existing: self.records[index].clone(),
                });
            }
            (Some(index), OverwritePolicy::Overwrite) => {
                let previous = std::mem::replace(&mut self.records[index], record);
                UpsertOutcome::Replaced { previous }
            }
            (None, _) => {
                let at = self.records.partition_point(|r| r.date > record.date);
                self.records.insert(at, record);
                UpsertOutcome::Inserted
            }
        };

        self.dirty = true;
        Ok(outcome)
    }

    /// Persists the working copy and replaces it with the collection as
    /// written.
    pub fn commit(&mut self) -> Result<&[HealthRecord]> {
        let persisted = self.store.save_all(&self.records)?;
        self.records = persisted;
        self.dirty = false;
        Ok(&self.records)
    }

    /// Discards the working copy and reads the store again.
    pub fn reload(&mut self) -> &[StoreError] {
        let report = self.store.load_all();
        for warning in &report.warnings {
            warn!("load warning: {}", warning);
        }
        debug!(
            "loaded {} records from {:?}",
            report.records.len(),
            report.source
        );

        self.records = report.records;
        self.load_source = report.source;
        self.load_warnings = report.warnings;
        self.dirty = false;
        &self.load_warnings
    }
}
