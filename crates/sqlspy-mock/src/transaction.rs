//! Commit, rollback and savepoint bookkeeping
//!
//! None of this has transactional effect on recorded data. A rollback to a
//! savepoint counts as a rollback.

use sqlspy_core::{Result, Savepoint, SqlSpyError};

/// A savepoint created on the connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavepointRecord {
    pub savepoint: Savepoint,
    pub released: bool,
    pub rolled_back: bool,
}

impl SavepointRecord {
    /// Creation index (0-based)
    pub fn id(&self) -> usize {
        self.savepoint.id()
    }

    pub fn name(&self) -> Option<&str> {
        self.savepoint.name()
    }
}

/// Transaction counters and savepoints of one connection
#[derive(Debug, Clone)]
pub struct TransactionLog {
    auto_commit: bool,
    commits: usize,
    rollbacks: usize,
    savepoints: Vec<SavepointRecord>,
}

impl Default for TransactionLog {
    fn default() -> Self {
        Self {
            auto_commit: true,
            commits: 0,
            rollbacks: 0,
            savepoints: Vec::new(),
        }
    }
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    pub fn set_auto_commit(&mut self, auto_commit: bool) {
        self.auto_commit = auto_commit;
    }

    pub fn commit(&mut self) {
        self.commits += 1;
    }

    pub fn rollback(&mut self) {
        self.rollbacks += 1;
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    /// Create a savepoint; ids are assigned in creation order
    pub fn set_savepoint(&mut self, name: Option<&str>) -> Savepoint {
        let id = self.savepoints.len();
        let savepoint = match name {
            Some(name) => Savepoint::named(id, name),
            None => Savepoint::anonymous(id),
        };
        self.savepoints.push(SavepointRecord {
            savepoint: savepoint.clone(),
            released: false,
            rolled_back: false,
        });
        savepoint
    }

    pub fn rollback_to(&mut self, savepoint: &Savepoint) -> Result<()> {
        let record = self.record_mut(savepoint)?;
        record.rolled_back = true;
        self.rollbacks += 1;
        Ok(())
    }

    pub fn release(&mut self, savepoint: &Savepoint) -> Result<()> {
        self.record_mut(savepoint)?.released = true;
        Ok(())
    }

    pub fn savepoints(&self) -> &[SavepointRecord] {
        &self.savepoints
    }

    pub fn savepoint(&self, id: usize) -> Option<&SavepointRecord> {
        self.savepoints.get(id)
    }

    /// First savepoint created with `name`
    pub fn savepoint_named(&self, name: &str) -> Option<&SavepointRecord> {
        self.savepoints.iter().find(|s| s.name() == Some(name))
    }

    fn record_mut(&mut self, savepoint: &Savepoint) -> Result<&mut SavepointRecord> {
        match self.savepoints.get_mut(savepoint.id()) {
            Some(record) if record.savepoint == *savepoint => Ok(record),
            _ => {
                tracing::warn!(%savepoint, "unknown savepoint");
                Err(SqlSpyError::NotFound(format!("{} was not created", savepoint)))
            }
        }
    }
}
