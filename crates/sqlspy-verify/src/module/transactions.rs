use sqlspy_mock::SavepointRecord;

use super::{TestModule, find_savepoint};
use crate::SavepointSelector;
use crate::error::{VerifyError, VerifyResult, fail};

impl TestModule<'_> {
    pub fn verify_committed(&self) -> VerifyResult {
        if self.snapshot().transactions().commits() > 0 {
            return Ok(());
        }
        fail(VerifyError::Transaction("connection was not committed".into()))
    }

    pub fn verify_not_committed(&self) -> VerifyResult {
        let commits = self.snapshot().transactions().commits();
        if commits == 0 {
            return Ok(());
        }
        fail(VerifyError::Transaction(format!(
            "connection was committed {} times",
            commits
        )))
    }

    pub fn verify_rolled_back(&self) -> VerifyResult {
        if self.snapshot().transactions().rollbacks() > 0 {
            return Ok(());
        }
        fail(VerifyError::Transaction(
            "connection was not rolled back".into(),
        ))
    }

    pub fn verify_not_rolled_back(&self) -> VerifyResult {
        let rollbacks = self.snapshot().transactions().rollbacks();
        if rollbacks == 0 {
            return Ok(());
        }
        fail(VerifyError::Transaction(format!(
            "connection was rolled back {} times",
            rollbacks
        )))
    }

    pub fn verify_number_commits(&self, expected: usize) -> VerifyResult {
        let actual = self.snapshot().transactions().commits();
        if actual == expected {
            return Ok(());
        }
        fail(VerifyError::TransactionCount {
            what: "commits",
            expected,
            actual,
        })
    }

    /// Rollbacks to a savepoint count as rollbacks
    pub fn verify_number_rollbacks(&self, expected: usize) -> VerifyResult {
        let actual = self.snapshot().transactions().rollbacks();
        if actual == expected {
            return Ok(());
        }
        fail(VerifyError::TransactionCount {
            what: "rollbacks",
            expected,
            actual,
        })
    }

    // Savepoints

    fn verify_savepoint(
        &self,
        selector: SavepointSelector,
        check: impl FnOnce(&SavepointRecord) -> Option<&'static str>,
    ) -> VerifyResult {
        let state = self.snapshot();
        let Some(record) = find_savepoint(&state, &selector) else {
            return fail(VerifyError::SavepointNotFound {
                selector: selector.to_string(),
            });
        };
        match check(record) {
            None => Ok(()),
            Some(found) => fail(VerifyError::SavepointState {
                savepoint: format!("savepoint {}", selector),
                state: found.to_string(),
            }),
        }
    }

    pub fn verify_savepoint_present(
        &self,
        selector: impl Into<SavepointSelector>,
    ) -> VerifyResult {
        self.verify_savepoint(selector.into(), |_| None)
    }

    pub fn verify_savepoint_released(
        &self,
        selector: impl Into<SavepointSelector>,
    ) -> VerifyResult {
        self.verify_savepoint(selector.into(), |record| {
            (!record.released).then_some("not released")
        })
    }

    pub fn verify_savepoint_not_released(
        &self,
        selector: impl Into<SavepointSelector>,
    ) -> VerifyResult {
        self.verify_savepoint(selector.into(), |record| {
            record.released.then_some("released")
        })
    }

    pub fn verify_savepoint_rolled_back(
        &self,
        selector: impl Into<SavepointSelector>,
    ) -> VerifyResult {
        self.verify_savepoint(selector.into(), |record| {
            (!record.rolled_back).then_some("not rolled back")
        })
    }

    pub fn verify_savepoint_not_rolled_back(
        &self,
        selector: impl Into<SavepointSelector>,
    ) -> VerifyResult {
        self.verify_savepoint(selector.into(), |record| {
            record.rolled_back.then_some("rolled back")
        })
    }
}
