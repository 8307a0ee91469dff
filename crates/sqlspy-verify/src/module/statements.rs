use sqlspy_mock::lifecycle::{Resource, Scope};
use sqlspy_mock::{SessionState, StatementKind};

use super::{TestModule, require_statement};
use crate::StatementSelector;
use crate::error::{VerifyError, VerifyResult, fail};

impl TestModule<'_> {
    fn verify_count(
        &self,
        kind: StatementKind,
        pattern: Option<&str>,
        expected: usize,
    ) -> VerifyResult {
        let state = self.snapshot();
        let actual = match pattern {
            Some(pattern) => state
                .statements()
                .matching(kind, pattern, state.matching())
                .len(),
            None => state.statements().count(kind),
        };
        if actual == expected {
            return Ok(());
        }
        let what = match pattern {
            Some(pattern) => format!("{}s matching \"{}\"", kind, pattern),
            None => format!("{}s", kind),
        };
        fail(VerifyError::Count {
            what,
            expected,
            actual,
        })
    }

    fn verify_presence(&self, kind: StatementKind, pattern: &str, present: bool) -> VerifyResult {
        let state = self.snapshot();
        let found = state
            .statements()
            .first_matching(kind, pattern, state.matching())
            .is_some();
        match (found, present) {
            (true, false) => fail(VerifyError::StatementPresent {
                kind,
                pattern: format!("\"{}\"", pattern),
            }),
            (false, true) => fail(VerifyError::StatementNotFound {
                kind,
                selector: format!("\"{}\"", pattern),
            }),
            _ => Ok(()),
        }
    }

    pub fn verify_number_statements(&self, expected: usize) -> VerifyResult {
        self.verify_count(StatementKind::Plain, None, expected)
    }

    /// Plain statements are matched against the SQL texts they executed
    pub fn verify_number_statements_matching(
        &self,
        expected: usize,
        pattern: &str,
    ) -> VerifyResult {
        self.verify_count(StatementKind::Plain, Some(pattern), expected)
    }

    pub fn verify_number_prepared_statements(&self, expected: usize) -> VerifyResult {
        self.verify_count(StatementKind::Prepared, None, expected)
    }

    pub fn verify_number_prepared_statements_matching(
        &self,
        expected: usize,
        pattern: &str,
    ) -> VerifyResult {
        self.verify_count(StatementKind::Prepared, Some(pattern), expected)
    }

    pub fn verify_number_callable_statements(&self, expected: usize) -> VerifyResult {
        self.verify_count(StatementKind::Callable, None, expected)
    }

    pub fn verify_number_callable_statements_matching(
        &self,
        expected: usize,
        pattern: &str,
    ) -> VerifyResult {
        self.verify_count(StatementKind::Callable, Some(pattern), expected)
    }

    pub fn verify_prepared_statement_present(&self, pattern: &str) -> VerifyResult {
        self.verify_presence(StatementKind::Prepared, pattern, true)
    }

    pub fn verify_prepared_statement_not_present(&self, pattern: &str) -> VerifyResult {
        self.verify_presence(StatementKind::Prepared, pattern, false)
    }

    pub fn verify_callable_statement_present(&self, pattern: &str) -> VerifyResult {
        self.verify_presence(StatementKind::Callable, pattern, true)
    }

    pub fn verify_callable_statement_not_present(&self, pattern: &str) -> VerifyResult {
        self.verify_presence(StatementKind::Callable, pattern, false)
    }

    /// Some execution of any kind ran SQL text matching `pattern`
    pub fn verify_sql_statement_executed(&self, pattern: &str) -> VerifyResult {
        let (executed, matching) = self.any_executed(pattern);
        if executed {
            return Ok(());
        }
        fail(VerifyError::NotExecuted {
            pattern: pattern.to_string(),
            matching,
        })
    }

    pub fn verify_sql_statement_not_executed(&self, pattern: &str) -> VerifyResult {
        let (executed, matching) = self.any_executed(pattern);
        if !executed {
            return Ok(());
        }
        fail(VerifyError::Executed {
            pattern: pattern.to_string(),
            matching,
        })
    }

    /// Whether any execution matched, and the match mode that was used
    fn any_executed(&self, pattern: &str) -> (bool, String) {
        let state = self.snapshot();
        let matching = *state.matching();
        let executed = state
            .executions()
            .iter()
            .any(|execution| matching.matches(&execution.sql, pattern));
        (executed, matching.describe())
    }

    // Closed state

    fn verify_closed(&self, kind: StatementKind, selector: StatementSelector) -> VerifyResult {
        let state = self.snapshot();
        let record = require_statement(&state, kind, &selector)?;
        if state.lifecycle().is_closed(Resource::Statement(record.id())) {
            return Ok(());
        }
        fail(VerifyError::NotClosed {
            resource: format!("{} {}", kind, selector),
        })
    }

    pub fn verify_statement_closed(&self, selector: impl Into<StatementSelector>) -> VerifyResult {
        self.verify_closed(StatementKind::Plain, selector.into())
    }

    pub fn verify_prepared_statement_closed(
        &self,
        selector: impl Into<StatementSelector>,
    ) -> VerifyResult {
        self.verify_closed(StatementKind::Prepared, selector.into())
    }

    pub fn verify_callable_statement_closed(
        &self,
        selector: impl Into<StatementSelector>,
    ) -> VerifyResult {
        self.verify_closed(StatementKind::Callable, selector.into())
    }

    /// Every statement of every kind was closed
    pub fn verify_all_statements_closed(&self) -> VerifyResult {
        let state = self.snapshot();
        verify_scope_closed(&state, Scope::Statements)
    }

    pub fn verify_connection_closed(&self) -> VerifyResult {
        let state = self.snapshot();
        verify_scope_closed(&state, Scope::Connection)
    }
}

pub(super) fn verify_scope_closed(state: &SessionState, scope: Scope) -> VerifyResult {
    match state.lifecycle().open_resources(scope).first() {
        None => Ok(()),
        Some(resource) => fail(VerifyError::NotClosed {
            resource: describe(state, *resource),
        }),
    }
}

fn describe(state: &SessionState, resource: Resource) -> String {
    match resource {
        Resource::Connection => "connection".to_string(),
        Resource::Statement(id) => match state.statements().get(id) {
            Some(record) => {
                // plain statements show the last text they executed
                let sql = record
                    .sql()
                    .or_else(|| record.executed().last().map(String::as_str));
                match sql {
                    Some(sql) => format!("{} {} (\"{}\")", record.kind(), id, sql),
                    None => format!("{} {}", record.kind(), id),
                }
            }
            None => format!("statement {}", id),
        },
        Resource::ResultSet(key) => match state.result_set(key) {
            Some(data) => format!("result set \"{}\" (#{})", data.id(), key.index()),
            None => format!("result set #{}", key.index()),
        },
    }
}
