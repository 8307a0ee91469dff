//! Ways to address recorded statements, savepoints and result sets

use sqlspy_mock::{
    MockCallableStatement, MockPreparedStatement, MockResultSet, MockStatement, ResultSetKey,
    StatementId,
};

/// Addresses one statement of a given kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementSelector {
    /// Creation index among statements of the same kind (0-based)
    Index(usize),
    /// First statement whose SQL text matches the pattern
    Sql(String),
    /// The statement behind a handle
    Id(StatementId),
}

impl std::fmt::Display for StatementSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatementSelector::Index(i) => write!(f, "index {}", i),
            StatementSelector::Sql(pattern) => write!(f, "\"{}\"", pattern),
            StatementSelector::Id(id) => write!(f, "statement {}", id),
        }
    }
}

impl From<usize> for StatementSelector {
    fn from(index: usize) -> Self {
        StatementSelector::Index(index)
    }
}

/// Untyped integer literals select by index. Negative values select nothing.
impl From<i32> for StatementSelector {
    fn from(index: i32) -> Self {
        StatementSelector::Index(usize::try_from(index).unwrap_or(usize::MAX))
    }
}

impl From<&str> for StatementSelector {
    fn from(pattern: &str) -> Self {
        StatementSelector::Sql(pattern.to_string())
    }
}

impl From<String> for StatementSelector {
    fn from(pattern: String) -> Self {
        StatementSelector::Sql(pattern)
    }
}

impl From<StatementId> for StatementSelector {
    fn from(id: StatementId) -> Self {
        StatementSelector::Id(id)
    }
}

impl From<&MockStatement> for StatementSelector {
    fn from(statement: &MockStatement) -> Self {
        StatementSelector::Id(statement.id())
    }
}

impl From<&MockPreparedStatement> for StatementSelector {
    fn from(statement: &MockPreparedStatement) -> Self {
        StatementSelector::Id(statement.id())
    }
}

impl From<&MockCallableStatement> for StatementSelector {
    fn from(statement: &MockCallableStatement) -> Self {
        StatementSelector::Id(statement.id())
    }
}

/// Addresses one savepoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavepointSelector {
    /// Creation index (0-based)
    Index(usize),
    Name(String),
}

impl std::fmt::Display for SavepointSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SavepointSelector::Index(i) => write!(f, "{}", i),
            SavepointSelector::Name(name) => write!(f, "\"{}\"", name),
        }
    }
}

impl From<usize> for SavepointSelector {
    fn from(index: usize) -> Self {
        SavepointSelector::Index(index)
    }
}

impl From<i32> for SavepointSelector {
    fn from(index: i32) -> Self {
        SavepointSelector::Index(usize::try_from(index).unwrap_or(usize::MAX))
    }
}

impl From<&str> for SavepointSelector {
    fn from(name: &str) -> Self {
        SavepointSelector::Name(name.to_string())
    }
}

impl From<&sqlspy_core::Savepoint> for SavepointSelector {
    fn from(savepoint: &sqlspy_core::Savepoint) -> Self {
        SavepointSelector::Index(savepoint.id())
    }
}

/// Addresses one returned result set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSetSelector {
    /// First returned result set with this id
    Id(String),
    /// A specific returned result set
    Key(ResultSetKey),
    /// The `occurrence`-th result set (0-based) returned by executions whose
    /// SQL text matches `pattern`
    Statement { pattern: String, occurrence: usize },
}

impl ResultSetSelector {
    pub fn statement(pattern: impl Into<String>, occurrence: usize) -> Self {
        ResultSetSelector::Statement {
            pattern: pattern.into(),
            occurrence,
        }
    }
}

impl std::fmt::Display for ResultSetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultSetSelector::Id(id) => write!(f, "with id \"{}\"", id),
            ResultSetSelector::Key(key) => write!(f, "#{}", key.index()),
            ResultSetSelector::Statement {
                pattern,
                occurrence,
            } => write!(f, "{} returned by \"{}\"", occurrence, pattern),
        }
    }
}

impl From<&str> for ResultSetSelector {
    fn from(id: &str) -> Self {
        ResultSetSelector::Id(id.to_string())
    }
}

impl From<ResultSetKey> for ResultSetSelector {
    fn from(key: ResultSetKey) -> Self {
        ResultSetSelector::Key(key)
    }
}

impl From<&MockResultSet> for ResultSetSelector {
    fn from(result_set: &MockResultSet) -> Self {
        ResultSetSelector::Key(result_set.key())
    }
}
