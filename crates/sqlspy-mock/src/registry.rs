//! Statement registry
//!
//! Every statement created on a mock connection is registered here and never
//! removed, so index lookups stay stable for the lifetime of the connection.
//! Records are partitioned by kind; each record knows its position both in
//! the global creation order ([`StatementId`]) and within its kind.

use indexmap::IndexMap;
use sqlspy_core::{Concurrency, MatchOptions, ParameterKey, ParameterMap};

use crate::ResultSetKey;

/// Kind of a mock statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Receives its SQL text per execution
    Plain,
    /// Prepared once with positional placeholders
    Prepared,
    /// Stored-procedure call with named and output parameters
    Callable,
}

impl StatementKind {
    pub fn label(&self) -> &'static str {
        match self {
            StatementKind::Plain => "statement",
            StatementKind::Prepared => "prepared statement",
            StatementKind::Callable => "callable statement",
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Creation index of a statement across all kinds (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatementId(usize);

impl StatementId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for StatementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// SQL text and parameters of a prepared or callable statement
#[derive(Debug, Clone, Default)]
pub struct Bound {
    pub sql: String,
    /// Parameters bound for the next execution
    pub parameters: ParameterMap,
    /// Parameter snapshots queued by `add_batch`
    pub batch: Vec<ParameterMap>,
}

impl Bound {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Default::default()
        }
    }
}

/// Output parameters of a callable statement
#[derive(Debug, Clone, Default)]
pub struct OutParameters {
    /// Registered keys with their declared type names
    pub registered: IndexMap<ParameterKey, String>,
    /// Values produced by the last execution
    pub values: ParameterMap,
}

/// Kind-specific part of a statement record
#[derive(Debug, Clone)]
pub enum StatementBody {
    Plain { batch: Vec<String> },
    Prepared(Bound),
    Callable(Bound, OutParameters),
}

impl StatementBody {
    pub fn plain() -> Self {
        StatementBody::Plain { batch: Vec::new() }
    }

    pub fn prepared(sql: impl Into<String>) -> Self {
        StatementBody::Prepared(Bound::new(sql))
    }

    pub fn callable(sql: impl Into<String>) -> Self {
        StatementBody::Callable(Bound::new(sql), OutParameters::default())
    }
}

/// One registered statement
#[derive(Debug, Clone)]
pub struct StatementRecord {
    id: StatementId,
    kind_index: usize,
    concurrency: Option<Concurrency>,
    pub(crate) body: StatementBody,
    /// Every SQL text executed through this statement, in order
    pub(crate) executed: Vec<String>,
    /// Result sets of the last execution
    pub(crate) results: Vec<ResultSetKey>,
    /// Position of the current result set in `results`
    pub(crate) current_result: usize,
}

impl StatementRecord {
    pub fn id(&self) -> StatementId {
        self.id
    }

    pub fn kind(&self) -> StatementKind {
        match self.body {
            StatementBody::Plain { .. } => StatementKind::Plain,
            StatementBody::Prepared(_) => StatementKind::Prepared,
            StatementBody::Callable(..) => StatementKind::Callable,
        }
    }

    /// Position within the statements of the same kind (0-based)
    pub fn kind_index(&self) -> usize {
        self.kind_index
    }

    /// Concurrency requested when the statement was created
    pub fn concurrency(&self) -> Option<Concurrency> {
        self.concurrency
    }

    /// Defining SQL text; `None` for plain statements
    pub fn sql(&self) -> Option<&str> {
        self.bound().map(|b| b.sql.as_str())
    }

    pub fn bound(&self) -> Option<&Bound> {
        match &self.body {
            StatementBody::Plain { .. } => None,
            StatementBody::Prepared(bound) | StatementBody::Callable(bound, _) => Some(bound),
        }
    }

    pub(crate) fn bound_mut(&mut self) -> Option<&mut Bound> {
        match &mut self.body {
            StatementBody::Plain { .. } => None,
            StatementBody::Prepared(bound) | StatementBody::Callable(bound, _) => Some(bound),
        }
    }

    /// Parameters currently bound; `None` for plain statements
    pub fn parameters(&self) -> Option<&ParameterMap> {
        self.bound().map(|b| &b.parameters)
    }

    pub fn out_parameters(&self) -> Option<&OutParameters> {
        match &self.body {
            StatementBody::Callable(_, out) => Some(out),
            _ => None,
        }
    }

    pub(crate) fn out_parameters_mut(&mut self) -> Option<&mut OutParameters> {
        match &mut self.body {
            StatementBody::Callable(_, out) => Some(out),
            _ => None,
        }
    }

    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    pub fn results(&self) -> &[ResultSetKey] {
        &self.results
    }

    /// Texts this record is matched against: the defining text, or every
    /// executed text for plain statements
    pub fn match_texts(&self) -> Vec<&str> {
        match self.sql() {
            Some(sql) => vec![sql],
            None => self.executed.iter().map(String::as_str).collect(),
        }
    }

    pub fn matches(&self, pattern: &str, options: &MatchOptions) -> bool {
        self.match_texts()
            .into_iter()
            .any(|text| options.matches(text, pattern))
    }
}

/// Registry of every statement created on one connection
#[derive(Debug, Clone, Default)]
pub struct StatementRegistry {
    records: Vec<StatementRecord>,
}

impl StatementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new statement
    pub fn register(
        &mut self,
        body: StatementBody,
        concurrency: Option<Concurrency>,
    ) -> StatementId {
        let id = StatementId(self.records.len());
        let mut record = StatementRecord {
            id,
            kind_index: 0,
            concurrency,
            body,
            executed: Vec::new(),
            results: Vec::new(),
            current_result: 0,
        };
        record.kind_index = self.count(record.kind());
        tracing::debug!(
            id = %id,
            kind = %record.kind(),
            sql = record.sql().unwrap_or(""),
            "registered statement"
        );
        self.records.push(record);
        id
    }

    pub fn get(&self, id: StatementId) -> Option<&StatementRecord> {
        self.records.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: StatementId) -> Option<&mut StatementRecord> {
        self.records.get_mut(id.0)
    }

    /// Every record, in creation order
    pub fn iter(&self) -> impl Iterator<Item = &StatementRecord> {
        self.records.iter()
    }

    /// Records of one kind, in creation order
    pub fn all(&self, kind: StatementKind) -> impl Iterator<Item = &StatementRecord> {
        self.records.iter().filter(move |r| r.kind() == kind)
    }

    pub fn count(&self, kind: StatementKind) -> usize {
        self.all(kind).count()
    }

    /// The `index`-th record of `kind` (0-based)
    pub fn by_index(&self, kind: StatementKind, index: usize) -> Option<&StatementRecord> {
        self.all(kind).nth(index)
    }

    /// Records of `kind` matching `pattern`, in creation order
    pub fn matching(
        &self,
        kind: StatementKind,
        pattern: &str,
        options: &MatchOptions,
    ) -> Vec<&StatementRecord> {
        self.all(kind)
            .filter(|r| r.matches(pattern, options))
            .collect()
    }

    pub fn first_matching(
        &self,
        kind: StatementKind,
        pattern: &str,
        options: &MatchOptions,
    ) -> Option<&StatementRecord> {
        self.all(kind).find(|r| r.matches(pattern, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn registry() -> StatementRegistry {
        let mut registry = StatementRegistry::new();
        registry.register(StatementBody::plain(), None);
        registry.register(
            StatementBody::prepared("INSERT INTO TEST (COL1, COL2) VALUES(?, ?)"),
            None,
        );
        registry.register(
            StatementBody::prepared("insert into test (col1, col2, col3) values(?, ?, ?)"),
            None,
        );
        registry.register(
            StatementBody::prepared("update mytable set test = test + ? where id = ?"),
            Some(Concurrency::Updatable),
        );
        registry.register(StatementBody::callable("{call getData(?, ?, ?, ?)}"), None);
        registry
    }

    fn sqls(records: Vec<&StatementRecord>) -> Vec<&str> {
        records.into_iter().filter_map(|r| r.sql()).collect()
    }

    #[test]
    fn test_indices_per_kind() {
        let registry = registry();
        assert_eq!(registry.count(StatementKind::Plain), 1);
        assert_eq!(registry.count(StatementKind::Prepared), 3);
        assert_eq!(registry.count(StatementKind::Callable), 1);

        let update = registry.by_index(StatementKind::Prepared, 2).unwrap();
        assert_eq!(update.kind_index(), 2);
        assert_eq!(update.id(), StatementId::new(3));
        assert_eq!(update.concurrency(), Some(Concurrency::Updatable));
        assert!(registry.by_index(StatementKind::Prepared, 3).is_none());

        let call = registry.by_index(StatementKind::Callable, 0).unwrap();
        assert_eq!(call.kind_index(), 0);
        assert_eq!(call.kind(), StatementKind::Callable);
    }

    #[rstest]
    #[case::substring("insert", MatchOptions::default(), 2)]
    #[case::case_sensitive("insert", MatchOptions::default().with_case_sensitive(true), 1)]
    #[case::exact_prefix("insert", MatchOptions::default().with_exact(true), 0)]
    #[case::regex_needs_full_match("insert", MatchOptions::default().with_regex(true), 0)]
    #[case::regex("insert into.*", MatchOptions::default().with_regex(true), 2)]
    #[case::regex_case_sensitive(
        "insert (.*) TEST.*",
        MatchOptions::new(true, false, true),
        0
    )]
    fn test_matching(
        #[case] pattern: &str,
        #[case] options: MatchOptions,
        #[case] expected: usize,
    ) {
        let registry = registry();
        assert_eq!(
            registry
                .matching(StatementKind::Prepared, pattern, &options)
                .len(),
            expected
        );
    }

    #[test]
    fn test_matching_preserves_creation_order_and_is_repeatable() {
        let registry = registry();
        let options = MatchOptions::default();
        let first = sqls(registry.matching(StatementKind::Prepared, "insert", &options));
        let second = sqls(registry.matching(StatementKind::Prepared, "insert", &options));
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                "INSERT INTO TEST (COL1, COL2) VALUES(?, ?)",
                "insert into test (col1, col2, col3) values(?, ?, ?)",
            ]
        );

        let case_sensitive = options.with_case_sensitive(true);
        let found = registry
            .first_matching(StatementKind::Prepared, "insert", &case_sensitive)
            .unwrap();
        assert_eq!(
            found.sql(),
            Some("insert into test (col1, col2, col3) values(?, ?, ?)")
        );
    }

    #[test]
    fn test_plain_statements_match_executed_text() {
        let mut registry = registry();
        let id = registry
            .by_index(StatementKind::Plain, 0)
            .map(|r| r.id())
            .unwrap();
        let options = MatchOptions::default();
        assert!(registry
            .first_matching(StatementKind::Plain, "select", &options)
            .is_none());

        registry
            .get_mut(id)
            .unwrap()
            .executed
            .push("select balance from account".to_string());
        let record = registry
            .first_matching(StatementKind::Plain, "SELECT BALANCE", &options)
            .unwrap();
        assert_eq!(record.id(), id);
        assert_eq!(record.sql(), None);
    }

    #[test]
    fn test_bound_parameters_only_on_prepared_kinds() {
        let registry = registry();
        assert!(registry.by_index(StatementKind::Plain, 0).unwrap().parameters().is_none());
        let call = registry.by_index(StatementKind::Callable, 0).unwrap();
        assert!(call.parameters().unwrap().is_empty());
        assert!(call.out_parameters().is_some());
        assert!(registry
            .by_index(StatementKind::Prepared, 0)
            .unwrap()
            .out_parameters()
            .is_none());
    }
}
