//! Result-set association table
//!
//! Links each execution that produced result sets to the ordered list it
//! produced, and indexes every returned result set by its identifier. An
//! execution that produced no result set has no entry at all, which keeps
//! "nothing returned" distinguishable from "an empty result set returned".

use std::collections::HashMap;

use crate::{ResultSetKey, StatementId};

/// One execution of a statement: the SQL text that ran and who ran it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedStatement {
    pub sql: String,
    pub statement: StatementId,
}

/// Result sets produced by one execution, in the order they were returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnedResultSets {
    pub execution: ExecutedStatement,
    pub result_sets: Vec<ResultSetKey>,
}

#[derive(Debug, Clone, Default)]
pub struct ResultSetAssociations {
    entries: Vec<ReturnedResultSets>,
    by_id: HashMap<String, Vec<ResultSetKey>>,
}

impl ResultSetAssociations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result sets an execution produced, given as key and id
    /// pairs; an empty list records nothing
    pub fn record_execution(
        &mut self,
        execution: ExecutedStatement,
        result_sets: Vec<(ResultSetKey, String)>,
    ) {
        if result_sets.is_empty() {
            return;
        }
        let mut keys = Vec::with_capacity(result_sets.len());
        for (key, id) in result_sets {
            self.by_id.entry(id).or_default().push(key);
            keys.push(key);
        }
        self.entries.push(ReturnedResultSets {
            execution,
            result_sets: keys,
        });
    }

    /// Every entry, in execution order
    pub fn all(&self) -> &[ReturnedResultSets] {
        &self.entries
    }

    /// Every returned result set with identifier `id`, in return order
    pub fn by_result_set_id(&self, id: &str) -> &[ResultSetKey] {
        self.by_id.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every returned result set, in return order
    pub fn returned(&self) -> impl Iterator<Item = ResultSetKey> + '_ {
        self.entries
            .iter()
            .flat_map(|entry| entry.result_sets.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn execution(sql: &str, statement: usize) -> ExecutedStatement {
        ExecutedStatement {
            sql: sql.to_string(),
            statement: StatementId::new(statement),
        }
    }

    fn key(index: usize) -> ResultSetKey {
        ResultSetKey::new(index)
    }

    #[test]
    fn test_multiple_result_sets_per_execution() {
        let mut table = ResultSetAssociations::new();
        table.record_execution(execution("select name", 0), vec![(key(0), "1".into())]);
        table.record_execution(
            execution("select xyz", 0),
            vec![(key(1), "3".into()), (key(2), "5".into())],
        );

        let all = table.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].execution.sql, "select name");
        assert_eq!(all[1].result_sets, vec![key(1), key(2)]);
        assert_eq!(table.returned().collect::<Vec<_>>(), vec![key(0), key(1), key(2)]);
    }

    #[test]
    fn test_reused_id_yields_several_occurrences() {
        let mut table = ResultSetAssociations::new();
        table.record_execution(execution("select", 0), vec![(key(0), "1".into())]);
        table.record_execution(
            execution("call set", 1),
            vec![(key(1), "6".into()), (key(2), "1".into())],
        );
        assert_eq!(table.by_result_set_id("1"), &[key(0), key(2)]);
        assert_eq!(table.by_result_set_id("6"), &[key(1)]);
        assert!(table.by_result_set_id("7").is_empty());
    }

    #[test]
    fn test_no_result_sets_records_nothing() {
        let mut table = ResultSetAssociations::new();
        table.record_execution(execution("update", 0), Vec::new());
        assert!(table.all().is_empty());
    }
}
