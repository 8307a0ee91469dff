use sqlspy_core::{ParameterKey, ParameterMap, Value};
use sqlspy_mock::{SessionState, StatementKind};

use super::{TestModule, require_statement};
use crate::StatementSelector;
use crate::error::{VerifyError, VerifyResult, fail};

impl TestModule<'_> {
    /// Parameter `key` of parameter set `set` of the first executed SQL text
    /// matching `pattern` equals `expected`
    ///
    /// A stored null only equals an expected [`Value::Null`].
    pub fn verify_sql_statement_parameter(
        &self,
        pattern: &str,
        set: usize,
        key: impl Into<ParameterKey>,
        expected: impl Into<Value>,
    ) -> VerifyResult {
        let state = self.snapshot();
        let parameters = parameter_set(&state, pattern, set)?;
        check_value(
            &set_context(pattern, set),
            parameters,
            key.into(),
            expected.into(),
        )
    }

    pub fn verify_sql_statement_parameter_present(
        &self,
        pattern: &str,
        set: usize,
        key: impl Into<ParameterKey>,
    ) -> VerifyResult {
        let state = self.snapshot();
        let parameters = parameter_set(&state, pattern, set)?;
        check_present(set_context(pattern, set), parameters, key.into())
    }

    pub fn verify_sql_statement_parameter_not_present(
        &self,
        pattern: &str,
        set: usize,
        key: impl Into<ParameterKey>,
    ) -> VerifyResult {
        let state = self.snapshot();
        let parameters = parameter_set(&state, pattern, set)?;
        check_absent(set_context(pattern, set), parameters, key.into())
    }

    /// Parameter set `set` of `pattern` equals `expected` exactly
    pub fn verify_sql_statement_parameter_map(
        &self,
        pattern: &str,
        set: usize,
        expected: &ParameterMap,
    ) -> VerifyResult {
        let state = self.snapshot();
        let actual = parameter_set(&state, pattern, set)?;
        if actual == expected {
            return Ok(());
        }
        fail(VerifyError::ParameterMapMismatch {
            context: set_context(pattern, set),
            expected: expected.clone(),
            actual: actual.clone(),
        })
    }

    /// Parameter set `set` of `pattern` has exactly `expected` parameters
    pub fn verify_sql_statement_parameter_number(
        &self,
        pattern: &str,
        set: usize,
        expected: usize,
    ) -> VerifyResult {
        let state = self.snapshot();
        let actual = parameter_set(&state, pattern, set)?.size();
        if actual == expected {
            return Ok(());
        }
        fail(VerifyError::ParameterCountMismatch {
            context: set_context(pattern, set),
            expected,
            actual,
        })
    }

    // Currently bound parameters

    fn bound_parameters(
        &self,
        kind: StatementKind,
        selector: StatementSelector,
        key: ParameterKey,
        check: impl FnOnce(String, &ParameterMap, ParameterKey) -> VerifyResult,
    ) -> VerifyResult {
        let state = self.snapshot();
        let record = require_statement(&state, kind, &selector)?;
        let empty = ParameterMap::new();
        let parameters = record.parameters().unwrap_or(&empty);
        check(format!("{} {}", kind, selector), parameters, key)
    }

    pub fn verify_prepared_statement_parameter_present(
        &self,
        selector: impl Into<StatementSelector>,
        key: impl Into<ParameterKey>,
    ) -> VerifyResult {
        self.bound_parameters(
            StatementKind::Prepared,
            selector.into(),
            key.into(),
            check_present,
        )
    }

    pub fn verify_prepared_statement_parameter_not_present(
        &self,
        selector: impl Into<StatementSelector>,
        key: impl Into<ParameterKey>,
    ) -> VerifyResult {
        self.bound_parameters(
            StatementKind::Prepared,
            selector.into(),
            key.into(),
            check_absent,
        )
    }

    pub fn verify_prepared_statement_parameter(
        &self,
        selector: impl Into<StatementSelector>,
        key: impl Into<ParameterKey>,
        expected: impl Into<Value>,
    ) -> VerifyResult {
        let expected = expected.into();
        self.bound_parameters(
            StatementKind::Prepared,
            selector.into(),
            key.into(),
            |context, parameters, key| check_value(&context, parameters, key, expected),
        )
    }

    pub fn verify_callable_statement_parameter_present(
        &self,
        selector: impl Into<StatementSelector>,
        key: impl Into<ParameterKey>,
    ) -> VerifyResult {
        self.bound_parameters(
            StatementKind::Callable,
            selector.into(),
            key.into(),
            check_present,
        )
    }

    pub fn verify_callable_statement_parameter_not_present(
        &self,
        selector: impl Into<StatementSelector>,
        key: impl Into<ParameterKey>,
    ) -> VerifyResult {
        self.bound_parameters(
            StatementKind::Callable,
            selector.into(),
            key.into(),
            check_absent,
        )
    }

    pub fn verify_callable_statement_parameter(
        &self,
        selector: impl Into<StatementSelector>,
        key: impl Into<ParameterKey>,
        expected: impl Into<Value>,
    ) -> VerifyResult {
        let expected = expected.into();
        self.bound_parameters(
            StatementKind::Callable,
            selector.into(),
            key.into(),
            |context, parameters, key| check_value(&context, parameters, key, expected),
        )
    }

    pub fn verify_callable_statement_out_parameter_registered(
        &self,
        selector: impl Into<StatementSelector>,
        key: impl Into<ParameterKey>,
    ) -> VerifyResult {
        let selector = selector.into();
        let key = key.into();
        let state = self.snapshot();
        let record = require_statement(&state, StatementKind::Callable, &selector)?;
        let registered = record
            .out_parameters()
            .is_some_and(|out| out.registered.contains_key(&key));
        if registered {
            return Ok(());
        }
        fail(VerifyError::OutParameterNotRegistered {
            context: format!("{} {}", StatementKind::Callable, selector),
            key,
        })
    }
}

fn set_context(pattern: &str, set: usize) -> String {
    format!("parameter set {} of \"{}\"", set, pattern)
}

fn parameter_set<'s>(
    state: &'s SessionState,
    pattern: &str,
    set: usize,
) -> Result<&'s ParameterMap, VerifyError> {
    let Some((_, sets)) = state.parameter_sets_matching(pattern) else {
        return fail(VerifyError::NoParameterSets {
            pattern: pattern.to_string(),
        });
    };
    match sets.get(set) {
        Some(parameters) => Ok(parameters),
        None => fail(VerifyError::ParameterSetOutOfRange {
            pattern: pattern.to_string(),
            index: set,
            len: sets.len(),
        }),
    }
}

fn check_present(context: String, parameters: &ParameterMap, key: ParameterKey) -> VerifyResult {
    if parameters.contains(&key) {
        return Ok(());
    }
    fail(VerifyError::ParameterMissing { context, key })
}

fn check_absent(context: String, parameters: &ParameterMap, key: ParameterKey) -> VerifyResult {
    if !parameters.contains(&key) {
        return Ok(());
    }
    fail(VerifyError::ParameterPresent { context, key })
}

fn check_value(
    context: &str,
    parameters: &ParameterMap,
    key: ParameterKey,
    expected: Value,
) -> VerifyResult {
    match parameters.get(&key) {
        None => fail(VerifyError::ParameterMissing {
            context: context.to_string(),
            key,
        }),
        Some(actual) if *actual == expected => Ok(()),
        Some(actual) => fail(VerifyError::ParameterMismatch {
            context: context.to_string(),
            key,
            expected,
            actual: actual.clone(),
        }),
    }
}
