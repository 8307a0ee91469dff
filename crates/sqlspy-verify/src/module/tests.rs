use pretty_assertions::assert_eq;
use rstest::rstest;
use sqlspy_core::{
    CallableStatement, Connection, ParameterMap, PreparedStatement, ResultSet, Statement,
    StatementOptions, Value,
};
use sqlspy_mock::{MockConnection, ResultSetFixture, SessionConfig, StatementKind};

use super::*;
use crate::ResultSetSelector;

fn accounts() -> ResultSetFixture {
    ResultSetFixture::new("accounts")
        .with_columns(["id", "balance"])
        .row([1, 100])
        .row([2, 200])
}

#[tokio::test]
async fn test_statement_counts_and_presence() -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);

    let plain = connection.create_statement().await?;
    plain.execute("delete from log").await?;
    connection.prepare_statement("insert into account values(?)").await?;
    connection.prepare_statement("update account set x = ?").await?;
    connection.prepare_call("{call audit(?)}").await?;

    module.verify_number_statements(1)?;
    module.verify_number_statements_matching(1, "delete")?;
    module.verify_number_prepared_statements(2)?;
    module.verify_number_prepared_statements_matching(1, "insert")?;
    module.verify_number_callable_statements(1)?;
    module.verify_prepared_statement_present("update account")?;
    module.verify_prepared_statement_not_present("delete")?;
    module.verify_callable_statement_present("audit")?;
    module.verify_callable_statement_not_present("insert")?;

    assert_eq!(
        module.verify_number_prepared_statements(3),
        Err(VerifyError::Count {
            what: "prepared statements".to_string(),
            expected: 3,
            actual: 2,
        })
    );
    assert!(matches!(
        module.verify_prepared_statement_present("select"),
        Err(VerifyError::StatementNotFound {
            kind: StatementKind::Prepared,
            ..
        })
    ));
    Ok(())
}

#[tokio::test]
async fn test_lookup_helpers_return_handles() -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);
    connection.prepare_statement("insert into a values(?)").await?;
    connection.prepare_statement("insert into b values(?)").await?;

    assert_eq!(module.prepared_statements().len(), 2);
    assert_eq!(module.prepared_statements_matching("into b").len(), 1);
    let second = module.prepared_statement(1).expect("second prepared statement");
    assert_eq!(second.sql(), "insert into b values(?)");
    assert!(module.prepared_statement("into c").is_none());
    assert!(module.callable_statement(0).is_none());
    assert!(module.statement(0).is_none());
    Ok(())
}

#[tokio::test]
async fn test_executed_sql_and_parameters() -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);

    let statement = connection
        .prepare_statement("update account set balance = ? where id = ?")
        .await?;
    statement.set_parameter(1, Value::from(-50))?;
    statement.set_parameter(2, Value::from(1))?;
    statement.execute_update().await?;
    statement.set_parameter(1, Value::from(50))?;
    statement.set_parameter(2, Value::from(2))?;
    statement.execute_update().await?;

    assert_eq!(
        module.executed_sql_statements(),
        vec![
            "update account set balance = ? where id = ?".to_string(),
            "update account set balance = ? where id = ?".to_string(),
        ]
    );
    module.verify_sql_statement_executed("UPDATE ACCOUNT")?;
    module.verify_sql_statement_not_executed("delete")?;
    module.verify_sql_statement_parameter("update account", 0, 1, -50)?;
    module.verify_sql_statement_parameter("update account", 1, 2, 2)?;
    module.verify_sql_statement_parameter_number("update account", 1, 2)?;
    module.verify_sql_statement_parameter_present("update account", 1, 2)?;
    module.verify_sql_statement_parameter_not_present("update account", 1, 3)?;
    assert!(matches!(
        module.verify_sql_statement_parameter_present("update account", 0, 3),
        Err(VerifyError::ParameterMissing { .. })
    ));
    assert!(matches!(
        module.verify_sql_statement_parameter_not_present("update account", 0, 1),
        Err(VerifyError::ParameterPresent { .. })
    ));
    module.verify_sql_statement_parameter_map(
        "update account",
        0,
        &ParameterMap::new().with(1, -50).with(2, 1),
    )?;

    assert!(matches!(
        module.verify_sql_statement_parameter("update account", 0, 1, 50),
        Err(VerifyError::ParameterMismatch { .. })
    ));
    assert_eq!(
        module.verify_sql_statement_parameter("update account", 2, 1, 50),
        Err(VerifyError::ParameterSetOutOfRange {
            pattern: "update account".to_string(),
            index: 2,
            len: 2,
        })
    );
    assert!(matches!(
        module.verify_sql_statement_parameter("select", 0, 1, 1),
        Err(VerifyError::NoParameterSets { .. })
    ));
    assert_eq!(
        module
            .executed_parameter_sets("update")
            .map(|sets| sets.len()),
        Some(2)
    );
    Ok(())
}

#[tokio::test]
async fn test_null_parameter_only_matches_null() -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);
    let statement = connection.prepare_statement("insert into t values(?)").await?;
    statement.set_parameter(1, Value::Null)?;
    statement.execute().await?;

    module.verify_sql_statement_parameter("insert", 0, 1, Value::Null)?;
    assert!(module.verify_sql_statement_parameter("insert", 0, 1, 0).is_err());
    Ok(())
}

#[tokio::test]
async fn test_bound_parameters_of_kept_statement() -> anyhow::Result<()> {
    let connection = MockConnection::with_config(
        SessionConfig::default().with_clear_parameters_on_execute(false),
    );
    let module = TestModule::new(&connection);

    let call = connection.prepare_call("{call transfer(?, ?)}").await?;
    call.set_parameter(1, Value::from(10))?;
    call.set_named_parameter("target", Value::from("savings"))?;
    call.register_out_parameter("status".into(), "VARCHAR")?;
    call.execute().await?;

    module.verify_callable_statement_parameter_present(0, 1)?;
    module.verify_callable_statement_parameter_present("transfer", "target")?;
    module.verify_callable_statement_parameter_not_present(0, 2)?;
    module.verify_callable_statement_parameter(0, "target", "savings")?;
    module.verify_callable_statement_out_parameter_registered(0, "status")?;
    assert!(matches!(
        module.verify_callable_statement_out_parameter_registered(0, "amount"),
        Err(VerifyError::OutParameterNotRegistered { .. })
    ));
    assert!(matches!(
        module.verify_prepared_statement_parameter_present(0, 1),
        Err(VerifyError::StatementNotFound { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_parameters_cleared_after_execute_by_default() -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);
    let statement = connection.prepare_statement("insert into t values(?)").await?;
    statement.set_parameter(1, Value::from(1))?;
    statement.execute().await?;

    module.verify_prepared_statement_parameter_not_present(0, 1)?;
    module.verify_sql_statement_parameter("insert", 0, 1, 1)?;
    Ok(())
}

#[tokio::test]
async fn test_result_set_contents() -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);
    connection
        .statement_fixtures()
        .prepare_result_set("select", accounts());

    let statement = connection.create_statement().await?;
    let rs = statement.execute_query("select * from account").await?;
    rs.close()?;

    module.verify_result_set_row("accounts", 1, [1, 100])?;
    module.verify_result_set_row(ResultSetSelector::statement("select", 0), 2, [2, 200])?;
    module.verify_result_set_column("accounts", "balance", [100, 200])?;
    module.verify_result_set_column("accounts", 1usize, [1, 2])?;
    module.verify_result_set_equals("accounts", &accounts())?;
    module.verify_result_set_closed("accounts")?;
    module.verify_all_result_sets_closed()?;

    assert!(matches!(
        module.verify_result_set_row("accounts", 3, [3, 300]),
        Err(VerifyError::RowOutOfRange { rows: 2, .. })
    ));
    assert!(matches!(
        module.verify_result_set_column("accounts", "owner", Vec::<Value>::new()),
        Err(VerifyError::ColumnNotFound { .. })
    ));
    assert!(matches!(
        module.verify_result_set_equals("accounts", &accounts().row([3, 300])),
        Err(VerifyError::ResultSetMismatch { .. })
    ));
    assert!(matches!(
        module.verify_result_set_row("missing", 1, [1]),
        Err(VerifyError::ResultSetNotFound { .. })
    ));
    assert_eq!(module.returned_result_sets().len(), 1);
    assert_eq!(module.returned_result_sets_by_id("accounts").len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_short_fixture_rows_verify_as_null() -> anyhow::Result<()> {
    let ragged = ResultSetFixture::from_json(
        r#"{"id": "rs", "columns": ["a", "b"], "rows": [[{"Int32": 1}]]}"#,
    )?;
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);
    connection
        .statement_fixtures()
        .prepare_global_result_set(ragged.clone());

    let statement = connection.create_statement().await?;
    statement.execute_query("select a, b from t").await?;

    module.verify_result_set_column("rs", "b", [Value::Null])?;
    module.verify_result_set_row("rs", 1, [Value::from(1), Value::Null])?;
    module.verify_result_set_equals("rs", &ragged)?;
    assert!(matches!(
        module.verify_result_set_column("rs", "b", [Value::from(2)]),
        Err(VerifyError::ColumnMismatch { .. })
    ));
    assert!(matches!(
        module.verify_result_set_row("rs", 1, [1]),
        Err(VerifyError::RowMismatch { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_failure_messages_name_mode_and_text() -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);
    let statement = connection.create_statement().await?;
    statement.execute("delete from log").await?;

    assert_eq!(
        module.verify_sql_statement_executed("insert"),
        Err(VerifyError::NotExecuted {
            pattern: "insert".to_string(),
            matching: "substring, case-insensitive".to_string(),
        })
    );
    assert_eq!(
        module.verify_sql_statement_not_executed("DELETE"),
        Err(VerifyError::Executed {
            pattern: "DELETE".to_string(),
            matching: "substring, case-insensitive".to_string(),
        })
    );
    assert_eq!(
        module.verify_all_statements_closed(),
        Err(VerifyError::NotClosed {
            resource: "statement #0 (\"delete from log\")".to_string(),
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_result_set_row_states() -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);
    connection
        .statement_fixtures()
        .prepare_result_set("select", accounts());

    let statement = connection
        .create_statement_with(StatementOptions::updatable())
        .await?;
    let rs = statement.execute_query("select").await?;
    rs.next()?;
    rs.update_value(2, Value::from(0))?;
    rs.update_row()?;
    rs.next()?;
    rs.delete_row()?;

    module.verify_result_set_row_updated("accounts", 1)?;
    module.verify_result_set_row_not_updated("accounts", 2)?;
    module.verify_result_set_row_deleted("accounts", 2)?;
    module.verify_result_set_row_not_deleted("accounts", 1)?;
    module.verify_result_set_row_not_inserted("accounts", 1)?;
    module.verify_result_set_row("accounts", 1, [1, 0])?;
    assert_eq!(
        module.verify_result_set_row_inserted("accounts", 1),
        Err(VerifyError::RowState {
            result_set: "accounts".to_string(),
            row: 1,
            state: "not inserted (inserted rows: [])".to_string(),
        })
    );
    assert!(matches!(
        module.verify_result_set_closed("accounts"),
        Err(VerifyError::NotClosed { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_transactions_and_savepoints() -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);

    module.verify_not_committed()?;
    module.verify_not_rolled_back()?;

    connection.commit().await?;
    connection.rollback().await?;
    let first = connection.set_savepoint(Some("first")).await?;
    let second = connection.set_savepoint(None).await?;
    connection.rollback_to_savepoint(&first).await?;
    connection.release_savepoint(&second).await?;

    module.verify_committed()?;
    module.verify_rolled_back()?;
    module.verify_number_commits(1)?;
    module.verify_number_rollbacks(2)?;
    module.verify_savepoint_present("first")?;
    module.verify_savepoint_present(1)?;
    module.verify_savepoint_rolled_back("first")?;
    module.verify_savepoint_not_released(&first)?;
    module.verify_savepoint_released(1)?;
    module.verify_savepoint_not_rolled_back(&second)?;
    assert_eq!(module.savepoints().len(), 2);
    assert_eq!(
        module.savepoint("first").map(|record| record.id()),
        Some(0)
    );

    assert!(matches!(
        module.verify_savepoint_present("third"),
        Err(VerifyError::SavepointNotFound { .. })
    ));
    assert_eq!(
        module.verify_savepoint_released("first"),
        Err(VerifyError::SavepointState {
            savepoint: "savepoint \"first\"".to_string(),
            state: "not released".to_string(),
        })
    );
    assert_eq!(
        module.verify_number_commits(2),
        Err(VerifyError::TransactionCount {
            what: "commits",
            expected: 2,
            actual: 1,
        })
    );
    Ok(())
}

#[rstest]
#[case(false, true)]
#[case(true, false)]
#[tokio::test]
async fn test_closed_statements(
    #[case] close: bool,
    #[case] expect_open: bool,
) -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);
    let statement = connection.create_statement().await?;
    let prepared = connection.prepare_statement("insert").await?;
    if close {
        statement.close().await?;
        prepared.close().await?;
    }

    assert_eq!(module.verify_statement_closed(0).is_err(), expect_open);
    assert_eq!(
        module.verify_prepared_statement_closed("insert").is_err(),
        expect_open
    );
    assert_eq!(module.verify_all_statements_closed().is_err(), expect_open);
    Ok(())
}

#[tokio::test]
async fn test_connection_closed() -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);
    assert_eq!(
        module.verify_connection_closed(),
        Err(VerifyError::NotClosed {
            resource: "connection".to_string(),
        })
    );
    connection.close().await?;
    module.verify_connection_closed()?;
    Ok(())
}

#[tokio::test]
async fn test_matching_toggles_apply_to_verification() -> anyhow::Result<()> {
    let connection = MockConnection::new();
    let module = TestModule::new(&connection);
    connection.prepare_statement("select * from account").await?;

    module.verify_prepared_statement_present("ACCOUNT")?;
    module.set_case_sensitive(true);
    module.verify_prepared_statement_not_present("ACCOUNT")?;
    module.set_case_sensitive(false);
    module.set_exact_match(true);
    module.verify_prepared_statement_not_present("account")?;
    module.verify_prepared_statement_present("SELECT * FROM ACCOUNT")?;
    module.set_exact_match(false);
    module.set_use_regular_expressions(true);
    module.verify_prepared_statement_present("select .* from acc.*")?;
    module.verify_prepared_statement_not_present("from acc.*")?;
    Ok(())
}
