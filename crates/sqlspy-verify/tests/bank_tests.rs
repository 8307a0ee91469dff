//! A small transfer routine tested against the mock driver

use std::sync::Arc;

use anyhow::{Result, bail};
use once_cell::sync::Lazy;
use sqlspy_mock::{
    Connection, DriverManager, MockObjectFactory, ResultSetFixture, Value,
};
use sqlspy_verify::TestModule;

const URL: &str = "sqlspy:bank";

// The driver manager is process-wide; each test installs its own factory.
static DRIVER_LOCK: Lazy<tokio::sync::Mutex<()>> = Lazy::new(|| tokio::sync::Mutex::new(()));

fn initialize_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("sqlspy_mock=debug".parse().unwrap())
                    .add_directive("sqlspy_verify=debug".parse().unwrap()),
            )
            .with_test_writer()
            .finish();

        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Code under test: moves money between two accounts in one transaction
#[derive(Default)]
struct Bank {
    connection: Option<Arc<dyn Connection>>,
}

#[derive(Debug, PartialEq)]
enum Transfer {
    Done,
    UnknownAccount,
    InsufficientFunds,
}

impl Bank {
    async fn connect(&mut self) -> Result<()> {
        let connection = DriverManager::connect(URL).await?;
        connection.set_auto_commit(false)?;
        self.connection = Some(connection);
        Ok(())
    }

    async fn transfer(&self, source: i32, target: i32, amount: i32) -> Result<Transfer> {
        let Some(connection) = &self.connection else {
            bail!("not connected");
        };

        let statement = connection.create_statement().await?;
        let result = statement
            .execute_query(&format!(
                "select balance from account where id={}",
                source
            ))
            .await?;
        let balance = if result.next()? {
            result.get(1)?.as_i64()
        } else {
            None
        };
        result.close()?;
        statement.close().await?;

        let outcome = match balance {
            None => Transfer::UnknownAccount,
            Some(balance) if balance < i64::from(amount) => Transfer::InsufficientFunds,
            Some(_) => {
                let update = connection
                    .prepare_statement("update akkount set balance=balance+? where id=?")
                    .await?;
                update.set_parameter(1, Value::from(-amount))?;
                update.set_parameter(2, Value::from(source))?;
                update.execute_update().await?;
                update.set_parameter(1, Value::from(amount))?;
                update.set_parameter(2, Value::from(target))?;
                update.execute_update().await?;
                update.close().await?;
                Transfer::Done
            }
        };

        if outcome == Transfer::Done {
            connection.commit().await?;
        } else {
            connection.rollback().await?;
        }
        Ok(outcome)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(connection) = self.connection.take() {
            connection.close().await?;
        }
        Ok(())
    }
}

fn factory_with_balance(balance: Option<i32>) -> MockObjectFactory {
    let factory = MockObjectFactory::new();
    let fixture = match balance {
        Some(balance) => ResultSetFixture::new("balance")
            .with_columns(["balance"])
            .row([balance]),
        None => ResultSetFixture::new("balance").with_columns(["balance"]),
    };
    factory
        .connection()
        .statement_fixtures()
        .prepare_global_result_set(fixture);
    factory.register_mock_driver();
    factory
}

async fn run_transfer(factory: &MockObjectFactory, amount: i32) -> Result<Transfer> {
    let mut bank = Bank::default();
    bank.connect().await?;
    let outcome = bank.transfer(1, 2, amount).await?;
    bank.disconnect().await?;
    factory.restore_drivers();
    Ok(outcome)
}

#[tokio::test]
async fn test_transfer_ok() -> Result<()> {
    initialize_logging();
    let _guard = DRIVER_LOCK.lock().await;
    let factory = factory_with_balance(Some(10000));
    assert_eq!(run_transfer(&factory, 5000).await?, Transfer::Done);

    let module = TestModule::new(factory.connection());
    module.verify_sql_statement_executed("select balance")?;
    module.verify_sql_statement_executed("update akkount")?;
    module.verify_sql_statement_parameter("update akkount", 0, 1, -5000)?;
    module.verify_sql_statement_parameter("update akkount", 0, 2, 1)?;
    module.verify_sql_statement_parameter("update akkount", 1, 1, 5000)?;
    module.verify_sql_statement_parameter("update akkount", 1, 2, 2)?;
    module.verify_committed()?;
    module.verify_not_rolled_back()?;
    module.verify_all_result_sets_closed()?;
    module.verify_all_statements_closed()?;
    module.verify_connection_closed()?;
    Ok(())
}

#[tokio::test]
async fn test_transfer_failure() -> Result<()> {
    initialize_logging();
    let _guard = DRIVER_LOCK.lock().await;
    let factory = factory_with_balance(Some(10000));
    assert_eq!(
        run_transfer(&factory, 20000).await?,
        Transfer::InsufficientFunds
    );

    let module = TestModule::new(factory.connection());
    module.verify_sql_statement_executed("select balance")?;
    module.verify_sql_statement_not_executed("update akkount")?;
    module.verify_not_committed()?;
    module.verify_rolled_back()?;
    module.verify_all_result_sets_closed()?;
    module.verify_all_statements_closed()?;
    module.verify_connection_closed()?;
    Ok(())
}

#[tokio::test]
async fn test_wrong_id() -> Result<()> {
    initialize_logging();
    let _guard = DRIVER_LOCK.lock().await;
    let factory = factory_with_balance(None);
    assert_eq!(
        run_transfer(&factory, 5000).await?,
        Transfer::UnknownAccount
    );

    let module = TestModule::new(factory.connection());
    module.verify_sql_statement_executed("select balance")?;
    module.verify_sql_statement_not_executed("update akkount")?;
    module.verify_not_committed()?;
    module.verify_rolled_back()?;
    module.verify_all_result_sets_closed()?;
    module.verify_all_statements_closed()?;
    module.verify_connection_closed()?;
    Ok(())
}

