use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, Statement,
    TransactionTrait, Value,
};

use crate::config::AdvisoryLockStrategy;
use crate::error::NestedSetError;

/// A transaction that, under a namespaced strategy, also holds a
/// transaction-scoped PostgreSQL advisory lock. Commit or rollback releases it.
pub struct LockedTransaction {
    txn: DatabaseTransaction,
    key: Option<String>,
}

impl LockedTransaction {
    pub async fn acquire(
        strategy: &AdvisoryLockStrategy,
        db: &DatabaseConnection,
    ) -> Result<Self, NestedSetError> {
        let key = strategy.key().map(|key| key.as_str().to_owned());

        if key.is_some() && db.get_database_backend() != DbBackend::Postgres {
            return Err(NestedSetError::UnsupportedBackend);
        }

        let txn = db.begin().await?;

        if let Some(ref key) = key {
            if let Err(err) = acquire_lock(&txn, key).await {
                let _ = txn.rollback().await;
                return Err(err);
            }
            tracing::debug!(key = key.as_str(), "advisory lock acquired");
        }

        Ok(Self { txn, key })
    }

    pub fn connection(&self) -> &DatabaseTransaction {
        &self.txn
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub async fn commit(self) -> Result<(), NestedSetError> {
        self.txn.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> Result<(), NestedSetError> {
        self.txn.rollback().await?;
        Ok(())
    }
}

async fn acquire_lock(txn: &DatabaseTransaction, key: &str) -> Result<(), NestedSetError> {
    txn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtext($1), 0)",
        vec![Value::from(key)],
    ))
    .await?;
    Ok(())
}
