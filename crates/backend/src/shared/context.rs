use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use contracts::domain::common::timestamp_now;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::future::Future;
use std::time::Duration;
use uuid::Uuid;

use super::error::ServiceError;

/// Per-request inputs every service operation runs with
#[derive(Debug, Clone, Copy)]
pub struct ServiceContext {
    /// Authenticated caller
    pub actor: Uuid,
    /// Ambient deadline for the whole operation
    pub deadline: Duration,
    /// Display timezone, which also defines the business calendar date
    pub offset: FixedOffset,
}

impl ServiceContext {
    pub fn new(actor: Uuid, deadline: Duration, offset: FixedOffset) -> Self {
        Self {
            actor,
            deadline,
            offset,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        timestamp_now()
    }

    /// Current calendar date in the display timezone
    pub fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.offset).date_naive()
    }

    /// Run `fut` under the ambient deadline. On expiry the future is dropped
    /// and `DeadlineExceeded` is returned.
    ///
    /// Transactional work goes through [`begin`](Self::begin), `run` and
    /// [`settle`](Self::settle): the deadline covers the statements, never
    /// the commit, so an expired operation has never committed.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    actor = %self.actor,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Operation aborted: deadline exceeded"
                );
                Err(ServiceError::DeadlineExceeded)
            }
        }
    }

    /// Open a transaction, waiting for a pooled connection no longer than
    /// the deadline
    pub async fn begin(&self, db: &DatabaseConnection) -> Result<DatabaseTransaction, ServiceError> {
        self.run(async { Ok(db.begin().await?) }).await
    }

    /// Commit the transaction when `outcome` is `Ok`, otherwise roll it back
    /// explicitly and hand the error through.
    pub async fn settle<T>(
        &self,
        txn: DatabaseTransaction,
        outcome: Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        match outcome {
            Ok(value) => {
                txn.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!(
                        actor = %self.actor,
                        error = %rollback_err,
                        "Transaction rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(deadline_ms: u64) -> ServiceContext {
        ServiceContext::new(
            Uuid::new_v4(),
            Duration::from_millis(deadline_ms),
            FixedOffset::east_opt(7 * 3600).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_run_passes_result_through() {
        let value = ctx(1000).run(async { Ok::<_, ServiceError>(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_aborts_on_deadline() {
        let result = ctx(10)
            .run(async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, ServiceError>(())
            })
            .await;
        assert!(matches!(result, Err(ServiceError::DeadlineExceeded)));
    }

    #[test]
    fn test_today_uses_display_offset() {
        let c = ctx(1000);
        let expected = Utc::now().with_timezone(&c.offset).date_naive();
        assert_eq!(c.today(), expected);
    }
}
