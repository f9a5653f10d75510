//! Transaction boundary helpers shared by the services.

use storage::Transaction;

use crate::error::{DomainError, ResultExt};

/// Commits on success and rolls back on failure.
///
/// A failed rollback is logged and counted; the original error is returned.
pub(crate) async fn finish<T, R>(
    tx: T,
    op: &'static str,
    result: Result<R, DomainError>,
) -> Result<R, DomainError>
where
    T: Transaction,
{
    match result {
        Ok(value) => {
            tx.commit().await.context(op, "committing transaction")?;
            Ok(value)
        }
        Err(err) => {
            rollback(tx, op).await;
            Err(err)
        }
    }
}

pub(crate) async fn rollback<T: Transaction>(tx: T, op: &'static str) {
    metrics::counter!("transaction_rollbacks_total", "operation" => op).increment(1);
    if let Err(e) = tx.rollback().await {
        tracing::warn!(operation = op, error = %e, "transaction rollback failed");
    }
}
