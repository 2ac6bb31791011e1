//! Organization-scoped quotation number generation.
//!
//! The heavy lifting happens in the `next_quotation_number` SQL function: a
//! single atomic upsert on `quotation_counters`, so concurrent callers for
//! the same organization serialize on the row lock and never receive the
//! same value. Insert paths that carry a generated number still retry on a
//! unique-constraint collision, bounded by [`MAX_GENERATION_ATTEMPTS`].

use crate::services::Database;
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

/// How many times an insert carrying a generated number is retried before
/// surfacing `GenerationConflict`.
pub const MAX_GENERATION_ATTEMPTS: u32 = 3;

/// Whether a sqlx error is a unique-constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[derive(Clone)]
pub struct QuotationNumberGenerator {
    db: Database,
}

impl QuotationNumberGenerator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Allocate the next quotation number for an organization.
    #[instrument(skip(self), fields(organization_id = %organization_id))]
    pub async fn generate(&self, organization_id: Uuid) -> Result<String, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["next_quotation_number"])
            .start_timer();

        let number: String = sqlx::query_scalar("SELECT next_quotation_number($1)")
            .bind(organization_id)
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to allocate quotation number: {}",
                    e
                ))
            })?;

        timer.observe_duration();

        Ok(number)
    }
}
