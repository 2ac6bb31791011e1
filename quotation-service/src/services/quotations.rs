//! Quotation aggregate store: CRUD plus workflow transitions.
//!
//! Every query is scoped by `organization_id`; no method returns rows
//! belonging to a different organization than the caller's.

use crate::models::{CreateQuotation, ListQuotationsFilter, Quotation, QuotationStatus, UpdateQuotation};
use crate::services::calculator::{self, QuotationTotals};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::numbering::{
    MAX_GENERATION_ATTEMPTS, QuotationNumberGenerator, is_unique_violation,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::PgConnection;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct QuotationStore {
    db: crate::services::Database,
    numbers: QuotationNumberGenerator,
}

impl QuotationStore {
    pub fn new(db: crate::services::Database, numbers: QuotationNumberGenerator) -> Self {
        Self { db, numbers }
    }

    /// Create a new draft quotation. The number is allocated from the
    /// organization sequence unless the caller supplied one; a generated
    /// number that still collides is retried up to the bounded attempt
    /// budget before surfacing `GenerationConflict`.
    #[instrument(skip(self, input), fields(organization_id = %input.organization_id))]
    pub async fn create(&self, input: &CreateQuotation) -> Result<Quotation, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_quotation"])
            .start_timer();

        let subtotal = input.subtotal.unwrap_or(Decimal::ZERO);
        let tax_rate = input.tax_rate.unwrap_or(Decimal::ZERO);
        let discount_rate = input.discount_rate.unwrap_or(Decimal::ZERO);
        let totals = calculator::totals_from_subtotal(subtotal, tax_rate, discount_rate)?;

        let mut attempts = 0;
        let quotation = loop {
            attempts += 1;

            let quotation_number = match &input.quotation_number {
                Some(number) => number.clone(),
                None => self.numbers.generate(input.organization_id).await?,
            };

            let quotation_id = Uuid::new_v4();
            let inserted = sqlx::query_as::<_, Quotation>(
                r#"
                INSERT INTO quotations (
                    quotation_id, organization_id, project_id, client_id, quotation_number,
                    subject, description, status, issue_date, valid_until,
                    subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total_amount,
                    currency, created_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft', COALESCE($8, CURRENT_DATE), $9,
                        $10, $11, $12, $13, $14, $15, $16, $17)
                RETURNING quotation_id, organization_id, project_id, client_id, quotation_number,
                    subject, description, status, issue_date, valid_until,
                    subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total_amount,
                    currency, approved_by, approved_at, rejection_reason, created_by, is_active,
                    created_utc, updated_utc
                "#,
            )
            .bind(quotation_id)
            .bind(input.organization_id)
            .bind(input.project_id)
            .bind(input.client_id)
            .bind(&quotation_number)
            .bind(&input.subject)
            .bind(&input.description)
            .bind(input.issue_date)
            .bind(input.valid_until)
            .bind(totals.subtotal)
            .bind(tax_rate)
            .bind(totals.tax_amount)
            .bind(discount_rate)
            .bind(totals.discount_amount)
            .bind(totals.total)
            .bind(input.currency.as_deref().unwrap_or("USD"))
            .bind(input.created_by)
            .fetch_one(self.db.pool())
            .await;

            match inserted {
                Ok(quotation) => break quotation,
                Err(ref e) if is_unique_violation(e) && input.quotation_number.is_some() => {
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "Quotation number '{}' already exists",
                        quotation_number
                    )));
                }
                Err(ref e) if is_unique_violation(e) && attempts < MAX_GENERATION_ATTEMPTS => {
                    continue;
                }
                Err(ref e) if is_unique_violation(e) => {
                    return Err(AppError::GenerationConflict(anyhow::anyhow!(
                        "Could not allocate a unique quotation number after {} attempts",
                        attempts
                    )));
                }
                Err(e) => {
                    return Err(AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to create quotation: {}",
                        e
                    )));
                }
            }
        };

        timer.observe_duration();

        info!(
            quotation_id = %quotation.quotation_id,
            quotation_number = %quotation.quotation_number,
            "Draft quotation created"
        );

        Ok(quotation)
    }

    /// Get a quotation by ID.
    #[instrument(skip(self), fields(organization_id = %organization_id, quotation_id = %quotation_id))]
    pub async fn get(
        &self,
        organization_id: Uuid,
        quotation_id: Uuid,
    ) -> Result<Option<Quotation>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_quotation"])
            .start_timer();

        let quotation = sqlx::query_as::<_, Quotation>(
            r#"
            SELECT quotation_id, organization_id, project_id, client_id, quotation_number,
                subject, description, status, issue_date, valid_until,
                subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total_amount,
                currency, approved_by, approved_at, rejection_reason, created_by, is_active,
                created_utc, updated_utc
            FROM quotations
            WHERE organization_id = $1 AND quotation_id = $2 AND is_active = TRUE
            "#,
        )
        .bind(organization_id)
        .bind(quotation_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get quotation: {}", e)))?;

        timer.observe_duration();

        Ok(quotation)
    }

    /// List quotations for an organization.
    #[instrument(skip(self, filter), fields(organization_id = %organization_id))]
    pub async fn list(
        &self,
        organization_id: Uuid,
        filter: &ListQuotationsFilter,
    ) -> Result<Vec<Quotation>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_quotations"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;
        let status_str = filter.status.map(|s| s.as_str().to_string());

        let quotations = if let Some(cursor) = filter.page_token {
            sqlx::query_as::<_, Quotation>(
                r#"
                SELECT quotation_id, organization_id, project_id, client_id, quotation_number,
                    subject, description, status, issue_date, valid_until,
                    subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total_amount,
                    currency, approved_by, approved_at, rejection_reason, created_by, is_active,
                    created_utc, updated_utc
                FROM quotations
                WHERE organization_id = $1
                  AND is_active = TRUE
                  AND ($2::varchar IS NULL OR status = $2)
                  AND ($3::uuid IS NULL OR client_id = $3)
                  AND ($4::uuid IS NULL OR project_id = $4)
                  AND ($5::date IS NULL OR issue_date >= $5)
                  AND ($6::date IS NULL OR issue_date <= $6)
                  AND quotation_id > $7
                ORDER BY quotation_id
                LIMIT $8
                "#,
            )
            .bind(organization_id)
            .bind(&status_str)
            .bind(filter.client_id)
            .bind(filter.project_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(cursor)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await
        } else {
            sqlx::query_as::<_, Quotation>(
                r#"
                SELECT quotation_id, organization_id, project_id, client_id, quotation_number,
                    subject, description, status, issue_date, valid_until,
                    subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total_amount,
                    currency, approved_by, approved_at, rejection_reason, created_by, is_active,
                    created_utc, updated_utc
                FROM quotations
                WHERE organization_id = $1
                  AND is_active = TRUE
                  AND ($2::varchar IS NULL OR status = $2)
                  AND ($3::uuid IS NULL OR client_id = $3)
                  AND ($4::uuid IS NULL OR project_id = $4)
                  AND ($5::date IS NULL OR issue_date >= $5)
                  AND ($6::date IS NULL OR issue_date <= $6)
                ORDER BY quotation_id
                LIMIT $7
                "#,
            )
            .bind(organization_id)
            .bind(&status_str)
            .bind(filter.client_id)
            .bind(filter.project_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list quotations: {}", e)))?;

        timer.observe_duration();

        Ok(quotations)
    }

    /// Partially update a quotation. Monetary fields (subtotal and rates) are
    /// only editable while the quotation is draft; any such change triggers a
    /// recomputation of the derived totals before the update is visible.
    #[instrument(skip(self, patch), fields(organization_id = %organization_id, quotation_id = %quotation_id))]
    pub async fn update(
        &self,
        organization_id: Uuid,
        quotation_id: Uuid,
        patch: &UpdateQuotation,
    ) -> Result<Option<Quotation>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_quotation"])
            .start_timer();

        let mut tx = self.db.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let existing = sqlx::query_as::<_, Quotation>(
            r#"
            SELECT quotation_id, organization_id, project_id, client_id, quotation_number,
                subject, description, status, issue_date, valid_until,
                subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total_amount,
                currency, approved_by, approved_at, rejection_reason, created_by, is_active,
                created_utc, updated_utc
            FROM quotations
            WHERE organization_id = $1 AND quotation_id = $2 AND is_active = TRUE
            FOR UPDATE
            "#,
        )
        .bind(organization_id)
        .bind(quotation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get quotation: {}", e)))?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let monetary_change =
            patch.subtotal.is_some() || patch.tax_rate.is_some() || patch.discount_rate.is_some();
        if monetary_change && existing.status() != QuotationStatus::Draft {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Only draft quotations can be repriced"
            )));
        }

        sqlx::query(
            r#"
            UPDATE quotations
            SET project_id = COALESCE($3, project_id),
                client_id = COALESCE($4, client_id),
                subject = COALESCE($5, subject),
                description = COALESCE($6, description),
                valid_until = COALESCE($7, valid_until),
                subtotal = COALESCE($8, subtotal),
                tax_rate = COALESCE($9, tax_rate),
                discount_rate = COALESCE($10, discount_rate),
                currency = COALESCE($11, currency),
                updated_utc = NOW()
            WHERE organization_id = $1 AND quotation_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(quotation_id)
        .bind(patch.project_id)
        .bind(patch.client_id)
        .bind(&patch.subject)
        .bind(&patch.description)
        .bind(patch.valid_until)
        .bind(patch.subtotal)
        .bind(patch.tax_rate)
        .bind(patch.discount_rate)
        .bind(&patch.currency)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update quotation: {}", e))
        })?;

        recompute_totals(&mut tx, organization_id, quotation_id).await?;

        let updated = sqlx::query_as::<_, Quotation>(
            r#"
            SELECT quotation_id, organization_id, project_id, client_id, quotation_number,
                subject, description, status, issue_date, valid_until,
                subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total_amount,
                currency, approved_by, approved_at, rejection_reason, created_by, is_active,
                created_utc, updated_utc
            FROM quotations
            WHERE organization_id = $1 AND quotation_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(quotation_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to reload quotation: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(quotation_id = %quotation_id, "Quotation updated");

        Ok(Some(updated))
    }

    /// Apply a workflow transition. Any transition not in the workflow table
    /// fails with `InvalidTransition` and leaves the status unchanged. A
    /// direct approve/reject also terminalizes any open approval request so
    /// the routing record mirrors the outcome.
    #[instrument(skip(self), fields(organization_id = %organization_id, quotation_id = %quotation_id))]
    pub async fn update_status(
        &self,
        organization_id: Uuid,
        quotation_id: Uuid,
        new_status: QuotationStatus,
        actor_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Option<Quotation>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_quotation_status"])
            .start_timer();

        let mut tx = self.db.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let Some(updated) =
            apply_status(&mut tx, organization_id, quotation_id, new_status, actor_id, reason)
                .await?
        else {
            return Ok(None);
        };

        if matches!(
            new_status,
            QuotationStatus::Approved | QuotationStatus::Rejected
        ) {
            sqlx::query(
                r#"
                UPDATE approval_requests
                SET status = $3,
                    processed_by = $4,
                    processed_at = NOW(),
                    comments = COALESCE($5, comments)
                WHERE organization_id = $1 AND quotation_id = $2 AND status = 'pending'
                "#,
            )
            .bind(organization_id)
            .bind(quotation_id)
            .bind(new_status.as_str())
            .bind(actor_id)
            .bind(reason)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to settle open approval request: {}",
                    e
                ))
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            quotation_id = %quotation_id,
            status = new_status.as_str(),
            "Quotation status updated"
        );

        Ok(Some(updated))
    }

    /// Soft-delete a quotation. Approved and sent quotations stay in storage
    /// for audit; only the `is_active` flag flips. Deleting an
    /// already-deleted quotation reports `false` (surfaced as `NotFound`).
    #[instrument(skip(self), fields(organization_id = %organization_id, quotation_id = %quotation_id))]
    pub async fn delete(
        &self,
        organization_id: Uuid,
        quotation_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_quotation"])
            .start_timer();

        let result = sqlx::query(
            r#"
            UPDATE quotations
            SET is_active = FALSE, updated_utc = NOW()
            WHERE organization_id = $1 AND quotation_id = $2 AND is_active = TRUE
            "#,
        )
        .bind(organization_id)
        .bind(quotation_id)
        .execute(self.db.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to delete quotation: {}", e))
        })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(quotation_id = %quotation_id, "Quotation soft-deleted");
        }

        Ok(deleted)
    }
}

/// Validate and apply a status transition on an open connection, so callers
/// holding a transaction (the approval engine) compose it with their own
/// writes atomically.
pub(crate) async fn apply_status(
    conn: &mut PgConnection,
    organization_id: Uuid,
    quotation_id: Uuid,
    new_status: QuotationStatus,
    actor_id: Uuid,
    reason: Option<&str>,
) -> Result<Option<Quotation>, AppError> {
    let existing = sqlx::query_as::<_, Quotation>(
        r#"
        SELECT quotation_id, organization_id, project_id, client_id, quotation_number,
            subject, description, status, issue_date, valid_until,
            subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total_amount,
            currency, approved_by, approved_at, rejection_reason, created_by, is_active,
            created_utc, updated_utc
        FROM quotations
        WHERE organization_id = $1 AND quotation_id = $2 AND is_active = TRUE
        FOR UPDATE
        "#,
    )
    .bind(organization_id)
    .bind(quotation_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get quotation: {}", e)))?;

    let Some(existing) = existing else {
        return Ok(None);
    };

    let current = existing.status();
    if !current.can_transition_to(new_status) {
        return Err(AppError::InvalidTransition {
            from: current.as_str().to_string(),
            to: new_status.as_str().to_string(),
        });
    }

    let updated = match new_status {
        QuotationStatus::Approved => {
            sqlx::query_as::<_, Quotation>(
                r#"
                UPDATE quotations
                SET status = $3, approved_by = $4, approved_at = NOW(), updated_utc = NOW()
                WHERE organization_id = $1 AND quotation_id = $2
                RETURNING quotation_id, organization_id, project_id, client_id, quotation_number,
                    subject, description, status, issue_date, valid_until,
                    subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total_amount,
                    currency, approved_by, approved_at, rejection_reason, created_by, is_active,
                    created_utc, updated_utc
                "#,
            )
            .bind(organization_id)
            .bind(quotation_id)
            .bind(new_status.as_str())
            .bind(actor_id)
            .fetch_one(&mut *conn)
            .await
        }
        QuotationStatus::Rejected => {
            let reason = reason
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or_else(|| {
                    AppError::BadRequest(anyhow::anyhow!(
                        "A reason is required when rejecting a quotation"
                    ))
                })?;
            sqlx::query_as::<_, Quotation>(
                r#"
                UPDATE quotations
                SET status = $3, rejection_reason = $4, updated_utc = NOW()
                WHERE organization_id = $1 AND quotation_id = $2
                RETURNING quotation_id, organization_id, project_id, client_id, quotation_number,
                    subject, description, status, issue_date, valid_until,
                    subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total_amount,
                    currency, approved_by, approved_at, rejection_reason, created_by, is_active,
                    created_utc, updated_utc
                "#,
            )
            .bind(organization_id)
            .bind(quotation_id)
            .bind(new_status.as_str())
            .bind(reason)
            .fetch_one(&mut *conn)
            .await
        }
        _ => {
            sqlx::query_as::<_, Quotation>(
                r#"
                UPDATE quotations
                SET status = $3, updated_utc = NOW()
                WHERE organization_id = $1 AND quotation_id = $2
                RETURNING quotation_id, organization_id, project_id, client_id, quotation_number,
                    subject, description, status, issue_date, valid_until,
                    subtotal, tax_rate, tax_amount, discount_rate, discount_amount, total_amount,
                    currency, approved_by, approved_at, rejection_reason, created_by, is_active,
                    created_utc, updated_utc
                "#,
            )
            .bind(organization_id)
            .bind(quotation_id)
            .bind(new_status.as_str())
            .fetch_one(&mut *conn)
            .await
        }
    }
    .map_err(|e| {
        AppError::DatabaseError(anyhow::anyhow!("Failed to update quotation status: {}", e))
    })?;

    Ok(Some(updated))
}

/// Recompute a quotation's derived monetary fields from its current item set
/// and rates, on the caller's connection. A quotation with no items keeps
/// its seeded subtotal (project budget or caller-supplied figure); once
/// items exist, their sum is authoritative.
pub(crate) async fn recompute_totals(
    conn: &mut PgConnection,
    organization_id: Uuid,
    quotation_id: Uuid,
) -> Result<QuotationTotals, AppError> {
    let (tax_rate, discount_rate, seeded_subtotal): (Decimal, Decimal, Decimal) = sqlx::query_as(
        r#"
        SELECT tax_rate, discount_rate, subtotal
        FROM quotations
        WHERE organization_id = $1 AND quotation_id = $2
        FOR UPDATE
        "#,
    )
    .bind(organization_id)
    .bind(quotation_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to read rates: {}", e)))?;

    let (item_sum, item_count): (Option<Decimal>, i64) = sqlx::query_as(
        r#"
        SELECT SUM(line_total), COUNT(*)
        FROM quotation_items
        WHERE organization_id = $1 AND quotation_id = $2
        "#,
    )
    .bind(organization_id)
    .bind(quotation_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to sum line items: {}", e)))?;

    let subtotal = if item_count > 0 {
        item_sum.unwrap_or(Decimal::ZERO)
    } else {
        seeded_subtotal
    };
    let totals = calculator::totals_from_subtotal(subtotal, tax_rate, discount_rate)?;

    sqlx::query(
        r#"
        UPDATE quotations
        SET subtotal = $3, tax_amount = $4, discount_amount = $5, total_amount = $6,
            updated_utc = NOW()
        WHERE organization_id = $1 AND quotation_id = $2
        "#,
    )
    .bind(organization_id)
    .bind(quotation_id)
    .bind(totals.subtotal)
    .bind(totals.tax_amount)
    .bind(totals.discount_amount)
    .bind(totals.total)
    .execute(&mut *conn)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to store totals: {}", e)))?;

    Ok(totals)
}
