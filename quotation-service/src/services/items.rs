//! Quotation line item store.
//!
//! Every mutation runs in a transaction that also recomputes the owning
//! quotation's totals, so subtotal/tax/discount/total are consistent with
//! the current item set before the next read is served. Operations are
//! scoped by `(organization_id, quotation_id)` together.

use crate::models::{CreateQuotationItem, QuotationItem, UpdateQuotationItem};
use crate::services::calculator;
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::quotations::recompute_totals;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::PgConnection;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct QuotationItemStore {
    db: crate::services::Database,
}

impl QuotationItemStore {
    pub fn new(db: crate::services::Database) -> Self {
        Self { db }
    }

    /// Add a line item to a draft quotation.
    #[instrument(skip(self, input), fields(organization_id = %organization_id, quotation_id = %quotation_id))]
    pub async fn create_item(
        &self,
        organization_id: Uuid,
        quotation_id: Uuid,
        input: &CreateQuotationItem,
    ) -> Result<QuotationItem, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_quotation_item"])
            .start_timer();

        if input.quantity <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Quantity must be greater than zero, got {}",
                input.quantity
            )));
        }

        let tax_rate = input.tax_rate.unwrap_or(Decimal::ZERO);
        let discount_percentage = input.discount_percentage.unwrap_or(Decimal::ZERO);
        let line_total =
            calculator::line_total(input.quantity, input.unit_price, discount_percentage, tax_rate)?;

        let mut tx = self.db.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        ensure_draft(&mut tx, organization_id, quotation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Quotation not found")))?;

        let item_id = Uuid::new_v4();
        let item = sqlx::query_as::<_, QuotationItem>(
            r#"
            INSERT INTO quotation_items (
                item_id, quotation_id, organization_id, name, description,
                quantity, unit_price, unit_type, tax_rate, discount_percentage,
                line_total, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING item_id, quotation_id, organization_id, name, description,
                quantity, unit_price, unit_type, tax_rate, discount_percentage,
                line_total, sort_order, created_utc
            "#,
        )
        .bind(item_id)
        .bind(quotation_id)
        .bind(organization_id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.quantity)
        .bind(input.unit_price)
        .bind(input.unit_type.as_deref().unwrap_or("unit"))
        .bind(tax_rate)
        .bind(discount_percentage)
        .bind(line_total)
        .bind(input.sort_order.unwrap_or(0))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to add line item: {}", e)))?;

        recompute_totals(&mut tx, organization_id, quotation_id).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(item_id = %item.item_id, "Line item added");

        Ok(item)
    }

    /// List the line items of a quotation.
    #[instrument(skip(self), fields(organization_id = %organization_id, quotation_id = %quotation_id))]
    pub async fn list_items(
        &self,
        organization_id: Uuid,
        quotation_id: Uuid,
    ) -> Result<Vec<QuotationItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_quotation_items"])
            .start_timer();

        let items = sqlx::query_as::<_, QuotationItem>(
            r#"
            SELECT item_id, quotation_id, organization_id, name, description,
                quantity, unit_price, unit_type, tax_rate, discount_percentage,
                line_total, sort_order, created_utc
            FROM quotation_items
            WHERE organization_id = $1 AND quotation_id = $2
            ORDER BY sort_order, created_utc
            "#,
        )
        .bind(organization_id)
        .bind(quotation_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list line items: {}", e)))?;

        timer.observe_duration();

        Ok(items)
    }

    /// Update a line item on a draft quotation. The line total is recomputed
    /// from the merged values, never taken from the caller.
    #[instrument(skip(self, patch), fields(organization_id = %organization_id, item_id = %item_id))]
    pub async fn update_item(
        &self,
        organization_id: Uuid,
        quotation_id: Uuid,
        item_id: Uuid,
        patch: &UpdateQuotationItem,
    ) -> Result<Option<QuotationItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_quotation_item"])
            .start_timer();

        let mut tx = self.db.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        if ensure_draft(&mut tx, organization_id, quotation_id)
            .await?
            .is_none()
        {
            return Ok(None);
        }

        let existing = sqlx::query_as::<_, QuotationItem>(
            r#"
            SELECT item_id, quotation_id, organization_id, name, description,
                quantity, unit_price, unit_type, tax_rate, discount_percentage,
                line_total, sort_order, created_utc
            FROM quotation_items
            WHERE organization_id = $1 AND quotation_id = $2 AND item_id = $3
            FOR UPDATE
            "#,
        )
        .bind(organization_id)
        .bind(quotation_id)
        .bind(item_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line item: {}", e)))?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let quantity = patch.quantity.unwrap_or(existing.quantity);
        let unit_price = patch.unit_price.unwrap_or(existing.unit_price);
        let tax_rate = patch.tax_rate.unwrap_or(existing.tax_rate);
        let discount_percentage = patch
            .discount_percentage
            .unwrap_or(existing.discount_percentage);

        if quantity <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Quantity must be greater than zero, got {}",
                quantity
            )));
        }
        let line_total = calculator::line_total(quantity, unit_price, discount_percentage, tax_rate)?;

        let item = sqlx::query_as::<_, QuotationItem>(
            r#"
            UPDATE quotation_items
            SET name = COALESCE($4, name),
                description = COALESCE($5, description),
                quantity = $6,
                unit_price = $7,
                unit_type = COALESCE($8, unit_type),
                tax_rate = $9,
                discount_percentage = $10,
                line_total = $11,
                sort_order = COALESCE($12, sort_order)
            WHERE organization_id = $1 AND quotation_id = $2 AND item_id = $3
            RETURNING item_id, quotation_id, organization_id, name, description,
                quantity, unit_price, unit_type, tax_rate, discount_percentage,
                line_total, sort_order, created_utc
            "#,
        )
        .bind(organization_id)
        .bind(quotation_id)
        .bind(item_id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(quantity)
        .bind(unit_price)
        .bind(&patch.unit_type)
        .bind(tax_rate)
        .bind(discount_percentage)
        .bind(line_total)
        .bind(patch.sort_order)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update line item: {}", e))
        })?;

        recompute_totals(&mut tx, organization_id, quotation_id).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        Ok(Some(item))
    }

    /// Remove a line item from a draft quotation.
    #[instrument(skip(self), fields(organization_id = %organization_id, item_id = %item_id))]
    pub async fn delete_item(
        &self,
        organization_id: Uuid,
        quotation_id: Uuid,
        item_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_quotation_item"])
            .start_timer();

        let mut tx = self.db.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        if ensure_draft(&mut tx, organization_id, quotation_id)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            DELETE FROM quotation_items
            WHERE organization_id = $1 AND quotation_id = $2 AND item_id = $3
            "#,
        )
        .bind(organization_id)
        .bind(quotation_id)
        .bind(item_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to remove line item: {}", e))
        })?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            recompute_totals(&mut tx, organization_id, quotation_id).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        Ok(deleted)
    }
}

/// Lock the owning quotation and verify it is an active draft. Returns
/// `None` when the quotation does not exist in the caller's organization;
/// errors when it exists but is past draft. The row lock serializes
/// concurrent item mutations on the same quotation.
async fn ensure_draft(
    conn: &mut PgConnection,
    organization_id: Uuid,
    quotation_id: Uuid,
) -> Result<Option<()>, AppError> {
    let status: Option<String> = sqlx::query_scalar(
        r#"
        SELECT status
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

    match status.as_deref() {
        None => Ok(None),
        Some("draft") => Ok(Some(())),
        Some(_) => Err(AppError::BadRequest(anyhow::anyhow!(
            "Line items can only be modified while the quotation is draft"
        ))),
    }
}
