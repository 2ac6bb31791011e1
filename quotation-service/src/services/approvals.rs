//! Approval workflow engine.
//!
//! State machine per quotation: none -> pending -> {approved, rejected}.
//! Submitting and processing each update the approval request and the
//! quotation status as one transaction; a partial failure leaves both rows
//! in their pre-call state. At most one pending request per quotation is
//! permitted, backed by a partial unique index.

use crate::models::{
    ApprovalDecision, ApprovalRequest, Quotation, QuotationStatus, SubmitApproval,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::numbering::is_unique_violation;
use crate::services::quotations::apply_status;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct ApprovalEngine {
    db: crate::services::Database,
}

impl ApprovalEngine {
    pub fn new(db: crate::services::Database) -> Self {
        Self { db }
    }

    /// Submit a quotation for approval: creates the routing record and moves
    /// the quotation to `pending_approval` atomically.
    #[instrument(skip(self, input), fields(organization_id = %input.organization_id, quotation_id = %input.quotation_id))]
    pub async fn submit(
        &self,
        input: &SubmitApproval,
    ) -> Result<(ApprovalRequest, Quotation), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["submit_approval"])
            .start_timer();

        let mut tx = self.db.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let status: Option<String> = sqlx::query_scalar(
            r#"
            SELECT status
            FROM quotations
            WHERE organization_id = $1 AND quotation_id = $2 AND is_active = TRUE
            FOR UPDATE
            "#,
        )
        .bind(input.organization_id)
        .bind(input.quotation_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get quotation: {}", e)))?;

        let status = status
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Quotation not found")))?;

        if QuotationStatus::from_string(&status) == QuotationStatus::PendingApproval {
            return Err(AppError::ApprovalAlreadyPending(anyhow::anyhow!(
                "Quotation {} already has a pending approval request",
                input.quotation_id
            )));
        }

        let pending: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM approval_requests
                WHERE quotation_id = $1 AND status = 'pending'
            )
            "#,
        )
        .bind(input.quotation_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to check pending requests: {}", e))
        })?;

        if pending {
            return Err(AppError::ApprovalAlreadyPending(anyhow::anyhow!(
                "Quotation {} already has a pending approval request",
                input.quotation_id
            )));
        }

        let request_id = Uuid::new_v4();
        let request = sqlx::query_as::<_, ApprovalRequest>(
            r#"
            INSERT INTO approval_requests (
                request_id, quotation_id, organization_id, requester_id, approver_id, comments
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING request_id, quotation_id, organization_id, requester_id, approver_id,
                comments, status, processed_by, processed_at, created_utc
            "#,
        )
        .bind(request_id)
        .bind(input.quotation_id)
        .bind(input.organization_id)
        .bind(input.requester_id)
        .bind(input.approver_id)
        .bind(&input.comments)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::ApprovalAlreadyPending(anyhow::anyhow!(
                    "Quotation {} already has a pending approval request",
                    input.quotation_id
                ))
            } else {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to create approval request: {}",
                    e
                ))
            }
        })?;

        let quotation = apply_status(
            &mut tx,
            input.organization_id,
            input.quotation_id,
            QuotationStatus::PendingApproval,
            input.requester_id,
            None,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Quotation not found")))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            request_id = %request.request_id,
            quotation_id = %input.quotation_id,
            approver_id = %input.approver_id,
            "Quotation submitted for approval"
        );

        Ok((request, quotation))
    }

    /// Process a pending request: terminalize it and cascade the quotation
    /// transition. Both writes commit together or not at all.
    #[instrument(skip(self, comments), fields(organization_id = %organization_id, request_id = %request_id))]
    pub async fn process(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
        decision: ApprovalDecision,
        comments: Option<&str>,
        processed_by: Uuid,
    ) -> Result<(ApprovalRequest, Quotation), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["process_approval"])
            .start_timer();

        let mut tx = self.db.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let request = sqlx::query_as::<_, ApprovalRequest>(
            r#"
            SELECT request_id, quotation_id, organization_id, requester_id, approver_id,
                comments, status, processed_by, processed_at, created_utc
            FROM approval_requests
            WHERE organization_id = $1 AND request_id = $2
            FOR UPDATE
            "#,
        )
        .bind(organization_id)
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get approval request: {}", e))
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Approval request not found")))?;

        if request.status != "pending" {
            return Err(AppError::InvalidTransition {
                from: request.status.clone(),
                to: decision.as_str().to_string(),
            });
        }

        let request = sqlx::query_as::<_, ApprovalRequest>(
            r#"
            UPDATE approval_requests
            SET status = $3, processed_by = $4, processed_at = NOW(),
                comments = COALESCE($5, comments)
            WHERE organization_id = $1 AND request_id = $2
            RETURNING request_id, quotation_id, organization_id, requester_id, approver_id,
                comments, status, processed_by, processed_at, created_utc
            "#,
        )
        .bind(organization_id)
        .bind(request_id)
        .bind(decision.as_str())
        .bind(processed_by)
        .bind(comments)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update approval request: {}", e))
        })?;

        let new_status = match decision {
            ApprovalDecision::Approved => QuotationStatus::Approved,
            ApprovalDecision::Rejected => QuotationStatus::Rejected,
        };

        let quotation = apply_status(
            &mut tx,
            organization_id,
            request.quotation_id,
            new_status,
            processed_by,
            comments,
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Quotation not found")))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(
            request_id = %request.request_id,
            quotation_id = %request.quotation_id,
            decision = decision.as_str(),
            "Approval request processed"
        );

        Ok((request, quotation))
    }

    /// Approval history for a quotation, newest first.
    #[instrument(skip(self), fields(organization_id = %organization_id, quotation_id = %quotation_id))]
    pub async fn list_for_quotation(
        &self,
        organization_id: Uuid,
        quotation_id: Uuid,
    ) -> Result<Vec<ApprovalRequest>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_approvals"])
            .start_timer();

        let requests = sqlx::query_as::<_, ApprovalRequest>(
            r#"
            SELECT request_id, quotation_id, organization_id, requester_id, approver_id,
                comments, status, processed_by, processed_at, created_utc
            FROM approval_requests
            WHERE organization_id = $1 AND quotation_id = $2
            ORDER BY created_utc DESC
            "#,
        )
        .bind(organization_id)
        .bind(quotation_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list approval requests: {}", e))
        })?;

        timer.observe_duration();

        Ok(requests)
    }
}
