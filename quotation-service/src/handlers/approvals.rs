//! Approval workflow handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::{ApiResponse, ApprovalDecisionRequest, ApprovalOutcome, SubmitApprovalRequest};
use crate::middleware::TenantContext;
use crate::models::{ApprovalDecision, ApprovalRequest, SubmitApproval};
use crate::services::metrics::APPROVAL_DECISIONS_TOTAL;
use crate::startup::AppState;

/// Submit a quotation for approval.
pub async fn submit_approval(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(quotation_id): Path<Uuid>,
    Json(payload): Json<SubmitApprovalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ApprovalOutcome>>), AppError> {
    let input = SubmitApproval {
        quotation_id,
        organization_id: tenant.organization_id,
        requester_id: tenant.user_id,
        approver_id: payload.approver_id,
        comments: payload.comments,
    };

    let (request, quotation) = state.approvals.submit(&input).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(
            "Quotation submitted for approval",
            ApprovalOutcome { request, quotation },
        )),
    ))
}

/// Decide a pending approval request.
pub async fn decide_approval(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<ApprovalDecisionRequest>,
) -> Result<Json<ApiResponse<ApprovalOutcome>>, AppError> {
    let decision = ApprovalDecision::parse(&payload.decision).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Decision must be 'approved' or 'rejected', got '{}'",
            payload.decision
        ))
    })?;

    let (request, quotation) = state
        .approvals
        .process(
            tenant.organization_id,
            request_id,
            decision,
            payload.comments.as_deref(),
            tenant.user_id,
        )
        .await?;

    APPROVAL_DECISIONS_TOTAL
        .with_label_values(&[decision.as_str()])
        .inc();

    Ok(Json(ApiResponse::new(
        "Approval request processed",
        ApprovalOutcome { request, quotation },
    )))
}

/// Approval history for a quotation, newest first.
pub async fn list_approvals(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(quotation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<ApprovalRequest>>>, AppError> {
    let requests = state
        .approvals
        .list_for_quotation(tenant.organization_id, quotation_id)
        .await?;

    Ok(Json(ApiResponse::new("Approval requests", requests)))
}
