//! Quotation handlers, all scoped to the caller's organization.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::prelude::ToPrimitive;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{
    ApiResponse, CreateQuotationRequest, GenerateQuotationRequest, ListQuotationsQuery,
    UpdateQuotationRequest, UpdateStatusRequest,
};
use crate::middleware::TenantContext;
use crate::models::{
    CreateQuotation, ListQuotationsFilter, Quotation, QuotationStatus, UpdateQuotation,
};
use crate::services::metrics::{QUOTATION_AMOUNT_TOTAL, QUOTATIONS_TOTAL};
use crate::services::{GenerateFromProject, GeneratedQuotation};
use crate::startup::AppState;

/// Create a new draft quotation.
pub async fn create_quotation(
    State(state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateQuotationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Quotation>>), AppError> {
    payload.validate()?;

    let input = CreateQuotation {
        organization_id: tenant.organization_id,
        project_id: payload.project_id,
        client_id: payload.client_id,
        quotation_number: payload.quotation_number,
        subject: payload.subject,
        description: payload.description,
        issue_date: payload.issue_date,
        valid_until: payload.valid_until,
        subtotal: payload.subtotal,
        tax_rate: payload.tax_rate,
        discount_rate: payload.discount_rate,
        currency: payload.currency,
        created_by: tenant.user_id,
    };

    let quotation = state.quotations.create(&input).await?;
    QUOTATIONS_TOTAL.with_label_values(&["draft"]).inc();

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Quotation created", quotation)),
    ))
}

/// Get a quotation by ID.
pub async fn get_quotation(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(quotation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Quotation>>, AppError> {
    let quotation = state
        .quotations
        .get(tenant.organization_id, quotation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Quotation not found")))?;

    Ok(Json(ApiResponse::new("Quotation", quotation)))
}

/// List quotations with optional filters and keyset pagination.
pub async fn list_quotations(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(params): Query<ListQuotationsQuery>,
) -> Result<Json<ApiResponse<Vec<Quotation>>>, AppError> {
    let status = match params.status.as_deref() {
        Some(s) => Some(QuotationStatus::parse(s).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Unknown status filter '{}'", s))
        })?),
        None => None,
    };

    let filter = ListQuotationsFilter {
        status,
        client_id: params.client_id,
        project_id: params.project_id,
        start_date: params.start_date,
        end_date: params.end_date,
        page_size: params.page_size.unwrap_or(50),
        page_token: params.page_token,
    };

    let quotations = state.quotations.list(tenant.organization_id, &filter).await?;

    Ok(Json(ApiResponse::new("Quotations", quotations)))
}

/// Partially update a quotation.
pub async fn update_quotation(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(quotation_id): Path<Uuid>,
    Json(payload): Json<UpdateQuotationRequest>,
) -> Result<Json<ApiResponse<Quotation>>, AppError> {
    payload.validate()?;

    let patch = UpdateQuotation {
        project_id: payload.project_id,
        client_id: payload.client_id,
        subject: payload.subject,
        description: payload.description,
        valid_until: payload.valid_until,
        subtotal: payload.subtotal,
        tax_rate: payload.tax_rate,
        discount_rate: payload.discount_rate,
        currency: payload.currency,
    };

    let quotation = state
        .quotations
        .update(tenant.organization_id, quotation_id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Quotation not found")))?;

    Ok(Json(ApiResponse::new("Quotation updated", quotation)))
}

/// Apply a workflow transition to a quotation.
pub async fn update_quotation_status(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(quotation_id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Quotation>>, AppError> {
    let status = QuotationStatus::parse(&payload.status).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Unknown status '{}'", payload.status))
    })?;

    let quotation = state
        .quotations
        .update_status(
            tenant.organization_id,
            quotation_id,
            status,
            tenant.user_id,
            payload.reason.as_deref(),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Quotation not found")))?;

    QUOTATIONS_TOTAL.with_label_values(&[status.as_str()]).inc();
    if status == QuotationStatus::Approved {
        QUOTATION_AMOUNT_TOTAL
            .with_label_values(&[&quotation.currency])
            .inc_by(quotation.total_amount.to_f64().unwrap_or(0.0));
    }

    Ok(Json(ApiResponse::new("Quotation status updated", quotation)))
}

/// Soft-delete a quotation.
pub async fn delete_quotation(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(quotation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let deleted = state
        .quotations
        .delete(tenant.organization_id, quotation_id)
        .await?;

    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Quotation not found")));
    }

    Ok(Json(ApiResponse::message("Quotation deleted")))
}

/// Generate a draft quotation from a project's cost data.
pub async fn generate_from_project(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<GenerateQuotationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<GeneratedQuotation>>), AppError> {
    let input = GenerateFromProject {
        project_id,
        template_id: payload.template_id,
        include_materials: payload.include_materials,
        include_labor: payload.include_labor,
    };

    let generated = state
        .generator
        .generate_from_project(Some(tenant.organization_id), tenant.user_id, &input)
        .await?;
    QUOTATIONS_TOTAL.with_label_values(&["draft"]).inc();

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Quotation generated", generated)),
    ))
}
