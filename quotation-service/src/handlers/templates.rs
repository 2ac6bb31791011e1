//! Quotation template read handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::ApiResponse;
use crate::middleware::TenantContext;
use crate::models::QuotationTemplate;
use crate::startup::AppState;

/// List the organization's quotation templates.
pub async fn list_templates(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<Json<ApiResponse<Vec<QuotationTemplate>>>, AppError> {
    let templates = state.templates.list(tenant.organization_id).await?;

    Ok(Json(ApiResponse::new("Templates", templates)))
}

/// Get a template by ID.
pub async fn get_template(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(template_id): Path<Uuid>,
) -> Result<Json<ApiResponse<QuotationTemplate>>, AppError> {
    let template = state
        .templates
        .get(tenant.organization_id, template_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?;

    Ok(Json(ApiResponse::new("Template", template)))
}
