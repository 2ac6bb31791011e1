//! Line item handlers, scoped by organization and owning quotation together.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{ApiResponse, CreateItemRequest, UpdateItemRequest};
use crate::middleware::TenantContext;
use crate::models::{CreateQuotationItem, QuotationItem, UpdateQuotationItem};
use crate::startup::AppState;

/// Add a line item to a draft quotation.
pub async fn create_item(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(quotation_id): Path<Uuid>,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<QuotationItem>>), AppError> {
    payload.validate()?;

    let input = CreateQuotationItem {
        name: payload.name,
        description: payload.description,
        quantity: payload.quantity,
        unit_price: payload.unit_price,
        unit_type: payload.unit_type,
        tax_rate: payload.tax_rate,
        discount_percentage: payload.discount_percentage,
        sort_order: payload.sort_order,
    };

    let item = state
        .items
        .create_item(tenant.organization_id, quotation_id, &input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Line item added", item)),
    ))
}

/// List the line items of a quotation.
pub async fn list_items(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(quotation_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<QuotationItem>>>, AppError> {
    let items = state
        .items
        .list_items(tenant.organization_id, quotation_id)
        .await?;

    Ok(Json(ApiResponse::new("Line items", items)))
}

/// Update a line item on a draft quotation.
pub async fn update_item(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path((quotation_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<ApiResponse<QuotationItem>>, AppError> {
    payload.validate()?;

    let patch = UpdateQuotationItem {
        name: payload.name,
        description: payload.description,
        quantity: payload.quantity,
        unit_price: payload.unit_price,
        unit_type: payload.unit_type,
        tax_rate: payload.tax_rate,
        discount_percentage: payload.discount_percentage,
        sort_order: payload.sort_order,
    };

    let item = state
        .items
        .update_item(tenant.organization_id, quotation_id, item_id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Line item not found")))?;

    Ok(Json(ApiResponse::new("Line item updated", item)))
}

/// Remove a line item from a draft quotation.
pub async fn delete_item(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path((quotation_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let deleted = state
        .items
        .delete_item(tenant.organization_id, quotation_id, item_id)
        .await?;

    if !deleted {
        return Err(AppError::NotFound(anyhow::anyhow!("Line item not found")));
    }

    Ok(Json(ApiResponse::message("Line item removed")))
}
