//! Request and response DTOs for the HTTP surface.

use crate::models::{ApprovalRequest, Quotation};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// JSON envelope shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

fn validate_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if *rate < Decimal::ZERO || *rate > Decimal::from(100) {
        return Err(ValidationError::new("rate_out_of_range"));
    }
    Ok(())
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("must_be_positive"));
    }
    Ok(())
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuotationRequest {
    #[validate(length(min = 1, max = 255))]
    pub subject: String,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    #[validate(length(min = 1, max = 32))]
    pub quotation_number: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    #[validate(custom(function = validate_non_negative))]
    pub subtotal: Option<Decimal>,
    #[validate(custom(function = validate_rate))]
    pub tax_rate: Option<Decimal>,
    #[validate(custom(function = validate_rate))]
    pub discount_rate: Option<Decimal>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateQuotationRequest {
    #[validate(length(min = 1, max = 255))]
    pub subject: Option<String>,
    pub description: Option<String>,
    pub project_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub valid_until: Option<NaiveDate>,
    #[validate(custom(function = validate_non_negative))]
    pub subtotal: Option<Decimal>,
    #[validate(custom(function = validate_rate))]
    pub tax_rate: Option<Decimal>,
    #[validate(custom(function = validate_rate))]
    pub discount_rate: Option<Decimal>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[validate(custom(function = validate_positive))]
    pub quantity: Decimal,
    #[validate(custom(function = validate_non_negative))]
    pub unit_price: Decimal,
    pub unit_type: Option<String>,
    #[validate(custom(function = validate_rate))]
    pub tax_rate: Option<Decimal>,
    #[validate(custom(function = validate_rate))]
    pub discount_percentage: Option<Decimal>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateItemRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = validate_positive))]
    pub quantity: Option<Decimal>,
    #[validate(custom(function = validate_non_negative))]
    pub unit_price: Option<Decimal>,
    pub unit_type: Option<String>,
    #[validate(custom(function = validate_rate))]
    pub tax_rate: Option<Decimal>,
    #[validate(custom(function = validate_rate))]
    pub discount_percentage: Option<Decimal>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitApprovalRequest {
    pub approver_id: Uuid,
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalDecisionRequest {
    pub decision: String,
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuotationRequest {
    pub template_id: Option<Uuid>,
    #[serde(default)]
    pub include_materials: bool,
    #[serde(default)]
    pub include_labor: bool,
}

#[derive(Debug, Deserialize)]
pub struct ListQuotationsQuery {
    pub status: Option<String>,
    pub client_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page_size: Option<i32>,
    pub page_token: Option<Uuid>,
}

/// Outcome of an approval submit or decision: the routing record plus the
/// quotation it moved.
#[derive(Debug, Serialize)]
pub struct ApprovalOutcome {
    pub request: ApprovalRequest,
    pub quotation: Quotation,
}
