//! Line item model for quotation-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One priced line within a quotation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuotationItem {
    pub item_id: Uuid,
    pub quotation_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit_type: String,
    pub tax_rate: Decimal,
    pub discount_percentage: Decimal,
    pub line_total: Decimal,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a line item.
#[derive(Debug, Clone)]
pub struct CreateQuotationItem {
    pub name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub unit_type: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub sort_order: Option<i32>,
}

/// Input for updating a line item.
#[derive(Debug, Clone, Default)]
pub struct UpdateQuotationItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub unit_type: Option<String>,
    pub tax_rate: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub sort_order: Option<i32>,
}
