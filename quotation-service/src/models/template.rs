//! Quotation template model: reusable boilerplate referenced, never owned,
//! by quotations during generation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuotationTemplate {
    pub template_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub header: Option<String>,
    pub footer: Option<String>,
    pub terms: Option<String>,
    pub default_tax_rate: Option<Decimal>,
    pub created_utc: DateTime<Utc>,
}
