//! Project read model consumed by the quotation generator. The project
//! module upstream owns this data.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub project_id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub budget: Decimal,
    pub material_cost: Decimal,
    pub labor_cost: Decimal,
    pub client_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
}
