//! Quotation model for quotation-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Quotation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotationStatus {
    Draft,
    Sent,
    PendingApproval,
    Approved,
    Rejected,
}

impl QuotationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotationStatus::Draft => "draft",
            QuotationStatus::Sent => "sent",
            QuotationStatus::PendingApproval => "pending_approval",
            QuotationStatus::Approved => "approved",
            QuotationStatus::Rejected => "rejected",
        }
    }

    /// Strict parse for status values supplied by callers.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(QuotationStatus::Draft),
            "sent" => Some(QuotationStatus::Sent),
            "pending_approval" => Some(QuotationStatus::PendingApproval),
            "approved" => Some(QuotationStatus::Approved),
            "rejected" => Some(QuotationStatus::Rejected),
            _ => None,
        }
    }

    /// Lenient parse for values read back from storage.
    pub fn from_string(s: &str) -> Self {
        Self::parse(s).unwrap_or(QuotationStatus::Draft)
    }

    /// Whether the workflow permits moving from `self` to `to`.
    pub fn can_transition_to(&self, to: QuotationStatus) -> bool {
        use QuotationStatus::*;
        matches!(
            (*self, to),
            (Draft, Sent)
                | (Draft, PendingApproval)
                | (Sent, Approved)
                | (Sent, Rejected)
                | (PendingApproval, Approved)
                | (PendingApproval, Rejected)
        )
    }
}

/// Quotation document.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quotation {
    pub quotation_id: Uuid,
    pub organization_id: Uuid,
    pub project_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub quotation_number: String,
    pub subject: String,
    pub description: Option<String>,
    pub status: String,
    pub issue_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub discount_rate: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Quotation {
    pub fn status(&self) -> QuotationStatus {
        QuotationStatus::from_string(&self.status)
    }
}

/// Input for creating a quotation.
#[derive(Debug, Clone)]
pub struct CreateQuotation {
    pub organization_id: Uuid,
    pub project_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    /// Auto-generated from the organization sequence when absent.
    pub quotation_number: Option<String>,
    pub subject: String,
    pub description: Option<String>,
    pub issue_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub subtotal: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub discount_rate: Option<Decimal>,
    pub currency: Option<String>,
    pub created_by: Uuid,
}

/// Input for a partial quotation update (draft only for monetary fields).
#[derive(Debug, Clone, Default)]
pub struct UpdateQuotation {
    pub project_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub valid_until: Option<NaiveDate>,
    pub subtotal: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub discount_rate: Option<Decimal>,
    pub currency: Option<String>,
}

/// Filter parameters for listing quotations.
#[derive(Debug, Clone, Default)]
pub struct ListQuotationsFilter {
    pub status: Option<QuotationStatus>,
    pub client_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}
