//! Domain models for quotation-service.

mod approval;
mod project;
mod quotation;
mod quotation_item;
mod template;

pub use approval::{ApprovalDecision, ApprovalRequest, ApprovalStatus, SubmitApproval};
pub use project::Project;
pub use quotation::{
    CreateQuotation, ListQuotationsFilter, Quotation, QuotationStatus, UpdateQuotation,
};
pub use quotation_item::{CreateQuotationItem, QuotationItem, UpdateQuotationItem};
pub use template::QuotationTemplate;
