//! Services module for quotation-service.

pub mod approvals;
pub mod calculator;
pub mod database;
pub mod generator;
pub mod items;
pub mod metrics;
pub mod numbering;
pub mod projects;
pub mod quotations;

pub use approvals::ApprovalEngine;
pub use database::Database;
pub use generator::{GenerateFromProject, GeneratedQuotation, QuotationGenerator};
pub use items::QuotationItemStore;
pub use metrics::{get_metrics, init_metrics};
pub use numbering::QuotationNumberGenerator;
pub use projects::{ProjectReader, TemplateReader};
pub use quotations::QuotationStore;
