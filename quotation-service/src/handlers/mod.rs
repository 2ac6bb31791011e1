//! HTTP handlers for quotation-service. Handlers extract the tenant context,
//! translate DTOs into store inputs, and wrap results in the JSON envelope.

pub mod approvals;
pub mod items;
pub mod quotations;
pub mod templates;
