//! Project-to-quotation generation: synthesize an initial quotation, and
//! optionally its line items, from a project's cost data and an optional
//! template.

use crate::models::{CreateQuotation, CreateQuotationItem, Quotation};
use crate::services::items::QuotationItemStore;
use crate::services::projects::{ProjectReader, TemplateReader};
use crate::services::quotations::QuotationStore;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

/// Tax rate applied when neither the template nor the caller provides one.
const DEFAULT_TAX_RATE: Decimal = dec!(11);

/// How long a generated quotation stays valid.
const VALIDITY_DAYS: i64 = 30;

/// Input for generating a quotation from a project.
#[derive(Debug, Clone)]
pub struct GenerateFromProject {
    pub project_id: Uuid,
    pub template_id: Option<Uuid>,
    pub include_materials: bool,
    pub include_labor: bool,
}

/// Result of a generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQuotation {
    pub quotation: Quotation,
    pub items_generated: bool,
}

#[derive(Clone)]
pub struct QuotationGenerator {
    projects: ProjectReader,
    templates: TemplateReader,
    quotations: QuotationStore,
    items: QuotationItemStore,
}

impl QuotationGenerator {
    pub fn new(
        projects: ProjectReader,
        templates: TemplateReader,
        quotations: QuotationStore,
        items: QuotationItemStore,
    ) -> Self {
        Self {
            projects,
            templates,
            quotations,
            items,
        }
    }

    /// Generate a draft quotation from a project.
    ///
    /// The caller's organization wins when present; callers without a tenant
    /// context fall back to the project's own organization. That fallback is
    /// a compatibility path for internal callers, not a security boundary —
    /// the HTTP layer always supplies the authenticated organization.
    #[instrument(skip(self, input), fields(project_id = %input.project_id))]
    pub async fn generate_from_project(
        &self,
        organization_id: Option<Uuid>,
        user_id: Uuid,
        input: &GenerateFromProject,
    ) -> Result<GeneratedQuotation, AppError> {
        let project = self
            .projects
            .get(input.project_id, organization_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Project not found")))?;

        let organization_id = organization_id.unwrap_or(project.organization_id);

        let template = match input.template_id {
            Some(template_id) => Some(
                self.templates
                    .get(organization_id, template_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Template not found")))?,
            ),
            None => None,
        };

        let tax_rate = template
            .as_ref()
            .and_then(|t| t.default_tax_rate)
            .unwrap_or(DEFAULT_TAX_RATE);
        let issue_date = Utc::now().date_naive();
        let valid_until = issue_date + Duration::days(VALIDITY_DAYS);

        let create = CreateQuotation {
            organization_id,
            project_id: Some(project.project_id),
            client_id: project.client_id,
            quotation_number: None,
            subject: format!("Quotation for {}", project.name),
            description: template.as_ref().and_then(|t| t.header.clone()),
            issue_date: Some(issue_date),
            valid_until: Some(valid_until),
            subtotal: Some(project.budget),
            tax_rate: Some(tax_rate),
            discount_rate: None,
            currency: None,
            created_by: user_id,
        };

        let quotation = self.quotations.create(&create).await?;

        let mut items_generated = false;
        if input.include_materials && project.material_cost > Decimal::ZERO {
            self.items
                .create_item(
                    organization_id,
                    quotation.quotation_id,
                    &CreateQuotationItem {
                        name: "Materials".to_string(),
                        description: Some(format!("Aggregate material cost for {}", project.name)),
                        quantity: Decimal::ONE,
                        unit_price: project.material_cost,
                        unit_type: Some("lot".to_string()),
                        tax_rate: None,
                        discount_percentage: None,
                        sort_order: Some(0),
                    },
                )
                .await?;
            items_generated = true;
        }
        if input.include_labor && project.labor_cost > Decimal::ZERO {
            self.items
                .create_item(
                    organization_id,
                    quotation.quotation_id,
                    &CreateQuotationItem {
                        name: "Labor".to_string(),
                        description: Some(format!("Aggregate labor cost for {}", project.name)),
                        quantity: Decimal::ONE,
                        unit_price: project.labor_cost,
                        unit_type: Some("lot".to_string()),
                        tax_rate: None,
                        discount_percentage: None,
                        sort_order: Some(1),
                    },
                )
                .await?;
            items_generated = true;
        }

        // Item creation refreshed the stored totals; reload so the caller
        // sees the final figures.
        let quotation = if items_generated {
            self.quotations
                .get(organization_id, quotation.quotation_id)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError(anyhow::anyhow!(
                        "Generated quotation disappeared during item creation"
                    ))
                })?
        } else {
            quotation
        };

        info!(
            quotation_id = %quotation.quotation_id,
            quotation_number = %quotation.quotation_number,
            items_generated = items_generated,
            "Quotation generated from project"
        );

        Ok(GeneratedQuotation {
            quotation,
            items_generated,
        })
    }
}
