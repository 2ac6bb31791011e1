//! Read-side collaborators consumed by the quotation generator: projects
//! and quotation templates.

use crate::models::{Project, QuotationTemplate};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct ProjectReader {
    db: crate::services::Database,
}

impl ProjectReader {
    pub fn new(db: crate::services::Database) -> Self {
        Self { db }
    }

    /// Fetch a project. Callers with a tenant context pass their
    /// organization; callers without one (`None`) get the project looked up
    /// by id alone and adopt its organization downstream.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub async fn get(
        &self,
        project_id: Uuid,
        organization_id: Option<Uuid>,
    ) -> Result<Option<Project>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_project"])
            .start_timer();

        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT project_id, organization_id, name, budget, material_cost, labor_cost,
                client_id, created_utc
            FROM projects
            WHERE project_id = $1
              AND ($2::uuid IS NULL OR organization_id = $2)
            "#,
        )
        .bind(project_id)
        .bind(organization_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get project: {}", e)))?;

        timer.observe_duration();

        Ok(project)
    }
}

#[derive(Clone)]
pub struct TemplateReader {
    db: crate::services::Database,
}

impl TemplateReader {
    pub fn new(db: crate::services::Database) -> Self {
        Self { db }
    }

    /// Get a template by ID.
    #[instrument(skip(self), fields(organization_id = %organization_id, template_id = %template_id))]
    pub async fn get(
        &self,
        organization_id: Uuid,
        template_id: Uuid,
    ) -> Result<Option<QuotationTemplate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_template"])
            .start_timer();

        let template = sqlx::query_as::<_, QuotationTemplate>(
            r#"
            SELECT template_id, organization_id, name, header, footer, terms,
                default_tax_rate, created_utc
            FROM quotation_templates
            WHERE organization_id = $1 AND template_id = $2
            "#,
        )
        .bind(organization_id)
        .bind(template_id)
        .fetch_optional(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get template: {}", e)))?;

        timer.observe_duration();

        Ok(template)
    }

    /// List an organization's templates.
    #[instrument(skip(self), fields(organization_id = %organization_id))]
    pub async fn list(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<QuotationTemplate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_templates"])
            .start_timer();

        let templates = sqlx::query_as::<_, QuotationTemplate>(
            r#"
            SELECT template_id, organization_id, name, header, footer, terms,
                default_tax_rate, created_utc
            FROM quotation_templates
            WHERE organization_id = $1
            ORDER BY name
            "#,
        )
        .bind(organization_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list templates: {}", e)))?;

        timer.observe_duration();

        Ok(templates)
    }
}
