//! Application startup and lifecycle management.

use crate::config::QuotationConfig;
use crate::handlers::{approvals, items, quotations, templates};
use crate::services::{
    ApprovalEngine, Database, ProjectReader, QuotationGenerator, QuotationItemStore,
    QuotationNumberGenerator, QuotationStore, TemplateReader, get_metrics, init_metrics,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state. Components receive their collaborators at
/// construction; nothing is wired up after the fact.
#[derive(Clone)]
pub struct AppState {
    pub config: QuotationConfig,
    pub db: Database,
    pub quotations: QuotationStore,
    pub items: QuotationItemStore,
    pub approvals: ApprovalEngine,
    pub generator: QuotationGenerator,
    pub templates: TemplateReader,
}

/// Health check endpoint for liveness probes.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => {
            tracing::debug!("Health check passed");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "ok",
                    "service": "quotation-service",
                    "version": env!("CARGO_PKG_VERSION")
                })),
            )
        }
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "quotation-service",
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    let metrics = get_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        metrics,
    )
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: QuotationConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the harness.
    pub async fn build_without_migrations(config: QuotationConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(
        config: QuotationConfig,
        run_migrations: bool,
    ) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let numbers = QuotationNumberGenerator::new(db.clone());
        let quotations = QuotationStore::new(db.clone(), numbers);
        let items = QuotationItemStore::new(db.clone());
        let approvals = ApprovalEngine::new(db.clone());
        let projects = ProjectReader::new(db.clone());
        let templates = TemplateReader::new(db.clone());
        let generator = QuotationGenerator::new(
            projects,
            templates.clone(),
            quotations.clone(),
            items.clone(),
        );

        let state = AppState {
            config: config.clone(),
            db,
            quotations,
            items,
            approvals,
            generator,
            templates,
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!(error = %e, addr = %addr, "Failed to bind listener");
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(port = port, "Quotation service listener bound");

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics_handler))
            .route(
                "/quotations",
                post(quotations::create_quotation).get(quotations::list_quotations),
            )
            .route(
                "/quotations/:id",
                get(quotations::get_quotation)
                    .patch(quotations::update_quotation)
                    .delete(quotations::delete_quotation),
            )
            .route(
                "/quotations/:id/status",
                post(quotations::update_quotation_status),
            )
            .route(
                "/quotations/:id/items",
                post(items::create_item).get(items::list_items),
            )
            .route(
                "/quotations/:id/items/:item_id",
                axum::routing::patch(items::update_item).delete(items::delete_item),
            )
            .route(
                "/quotations/:id/approval",
                post(approvals::submit_approval).get(approvals::list_approvals),
            )
            .route("/approvals/:id/decision", post(approvals::decide_approval))
            .route(
                "/projects/:id/quotation",
                post(quotations::generate_from_project),
            )
            .route("/templates", get(templates::list_templates))
            .route("/templates/:id", get(templates::get_template))
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(middleware::from_fn(metrics_middleware))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|value| value.to_str().ok())
                        .unwrap_or("-");

                    tracing::info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        organization_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                    )
                }),
            )
            .with_state(self.state);

        tracing::info!(
            service = "quotation-service",
            version = env!("CARGO_PKG_VERSION"),
            port = self.port,
            "Service ready to accept connections"
        );

        axum::serve(self.listener, router).await
    }
}
