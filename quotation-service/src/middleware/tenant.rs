//! Tenant context extraction for multi-tenancy support.
//!
//! The authenticating gateway validates the caller's JWT and forwards the
//! resolved identity as `X-Org-ID` / `X-User-ID` headers. This extractor
//! normalizes them into one canonical shape before they reach any store;
//! nothing below the handler layer reads ambient tenant state.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use service_core::error::AppError;
use uuid::Uuid;

/// Authenticated tenant identity, passed explicitly into every store call.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    pub organization_id: Uuid,
    pub user_id: Uuid,
}

fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, AppError> {
    let value = parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::AuthError(anyhow::anyhow!("Missing {} header (required from gateway)", name))
        })?;

    Uuid::parse_str(value)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("Malformed {} header", name)))
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let organization_id = header_uuid(parts, "X-Org-ID")?;
        let user_id = header_uuid(parts, "X-User-ID")?;

        let span = tracing::Span::current();
        span.record("organization_id", organization_id.to_string().as_str());
        span.record("user_id", user_id.to_string().as_str());

        Ok(TenantContext {
            organization_id,
            user_id,
        })
    }
}
