//! Business (tenant) context extraction.
//!
//! Reads the bearer token, verifies it, and resolves the business owned by
//! the token's user. Handlers receive the business id explicitly and pass it
//! to every repository and report call.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use service_core::error::AppError;

use crate::error::InvoiceError;
use crate::startup::AppState;

/// Authenticated caller and the business it acts for.
#[derive(Debug, Clone)]
pub struct BusinessContext {
    pub user_id: String,
    pub business_id: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for BusinessContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| InvoiceError::Unauthorized("no token".to_string()))?;

        let user_id = state.tokens.verify(token)?;

        let business = state
            .directory
            .business_for_user(&user_id)
            .await?
            .ok_or_else(|| {
                tracing::warn!(user_id = %user_id, "No business found for user");
                InvoiceError::Unauthorized("business not found".to_string())
            })?;

        tracing::Span::current().record("business_id", business.id.as_str());

        Ok(BusinessContext {
            user_id,
            business_id: business.id,
        })
    }
}
