//! Principal Extractor
//!
//! Resolves the caller once per request through the configured
//! [`SessionProvider`](super::SessionProvider); handlers receive the
//! principal as an explicit value.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::models::Principal;

use crate::AppError;
use crate::core::ServerState;

/// Authenticated caller of the current request
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl FromRequestParts<ServerState> for CurrentPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(principal) = parts.extensions.get::<Principal>() {
            return Ok(Self(principal.clone()));
        }

        let principal = state.sessions.current_principal(parts).await?;
        parts.extensions.insert(principal.clone());
        Ok(Self(principal))
    }
}
