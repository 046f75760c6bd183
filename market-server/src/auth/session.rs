//! Session providers
//!
//! Turn request headers into an authenticated [`Principal`]. The HTTP layer
//! only sees the trait, so tests can plug in a fixed principal.

use async_trait::async_trait;
use http::request::Parts;
use shared::models::Principal;

use super::jwt::{JwtError, JwtService};
use crate::security_log;
use crate::utils::{AppError, AppResult};

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// `NotAuthenticated` / `TokenInvalid` / `TokenExpired` when no valid session exists
    async fn current_principal(&self, parts: &Parts) -> AppResult<Principal>;
}

/// Bearer-token sessions backed by [`JwtService`]
pub struct JwtSessionProvider {
    jwt: JwtService,
}

impl JwtSessionProvider {
    pub fn new(jwt: JwtService) -> Self {
        Self { jwt }
    }
}

#[async_trait]
impl SessionProvider for JwtSessionProvider {
    async fn current_principal(&self, parts: &Parts) -> AppResult<Principal> {
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
            None => {
                security_log!("WARN", "auth_missing", uri = parts.uri.path().to_string());
                return Err(AppError::not_authenticated());
            }
        };

        match self.jwt.validate_token(token) {
            Ok(claims) => Principal::try_from(claims)
                .map_err(|e| AppError::invalid_token(format!("Malformed JWT claims: {e}"))),
            Err(e) => {
                security_log!(
                    "WARN",
                    "auth_failed",
                    error = e.to_string(),
                    uri = parts.uri.path().to_string()
                );
                match e {
                    JwtError::ExpiredToken => Err(AppError::token_expired()),
                    _ => Err(AppError::invalid_token("Invalid token")),
                }
            }
        }
    }
}

/// Always returns the same principal
pub struct StaticSessionProvider {
    principal: Option<Principal>,
}

impl StaticSessionProvider {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    /// Provider that rejects every request
    pub fn anonymous() -> Self {
        Self { principal: None }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn current_principal(&self, _parts: &Parts) -> AppResult<Principal> {
        self.principal.clone().ok_or_else(AppError::not_authenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtConfig;
    use shared::error::ErrorCode;
    use shared::models::Role;

    fn parts(auth: Option<&str>) -> Parts {
        let mut builder = http::Request::builder().uri("/api/resources/products");
        if let Some(value) = auth {
            builder = builder.header(http::header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_jwt_session_resolves_principal() {
        let jwt = JwtService::with_config(JwtConfig::default()).unwrap();
        let principal = Principal::new(42, "alice", vec![Role::new(10, "merchant")]);
        let token = jwt.generate_token(&principal).unwrap();
        let provider = JwtSessionProvider::new(jwt);

        let resolved = provider
            .current_principal(&parts(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(resolved, principal);
    }

    #[tokio::test]
    async fn test_missing_and_bad_tokens() {
        let provider = JwtSessionProvider::new(JwtService::with_config(JwtConfig::default()).unwrap());

        let err = provider.current_principal(&parts(None)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);

        let err = provider
            .current_principal(&parts(Some("Bearer not-a-jwt")))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenInvalid);
    }
}
