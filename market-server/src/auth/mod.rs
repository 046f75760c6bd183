//! 认证授权模块
//!
//! - [`JwtService`] - JWT 令牌服务
//! - [`SessionProvider`] - 请求 → [`Principal`](shared::models::Principal)
//! - [`CurrentPrincipal`] - axum 提取器
//! - [`PermissionResolver`] - 授权合并为 [`Decision`]

pub mod extractor;
pub mod jwt;
pub mod permissions;
pub mod session;

pub use extractor::CurrentPrincipal;
pub use jwt::{Claims, JwtConfig, JwtError, JwtService, RoleClaim};
pub use permissions::{Decision, PermissionResolver};
pub use session::{JwtSessionProvider, SessionProvider, StaticSessionProvider};
