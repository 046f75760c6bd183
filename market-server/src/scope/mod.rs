//! 可见范围 (visibility scope)
//!
//! - [`VisibilityScope`] - Unrestricted / Restricted(ids) / Empty
//! - [`VisibilityScopeBuilder`] - 授权决策 → 范围，沿 商品 → 订单行 → 订单 → 客户 链推导
//! - [`ScopeSession`] - 单个请求内的范围缓存
//! - [`ConditionRegistry`] - 条件标签 → 求值器

pub mod builder;
pub mod conditions;
pub mod session;
pub mod visibility;

pub use builder::{ScopeChain, VisibilityScopeBuilder};
pub use conditions::{ConditionEvaluator, ConditionRegistry, CreatorCondition};
pub use session::ScopeSession;
pub use visibility::VisibilityScope;
