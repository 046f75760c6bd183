//! 变更守卫
//!
//! - [`EntityAccessGuard`] - 单实体变更权限判断、批量执行
//! - [`validate_ids`] / [`BulkOutcome`] - 批量输入校验与结果
//! - [`PostCommit`] - 提交后的尽力而为副作用

pub mod access;
pub mod bulk;
pub mod effects;

pub use access::{ENTITY_NOT_FOUND, EntityAccessGuard, PERMISSION_DENIED};
pub use bulk::{BulkAction, BulkFailure, BulkOutcome, validate_ids};
pub use effects::{BoxError, EffectWarning, PostCommit, SideEffect};
