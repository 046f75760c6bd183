//! Market Server - 多商户电商后台 (可见性引擎 + HTTP API)
//!
//! # 架构概述
//!
//! 商户只拥有自己创建的商品；订单、订单行、客户是共享实体，只能经由
//! 商品 → 订单行 → 订单 → 客户 链路间接可见。本 crate 把通用的角色授权
//! 转换为每个请求具体可见的记录集合，并据此过滤列表、统计与批量操作。
//!
//! # 模块结构
//!
//! ```text
//! market-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── auth/          # JWT 会话、权限解析
//! ├── scope/         # 可见范围推导 (Unrestricted / Restricted / Empty)
//! ├── filter/        # 谓词 AST 与过滤编译
//! ├── stats/         # 范围内聚合
//! ├── guard/         # 单实体变更守卫、批量执行、后置副作用
//! ├── orders/        # 订单状态流转表
//! ├── audit/         # 审计记录
//! ├── services/      # 面向控制器的引擎门面
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 存储抽象、内存实现、SQLite 实现
//! └── utils/         # 日志、时间、校验
//! ```

pub mod api;
pub mod audit;
pub mod auth;
pub mod core;
pub mod db;
pub mod filter;
pub mod guard;
pub mod orders;
pub mod scope;
pub mod services;
pub mod stats;
pub mod utils;

// Re-export 公共类型
pub use auth::{JwtService, PermissionResolver};
pub use core::{Config, Server, ServerState};
pub use scope::{ScopeSession, VisibilityScope, VisibilityScopeBuilder};
pub use services::MarketplaceEngine;
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
