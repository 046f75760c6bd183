use std::sync::Arc;

use crate::audit::AuditSink;
use crate::auth::{JwtService, JwtSessionProvider, SessionProvider};
use crate::core::Config;
use crate::db::{PermissionStore, Repository, SqliteStore};
use crate::orders::LogNotifier;
use crate::services::MarketplaceEngine;
use crate::utils::{AppError, AppResult};

/// 服务器状态 - 持有所有服务的共享引用
///
/// 使用 Arc 实现浅拷贝，每个请求克隆一次的成本极低。
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | engine | Arc<MarketplaceEngine> | 可见性引擎门面 |
/// | sessions | Arc<dyn SessionProvider> | 请求 → Principal |
/// | jwt | Arc<JwtService> | JWT 认证服务 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub engine: Arc<MarketplaceEngine>,
    pub sessions: Arc<dyn SessionProvider>,
    pub jwt: Arc<JwtService>,
}

impl ServerState {
    /// 手动构造 (测试时注入替身)
    pub fn with_components(
        config: Config,
        engine: Arc<MarketplaceEngine>,
        sessions: Arc<dyn SessionProvider>,
        jwt: Arc<JwtService>,
    ) -> Self {
        Self {
            config,
            engine,
            sessions,
            jwt,
        }
    }

    /// 初始化服务器状态
    ///
    /// 1. 连接 SQLite 并执行迁移
    /// 2. 装配引擎 (存储同时充当仓储、授权表和审计表)
    /// 3. 创建 JWT 服务与会话提供者
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        let store = SqliteStore::connect(&config.database_url).await?;
        tracing::info!(url = %config.database_url, "Database ready");
        Self::with_store(config.clone(), Arc::new(store))
    }

    /// 用任意同时实现三种存储接口的后端装配状态
    pub fn with_store<S>(config: Config, store: Arc<S>) -> AppResult<Self>
    where
        S: Repository + PermissionStore + AuditSink + 'static,
    {
        let jwt = JwtService::with_config(config.jwt.clone())
            .map_err(|e| AppError::config(e.to_string()))?;
        let jwt = Arc::new(jwt);

        let engine = MarketplaceEngine::new(
            store.clone(),
            store.clone(),
            store,
            Arc::new(LogNotifier),
            config.limits,
        );
        let sessions: Arc<dyn SessionProvider> =
            Arc::new(JwtSessionProvider::new(jwt.as_ref().clone()));

        Ok(Self::with_components(config, Arc::new(engine), sessions, jwt))
    }
}
