use std::str::FromStr;

use crate::auth::JwtConfig;
use crate::services::EngineLimits;
use crate::utils::{AppError, AppResult};

/// 服务器配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖 (启动时先加载 `.env`)：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | DATABASE_URL | sqlite://market.db?mode=rwc | SQLite 连接串 |
/// | ENVIRONMENT | development | 运行环境 |
/// | JWT_SECRET | 开发环境随机生成 | 非开发环境必填，至少 32 字符 |
/// | JWT_ISSUER | market-server | 令牌签发者 |
/// | JWT_AUDIENCE | market-admin | 令牌受众 |
/// | JWT_EXPIRATION_MINUTES | 1440 | 令牌有效期 |
/// | LOG_LEVEL | - | EnvFilter 指令 (RUST_LOG 优先) |
/// | LOG_DIR | - | 日志目录 (按天滚动) |
/// | LOG_JSON | false | JSON 日志 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | MAX_BULK_IDS | 100 | 单次批量操作的 id 上限 |
/// | DEFAULT_PAGE_SIZE | 20 | 默认分页大小 |
/// | EXPORT_LIMIT | 5000 | 导出行数上限 |
/// | LOW_STOCK_THRESHOLD | 5 | 低库存阈值 |
///
/// # 示例
///
/// ```ignore
/// HTTP_PORT=8080 DATABASE_URL=sqlite://data/market.db cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API 服务端口
    pub http_port: u16,
    pub database_url: String,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    pub log_level: Option<String>,
    pub log_dir: Option<String>,
    pub log_json: bool,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 引擎限额
    pub limits: EngineLimits,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 未设置的项使用默认值；无法解析的数值同样回退到默认值。
    pub fn from_env() -> AppResult<Self> {
        let environment = env_string("ENVIRONMENT").unwrap_or_else(|| "development".into());
        let defaults = JwtConfig::default();

        let secret = match env_string("JWT_SECRET") {
            Some(secret) => secret,
            None if environment == "development" => {
                tracing::warn!("JWT_SECRET not set, using a random development secret");
                defaults.secret
            }
            None => {
                return Err(AppError::config(format!(
                    "JWT_SECRET is required in {environment}"
                )));
            }
        };

        let jwt = JwtConfig {
            secret,
            expiration_minutes: env_or("JWT_EXPIRATION_MINUTES", defaults.expiration_minutes),
            issuer: env_string("JWT_ISSUER").unwrap_or(defaults.issuer),
            audience: env_string("JWT_AUDIENCE").unwrap_or(defaults.audience),
        };

        let fallback = EngineLimits::default();
        let limits = EngineLimits {
            max_bulk_ids: env_or("MAX_BULK_IDS", fallback.max_bulk_ids),
            default_page_size: env_or("DEFAULT_PAGE_SIZE", fallback.default_page_size),
            export_limit: env_or("EXPORT_LIMIT", fallback.export_limit),
            low_stock_threshold: env_or("LOW_STOCK_THRESHOLD", fallback.low_stock_threshold),
        };

        Ok(Self {
            http_port: env_or("HTTP_PORT", 3000),
            database_url: env_string("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://market.db?mode=rwc".into()),
            environment,
            jwt,
            log_level: env_string("LOG_LEVEL"),
            log_dir: env_string("LOG_DIR"),
            log_json: env_or("LOG_JSON", false),
            request_timeout_ms: env_or("REQUEST_TIMEOUT_MS", 30000),
            limits,
        })
    }

    /// 测试用配置：内存库、随机端口、开发密钥
    pub fn for_tests() -> Self {
        Self {
            http_port: 0,
            database_url: "sqlite::memory:".into(),
            environment: "test".into(),
            jwt: JwtConfig::default(),
            log_level: None,
            log_dir: None,
            log_json: false,
            request_timeout_ms: 30000,
            limits: EngineLimits::default(),
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
