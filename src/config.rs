use serde::{Deserialize, Serialize};
use std::env;

use crate::services::OverflowPolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub approval: ApprovalConfig,
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

/// 审批事务的超时与重试策略
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// 申请行锁等待上限（秒）
    pub lock_wait_secs: u64,
    /// 单次审批事务的执行预算（秒），超过后不再开始写佣金流水
    pub execution_budget_secs: u64,
    /// 瞬时错误最多尝试次数（含首次）
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    /// 上线层级不足时未分配佣金的处理方式
    pub overflow_policy: OverflowPolicy,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            lock_wait_secs: 10,
            execution_budget_secs: 300,
            max_attempts: 3,
            retry_base_delay_ms: 200,
            overflow_policy: OverflowPolicy::Forfeit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// 定时对账间隔（秒），0 表示关闭
    pub interval_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and config.toml was not found")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                    },
                    approval: ApprovalConfig::default(),
                    reconciliation: ReconciliationConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config =
            toml::from_str(config_str).map_err(|e| format!("Failed to parse config file: {e}"))?;
        Ok(config)
    }

    // 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            self.jwt.secret = v;
        }

        // 审批
        if let Ok(v) = env::var("APPROVAL_LOCK_WAIT_SECS")
            && let Ok(n) = v.parse()
        {
            self.approval.lock_wait_secs = n;
        }
        if let Ok(v) = env::var("APPROVAL_EXECUTION_BUDGET_SECS")
            && let Ok(n) = v.parse()
        {
            self.approval.execution_budget_secs = n;
        }
        if let Ok(v) = env::var("APPROVAL_MAX_ATTEMPTS")
            && let Ok(n) = v.parse()
        {
            self.approval.max_attempts = n;
        }
        if let Ok(v) = env::var("APPROVAL_RETRY_BASE_DELAY_MS")
            && let Ok(n) = v.parse()
        {
            self.approval.retry_base_delay_ms = n;
        }
        if let Ok(v) = env::var("APPROVAL_OVERFLOW_POLICY") {
            match v.parse() {
                Ok(policy) => self.approval.overflow_policy = policy,
                Err(e) => log::warn!("Ignoring APPROVAL_OVERFLOW_POLICY: {e}"),
            }
        }

        // 对账
        if let Ok(v) = env::var("RECONCILIATION_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            self.reconciliation.interval_secs = n;
        }
    }
}
