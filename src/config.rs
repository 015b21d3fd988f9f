// 配置管理模块
// 负责加载应用程序配置 (环境变量) 和服务编排配置树

pub(crate) mod store;

pub use store::{ConfigStore, GLOBAL_NAMESPACE};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// 应用程序配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 数据库配置 (未设置时不启用数据库驱动)
    pub database: Option<DatabaseConfig>,
    /// 编排配置
    pub orchestration: OrchestrationConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 服务器监听地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
    /// 工作线程数
    pub workers: Option<usize>,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: u32,
}

/// 编排配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationConfig {
    /// 编排配置树 (JSON) 文件路径
    pub config_path: String,
    /// 全局测试模式覆盖 (SERVICE_TEST_MODE)
    pub test_mode: Option<bool>,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok(); // 加载.env文件，忽略错误

        let database = match env::var("DATABASE_URL") {
            Ok(url) => Some(DatabaseConfig {
                url,
                max_connections: env::var("DB_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("Invalid DB_MAX_CONNECTIONS")?,
            }),
            Err(_) => None,
        };

        let test_mode = match env::var("SERVICE_TEST_MODE") {
            Ok(value) => Some(parse_bool(&value).context("Invalid SERVICE_TEST_MODE")?),
            Err(_) => None,
        };

        Ok(AppConfig {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .context("Invalid SERVER_PORT")?,
                workers: env::var("SERVER_WORKERS")
                    .ok()
                    .and_then(|s| s.parse().ok()),
            },
            database,
            orchestration: OrchestrationConfig {
                config_path: env::var("ORCHESTRATION_CONFIG")
                    .unwrap_or_else(|_| "config/orchestration.json".to_string()),
                test_mode,
            },
        })
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if let Some(database) = &self.database {
            if database.url.is_empty() {
                anyhow::bail!("Database URL cannot be empty");
            }
            if database.max_connections == 0 {
                anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
            }
        }

        if self.orchestration.config_path.is_empty() {
            anyhow::bail!("ORCHESTRATION_CONFIG cannot be empty");
        }

        Ok(())
    }

    /// 获取服务器绑定地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                workers: None,
            },
            database: None,
            orchestration: OrchestrationConfig {
                config_path: "config/orchestration.json".to_string(),
                test_mode: None,
            },
        }
    }
}

/// 解析环境变量中的布尔值
fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("expected a boolean, got `{}`", other),
    }
}
