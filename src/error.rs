// 编排层错误定义
// 解析服务、提供商、商户和网关时可能出现的所有错误

use thiserror::Error;

/// 编排操作的结果类型
pub type Result<T> = std::result::Result<T, OrchestrationError>;

/// 编排错误
///
/// 所有错误都在检测点立即返回，本层不做任何重试或恢复。
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// 驱动、网关或必需的配置项无效/缺失
    #[error("{0}")]
    Configuration(String),

    /// 提供商或商户标识无法解析为已知实体
    #[error("{0}")]
    Resolution(String),

    /// 商户未关联到该提供商
    #[error("The {merchant} merchant is not supported by the {provider} provider.")]
    Incompatible {
        /// 商户显示名称
        merchant: String,
        /// 提供商显示名称
        provider: String,
    },

    /// 网关不支持被转发的方法
    #[error("{service}::{method}() not found.")]
    NoSuchMethod { service: String, method: String },

    /// 数据库驱动的查询失败
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 网关执行请求时失败
    #[error(transparent)]
    Gateway(#[from] anyhow::Error),
}

impl OrchestrationError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        OrchestrationError::Configuration(message.into())
    }

    pub(crate) fn resolution(message: impl Into<String>) -> Self {
        OrchestrationError::Resolution(message.into())
    }
}
