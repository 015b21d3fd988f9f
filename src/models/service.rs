// 服务数据模型
// 服务是一类可插拔能力 (例如 payments)，由一个或多个提供商实现

use serde::{Deserialize, Serialize};

use crate::utils::headline;

/// 服务信息模型
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Service {
    /// 服务唯一标识符
    pub id: String,
    /// 服务默认提供商
    pub default_provider_id: Option<String>,
    /// 服务默认商户
    pub default_merchant_id: Option<String>,
}

impl Service {
    /// 创建没有默认值的服务
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            default_provider_id: None,
            default_merchant_id: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 服务显示名称
    pub fn name(&self) -> String {
        headline(&self.id)
    }
}
