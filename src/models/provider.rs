// 提供商数据模型

use serde::{Deserialize, Serialize};

use crate::models::Service;
use crate::utils::headline;

/// 提供商信息模型
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Provider {
    /// 提供商唯一标识符
    pub id: String,
    /// 所属服务
    pub service: Service,
    /// 处理请求的网关注册键
    pub gateway: Option<String>,
}

impl Provider {
    pub fn new(service: Service, id: impl Into<String>, gateway: Option<String>) -> Self {
        Self {
            id: id.into(),
            service,
            gateway,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> String {
        headline(&self.id)
    }

    pub fn service(&self) -> &Service {
        &self.service
    }
}

/// 提供商参数：标识或已解析的实体
#[derive(Debug, Clone)]
pub enum ProviderRef {
    Id(String),
    Entity(Provider),
}

impl From<&str> for ProviderRef {
    fn from(id: &str) -> Self {
        ProviderRef::Id(id.to_string())
    }
}

impl From<String> for ProviderRef {
    fn from(id: String) -> Self {
        ProviderRef::Id(id)
    }
}

impl From<&String> for ProviderRef {
    fn from(id: &String) -> Self {
        ProviderRef::Id(id.clone())
    }
}

impl From<Provider> for ProviderRef {
    fn from(provider: Provider) -> Self {
        ProviderRef::Entity(provider)
    }
}

impl From<&Provider> for ProviderRef {
    fn from(provider: &Provider) -> Self {
        ProviderRef::Entity(provider.clone())
    }
}
