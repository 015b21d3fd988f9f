// 商户数据模型
// 商户是使用服务的身份/凭据集合，通过一个或多个提供商发起请求

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Service;
use crate::utils::headline;

/// 商户信息模型
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Merchant {
    /// 商户唯一标识符
    pub id: String,
    /// 所属服务
    pub service: Service,
    /// 兼容的提供商 (含每对关联数据)
    pub providers: Vec<MerchantProvider>,
    /// 商户自己的默认提供商
    pub default_provider_id: Option<String>,
}

/// 商户与提供商的关联
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MerchantProvider {
    /// 提供商标识
    pub provider_id: String,
    /// 关联数据 (例如该商户在提供商处的凭据)
    pub data: Value,
}

impl Merchant {
    pub fn new(service: Service, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service,
            providers: Vec::new(),
            default_provider_id: None,
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

    /// 兼容的提供商列表
    pub fn providers(&self) -> &[MerchantProvider] {
        &self.providers
    }

    /// 检查商户是否关联了指定提供商
    pub fn supports(&self, provider_id: &str) -> bool {
        self.providers.iter().any(|link| link.provider_id == provider_id)
    }

    /// 获取与指定提供商的关联数据
    pub fn link(&self, provider_id: &str) -> Option<&MerchantProvider> {
        self.providers.iter().find(|link| link.provider_id == provider_id)
    }
}

/// 商户参数：标识或已解析的实体
#[derive(Debug, Clone)]
pub enum MerchantRef {
    Id(String),
    Entity(Merchant),
}

impl From<&str> for MerchantRef {
    fn from(id: &str) -> Self {
        MerchantRef::Id(id.to_string())
    }
}

impl From<String> for MerchantRef {
    fn from(id: String) -> Self {
        MerchantRef::Id(id)
    }
}

impl From<&String> for MerchantRef {
    fn from(id: &String) -> Self {
        MerchantRef::Id(id.clone())
    }
}

impl From<Merchant> for MerchantRef {
    fn from(merchant: Merchant) -> Self {
        MerchantRef::Entity(merchant)
    }
}

impl From<&Merchant> for MerchantRef {
    fn from(merchant: &Merchant) -> Self {
        MerchantRef::Entity(merchant.clone())
    }
}
