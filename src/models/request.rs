// HTTP请求/响应数据模型
// 服务列表、服务详情以及转发给网关的请求体

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Service;

/// 转发请求
#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    /// 网关方法名
    pub method: String,
    /// 方法参数
    #[serde(default)]
    pub params: Value,
    /// 指定提供商 (可选，默认使用驱动计算的默认值)
    pub provider: Option<String>,
    /// 指定商户 (可选)
    pub merchant: Option<String>,
}

/// 服务摘要
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ServiceSummary {
    pub id: String,
    pub name: String,
    pub default_provider_id: Option<String>,
    pub default_merchant_id: Option<String>,
}

impl From<&Service> for ServiceSummary {
    fn from(service: &Service) -> Self {
        Self {
            id: service.id.clone(),
            name: service.name(),
            default_provider_id: service.default_provider_id.clone(),
            default_merchant_id: service.default_merchant_id.clone(),
        }
    }
}

/// 服务详情，默认值由服务驱动计算
#[derive(Debug, Serialize)]
pub struct ServiceDetail {
    #[serde(flatten)]
    pub summary: ServiceSummary,
    /// 驱动计算的默认提供商
    pub default_provider: Option<String>,
    /// 驱动计算的默认商户
    pub default_merchant: Option<String>,
    /// 服务是否处于测试模式
    pub test_mode: bool,
}
