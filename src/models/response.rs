// 网关响应数据模型

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::models::{Merchant, Provider};

/// 服务门面转发调用后返回的响应
#[derive(Debug, Serialize, Clone)]
pub struct ServiceResponse {
    /// 请求唯一标识符
    pub request_id: Uuid,
    /// 服务标识
    pub service_id: String,
    /// 被调用的网关方法
    pub method: Option<String>,
    /// 处理请求的提供商
    pub provider_id: Option<String>,
    /// 发起请求的商户
    pub merchant_id: Option<String>,
    /// 网关返回的数据
    pub data: Value,
    /// 完成时间
    pub completed_at: DateTime<Utc>,
}

impl ServiceResponse {
    pub fn new(service_id: impl Into<String>, data: Value) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            service_id: service_id.into(),
            method: None,
            provider_id: None,
            merchant_id: None,
            data,
            completed_at: Utc::now(),
        }
    }

    /// 记录产生该响应的方法、提供商和商户
    pub fn configure(mut self, method: &str, provider: &Provider, merchant: &Merchant) -> Self {
        self.method = Some(method.to_string());
        self.provider_id = Some(provider.id.clone());
        self.merchant_id = Some(merchant.id.clone());
        self
    }
}
