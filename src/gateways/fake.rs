// 测试模式网关
// 测试模式下替代真实网关，按配置返回预设响应

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::config::ConfigStore;
use crate::gateways::Gateway;
use crate::models::{Merchant, Provider};

/// 测试模式网关
///
/// 支持的方法及其响应来自服务配置 `testing.responses.<method>`。
#[derive(Debug, Clone)]
pub struct FakeGateway {
    provider_id: String,
    merchant_id: String,
    responses: Map<String, Value>,
    calls: Vec<String>,
}

impl FakeGateway {
    pub fn new(provider: &Provider, merchant: &Merchant, responses: Map<String, Value>) -> Self {
        Self {
            provider_id: provider.id.clone(),
            merchant_id: merchant.id.clone(),
            responses,
            calls: Vec::new(),
        }
    }

    /// 创建读取服务测试响应配置的网关构造函数
    pub fn factory(
        config: Arc<ConfigStore>,
    ) -> impl Fn(&Provider, &Merchant) -> Box<dyn Gateway> + Send + Sync + 'static {
        move |provider, merchant| {
            let responses = config
                .get(provider.service().id(), "testing.responses")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();

            let gateway: Box<dyn Gateway> = Box::new(FakeGateway::new(provider, merchant, responses));
            gateway
        }
    }

    /// 已执行的方法 (按调用顺序)
    pub fn calls(&self) -> &[String] {
        &self.calls
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    fn supports(&self, method: &str) -> bool {
        self.responses.contains_key(method)
    }

    async fn execute(&mut self, method: &str, params: Value) -> anyhow::Result<Value> {
        let response = self
            .responses
            .get(method)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("No fake response configured for `{}`", method))?;

        self.calls.push(method.to_string());
        log::debug!(
            "Fake gateway answered {} for provider {} / merchant {}",
            method,
            self.provider_id,
            self.merchant_id
        );

        Ok(json!({
            "provider": self.provider_id,
            "merchant": self.merchant_id,
            "method": method,
            "params": params,
            "response": response,
        }))
    }
}
