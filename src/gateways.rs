// 网关模块
// 网关是针对某个 (提供商, 商户) 组合真正执行请求的对象

mod fake;
mod registry;

pub use fake::FakeGateway;
pub use registry::{GatewayFactory, GatewayRegistry};

use async_trait::async_trait;
use serde_json::Value;

/// 网关能力接口
///
/// 服务门面把未知调用按方法名转发给网关。`supports` 返回 false 的方法
/// 不会被执行，门面会直接报告 `NoSuchMethod`。
#[async_trait]
pub trait Gateway: Send + Sync {
    /// 是否支持指定方法
    fn supports(&self, method: &str) -> bool;

    /// 执行指定方法
    ///
    /// # Arguments
    /// * `method` - 方法名，例如 `charge`
    /// * `params` - 方法参数
    ///
    /// # Returns
    /// * 网关返回的数据
    async fn execute(&mut self, method: &str, params: Value) -> anyhow::Result<Value>;
}
