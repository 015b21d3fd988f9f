// 服务驱动模块
// 驱动负责解析提供商/商户标识、计算默认值、检查兼容性并确定网关

mod config_driver;
mod database_driver;
mod registry;

pub use config_driver::{ConfigDriver, ConfigDriverFactory};
pub use database_driver::{install_schema, DatabaseDriver, DatabaseDriverFactory};
pub use registry::DriverRegistry;

use async_trait::async_trait;

use crate::config::ConfigStore;
use crate::error::{OrchestrationError, Result};
use crate::gateways::{Gateway, GatewayRegistry};
use crate::models::{Merchant, MerchantRef, Provider, ProviderRef, Service};

/// 服务驱动
///
/// 配置驱动和数据库驱动共享同一套契约。解析方法在找不到实体时返回
/// `Ok(None)`，由服务门面把它转换为错误。
#[async_trait]
pub trait ServiceDriver: Send + Sync {
    /// 驱动负责的服务
    fn service(&self) -> &Service;

    /// 编排配置
    fn config(&self) -> &ConfigStore;

    /// 重置驱动在请求之间缓存的状态
    async fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    /// 解析提供商，实体参数原样返回
    async fn resolve_provider(&self, provider: ProviderRef) -> Result<Option<Provider>>;

    /// 默认提供商标识：商户自己的默认值优先，其次是服务默认值
    async fn default_provider(&self, merchant: Option<&Merchant>) -> Result<Option<String>>;

    /// 解析商户，实体参数原样返回
    async fn resolve_merchant(&self, merchant: MerchantRef) -> Result<Option<Merchant>>;

    /// 默认商户标识
    async fn default_merchant(&self, provider: Option<&Provider>) -> Result<Option<String>>;

    /// 检查商户是否关联到提供商 (限定在同一服务内)
    async fn check(&self, provider: &Provider, merchant: &Merchant) -> Result<bool>;

    /// 确定提供商使用的网关注册键
    fn resolve_gateway_class(&self, provider: &Provider) -> Result<Option<String>>;

    /// 构造 (提供商, 商户) 对应的网关实例
    async fn resolve_gateway(
        &self,
        provider: &Provider,
        merchant: &Merchant,
        gateways: &GatewayRegistry,
    ) -> Result<Box<dyn Gateway>> {
        let service = self.service();

        let key = match self.resolve_gateway_class(provider)? {
            Some(key) => key,
            None if test_mode(self.config(), service) => {
                return Err(OrchestrationError::configuration(format!(
                    "You must set a testing gateway for the {} service.",
                    service.name()
                )));
            }
            None => {
                return Err(OrchestrationError::configuration(format!(
                    "You must set a gateway for the {} {} provider.",
                    provider.name(),
                    service.name()
                )));
            }
        };

        let gateway = gateways.build(&key, provider, merchant).ok_or_else(|| {
            OrchestrationError::configuration(format!("The `{}` gateway does not exist.", key))
        })?;

        log::info!(
            "Resolved {} gateway `{}` for provider {} / merchant {}",
            service.id(),
            key,
            provider.id(),
            merchant.id()
        );

        Ok(gateway)
    }
}

/// 驱动工厂
///
/// 列出驱动管理的全部服务，并为单个服务构造驱动。
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// 全部服务 (按标识排序)
    async fn services(&self) -> Result<Vec<Service>>;

    /// 为服务构造驱动
    async fn build(&self, service: Service) -> Result<Box<dyn ServiceDriver>>;
}

/// 服务是否处于测试模式 (服务配置优先，其次是全局配置)
pub fn test_mode(config: &ConfigStore, service: &Service) -> bool {
    config.get_bool(service.id(), "test_mode", false)
}

/// 测试模式下的网关键；未处于测试模式时返回 `None`
pub(crate) fn testing_gateway(config: &ConfigStore, service: &Service) -> Option<Option<String>> {
    if test_mode(config, service) {
        Some(config.get_str(service.id(), "testing.gateway"))
    } else {
        None
    }
}
