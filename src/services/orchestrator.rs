// 服务编排入口
// 根据配置为服务选择驱动，并创建请求级别的服务门面

use std::sync::Arc;

use crate::config::store::value_to_string;
use crate::config::ConfigStore;
use crate::drivers::{DriverFactory, DriverRegistry};
use crate::error::{OrchestrationError, Result};
use crate::gateways::GatewayRegistry;
use crate::models::Service;
use crate::services::ServiceFacade;

/// 服务编排器
///
/// 进程启动时构造一次，配置、驱动注册表和网关注册表都在之后保持只读。
pub struct Orchestrator {
    config: Arc<ConfigStore>,
    drivers: DriverRegistry,
    gateways: Arc<GatewayRegistry>,
}

impl Orchestrator {
    /// 创建编排器
    ///
    /// # Arguments
    /// * `config` - 编排配置
    /// * `drivers` - 已注册的驱动工厂
    /// * `gateways` - 已注册的网关构造函数
    pub fn new(config: Arc<ConfigStore>, drivers: DriverRegistry, gateways: GatewayRegistry) -> Self {
        log::info!(
            "Orchestrator ready with drivers {:?} and gateways {:?}",
            drivers.keys(),
            gateways.keys()
        );

        Self {
            config,
            drivers,
            gateways: Arc::new(gateways),
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn drivers(&self) -> &DriverRegistry {
        &self.drivers
    }

    pub fn gateways(&self) -> &GatewayRegistry {
        &self.gateways
    }

    /// 全局默认驱动管理的全部服务
    pub async fn all(&self) -> Result<Vec<Service>> {
        let factory = self.driver_factory(None)?;
        factory.services().await
    }

    /// 按标识查找服务
    pub async fn find(&self, id: &str) -> Result<Option<Service>> {
        let services = self.all().await?;
        Ok(services.into_iter().find(|service| service.id == id))
    }

    /// 为服务创建服务门面
    ///
    /// # Arguments
    /// * `id` - 服务标识
    ///
    /// # Returns
    /// * 尚未选择提供商和商户的服务门面
    pub async fn service(&self, id: &str) -> Result<ServiceFacade> {
        let factory = self.driver_factory(Some(id))?;

        let service = factory
            .services()
            .await?
            .into_iter()
            .find(|service| service.id == id)
            .ok_or_else(|| {
                OrchestrationError::configuration(format!("The {} service does not exist.", id))
            })?;

        let driver = factory.build(service).await?;
        log::debug!("Created facade for service {}", id);

        Ok(ServiceFacade::new(driver, self.gateways.clone()))
    }

    /// 解析驱动工厂
    ///
    /// 驱动名称来自 `defaults.driver`，再经 `drivers.<name>` 映射为注册键。
    /// 未指定服务时只读取全局命名空间。
    fn driver_factory(&self, scope: Option<&str>) -> Result<Arc<dyn DriverFactory>> {
        let read = |path: &str| match scope {
            Some(id) => self.config.get_str(id, path),
            None => self.config.get_global(path).and_then(value_to_string),
        };

        let key = read("defaults.driver")
            .and_then(|name| read(&format!("drivers.{}", name)))
            .ok_or_else(|| OrchestrationError::configuration("Invalid driver provided."))?;

        self.drivers.get(&key).ok_or_else(|| {
            OrchestrationError::configuration(format!("The `{}` driver is not registered.", key))
        })
    }
}
