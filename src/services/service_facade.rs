// 服务门面
// 保存当前选择的提供商、商户和网关，懒加载网关并把调用转发给它

use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;

use crate::drivers::ServiceDriver;
use crate::error::{OrchestrationError, Result};
use crate::gateways::{Gateway, GatewayRegistry};
use crate::models::{Merchant, MerchantRef, Provider, ProviderRef, Service, ServiceResponse};

/// 服务门面
///
/// 每个实例只在一次请求 (或一次逻辑操作) 内使用。更换提供商或商户会丢弃
/// 已解析的网关，下一次转发调用时重新解析。
pub struct ServiceFacade {
    driver: Box<dyn ServiceDriver>,
    gateways: Arc<GatewayRegistry>,
    provider: Option<Provider>,
    merchant: Option<Merchant>,
    gateway: Option<Box<dyn Gateway>>,
}

impl ServiceFacade {
    pub fn new(driver: Box<dyn ServiceDriver>, gateways: Arc<GatewayRegistry>) -> Self {
        Self {
            driver,
            gateways,
            provider: None,
            merchant: None,
            gateway: None,
        }
    }

    pub fn service(&self) -> &Service {
        self.driver.service()
    }

    pub fn driver(&self) -> &dyn ServiceDriver {
        self.driver.as_ref()
    }

    /// 链式设置提供商
    pub async fn provider(&mut self, provider: impl Into<ProviderRef>) -> Result<&mut Self> {
        self.set_provider(provider).await?;
        Ok(self)
    }

    /// 当前提供商，未设置时使用驱动计算的默认提供商
    pub async fn get_provider(&mut self) -> Result<&Provider> {
        if self.provider.is_none() {
            let id = self.default_provider().await?.ok_or_else(|| {
                OrchestrationError::configuration(format!(
                    "No default provider is configured for the {} service.",
                    self.service().name()
                ))
            })?;
            self.set_provider(id).await?;
        }

        self.provider
            .as_ref()
            .ok_or_else(|| OrchestrationError::resolution("Invalid provider."))
    }

    /// 设置提供商；解析失败时保持原有选择不变
    pub async fn set_provider(&mut self, provider: impl Into<ProviderRef>) -> Result<()> {
        let provider = self
            .driver
            .resolve_provider(provider.into())
            .await?
            .ok_or_else(|| OrchestrationError::resolution("Invalid provider."))?;

        log::debug!("{} service provider set to {}", self.service().id(), provider.id());

        self.provider = Some(provider);
        self.gateway = None;
        Ok(())
    }

    /// 默认提供商标识
    pub async fn default_provider(&self) -> Result<Option<String>> {
        self.driver.default_provider(self.merchant.as_ref()).await
    }

    /// 链式设置商户
    pub async fn merchant(&mut self, merchant: impl Into<MerchantRef>) -> Result<&mut Self> {
        self.set_merchant(merchant).await?;
        Ok(self)
    }

    /// 当前商户，未设置时使用驱动计算的默认商户
    pub async fn get_merchant(&mut self) -> Result<&Merchant> {
        if self.merchant.is_none() {
            let id = self.default_merchant().await?.ok_or_else(|| {
                OrchestrationError::configuration(format!(
                    "No default merchant is configured for the {} service.",
                    self.service().name()
                ))
            })?;
            self.set_merchant(id).await?;
        }

        self.merchant
            .as_ref()
            .ok_or_else(|| OrchestrationError::resolution("Invalid merchant."))
    }

    /// 设置商户；解析失败时保持原有选择不变
    pub async fn set_merchant(&mut self, merchant: impl Into<MerchantRef>) -> Result<()> {
        let merchant = self
            .driver
            .resolve_merchant(merchant.into())
            .await?
            .ok_or_else(|| OrchestrationError::resolution("Invalid merchant."))?;

        log::debug!("{} service merchant set to {}", self.service().id(), merchant.id());

        self.merchant = Some(merchant);
        self.gateway = None;
        Ok(())
    }

    /// 默认商户标识
    pub async fn default_merchant(&self) -> Result<Option<String>> {
        self.driver.default_merchant(self.provider.as_ref()).await
    }

    /// 是否已有解析好的网关
    pub fn has_gateway(&self) -> bool {
        self.gateway.is_some()
    }

    /// 当前网关，首次访问时解析
    ///
    /// 先确定商户再确定提供商，使商户自己的默认提供商生效。
    pub async fn get_gateway(&mut self) -> Result<&mut dyn Gateway> {
        if self.gateway.is_none() {
            self.get_merchant().await?;
            self.get_provider().await?;

            let gateway = self.resolve_gateway().await?;
            self.gateway = Some(gateway);
        }

        match self.gateway.as_deref_mut() {
            Some(gateway) => {
                let gateway: &mut dyn Gateway = gateway;
                Ok(gateway)
            }
            None => Err(OrchestrationError::configuration("Gateway could not be resolved.")),
        }
    }

    async fn resolve_gateway(&self) -> Result<Box<dyn Gateway>> {
        let (Some(provider), Some(merchant)) = (self.provider.as_ref(), self.merchant.as_ref()) else {
            return Err(OrchestrationError::configuration(
                "A provider and a merchant are required to resolve a gateway.",
            ));
        };

        if !self.driver.check(provider, merchant).await? {
            log::warn!(
                "Merchant {} is not linked to provider {} in the {} service",
                merchant.id(),
                provider.id(),
                self.service().id()
            );
            return Err(OrchestrationError::Incompatible {
                merchant: merchant.name(),
                provider: provider.name(),
            });
        }

        self.driver
            .resolve_gateway(provider, merchant, &self.gateways)
            .await
    }

    /// 把调用转发给网关
    ///
    /// # Arguments
    /// * `method` - 网关方法名
    /// * `params` - 方法参数
    ///
    /// # Returns
    /// * 带有方法、提供商和商户信息的响应
    pub async fn call(&mut self, method: &str, params: Value) -> Result<ServiceResponse> {
        let service_id = self.service().id().to_string();
        let service_name = self.service().name();

        let gateway = self.get_gateway().await?;
        if !gateway.supports(method) {
            return Err(OrchestrationError::NoSuchMethod {
                service: service_name,
                method: method.to_string(),
            });
        }

        let data = gateway
            .execute(method, params)
            .await
            .with_context(|| format!("{}::{}() failed", service_name, method))?;

        let (Some(provider), Some(merchant)) = (self.provider.as_ref(), self.merchant.as_ref()) else {
            return Err(OrchestrationError::configuration(
                "A provider and a merchant are required to forward a call.",
            ));
        };

        log::info!(
            "{}::{}() handled by provider {} for merchant {}",
            service_id,
            method,
            provider.id(),
            merchant.id()
        );

        Ok(ServiceResponse::new(service_id, data).configure(method, provider, merchant))
    }

    /// 恢复到初始状态，并让驱动刷新缓存
    pub async fn reset(&mut self) -> Result<()> {
        self.provider = None;
        self.merchant = None;
        self.gateway = None;

        self.driver.refresh().await
    }
}
