// 配置驱动
// 提供商、商户和默认值都来自编排配置树，按服务命名空间查找

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::store::value_to_string;
use crate::config::{ConfigStore, GLOBAL_NAMESPACE};
use crate::drivers::{testing_gateway, DriverFactory, ServiceDriver};
use crate::error::Result;
use crate::models::{Merchant, MerchantProvider, MerchantRef, Provider, ProviderRef, Service};

/// 配置驱动
pub struct ConfigDriver {
    service: Service,
    config: Arc<ConfigStore>,
}

impl ConfigDriver {
    pub fn new(service: Service, config: Arc<ConfigStore>) -> Self {
        Self { service, config }
    }

    /// 服务命名空间下 `providers` / `merchants` 表中的条目
    ///
    /// id 只作为表键使用，不拼进配置路径，空 id 视为不存在。
    fn entry(&self, table: &str, id: &str) -> Option<&Value> {
        if id.is_empty() {
            return None;
        }

        let namespace = self.config.namespace(self.service.id());
        self.config
            .lookup(&format!("{}.{}", namespace, table))?
            .as_object()?
            .get(id)
            .filter(|entry| !entry.is_null())
    }

    fn provider_from_config(&self, id: &str) -> Option<Provider> {
        let entry = self.entry("providers", id)?;

        // 允许简写 "stripe": "stripe_gateway"
        let gateway = match entry {
            Value::Object(map) => map.get("gateway").and_then(value_to_string),
            other => value_to_string(other),
        };

        Some(Provider::new(self.service.clone(), id, gateway))
    }

    fn merchant_from_config(&self, id: &str) -> Option<Merchant> {
        let entry = self.entry("merchants", id)?;
        let mut merchant = Merchant::new(self.service.clone(), id);

        if let Value::Object(map) = entry {
            merchant.providers = match map.get("providers") {
                Some(Value::Object(links)) => links
                    .iter()
                    .map(|(provider_id, data)| MerchantProvider {
                        provider_id: provider_id.clone(),
                        data: data.clone(),
                    })
                    .collect(),
                Some(Value::Array(ids)) => ids
                    .iter()
                    .filter_map(value_to_string)
                    .map(|provider_id| MerchantProvider {
                        provider_id,
                        data: Value::Null,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            merchant.default_provider_id = map.get("default_provider").and_then(value_to_string);
        }

        Some(merchant)
    }
}

#[async_trait]
impl ServiceDriver for ConfigDriver {
    fn service(&self) -> &Service {
        &self.service
    }

    fn config(&self) -> &ConfigStore {
        &self.config
    }

    async fn resolve_provider(&self, provider: ProviderRef) -> Result<Option<Provider>> {
        Ok(match provider {
            ProviderRef::Entity(provider) => Some(provider),
            ProviderRef::Id(id) => self.provider_from_config(&id),
        })
    }

    async fn default_provider(&self, merchant: Option<&Merchant>) -> Result<Option<String>> {
        if let Some(id) = merchant.and_then(|m| m.default_provider_id.clone()) {
            return Ok(Some(id));
        }

        Ok(self.config.get_str(self.service.id(), "defaults.provider"))
    }

    async fn resolve_merchant(&self, merchant: MerchantRef) -> Result<Option<Merchant>> {
        Ok(match merchant {
            MerchantRef::Entity(merchant) => Some(merchant),
            MerchantRef::Id(id) => self.merchant_from_config(&id),
        })
    }

    async fn default_merchant(&self, _provider: Option<&Provider>) -> Result<Option<String>> {
        Ok(self.config.get_str(self.service.id(), "defaults.merchant"))
    }

    async fn check(&self, provider: &Provider, merchant: &Merchant) -> Result<bool> {
        // 两个实体都必须属于当前服务
        Ok(provider.service.id == self.service.id
            && merchant.service.id == self.service.id
            && merchant.supports(&provider.id))
    }

    fn resolve_gateway_class(&self, provider: &Provider) -> Result<Option<String>> {
        if let Some(gateway) = testing_gateway(&self.config, &self.service) {
            return Ok(gateway);
        }

        Ok(provider.gateway.clone())
    }
}

/// 配置驱动工厂
pub struct ConfigDriverFactory {
    config: Arc<ConfigStore>,
}

impl ConfigDriverFactory {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self { config }
    }

    fn service_from_config(&self, id: &str) -> Service {
        Service {
            id: id.to_string(),
            default_provider_id: self.config.get_str(id, "defaults.provider"),
            default_merchant_id: self.config.get_str(id, "defaults.merchant"),
        }
    }
}

#[async_trait]
impl DriverFactory for ConfigDriverFactory {
    async fn services(&self) -> Result<Vec<Service>> {
        let mut ids: Vec<String> = self
            .config
            .get_global("services")
            .and_then(Value::as_object)
            .map(|services| services.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();

        log::debug!("{} services configured under {}.services", ids.len(), GLOBAL_NAMESPACE);

        Ok(ids.iter().map(|id| self.service_from_config(id)).collect())
    }

    async fn build(&self, service: Service) -> Result<Box<dyn ServiceDriver>> {
        Ok(Box::new(ConfigDriver::new(service, self.config.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Arc<ConfigStore> {
        Arc::new(ConfigStore::new(json!({
            "orchestration": {
                "services": {
                    "payments": { "config": "payments" },
                    "billing": {},
                },
            },
            "payments": {
                "defaults": { "provider": "stripe", "merchant": "acme" },
                "providers": {
                    "stripe": { "gateway": "stripe" },
                    "paypal": "paypal",
                    "manual": {},
                },
                "merchants": {
                    "acme": { "providers": { "stripe": { "account": "acct_1" } } },
                    "globex": {
                        "providers": ["stripe", "paypal"],
                        "default_provider": "paypal",
                    },
                },
            },
        })))
    }

    fn driver() -> ConfigDriver {
        ConfigDriver::new(Service::new("payments"), config())
    }

    #[tokio::test]
    async fn test_resolve_provider_by_id() {
        let driver = driver();

        let stripe = driver.resolve_provider("stripe".into()).await.unwrap().unwrap();
        assert_eq!(stripe.gateway.as_deref(), Some("stripe"));
        assert_eq!(stripe.service().id(), "payments");

        let paypal = driver.resolve_provider("paypal".into()).await.unwrap().unwrap();
        assert_eq!(paypal.gateway.as_deref(), Some("paypal"));

        let manual = driver.resolve_provider("manual".into()).await.unwrap().unwrap();
        assert_eq!(manual.gateway, None);

        assert!(driver.resolve_provider("adyen".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resolve_merchant_links() {
        let driver = driver();

        let acme = driver.resolve_merchant("acme".into()).await.unwrap().unwrap();
        assert!(acme.supports("stripe"));
        assert!(!acme.supports("paypal"));
        assert_eq!(acme.link("stripe").unwrap().data["account"], "acct_1");

        let globex = driver.resolve_merchant("globex".into()).await.unwrap().unwrap();
        assert!(globex.supports("paypal"));
        assert_eq!(globex.default_provider_id.as_deref(), Some("paypal"));

        assert!(driver.resolve_merchant("initech".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ids_do_not_walk_config_paths() {
        let driver = driver();

        for id in ["", "stripe.gateway", ".stripe", "stripe."] {
            assert!(
                driver.resolve_provider(id.into()).await.unwrap().is_none(),
                "provider id {:?}",
                id
            );
        }
        for id in ["", "acme.providers", "acme.providers.stripe", ".acme"] {
            assert!(
                driver.resolve_merchant(id.into()).await.unwrap().is_none(),
                "merchant id {:?}",
                id
            );
        }
    }

    #[tokio::test]
    async fn test_default_provider_prefers_merchant_default() {
        let driver = driver();
        let globex = driver.resolve_merchant("globex".into()).await.unwrap().unwrap();
        let acme = driver.resolve_merchant("acme".into()).await.unwrap().unwrap();

        assert_eq!(driver.default_provider(None).await.unwrap().as_deref(), Some("stripe"));
        assert_eq!(driver.default_provider(Some(&globex)).await.unwrap().as_deref(), Some("paypal"));
        assert_eq!(driver.default_provider(Some(&acme)).await.unwrap().as_deref(), Some("stripe"));
        assert_eq!(driver.default_merchant(None).await.unwrap().as_deref(), Some("acme"));
    }

    #[tokio::test]
    async fn test_check_rejects_other_services() {
        let driver = driver();
        let stripe = driver.resolve_provider("stripe".into()).await.unwrap().unwrap();
        let acme = driver.resolve_merchant("acme".into()).await.unwrap().unwrap();
        assert!(driver.check(&stripe, &acme).await.unwrap());

        let foreign = Provider::new(Service::new("billing"), "stripe", None);
        assert!(!driver.check(&foreign, &acme).await.unwrap());
    }

    #[tokio::test]
    async fn test_gateway_class_in_test_mode() {
        let mut store = ConfigStore::clone(&config());
        store.set("payments.test_mode", json!(true));
        let driver = ConfigDriver::new(Service::new("payments"), Arc::new(store.clone()));
        let stripe = driver.resolve_provider("stripe".into()).await.unwrap().unwrap();

        // 测试模式但没有配置测试网关
        assert_eq!(driver.resolve_gateway_class(&stripe).unwrap(), None);

        store.set("payments.testing.gateway", json!("fake"));
        let driver = ConfigDriver::new(Service::new("payments"), Arc::new(store));
        assert_eq!(driver.resolve_gateway_class(&stripe).unwrap().as_deref(), Some("fake"));
    }

    #[tokio::test]
    async fn test_factory_lists_services_in_order() {
        let factory = ConfigDriverFactory::new(config());
        let services = factory.services().await.unwrap();

        let ids: Vec<&str> = services.iter().map(|s| s.id()).collect();
        assert_eq!(ids, ["billing", "payments"]);
        assert_eq!(services[1].default_provider_id.as_deref(), Some("stripe"));
    }
}
