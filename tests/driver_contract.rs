// 驱动契约测试
// 同一组用例分别运行在配置驱动和数据库驱动 (内存 SQLite) 上

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use orchestra::config::ConfigStore;
use orchestra::drivers::{
    install_schema, ConfigDriverFactory, DatabaseDriverFactory, DriverFactory, DriverRegistry,
};
use orchestra::error::OrchestrationError;
use orchestra::gateways::{Gateway, GatewayRegistry};
use orchestra::models::{Merchant, Provider, Service};
use orchestra::services::{CatalogService, ConfigCatalog, Orchestrator};

/// 回显网关名称的测试网关
struct EchoGateway {
    name: &'static str,
    provider: String,
    merchant: String,
}

#[async_trait]
impl Gateway for EchoGateway {
    fn supports(&self, method: &str) -> bool {
        method == "charge"
    }

    async fn execute(&mut self, method: &str, params: Value) -> anyhow::Result<Value> {
        Ok(json!({
            "gateway": self.name,
            "provider": self.provider,
            "merchant": self.merchant,
            "method": method,
            "params": params,
        }))
    }
}

fn echo(name: &'static str) -> impl Fn(&Provider, &Merchant) -> Box<dyn Gateway> + Send + Sync + 'static {
    move |provider, merchant| {
        let gateway: Box<dyn Gateway> = Box::new(EchoGateway {
            name,
            provider: provider.id.clone(),
            merchant: merchant.id.clone(),
        });
        gateway
    }
}

fn gateways() -> GatewayRegistry {
    let mut gateways = GatewayRegistry::new();
    gateways
        .register("stripe", echo("stripe"))
        .register("paypal", echo("paypal"));
    gateways
}

/// 配置驱动：payments 服务，stripe/paypal 两个提供商，acme 只关联 stripe
fn config_backend() -> Orchestrator {
    let mut store = ConfigStore::empty();
    let mut catalog = ConfigCatalog::new(&mut store);

    let service = catalog.create_service("payments").unwrap();
    let stripe = catalog.create_provider(&service, "stripe", Some("stripe")).unwrap();
    let paypal = catalog.create_provider(&service, "paypal", Some("paypal")).unwrap();

    let acme = catalog.create_merchant(&service, "acme").unwrap();
    let acme = catalog
        .link_merchant_to_provider(&acme, &stripe, json!({ "account": "acct_1" }))
        .unwrap();

    let globex = catalog.create_merchant(&service, "globex").unwrap();
    let globex = catalog.link_merchant_to_provider(&globex, &stripe, Value::Null).unwrap();
    let globex = catalog.link_merchant_to_provider(&globex, &paypal, Value::Null).unwrap();
    catalog.set_merchant_default_provider(&globex, Some(&paypal)).unwrap();

    catalog.set_service_defaults(&service, Some(&acme), Some(&stripe)).unwrap();

    let config = Arc::new(store);
    let mut drivers = DriverRegistry::new();
    drivers.register("config", ConfigDriverFactory::new(config.clone()));

    Orchestrator::new(config, drivers, gateways())
}

async fn memory_pool() -> AnyPool {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    install_schema(&pool).await.unwrap();
    pool
}

/// 数据库驱动：与配置驱动相同的数据，写入内存 SQLite
async fn database_backend() -> (Orchestrator, AnyPool) {
    let pool = memory_pool().await;
    let catalog = CatalogService::new(pool.clone());

    let service = catalog.create_service("payments").await.unwrap();
    let stripe = catalog.create_provider(&service, "stripe", Some("stripe")).await.unwrap();
    let paypal = catalog.create_provider(&service, "paypal", Some("paypal")).await.unwrap();

    let acme = catalog.create_merchant(&service, "acme").await.unwrap();
    catalog
        .link_merchant_to_provider(&acme, &stripe, json!({ "account": "acct_1" }))
        .await
        .unwrap();

    let globex = catalog.create_merchant(&service, "globex").await.unwrap();
    catalog.link_merchant_to_provider(&globex, &stripe, Value::Null).await.unwrap();
    catalog.link_merchant_to_provider(&globex, &paypal, Value::Null).await.unwrap();
    catalog.set_merchant_default_provider(&globex, Some(&paypal)).await.unwrap();

    catalog.set_service_defaults(&service, Some(&acme), Some(&stripe)).await.unwrap();

    let mut store = ConfigStore::empty();
    store.set("orchestration.defaults.driver", json!("database"));
    let config = Arc::new(store);

    let mut drivers = DriverRegistry::new();
    drivers.register("database", DatabaseDriverFactory::new(pool.clone(), config.clone()));

    (Orchestrator::new(config, drivers, gateways()), pool)
}

async fn backends() -> Vec<(&'static str, Orchestrator)> {
    let (database, _pool) = database_backend().await;
    vec![("config", config_backend()), ("database", database)]
}

#[tokio::test]
async fn services_are_listed_and_unknown_ids_rejected() {
    for (name, orchestrator) in backends().await {
        let services = orchestrator.all().await.unwrap();
        assert_eq!(services.len(), 1, "{}", name);
        assert_eq!(services[0].id(), "payments", "{}", name);
        assert_eq!(services[0].default_provider_id.as_deref(), Some("stripe"), "{}", name);
        assert_eq!(services[0].default_merchant_id.as_deref(), Some("acme"), "{}", name);

        let err = orchestrator.service("shipping").await.err().unwrap();
        assert!(matches!(err, OrchestrationError::Configuration(_)), "{}", name);
    }
}

#[tokio::test]
async fn registered_entities_round_trip() {
    for (name, orchestrator) in backends().await {
        let payments = orchestrator.service("payments").await.unwrap();
        let driver = payments.driver();

        let stripe = driver.resolve_provider("stripe".into()).await.unwrap().unwrap();
        assert_eq!(stripe.id(), "stripe", "{}", name);
        assert_eq!(stripe.gateway.as_deref(), Some("stripe"), "{}", name);
        assert_eq!(stripe.service().id(), "payments", "{}", name);

        let acme = driver.resolve_merchant("acme".into()).await.unwrap().unwrap();
        assert_eq!(acme.id(), "acme", "{}", name);
        assert_eq!(acme.name(), "Acme", "{}", name);
        assert_eq!(acme.link("stripe").unwrap().data["account"], "acct_1", "{}", name);

        assert!(driver.resolve_provider("worldpay".into()).await.unwrap().is_none(), "{}", name);
        assert!(driver.resolve_merchant("hooli".into()).await.unwrap().is_none(), "{}", name);
    }
}

#[tokio::test]
async fn check_follows_links() {
    for (name, orchestrator) in backends().await {
        let payments = orchestrator.service("payments").await.unwrap();
        let driver = payments.driver();

        let stripe = driver.resolve_provider("stripe".into()).await.unwrap().unwrap();
        let paypal = driver.resolve_provider("paypal".into()).await.unwrap().unwrap();
        let acme = driver.resolve_merchant("acme".into()).await.unwrap().unwrap();
        let globex = driver.resolve_merchant("globex".into()).await.unwrap().unwrap();

        assert!(driver.check(&stripe, &acme).await.unwrap(), "{}", name);
        assert!(!driver.check(&paypal, &acme).await.unwrap(), "{}", name);
        assert!(driver.check(&paypal, &globex).await.unwrap(), "{}", name);

        let foreign = Provider::new(Service::new("billing"), "stripe", None);
        assert!(!driver.check(&foreign, &acme).await.unwrap(), "{}", name);

        // 链接存在但两个实体都属于其他服务
        let mut foreign_acme = acme.clone();
        foreign_acme.service = Service::new("billing");
        assert!(!driver.check(&foreign, &foreign_acme).await.unwrap(), "{}", name);
    }
}

#[tokio::test]
async fn defaults_prefer_merchant_then_service() {
    for (name, orchestrator) in backends().await {
        let payments = orchestrator.service("payments").await.unwrap();
        let driver = payments.driver();
        let acme = driver.resolve_merchant("acme".into()).await.unwrap().unwrap();
        let globex = driver.resolve_merchant("globex".into()).await.unwrap().unwrap();

        assert_eq!(driver.default_provider(None).await.unwrap().as_deref(), Some("stripe"), "{}", name);
        assert_eq!(driver.default_provider(Some(&acme)).await.unwrap().as_deref(), Some("stripe"), "{}", name);
        assert_eq!(driver.default_provider(Some(&globex)).await.unwrap().as_deref(), Some("paypal"), "{}", name);
        assert_eq!(driver.default_merchant(None).await.unwrap().as_deref(), Some("acme"), "{}", name);
    }
}

#[tokio::test]
async fn incompatible_pair_is_rejected_and_linked_pair_forwarded() {
    for (name, orchestrator) in backends().await {
        let mut payments = orchestrator.service("payments").await.unwrap();

        payments.set_merchant("acme").await.unwrap();
        payments.set_provider("paypal").await.unwrap();
        let err = payments.call("charge", json!(100)).await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Incompatible { .. }), "{}", name);

        payments.set_provider("stripe").await.unwrap();
        let response = payments.call("charge", json!(100)).await.unwrap();
        assert_eq!(response.data["gateway"], "stripe", "{}", name);
        assert_eq!(response.data["merchant"], "acme", "{}", name);
        assert_eq!(response.data["params"], 100, "{}", name);
    }
}

#[tokio::test]
async fn defaults_resolve_without_explicit_selection() {
    for (name, orchestrator) in backends().await {
        let mut payments = orchestrator.service("payments").await.unwrap();

        assert!(payments.get_gateway().await.is_ok(), "{}", name);
        assert_eq!(payments.get_provider().await.unwrap().id(), "stripe", "{}", name);
        assert_eq!(payments.get_merchant().await.unwrap().id(), "acme", "{}", name);
    }
}

#[tokio::test]
async fn unknown_selection_keeps_previous_state() {
    for (name, orchestrator) in backends().await {
        let mut payments = orchestrator.service("payments").await.unwrap();
        payments.set_merchant("globex").await.unwrap();
        payments.set_provider("paypal").await.unwrap();

        let err = payments.set_provider("worldpay").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Resolution(_)), "{}", name);
        let err = payments.set_merchant("hooli").await.unwrap_err();
        assert!(matches!(err, OrchestrationError::Resolution(_)), "{}", name);

        assert_eq!(payments.get_provider().await.unwrap().id(), "paypal", "{}", name);
        assert_eq!(payments.get_merchant().await.unwrap().id(), "globex", "{}", name);
    }
}

#[tokio::test]
async fn provider_change_re_resolves_gateway() {
    for (name, orchestrator) in backends().await {
        let mut payments = orchestrator.service("payments").await.unwrap();
        payments.set_merchant("globex").await.unwrap();

        // globex 的默认提供商是 paypal
        let first = payments.call("charge", Value::Null).await.unwrap();
        assert_eq!(first.data["gateway"], "paypal", "{}", name);

        payments.set_provider("stripe").await.unwrap();
        assert!(!payments.has_gateway(), "{}", name);

        let second = payments.call("charge", Value::Null).await.unwrap();
        assert_eq!(second.data["gateway"], "stripe", "{}", name);
    }
}

#[tokio::test]
async fn reset_restores_configured_defaults() {
    for (name, orchestrator) in backends().await {
        let mut payments = orchestrator.service("payments").await.unwrap();
        payments.set_merchant("globex").await.unwrap();
        payments.set_provider("paypal").await.unwrap();

        payments.reset().await.unwrap();

        assert!(!payments.has_gateway(), "{}", name);
        assert_eq!(payments.get_provider().await.unwrap().id(), "stripe", "{}", name);
        assert_eq!(payments.get_merchant().await.unwrap().id(), "acme", "{}", name);
    }
}

#[tokio::test]
async fn database_reset_reloads_service_defaults() {
    let (orchestrator, pool) = database_backend().await;
    let mut payments = orchestrator.service("payments").await.unwrap();
    assert_eq!(payments.get_merchant().await.unwrap().id(), "acme");

    // 管理端修改服务默认值
    let catalog = CatalogService::new(pool);
    let service = payments.service().clone();
    let globex = payments
        .driver()
        .resolve_merchant("globex".into())
        .await
        .unwrap()
        .unwrap();
    let updated = catalog.set_service_defaults(&service, Some(&globex), None).await.unwrap();
    assert_eq!(updated.default_provider_id.as_deref(), Some("paypal"));

    payments.reset().await.unwrap();
    assert_eq!(payments.get_provider().await.unwrap().id(), "paypal");
    assert_eq!(payments.get_merchant().await.unwrap().id(), "globex");
}

#[tokio::test]
async fn database_provider_gateway_falls_back_to_config() {
    let pool = memory_pool().await;
    let catalog = CatalogService::new(pool.clone());
    let service = catalog.create_service("payments").await.unwrap();
    catalog.create_provider(&service, "manual", None).await.unwrap();

    let mut store = ConfigStore::empty();
    store.set("payments.providers.manual.gateway", json!("stripe"));
    let factory = DatabaseDriverFactory::new(pool, Arc::new(store));

    let driver = factory.build(service).await.unwrap();
    let manual = driver.resolve_provider("manual".into()).await.unwrap().unwrap();
    assert_eq!(manual.gateway, None);
    assert_eq!(driver.resolve_gateway_class(&manual).unwrap().as_deref(), Some("stripe"));
}

#[tokio::test]
async fn database_driver_requires_stored_service() {
    let pool = memory_pool().await;
    let factory = DatabaseDriverFactory::new(pool, Arc::new(ConfigStore::empty()));

    let err = factory.build(Service::new("ghost")).await.err().unwrap();
    assert!(matches!(err, OrchestrationError::Configuration(_)));
    assert_eq!(err.to_string(), "The ghost service does not exist.");
}

#[tokio::test]
async fn catalog_rejects_cross_service_links() {
    let pool = memory_pool().await;
    let catalog = CatalogService::new(pool);

    let payments = catalog.create_service("payments").await.unwrap();
    let billing = catalog.create_service("billing").await.unwrap();
    let stripe = catalog.create_provider(&billing, "stripe", Some("stripe")).await.unwrap();
    let acme = catalog.create_merchant(&payments, "acme").await.unwrap();

    assert!(catalog.link_merchant_to_provider(&acme, &stripe, Value::Null).await.is_err());
    assert!(catalog.create_service("not valid").await.is_err());
}

#[tokio::test]
async fn database_driver_reads_null_columns() {
    let pool = memory_pool().await;
    for statement in [
        "INSERT INTO services (id, default_provider_id, default_merchant_id, created_at, updated_at) VALUES ('payments', NULL, NULL, 'now', 'now')",
        "INSERT INTO providers (id, service_id, gateway, created_at, updated_at) VALUES ('manual', 'payments', NULL, 'now', 'now')",
        "INSERT INTO merchants (id, service_id, default_provider_id, created_at, updated_at) VALUES ('acme', 'payments', NULL, 'now', 'now')",
        "INSERT INTO merchant_provider (merchant_id, provider_id, data, created_at, updated_at) VALUES ('acme', 'manual', NULL, 'now', 'now')",
    ] {
        sqlx::query(statement).execute(&pool).await.unwrap();
    }

    let factory = DatabaseDriverFactory::new(pool, Arc::new(ConfigStore::empty()));
    let services = factory.services().await.unwrap();
    assert_eq!(services, vec![Service::new("payments")]);

    let driver = factory.build(Service::new("payments")).await.unwrap();
    let manual = driver.resolve_provider("manual".into()).await.unwrap().unwrap();
    assert_eq!(manual.gateway, None);

    let acme = driver.resolve_merchant("acme".into()).await.unwrap().unwrap();
    assert_eq!(acme.default_provider_id, None);
    assert_eq!(acme.link("manual").unwrap().data, Value::Null);
    assert!(driver.check(&manual, &acme).await.unwrap());
    assert_eq!(driver.default_provider(Some(&acme)).await.unwrap(), None);
}
