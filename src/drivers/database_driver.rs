// 数据库驱动
// 提供商、商户及其关联保存在关系表中，查询都限定在当前服务内

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{AnyPool, FromRow};

use crate::config::ConfigStore;
use crate::drivers::{testing_gateway, DriverFactory, ServiceDriver};
use crate::error::{OrchestrationError, Result};
use crate::models::{Merchant, MerchantProvider, MerchantRef, Provider, ProviderRef, Service};

// Any 驱动无法把 NULL 解码为 Option<String>，可空列都用 COALESCE(col, '') 读取，
// 空字符串再还原为 None

/// 服务表记录
#[derive(Debug, FromRow)]
struct ServiceRow {
    id: String,
    default_provider_id: String,
    default_merchant_id: String,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Self {
            id: row.id,
            default_provider_id: non_empty(row.default_provider_id),
            default_merchant_id: non_empty(row.default_merchant_id),
        }
    }
}

/// 提供商表记录
#[derive(Debug, FromRow)]
struct ProviderRow {
    id: String,
    gateway: String,
}

/// 商户表记录
#[derive(Debug, FromRow)]
struct MerchantRow {
    id: String,
    default_provider_id: String,
}

/// 商户-提供商关联表记录
#[derive(Debug, FromRow)]
struct MerchantProviderRow {
    provider_id: String,
    data: String,
}

/// 数据库驱动
pub struct DatabaseDriver {
    service: Service,
    pool: AnyPool,
    config: Arc<ConfigStore>,
}

impl DatabaseDriver {
    /// 创建数据库驱动，服务必须在 services 表中存在
    ///
    /// # Arguments
    /// * `service` - 服务 (按标识重新从数据库加载)
    /// * `pool` - 数据库连接池
    /// * `config` - 编排配置
    pub async fn new(service: Service, pool: AnyPool, config: Arc<ConfigStore>) -> Result<Self> {
        let service = fetch_service(&pool, service.id())
            .await?
            .ok_or_else(|| missing_service(service.id()))?;

        Ok(Self {
            service,
            pool,
            config,
        })
    }

    async fn fetch_provider(&self, id: &str) -> Result<Option<Provider>> {
        let row = sqlx::query_as::<_, ProviderRow>(
            r#"
            SELECT id, COALESCE(gateway, '') AS gateway
            FROM providers
            WHERE id = $1 AND service_id = $2
            "#,
        )
        .bind(id)
        .bind(self.service.id())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| Provider::new(self.service.clone(), row.id, non_empty(row.gateway))))
    }

    async fn fetch_merchant(&self, id: &str) -> Result<Option<Merchant>> {
        let row = sqlx::query_as::<_, MerchantRow>(
            r#"
            SELECT id, COALESCE(default_provider_id, '') AS default_provider_id
            FROM merchants
            WHERE id = $1 AND service_id = $2
            "#,
        )
        .bind(id)
        .bind(self.service.id())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let links = sqlx::query_as::<_, MerchantProviderRow>(
            r#"
            SELECT provider_id, COALESCE(data, '') AS data
            FROM merchant_provider
            WHERE merchant_id = $1
            ORDER BY provider_id
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await?;

        let mut merchant = Merchant::new(self.service.clone(), row.id);
        merchant.default_provider_id = non_empty(row.default_provider_id);
        merchant.providers = links
            .into_iter()
            .map(|link| MerchantProvider {
                data: parse_link_data(&merchant.id, &link),
                provider_id: link.provider_id,
            })
            .collect();

        Ok(Some(merchant))
    }
}

#[async_trait]
impl ServiceDriver for DatabaseDriver {
    fn service(&self) -> &Service {
        &self.service
    }

    fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// 重新加载服务记录，使管理端修改的默认值在下一次请求中生效
    async fn refresh(&mut self) -> Result<()> {
        self.service = fetch_service(&self.pool, self.service.id())
            .await?
            .ok_or_else(|| missing_service(self.service.id()))?;

        log::debug!("Refreshed service {} from database", self.service.id());
        Ok(())
    }

    async fn resolve_provider(&self, provider: ProviderRef) -> Result<Option<Provider>> {
        match provider {
            ProviderRef::Entity(provider) => Ok(Some(provider)),
            ProviderRef::Id(id) => self.fetch_provider(&id).await,
        }
    }

    async fn default_provider(&self, merchant: Option<&Merchant>) -> Result<Option<String>> {
        if let Some(id) = merchant.and_then(|m| m.default_provider_id.clone()) {
            return Ok(Some(id));
        }

        Ok(self
            .service
            .default_provider_id
            .clone()
            .or_else(|| self.config.get_str(self.service.id(), "defaults.provider")))
    }

    async fn resolve_merchant(&self, merchant: MerchantRef) -> Result<Option<Merchant>> {
        match merchant {
            MerchantRef::Entity(merchant) => Ok(Some(merchant)),
            MerchantRef::Id(id) => self.fetch_merchant(&id).await,
        }
    }

    async fn default_merchant(&self, _provider: Option<&Provider>) -> Result<Option<String>> {
        Ok(self
            .service
            .default_merchant_id
            .clone()
            .or_else(|| self.config.get_str(self.service.id(), "defaults.merchant")))
    }

    async fn check(&self, provider: &Provider, merchant: &Merchant) -> Result<bool> {
        // 两个实体都必须属于当前服务
        let service_id = self.service.id();
        if provider.service().id() != service_id || merchant.service().id() != service_id {
            return Ok(false);
        }

        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM merchant_provider
            JOIN merchants ON merchants.id = merchant_provider.merchant_id
            JOIN providers ON providers.id = merchant_provider.provider_id
            WHERE merchant_provider.merchant_id = $1
              AND merchant_provider.provider_id = $2
              AND merchants.service_id = $3
              AND providers.service_id = $4
            "#,
        )
        .bind(merchant.id())
        .bind(provider.id())
        .bind(service_id)
        .bind(service_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    fn resolve_gateway_class(&self, provider: &Provider) -> Result<Option<String>> {
        if let Some(gateway) = testing_gateway(&self.config, &self.service) {
            return Ok(gateway);
        }

        // 提供商记录未设置网关时回退到服务配置
        Ok(provider.gateway.clone().or_else(|| {
            self.config
                .get_str(self.service.id(), &format!("providers.{}.gateway", provider.id()))
        }))
    }
}

/// 数据库驱动工厂
pub struct DatabaseDriverFactory {
    pool: AnyPool,
    config: Arc<ConfigStore>,
}

impl DatabaseDriverFactory {
    pub fn new(pool: AnyPool, config: Arc<ConfigStore>) -> Self {
        Self { pool, config }
    }
}

#[async_trait]
impl DriverFactory for DatabaseDriverFactory {
    async fn services(&self) -> Result<Vec<Service>> {
        let rows = sqlx::query_as::<_, ServiceRow>(
            r#"
            SELECT id,
                   COALESCE(default_provider_id, '') AS default_provider_id,
                   COALESCE(default_merchant_id, '') AS default_merchant_id
            FROM services
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Service::from).collect())
    }

    async fn build(&self, service: Service) -> Result<Box<dyn ServiceDriver>> {
        let driver = DatabaseDriver::new(service, self.pool.clone(), self.config.clone()).await?;
        Ok(Box::new(driver))
    }
}

/// 创建编排数据表 (已存在时跳过)
pub async fn install_schema(pool: &AnyPool) -> Result<()> {
    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS services (
            id VARCHAR(255) PRIMARY KEY,
            default_provider_id VARCHAR(255),
            default_merchant_id VARCHAR(255),
            created_at VARCHAR(64) NOT NULL,
            updated_at VARCHAR(64) NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS providers (
            id VARCHAR(255) PRIMARY KEY,
            service_id VARCHAR(255) NOT NULL REFERENCES services (id),
            gateway VARCHAR(255),
            created_at VARCHAR(64) NOT NULL,
            updated_at VARCHAR(64) NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS merchants (
            id VARCHAR(255) PRIMARY KEY,
            service_id VARCHAR(255) NOT NULL REFERENCES services (id),
            default_provider_id VARCHAR(255),
            created_at VARCHAR(64) NOT NULL,
            updated_at VARCHAR(64) NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS merchant_provider (
            merchant_id VARCHAR(255) NOT NULL REFERENCES merchants (id),
            provider_id VARCHAR(255) NOT NULL REFERENCES providers (id),
            data TEXT,
            created_at VARCHAR(64) NOT NULL,
            updated_at VARCHAR(64) NOT NULL,
            PRIMARY KEY (merchant_id, provider_id)
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    log::info!("Orchestration tables are ready");
    Ok(())
}

async fn fetch_service(pool: &AnyPool, id: &str) -> Result<Option<Service>> {
    let row = sqlx::query_as::<_, ServiceRow>(
        r#"
        SELECT id,
               COALESCE(default_provider_id, '') AS default_provider_id,
               COALESCE(default_merchant_id, '') AS default_merchant_id
        FROM services
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Service::from))
}

fn missing_service(id: &str) -> OrchestrationError {
    OrchestrationError::configuration(format!("The {} service does not exist.", id))
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_link_data(merchant_id: &str, link: &MerchantProviderRow) -> Value {
    match link.data.as_str() {
        "" => Value::Null,
        raw => serde_json::from_str(raw).unwrap_or_else(|e| {
            log::warn!(
                "Ignoring malformed link data for merchant {} / provider {}: {}",
                merchant_id,
                link.provider_id,
                e
            );
            Value::Null
        }),
    }
}
