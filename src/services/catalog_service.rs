// 服务目录管理
// 负责登记服务、提供商、商户及其关联和默认值 (管理端写操作，不属于解析核心)

use anyhow::{Context, Result};
use serde_json::{json, Value};
use sqlx::AnyPool;

use crate::config::{ConfigStore, GLOBAL_NAMESPACE};
use crate::models::{Merchant, MerchantProvider, Provider, Service};
use crate::utils::InputValidator;

/// 数据库服务目录
pub struct CatalogService {
    pool: AnyPool,
}

impl CatalogService {
    /// 创建新的目录服务实例
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// 登记新服务
    ///
    /// # Arguments
    /// * `id` - 服务标识
    ///
    /// # Returns
    /// * 新登记的服务
    pub async fn create_service(&self, id: &str) -> Result<Service> {
        let mut validator = InputValidator::new();
        validator.validate_identifier_field("service_id", id);
        validator.into_result()?;

        let now = timestamp();
        sqlx::query(
            r#"
            INSERT INTO services (id, default_provider_id, default_merchant_id, created_at, updated_at)
            VALUES ($1, NULL, NULL, $2, $3)
            "#,
        )
        .bind(id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to create service")?;

        log::info!("Created service: {}", id);
        Ok(Service::new(id))
    }

    /// 登记服务下的提供商
    ///
    /// # Arguments
    /// * `service` - 所属服务
    /// * `id` - 提供商标识
    /// * `gateway` - 网关注册键 (可选)
    pub async fn create_provider(
        &self,
        service: &Service,
        id: &str,
        gateway: Option<&str>,
    ) -> Result<Provider> {
        let mut validator = InputValidator::new();
        validator.validate_identifier_field("provider_id", id);
        validator.validate_optional_identifier_field("gateway", gateway);
        validator.into_result()?;

        let now = timestamp();
        sqlx::query(
            r#"
            INSERT INTO providers (id, service_id, gateway, created_at, updated_at)
            VALUES ($1, $2, NULLIF($3, ''), $4, $5)
            "#,
        )
        .bind(id)
        .bind(service.id())
        .bind(gateway.unwrap_or_default())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to create provider")?;

        log::info!("Created provider {} for service {}", id, service.id());
        Ok(Provider::new(service.clone(), id, gateway.map(str::to_string)))
    }

    /// 登记服务下的商户
    pub async fn create_merchant(&self, service: &Service, id: &str) -> Result<Merchant> {
        let mut validator = InputValidator::new();
        validator.validate_identifier_field("merchant_id", id);
        validator.into_result()?;

        let now = timestamp();
        sqlx::query(
            r#"
            INSERT INTO merchants (id, service_id, default_provider_id, created_at, updated_at)
            VALUES ($1, $2, NULL, $3, $4)
            "#,
        )
        .bind(id)
        .bind(service.id())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to create merchant")?;

        log::info!("Created merchant {} for service {}", id, service.id());
        Ok(Merchant::new(service.clone(), id))
    }

    /// 关联商户与提供商，已关联时更新关联数据
    ///
    /// # Arguments
    /// * `merchant` - 商户
    /// * `provider` - 提供商 (必须属于同一服务)
    /// * `data` - 关联数据
    pub async fn link_merchant_to_provider(
        &self,
        merchant: &Merchant,
        provider: &Provider,
        data: Value,
    ) -> Result<()> {
        ensure_same_service(merchant, provider)?;

        let now = timestamp();
        sqlx::query(
            r#"
            INSERT INTO merchant_provider (merchant_id, provider_id, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (merchant_id, provider_id)
            DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
            "#,
        )
        .bind(merchant.id())
        .bind(provider.id())
        .bind(data.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("Failed to link merchant to provider")?;

        log::info!("Linked merchant {} to provider {}", merchant.id(), provider.id());
        Ok(())
    }

    /// 设置服务默认商户和默认提供商
    ///
    /// 未指定提供商但指定了商户时，使用该商户自己的默认提供商。
    pub async fn set_service_defaults(
        &self,
        service: &Service,
        merchant: Option<&Merchant>,
        provider: Option<&Provider>,
    ) -> Result<Service> {
        let merchant_id = merchant.map(|m| m.id.clone());
        let provider_id = provider
            .map(|p| p.id.clone())
            .or_else(|| merchant.and_then(|m| m.default_provider_id.clone()));

        let rows_affected = sqlx::query(
            r#"
            UPDATE services
            SET default_merchant_id = NULLIF($1, ''),
                default_provider_id = NULLIF($2, ''),
                updated_at = $3
            WHERE id = $4
            "#,
        )
        .bind(merchant_id.as_deref().unwrap_or_default())
        .bind(provider_id.as_deref().unwrap_or_default())
        .bind(timestamp())
        .bind(service.id())
        .execute(&self.pool)
        .await
        .context("Failed to update service defaults")?
        .rows_affected();

        if rows_affected == 0 {
            anyhow::bail!("Service {} not found", service.id());
        }

        log::info!("Updated defaults for service: {}", service.id());

        Ok(Service {
            id: service.id.clone(),
            default_provider_id: provider_id,
            default_merchant_id: merchant_id,
        })
    }

    /// 设置商户自己的默认提供商
    pub async fn set_merchant_default_provider(
        &self,
        merchant: &Merchant,
        provider: Option<&Provider>,
    ) -> Result<Merchant> {
        if let Some(provider) = provider {
            ensure_same_service(merchant, provider)?;
        }

        let rows_affected = sqlx::query(
            r#"
            UPDATE merchants
            SET default_provider_id = NULLIF($1, ''), updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(provider.map(Provider::id).unwrap_or_default())
        .bind(timestamp())
        .bind(merchant.id())
        .execute(&self.pool)
        .await
        .context("Failed to update merchant default provider")?
        .rows_affected();

        if rows_affected == 0 {
            anyhow::bail!("Merchant {} not found", merchant.id());
        }

        let mut merchant = merchant.clone();
        merchant.default_provider_id = provider.map(|p| p.id.clone());
        Ok(merchant)
    }
}

/// 配置服务目录
///
/// 在启动阶段 (配置存储放入 `Arc` 之前) 登记服务、提供商和商户。
pub struct ConfigCatalog<'a> {
    config: &'a mut ConfigStore,
}

impl<'a> ConfigCatalog<'a> {
    pub fn new(config: &'a mut ConfigStore) -> Self {
        Self { config }
    }

    /// 登记新服务，服务配置使用与标识同名的命名空间
    pub fn create_service(&mut self, id: &str) -> Result<Service> {
        let mut validator = InputValidator::new();
        validator.validate_identifier_field("service_id", id);
        validator.into_result()?;

        self.config.set(
            &format!("{}.services.{}", GLOBAL_NAMESPACE, id),
            json!({ "config": id }),
        );

        Ok(Service::new(id))
    }

    pub fn create_provider(
        &mut self,
        service: &Service,
        id: &str,
        gateway: Option<&str>,
    ) -> Result<Provider> {
        let mut validator = InputValidator::new();
        validator.validate_identifier_field("provider_id", id);
        validator.validate_optional_identifier_field("gateway", gateway);
        validator.into_result()?;

        let path = format!("{}.providers.{}", self.namespace(service), id);
        self.config.set(&path, json!({ "gateway": gateway }));

        Ok(Provider::new(service.clone(), id, gateway.map(str::to_string)))
    }

    pub fn create_merchant(&mut self, service: &Service, id: &str) -> Result<Merchant> {
        let mut validator = InputValidator::new();
        validator.validate_identifier_field("merchant_id", id);
        validator.into_result()?;

        let path = format!("{}.merchants.{}", self.namespace(service), id);
        self.config.set(&path, json!({ "providers": {} }));

        Ok(Merchant::new(service.clone(), id))
    }

    pub fn link_merchant_to_provider(
        &mut self,
        merchant: &Merchant,
        provider: &Provider,
        data: Value,
    ) -> Result<Merchant> {
        ensure_same_service(merchant, provider)?;

        let path = format!(
            "{}.merchants.{}.providers.{}",
            self.namespace(merchant.service()),
            merchant.id(),
            provider.id()
        );
        let data = if data.is_null() { json!({}) } else { data };
        self.config.set(&path, data.clone());

        let mut merchant = merchant.clone();
        merchant.providers.retain(|link| link.provider_id != provider.id);
        merchant.providers.push(MerchantProvider {
            provider_id: provider.id.clone(),
            data,
        });
        Ok(merchant)
    }

    /// 设置服务默认商户和默认提供商
    ///
    /// 未指定提供商但指定了商户时，使用该商户的默认提供商或第一个关联的提供商。
    pub fn set_service_defaults(
        &mut self,
        service: &Service,
        merchant: Option<&Merchant>,
        provider: Option<&Provider>,
    ) -> Result<Service> {
        let merchant_id = merchant.map(|m| m.id.clone());
        let provider_id = provider.map(|p| p.id.clone()).or_else(|| {
            merchant.and_then(|m| {
                m.default_provider_id
                    .clone()
                    .or_else(|| m.providers.first().map(|link| link.provider_id.clone()))
            })
        });

        let namespace = self.namespace(service);
        self.config
            .set(&format!("{}.defaults.merchant", namespace), json!(merchant_id));
        self.config
            .set(&format!("{}.defaults.provider", namespace), json!(provider_id));

        Ok(Service {
            id: service.id.clone(),
            default_provider_id: provider_id,
            default_merchant_id: merchant_id,
        })
    }

    pub fn set_merchant_default_provider(
        &mut self,
        merchant: &Merchant,
        provider: Option<&Provider>,
    ) -> Result<Merchant> {
        if let Some(provider) = provider {
            ensure_same_service(merchant, provider)?;
        }

        let path = format!(
            "{}.merchants.{}.default_provider",
            self.namespace(merchant.service()),
            merchant.id()
        );
        self.config.set(&path, json!(provider.map(Provider::id)));

        let mut merchant = merchant.clone();
        merchant.default_provider_id = provider.map(|p| p.id.clone());
        Ok(merchant)
    }

    /// 设置服务自己的驱动
    pub fn set_service_driver(&mut self, service: &Service, driver: &str) {
        let path = format!("{}.defaults.driver", self.namespace(service));
        self.config.set(&path, json!(driver));
    }

    fn namespace(&self, service: &Service) -> String {
        self.config.namespace(service.id())
    }
}

/// 跨服务关联是无效的
fn ensure_same_service(merchant: &Merchant, provider: &Provider) -> Result<()> {
    if merchant.service().id() != provider.service().id() {
        anyhow::bail!(
            "Merchant {} ({}) and provider {} ({}) belong to different services",
            merchant.id(),
            merchant.service().id(),
            provider.id(),
            provider.service().id()
        );
    }
    Ok(())
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
