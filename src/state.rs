// 应用状态管理
// 包含服务编排器、数据库连接池、配置信息等全局状态

use std::sync::Arc;

use sqlx::AnyPool;

use orchestra::config::{AppConfig, ConfigStore};
use orchestra::drivers::{ConfigDriverFactory, DatabaseDriverFactory, DriverRegistry};
use orchestra::gateways::{FakeGateway, GatewayRegistry};
use orchestra::services::Orchestrator;

/// 应用全局状态
pub struct AppState {
    /// 服务编排器
    pub orchestrator: Arc<Orchestrator>,
    /// 应用配置
    pub config: AppConfig,
    /// 数据库连接池 (未配置 DATABASE_URL 时为空)
    pub db_pool: Option<AnyPool>,
}

impl AppState {
    /// 创建新的应用状态实例
    ///
    /// # Arguments
    /// * `orchestrator` - 服务编排器
    /// * `config` - 应用配置
    /// * `db_pool` - 数据库连接池
    ///
    /// # Returns
    /// * 应用状态实例
    pub fn new(orchestrator: Arc<Orchestrator>, config: AppConfig, db_pool: Option<AnyPool>) -> Self {
        Self {
            orchestrator,
            config,
            db_pool,
        }
    }

    /// 创建测试用的应用状态 (仅使用配置驱动)
    #[cfg(test)]
    pub fn new_for_test(tree: serde_json::Value) -> Self {
        let store = Arc::new(ConfigStore::new(tree));
        let orchestrator = build_orchestrator(store, None);

        Self::new(Arc::new(orchestrator), AppConfig::default(), None)
    }
}

/// 注册驱动和网关并创建编排器
///
/// 配置驱动始终可用；只有连接了数据库时才注册数据库驱动。
pub fn build_orchestrator(config: Arc<ConfigStore>, db_pool: Option<AnyPool>) -> Orchestrator {
    let mut drivers = DriverRegistry::new();
    drivers.register("config", ConfigDriverFactory::new(config.clone()));
    if let Some(pool) = db_pool {
        drivers.register("database", DatabaseDriverFactory::new(pool, config.clone()));
    }

    let mut gateways = GatewayRegistry::new();
    gateways.register("fake", FakeGateway::factory(config.clone()));

    Orchestrator::new(config, drivers, gateways)
}
