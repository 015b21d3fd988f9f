// 服务层模块
// 包含服务编排入口、请求级服务门面以及管理端目录服务

pub mod catalog_service;
pub mod orchestrator;
pub mod service_facade;

// 重新导出服务
pub use catalog_service::{CatalogService, ConfigCatalog};
pub use orchestrator::Orchestrator;
pub use service_facade::ServiceFacade;
