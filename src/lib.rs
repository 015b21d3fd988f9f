// 服务编排库
// 按配置为逻辑服务选择提供商、商户和网关，并把调用转发给网关

pub mod config;
pub mod drivers;
pub mod error;
pub mod gateways;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{AppConfig, ConfigStore};
pub use error::{OrchestrationError, Result};
pub use services::{Orchestrator, ServiceFacade};
