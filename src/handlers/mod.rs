// API处理器模块
// 包含所有HTTP请求处理逻辑

pub mod health_handlers;
pub mod service_handlers;

// 重新导出处理器
pub use health_handlers::*;
pub use service_handlers::*;
