// 工具函数模块
// 包含命名转换、输入验证等通用工具

pub mod naming;
pub mod validation;

// 重新导出常用函数
pub use naming::*;
pub use validation::*;
