// 网关注册表
// 把配置中的网关键映射到构造函数，在进程启动时填充

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::gateways::Gateway;
use crate::models::{Merchant, Provider};

/// 网关构造函数
pub type GatewayFactory = Arc<dyn Fn(&Provider, &Merchant) -> Box<dyn Gateway> + Send + Sync>;

/// 网关注册表
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    factories: HashMap<String, GatewayFactory>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册网关构造函数，同名键会被覆盖
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&Provider, &Merchant) -> Box<dyn Gateway> + Send + Sync + 'static,
    {
        let key = key.into();
        if self.factories.insert(key.clone(), Arc::new(factory)).is_some() {
            log::warn!("Gateway `{}` was registered twice, keeping the latest", key);
        }
        self
    }

    /// 已注册的网关键 (排序)
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// 为提供商和商户构造网关实例
    pub fn build(&self, key: &str, provider: &Provider, merchant: &Merchant) -> Option<Box<dyn Gateway>> {
        self.factories.get(key).map(|factory| factory(provider, merchant))
    }
}

impl fmt::Debug for GatewayRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayRegistry")
            .field("gateways", &self.keys())
            .finish()
    }
}
