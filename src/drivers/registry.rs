// 驱动注册表
// 把配置中的驱动键映射到驱动工厂，在进程启动时填充

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::drivers::DriverFactory;

/// 驱动注册表
#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, Arc<dyn DriverFactory>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册驱动工厂，同名键会被覆盖
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        F: DriverFactory + 'static,
    {
        let key = key.into();
        if self.factories.insert(key.clone(), Arc::new(factory)).is_some() {
            log::warn!("Driver `{}` was registered twice, keeping the latest", key);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn DriverFactory>> {
        self.factories.get(key).cloned()
    }

    /// 已注册的驱动键 (排序)
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.keys())
            .finish()
    }
}
