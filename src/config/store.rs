// 编排配置存储
// 分层键值配置，按 服务命名空间 -> 全局命名空间 -> 默认值 的顺序回退

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

/// 全局配置命名空间
pub const GLOBAL_NAMESPACE: &str = "orchestration";

/// 编排配置存储
///
/// 启动时构造一次，之后以 `Arc<ConfigStore>` 的形式传给驱动和服务门面。
/// 路径使用 `.` 分隔，JSON `null` 视同未配置。
#[derive(Debug, Clone)]
pub struct ConfigStore {
    root: Value,
}

impl ConfigStore {
    /// 基于配置树创建存储，并合并包内默认配置 (用户配置优先)
    pub fn new(tree: Value) -> Self {
        let mut root = match tree {
            Value::Object(_) => tree,
            _ => Value::Object(Map::new()),
        };
        merge_defaults(&mut root, package_defaults());

        Self { root }
    }

    /// 仅包含包内默认配置的存储
    pub fn empty() -> Self {
        Self::new(Value::Object(Map::new()))
    }

    /// 从JSON文件加载配置树
    ///
    /// # Arguments
    /// * `path` - 配置文件路径
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read orchestration config {}", path.display()))?;
        let tree: Value = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON in orchestration config {}", path.display()))?;

        if !tree.is_object() {
            anyhow::bail!("Orchestration config {} must be a JSON object", path.display());
        }

        Ok(Self::new(tree))
    }

    /// 应用全局测试模式覆盖 (来自 SERVICE_TEST_MODE)
    pub fn with_test_mode(mut self, test_mode: Option<bool>) -> Self {
        if let Some(enabled) = test_mode {
            self.set(&format!("{}.test_mode", GLOBAL_NAMESPACE), Value::Bool(enabled));
        }
        self
    }

    /// 按绝对路径读取配置值
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            current = current.as_object()?.get(segment)?;
        }

        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    /// 按绝对路径写入配置值，必要时创建中间节点
    pub fn set(&mut self, path: &str, value: Value) {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in parents {
            current = ensure_object(current)
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        ensure_object(current).insert(last.to_string(), value);
    }

    /// 获取作用域对应的配置命名空间
    ///
    /// 若 `orchestration.services.<scope>.config` 有值则使用该值，否则使用作用域本身。
    pub fn namespace(&self, scope: &str) -> String {
        self.lookup(&format!("{}.services.{}.config", GLOBAL_NAMESPACE, scope))
            .and_then(value_to_string)
            .unwrap_or_else(|| scope.to_string())
    }

    /// 读取作用域配置，未配置时回退到全局命名空间
    ///
    /// # Arguments
    /// * `scope` - 作用域键 (通常为服务标识)
    /// * `path` - 相对路径，例如 `defaults.provider`
    pub fn get(&self, scope: &str, path: &str) -> Option<&Value> {
        let namespace = self.namespace(scope);

        self.lookup(&format!("{}.{}", namespace, path))
            .or_else(|| self.get_global(path))
    }

    /// 读取作用域配置，全部缺失时返回默认值
    pub fn get_or(&self, scope: &str, path: &str, default: Value) -> Value {
        self.get(scope, path).cloned().unwrap_or(default)
    }

    /// 读取字符串配置 (数字标识会被转换为字符串)
    pub fn get_str(&self, scope: &str, path: &str) -> Option<String> {
        self.get(scope, path).and_then(value_to_string)
    }

    /// 读取布尔配置
    pub fn get_bool(&self, scope: &str, path: &str, default: bool) -> bool {
        match self.get(scope, path) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().map_or(default, |n| n != 0),
            Some(Value::String(s)) => match s.as_str() {
                "1" | "true" => true,
                "0" | "false" | "" => false,
                _ => default,
            },
            _ => default,
        }
    }

    /// 读取全局命名空间配置
    pub fn get_global(&self, path: &str) -> Option<&Value> {
        self.lookup(&format!("{}.{}", GLOBAL_NAMESPACE, path))
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::empty()
    }
}

/// 包内默认配置
fn package_defaults() -> Value {
    json!({
        GLOBAL_NAMESPACE: {
            "defaults": {
                "driver": "config",
            },
            "drivers": {
                "config": "config",
                "database": "database",
            },
            "test_mode": false,
        }
    })
}

/// 把默认配置合并到目标树中，已有的键保持不变
fn merge_defaults(target: &mut Value, defaults: Value) {
    if let (Value::Object(target), Value::Object(defaults)) = (target, defaults) {
        for (key, value) in defaults {
            match target.get_mut(&key) {
                Some(existing) => merge_defaults(existing, value),
                None => {
                    target.insert(key, value);
                }
            }
        }
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
