// 数据验证工具函数
// 校验服务、提供商、商户标识等管理端输入

use anyhow::Result;
use std::collections::HashMap;

/// 标识最大长度 (与数据表主键列一致)
pub const MAX_IDENTIFIER_LENGTH: usize = 255;

/// 验证实体标识格式
///
/// # Arguments
/// * `id` - 服务、提供商或商户标识
///
/// # Returns
/// * 标识是否有效
pub fn validate_identifier(id: &str) -> Result<()> {
    if id.is_empty() {
        anyhow::bail!("Identifier cannot be empty");
    }

    if id.len() > MAX_IDENTIFIER_LENGTH {
        anyhow::bail!("Identifier too long (max {} characters)", MAX_IDENTIFIER_LENGTH);
    }

    // 只允许字母、数字、下划线、连字符
    let valid_chars = id.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-');

    if !valid_chars {
        anyhow::bail!("Identifier contains invalid characters");
    }

    Ok(())
}

/// 通用输入验证器
pub struct InputValidator {
    errors: HashMap<String, Vec<String>>,
}

impl InputValidator {
    /// 创建新的验证器
    pub fn new() -> Self {
        Self {
            errors: HashMap::new(),
        }
    }

    /// 添加字段验证错误
    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(Vec::new)
            .push(message.to_string());
    }

    /// 验证标识字段
    pub fn validate_identifier_field(&mut self, field: &str, value: &str) {
        if let Err(e) = validate_identifier(value) {
            self.add_error(field, &e.to_string());
        }
    }

    /// 验证可选标识字段 (为空时跳过)
    pub fn validate_optional_identifier_field(&mut self, field: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.validate_identifier_field(field, value);
        }
    }

    /// 检查是否有验证错误
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// 转换为错误结果
    pub fn into_result(self) -> Result<()> {
        if self.has_errors() {
            let mut fields: Vec<_> = self.errors.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));

            let error_msg = fields
                .iter()
                .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
                .collect::<Vec<_>>()
                .join("; ");

            anyhow::bail!("Validation failed: {}", error_msg);
        }

        Ok(())
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}
