// 命名工具函数
// 把服务、提供商、商户标识转换为可读的显示名称

/// 把标识转换为标题格式
///
/// 以下划线、连字符、空白以及驼峰边界切分单词，并将每个单词首字母大写。
///
/// # Arguments
/// * `id` - 实体标识，例如 `acme_corp` 或 `stripeCheckout`
///
/// # Returns
/// * 显示名称，例如 `Acme Corp` 或 `Stripe Checkout`
pub fn headline(id: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut previous: Option<char> = None;

    for c in id.chars() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous = None;
            continue;
        }

        let camel_boundary = c.is_uppercase()
            && previous.map_or(false, |p| p.is_lowercase() || p.is_ascii_digit());
        if camel_boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }

        current.push(c);
        previous = Some(c);
    }

    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| capitalize(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
