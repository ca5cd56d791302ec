// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文（默认）、英文、西班牙文
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 支持的语言
pub const SUPPORTED_LOCALES: [&str; 3] = ["zh-CN", "en", "es"];

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言（不支持的语言代码忽略并返回 false）
///
/// # 参数
/// - locale: 语言代码（"zh-CN" / "en" / "es"）
pub fn set_locale(locale: &str) -> bool {
    if !SUPPORTED_LOCALES.contains(&locale) {
        tracing::warn!(locale, "不支持的语言，保持当前设置");
        return false;
    }
    rust_i18n::set_locale(locale);
    true
}

/// 翻译消息（无参数）
///
/// # 示例
/// ```no_run
/// use exam_balancer::i18n::t;
/// let header = t("export.header_from");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息（带参数）
///
/// # 示例
/// ```no_run
/// use exam_balancer::i18n::t_with_args;
/// let msg = t_with_args("summary.mean", &[("mean", "10")]);
/// ```
pub fn t_with_args<V: AsRef<str>>(key: &str, args: &[(&str, V)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v.as_ref());
    }
    result
}
