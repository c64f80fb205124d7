// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持英文（默认）、印地语、泰米尔语
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// 红线: 核心逻辑只使用 MessageKey 枚举，字符串 key 不出本模块；
//       不修改全局 locale，由 Localizer 实例持有 locale
// ==========================================

use std::borrow::Cow;
use tracing::warn;

/// 默认语言
pub const DEFAULT_LOCALE: &str = "en";

// ==========================================
// MessageKey - 消息键
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    LabFailure,
    LabFailureBanned,
    HighFrequency,
    ExtendedWithdrawal,
    WithdrawalRationale,
    MarketHold,
    MarketSell,
    MarketMonitor,
}

impl MessageKey {
    /// 对应 locales/*.yml 中的条目
    fn catalog_key(&self) -> &'static str {
        match self {
            MessageKey::LabFailure => "alert.lab_failure",
            MessageKey::LabFailureBanned => "alert.lab_failure_banned",
            MessageKey::HighFrequency => "alert.high_frequency",
            MessageKey::ExtendedWithdrawal => "alert.extended_withdrawal",
            MessageKey::WithdrawalRationale => "withdrawal.rationale",
            MessageKey::MarketHold => "market.hold",
            MessageKey::MarketSell => "market.sell",
            MessageKey::MarketMonitor => "market.monitor",
        }
    }
}

// ==========================================
// Localizer Trait
// ==========================================
// 注入到引擎中；测试可替换为固定实现
pub trait Localizer: Send + Sync {
    /// 当前语言代码
    fn locale(&self) -> &str;

    /// 渲染消息，args 中的 (name, value) 替换 %{name}
    fn render(&self, key: MessageKey, args: &[(&str, String)]) -> String;
}

// ==========================================
// RustI18nLocalizer - 基于 rust-i18n 目录的实现
// ==========================================
#[derive(Debug, Clone)]
pub struct RustI18nLocalizer {
    locale: String,
}

impl RustI18nLocalizer {
    /// 创建本地化器
    ///
    /// 不支持的语言回退到 DEFAULT_LOCALE
    pub fn new(locale: &str) -> Self {
        let requested = locale.trim();
        let supported = available_locales().iter().any(|l| *l == requested);
        if !supported {
            warn!(locale = requested, "不支持的语言，回退到 {}", DEFAULT_LOCALE);
        }

        Self {
            locale: if supported {
                requested.to_string()
            } else {
                DEFAULT_LOCALE.to_string()
            },
        }
    }
}

impl Default for RustI18nLocalizer {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

impl Localizer for RustI18nLocalizer {
    fn locale(&self) -> &str {
        &self.locale
    }

    fn render(&self, key: MessageKey, args: &[(&str, String)]) -> String {
        let template: Cow<'_, str> =
            rust_i18n::t!(key.catalog_key(), locale = self.locale.as_str());
        interpolate(&template, args)
    }
}

/// 已加载的语言列表
pub fn available_locales() -> Vec<&'static str> {
    rust_i18n::available_locales!()
}

/// 替换 %{name} 占位符
fn interpolate(template: &str, args: &[(&str, String)]) -> String {
    let mut result = template.to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}
