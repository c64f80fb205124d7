// ==========================================
// 兽药残留合规核心 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::domain::types::ResidueUnit;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

// ==========================================
// 配置错误
// ==========================================
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置读取失败: {0}")]
    ReadError(String),

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ValueError {
        key: String,
        value: String,
        message: String,
    },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),
}

impl From<rusqlite::Error> for ConfigError {
    fn from(err: rusqlite::Error) -> Self {
        ConfigError::ReadError(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// 参考限量缺失策略
// ==========================================
// 未命中参考表时的处理方式必须显式配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum MissingReferencePolicy {
    /// 返回 ReferenceNotFound，由调用方处理（默认）
    Reject,
    /// 使用配置的默认限量，结果标记为 PolicyDefault
    DefaultLimit { value: f64, unit: ResidueUnit },
}

/// 基准休药天数上限
pub const MAX_BASE_WITHDRAWAL_DAYS: u32 = 3_650;

/// 高频用药窗口上限（天）
pub const MAX_HIGH_FREQUENCY_WINDOW_DAYS: i64 = 3_650;

// ==========================================
// ComplianceConfig - 类型化配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    pub missing_reference_policy: MissingReferencePolicy,
    pub default_sample_scope: String,
    pub max_batch_rows: usize,
    pub default_base_withdrawal_days: u32,
    pub withdrawal_confidence: f64,
    pub high_frequency_threshold: usize,
    pub high_frequency_window_days: i64,
    pub alert_locale: String,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            missing_reference_policy: MissingReferencePolicy::Reject,
            default_sample_scope: "Milk".to_string(),
            max_batch_rows: 1000,
            default_base_withdrawal_days: 14,
            withdrawal_confidence: 0.85,
            high_frequency_threshold: 10,
            high_frequency_window_days: 30,
            alert_locale: crate::i18n::DEFAULT_LOCALE.to_string(),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 读取 global scope 全部配置
    fn read_global(&self) -> ConfigResult<HashMap<String, String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global'")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
            ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// 加载类型化配置
    ///
    /// 未配置的键取默认值；未知键忽略；格式错误返回 ValueError
    pub fn load(&self) -> ConfigResult<ComplianceConfig> {
        let raw = self.read_global()?;
        let config = ComplianceConfig::from_map(&raw)?;
        debug!(?config, "配置加载完成");
        Ok(config)
    }
}

impl ComplianceConfig {
    /// 从 key-value 映射构建配置
    pub fn from_map(raw: &HashMap<String, String>) -> ConfigResult<Self> {
        let defaults = ComplianceConfig::default();

        let policy_name = raw
            .get(config_keys::MISSING_REFERENCE_POLICY)
            .map(|s| s.trim().to_lowercase())
            .unwrap_or_else(|| "reject".to_string());

        let missing_reference_policy = match policy_name.as_str() {
            "reject" => MissingReferencePolicy::Reject,
            "default_limit" => {
                let value: f64 = parse_or(raw, config_keys::DEFAULT_LIMIT_VALUE, 0.1)?;
                if !value.is_finite() || value <= 0.0 {
                    return Err(value_error(
                        config_keys::DEFAULT_LIMIT_VALUE,
                        &value.to_string(),
                        "默认限量必须为正数",
                    ));
                }
                let unit_raw = raw
                    .get(config_keys::DEFAULT_LIMIT_UNIT)
                    .map(String::as_str)
                    .unwrap_or("mg/kg");
                let unit = unit_raw
                    .parse::<ResidueUnit>()
                    .map_err(|e| value_error(config_keys::DEFAULT_LIMIT_UNIT, unit_raw, &e))?;
                MissingReferencePolicy::DefaultLimit { value, unit }
            }
            other => {
                return Err(value_error(
                    config_keys::MISSING_REFERENCE_POLICY,
                    other,
                    "仅支持 reject / default_limit",
                ))
            }
        };

        let default_sample_scope = raw
            .get(config_keys::DEFAULT_SAMPLE_SCOPE)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.default_sample_scope);

        let max_batch_rows = parse_or(raw, config_keys::MAX_BATCH_ROWS, defaults.max_batch_rows)?;
        let default_base_withdrawal_days = parse_or(
            raw,
            config_keys::DEFAULT_BASE_WITHDRAWAL_DAYS,
            defaults.default_base_withdrawal_days,
        )?;
        let withdrawal_confidence = parse_or(
            raw,
            config_keys::WITHDRAWAL_CONFIDENCE,
            defaults.withdrawal_confidence,
        )?;
        let high_frequency_threshold = parse_or(
            raw,
            config_keys::HIGH_FREQUENCY_THRESHOLD,
            defaults.high_frequency_threshold,
        )?;
        let high_frequency_window_days = parse_or(
            raw,
            config_keys::HIGH_FREQUENCY_WINDOW_DAYS,
            defaults.high_frequency_window_days,
        )?;
        let alert_locale = raw
            .get(config_keys::ALERT_LOCALE)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.alert_locale);

        let config = Self {
            missing_reference_policy,
            default_sample_scope,
            max_batch_rows,
            default_base_withdrawal_days,
            withdrawal_confidence,
            high_frequency_threshold,
            high_frequency_window_days,
            alert_locale,
        };
        config.validate()?;
        Ok(config)
    }

    /// 取值范围校验
    ///
    /// 休药基准天数与告警窗口参与日期运算，上限保证不溢出
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_base_withdrawal_days > MAX_BASE_WITHDRAWAL_DAYS {
            return Err(value_error(
                config_keys::DEFAULT_BASE_WITHDRAWAL_DAYS,
                &self.default_base_withdrawal_days.to_string(),
                &format!("基准休药天数不能超过 {}", MAX_BASE_WITHDRAWAL_DAYS),
            ));
        }
        if self.high_frequency_window_days <= 0
            || self.high_frequency_window_days > MAX_HIGH_FREQUENCY_WINDOW_DAYS
        {
            return Err(value_error(
                config_keys::HIGH_FREQUENCY_WINDOW_DAYS,
                &self.high_frequency_window_days.to_string(),
                &format!("窗口天数必须在 1..={} 之间", MAX_HIGH_FREQUENCY_WINDOW_DAYS),
            ));
        }
        if !(0.0..=1.0).contains(&self.withdrawal_confidence) {
            return Err(value_error(
                config_keys::WITHDRAWAL_CONFIDENCE,
                &self.withdrawal_confidence.to_string(),
                "置信度必须在 0..=1 之间",
            ));
        }
        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(
    raw: &HashMap<String, String>,
    key: &str,
    default: T,
) -> ConfigResult<T> {
    match raw.get(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| value_error(key, value, "无法解析")),
    }
}

fn value_error(key: &str, value: &str, message: &str) -> ConfigError {
    ConfigError::ValueError {
        key: key.to_string(),
        value: value.to_string(),
        message: message.to_string(),
    }
}

/// 默认数据库路径
///
/// 优先读取环境变量 VETINTEL_MRL_DB_PATH，其次用户数据目录
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var("VETINTEL_MRL_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./vetintel_mrl.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("vetintel-mrl");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("vetintel_mrl.db");
        }
    }
    path.to_string_lossy().to_string()
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // MRL 参考限量
    pub const MISSING_REFERENCE_POLICY: &str = "mrl.missing_reference_policy";
    pub const DEFAULT_LIMIT_VALUE: &str = "mrl.default_limit_value";
    pub const DEFAULT_LIMIT_UNIT: &str = "mrl.default_limit_unit";

    // 检测上传
    pub const DEFAULT_SAMPLE_SCOPE: &str = "lab.default_scope";
    pub const MAX_BATCH_ROWS: &str = "lab.max_batch_rows";

    // 休药期
    pub const DEFAULT_BASE_WITHDRAWAL_DAYS: &str = "withdrawal.default_base_days";
    pub const WITHDRAWAL_CONFIDENCE: &str = "withdrawal.confidence";

    // 告警
    pub const HIGH_FREQUENCY_THRESHOLD: &str = "alert.high_frequency_threshold";
    pub const HIGH_FREQUENCY_WINDOW_DAYS: &str = "alert.high_frequency_window_days";
    pub const ALERT_LOCALE: &str = "alert.locale";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_load_defaults_from_empty_table() {
        let manager = setup_manager();
        let config = manager.load().unwrap();
        assert_eq!(config, ComplianceConfig::default());
        assert_eq!(config.missing_reference_policy, MissingReferencePolicy::Reject);
    }

    #[test]
    fn test_default_limit_policy_is_explicit() {
        let manager = setup_manager();
        manager
            .set_value(config_keys::MISSING_REFERENCE_POLICY, "default_limit")
            .unwrap();
        manager
            .set_value(config_keys::DEFAULT_LIMIT_VALUE, "0.1")
            .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(
            config.missing_reference_policy,
            MissingReferencePolicy::DefaultLimit {
                value: 0.1,
                unit: ResidueUnit::MgPerKg
            }
        );
    }

    #[test]
    fn test_set_value_overwrites() {
        let manager = setup_manager();
        manager.set_value(config_keys::MAX_BATCH_ROWS, "500").unwrap();
        manager.set_value(config_keys::MAX_BATCH_ROWS, "200").unwrap();
        assert_eq!(manager.load().unwrap().max_batch_rows, 200);
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        let manager = setup_manager();
        manager
            .set_value(config_keys::HIGH_FREQUENCY_THRESHOLD, "ten")
            .unwrap();
        assert!(matches!(
            manager.load(),
            Err(ConfigError::ValueError { .. })
        ));

        let mut raw = HashMap::new();
        raw.insert(
            config_keys::MISSING_REFERENCE_POLICY.to_string(),
            "ignore".to_string(),
        );
        assert!(ComplianceConfig::from_map(&raw).is_err());
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let cases = [
            (config_keys::DEFAULT_BASE_WITHDRAWAL_DAYS, "40000000"),
            (config_keys::HIGH_FREQUENCY_WINDOW_DAYS, "200000000"),
            (config_keys::HIGH_FREQUENCY_WINDOW_DAYS, "0"),
            (config_keys::WITHDRAWAL_CONFIDENCE, "1.5"),
        ];
        for (key, value) in cases {
            let mut raw = HashMap::new();
            raw.insert(key.to_string(), value.to_string());
            assert!(
                matches!(
                    ComplianceConfig::from_map(&raw),
                    Err(ConfigError::ValueError { .. })
                ),
                "{}={} should be rejected",
                key,
                value
            );
        }

        let mut raw = HashMap::new();
        raw.insert(
            config_keys::DEFAULT_BASE_WITHDRAWAL_DAYS.to_string(),
            MAX_BASE_WITHDRAWAL_DAYS.to_string(),
        );
        raw.insert(
            config_keys::HIGH_FREQUENCY_WINDOW_DAYS.to_string(),
            MAX_HIGH_FREQUENCY_WINDOW_DAYS.to_string(),
        );
        assert!(ComplianceConfig::from_map(&raw).is_ok());
    }
}
