// ==========================================
// 兽药残留合规核心 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{
    config_keys, default_db_path, ComplianceConfig, ConfigError, ConfigManager, ConfigResult,
    MissingReferencePolicy, MAX_BASE_WITHDRAWAL_DAYS, MAX_HIGH_FREQUENCY_WINDOW_DAYS,
};
