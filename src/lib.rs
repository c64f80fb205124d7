// ==========================================
// 兽药残留合规核心 - 核心库
// ==========================================
// 职责: MRL 合规判定 / 休药期计算 / 告警生成
// 技术栈: Rust + SQLite
// 系统定位: 合规辅助（结果由调用方展示与存档）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AlertKind, AlertSeverity, ComplianceStatus, LabSampleState, LimitSource, ResidueUnit,
    RiskBand, Route, Species,
};

// 领域实体
pub use domain::{
    Alert, EvaluatedSample, Evaluation, LabSample, ReferenceLimit, TreatmentInput,
    TreatmentRecord, WithdrawalRecommendation, WithdrawalSchedule,
};

// 引擎
pub use engine::{
    AlertGenerator, ComplianceError, ComplianceEvaluator, ComplianceResult, MarketAdvisory,
    MrlReferenceTable, WithdrawalScheduler,
};

// API
pub use api::{ApiError, ApiResult, ComplianceApi, LabBatchReport, SessionContext, UserRole};

// 配置
pub use config::{ComplianceConfig, ConfigManager, MissingReferencePolicy};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "VetIntel MRL Compliance";
