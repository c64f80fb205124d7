// ==========================================
// 兽药残留合规核心 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod alert;
pub mod lab;
pub mod reference;
pub mod treatment;
pub mod types;
pub mod withdrawal;

// 重导出核心类型
pub use alert::Alert;
pub use lab::{EvaluatedSample, Evaluation, LabSample};
pub use reference::{LimitLookup, ReferenceLimit, WILDCARD_SCOPE};
pub use treatment::{TreatmentInput, TreatmentRecord};
pub use types::{
    AlertKind, AlertSeverity, ComplianceStatus, LabSampleState, LimitSource, ResidueUnit,
    RiskBand, Route, Species,
};
pub use withdrawal::{WithdrawalRecommendation, WithdrawalSchedule};
