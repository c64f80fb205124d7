// ==========================================
// 兽药残留合规核心 - 引擎层
// ==========================================
// 职责: 参考限量查表、合规判定、休药期计算、告警生成
// 红线: Engine 不访问存储；输入为参考数据与历史记录，输出为派生结果
// ==========================================

pub mod advisory;
pub mod alert_generator;
pub mod compliance;
pub mod error;
pub mod mrl_table;
pub mod withdrawal;

// 重导出核心引擎
pub use advisory::{MarketAdvisory, MarketRecommendation, PriceForecast};
pub use alert_generator::{AlertGenerator, AlertLog};
pub use compliance::ComplianceEvaluator;
pub use error::{ComplianceError, ComplianceResult};
pub use mrl_table::MrlReferenceTable;
pub use withdrawal::{label_withdrawal_days, WithdrawalScheduler};
