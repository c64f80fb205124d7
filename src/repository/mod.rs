// ==========================================
// 兽药残留合规核心 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 用药记录 / 检测样本 / 告警的持久化
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod alert_repo;
pub mod error;
pub mod lab_sample_repo;
pub mod treatment_repo;

// 重导出核心仓储
pub use alert_repo::AlertRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use lab_sample_repo::{LabSampleRepository, StoredLabSample};
pub use treatment_repo::TreatmentRepository;
