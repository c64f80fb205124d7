// ==========================================
// 兽药残留合规核心 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供展示层 / 命令行调用
// ==========================================

pub mod compliance_api;
pub mod error;
pub mod session;

// 重导出核心类型
pub use compliance_api::{
    ComplianceApi, LabBatchReport, LabResultView, TreatmentOutcome, UnresolvedSample,
};
pub use error::{ApiError, ApiResult};
pub use session::{SessionContext, UserRole};
