// ==========================================
// 兽药残留合规核心 - 导入层
// ==========================================
// 职责: 外部检测结果文件解析 + 输入字段校验
// 支持: CSV
// ==========================================

pub mod error;
pub mod lab_csv;
pub mod validator;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use lab_csv::LabCsvParser;
pub use validator::{validate_lab_sample, validate_treatment};
