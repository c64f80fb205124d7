// ==========================================
// 兽药残留合规核心 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 错误必须以类型返回，不允许吞掉或静默降级
// ==========================================

use thiserror::Error;

/// 合规引擎错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComplianceError {
    /// 字段缺失或格式错误（进入核心前拦截）
    #[error("数据验证失败 (字段 {field}): {message}")]
    Validation { field: String, message: String },

    /// 禁用药登记（硬拒绝，不生成记录）
    #[error("禁用药物: {substance} 禁止用于食品动物")]
    BannedSubstance { substance: String },

    /// 参考限量未命中（调用方必须显式选择默认策略）
    #[error("MRL 参考限量未找到: substance={substance}, scope={scope}")]
    ReferenceNotFound { substance: String, scope: String },

    /// 批量上传超出行数上限（整批拒绝）
    #[error("批量上传超出上限: {rows} 行 > {max} 行")]
    BatchSizeExceeded { rows: usize, max: usize },
}

impl ComplianceError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ComplianceError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result 类型别名
pub type ComplianceResult<T> = Result<T, ComplianceError>;
