// ==========================================
// 兽药残留合规核心 - MRL 参考限量领域模型
// ==========================================
// 职责: (substance, scope) → 限量值 + 单位
// 红线: limit_value == 0 表示绝对禁用，不是普通阈值
// ==========================================

use crate::domain::types::{LimitSource, ResidueUnit};
use serde::{Deserialize, Serialize};

/// 通配 scope，适用于全部物种/组织
pub const WILDCARD_SCOPE: &str = "All";

// ==========================================
// ReferenceLimit - 参考限量
// ==========================================
// 不可变参考数据，进程启动时加载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLimit {
    pub substance: String,   // 药物名称
    pub scope: String,       // 物种/组织范围（"All" 为通配）
    pub limit_value: f64,    // 限量值（>= 0）
    pub unit: ResidueUnit,   // 单位
}

impl ReferenceLimit {
    pub fn new(substance: &str, scope: &str, limit_value: f64, unit: ResidueUnit) -> Self {
        Self {
            substance: substance.to_string(),
            scope: scope.to_string(),
            limit_value,
            unit,
        }
    }

    /// 限量为 0 即禁用
    pub fn is_ban(&self) -> bool {
        self.limit_value == 0.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.scope.eq_ignore_ascii_case(WILDCARD_SCOPE)
    }
}

// ==========================================
// LimitLookup - 查表结果
// ==========================================
// 禁用与普通阈值在类型上区分，调用方必须显式处理
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitLookup {
    Threshold {
        limit: ReferenceLimit,
        source: LimitSource,
    },
    Banned {
        limit: ReferenceLimit,
        source: LimitSource,
    },
}

impl LimitLookup {
    pub fn from_entry(limit: ReferenceLimit, source: LimitSource) -> Self {
        if limit.is_ban() {
            LimitLookup::Banned { limit, source }
        } else {
            LimitLookup::Threshold { limit, source }
        }
    }

    pub fn limit(&self) -> &ReferenceLimit {
        match self {
            LimitLookup::Threshold { limit, .. } | LimitLookup::Banned { limit, .. } => limit,
        }
    }

    pub fn source(&self) -> LimitSource {
        match self {
            LimitLookup::Threshold { source, .. } | LimitLookup::Banned { source, .. } => *source,
        }
    }

    pub fn is_banned(&self) -> bool {
        matches!(self, LimitLookup::Banned { .. })
    }
}
