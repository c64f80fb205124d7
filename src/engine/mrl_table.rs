// ==========================================
// 兽药残留合规核心 - MRL 参考限量表
// ==========================================
// 职责: (substance, scope) → ReferenceLimit
// 查找顺序: 精确 scope → "All" 通配 → ReferenceNotFound
// 红线: 未命中不等于无限量；限量为 0 单独返回 Banned
// ==========================================

use crate::domain::reference::{LimitLookup, ReferenceLimit, WILDCARD_SCOPE};
use crate::domain::types::{LimitSource, ResidueUnit};
use crate::engine::error::{ComplianceError, ComplianceResult};
use std::collections::HashMap;

/// 默认参考数据 (µg/kg)
const DEFAULT_LIMITS_UG_PER_KG: &[(&str, &str, f64)] = &[
    ("Oxytetracycline", "Milk", 100.0),
    ("Oxytetracycline", "Meat", 200.0),
    ("Penicillin", "Milk", 4.0),
    ("Penicillin", "Meat", 50.0),
    ("Penicillin G", "Milk", 4.0),
    ("Penicillin G", "Meat", 50.0),
    ("Amoxicillin", "Milk", 4.0),
    ("Amoxicillin", "Meat", 50.0),
    ("Streptomycin", "Milk", 200.0),
    ("Streptomycin", "Meat", 500.0),
    ("Enrofloxacin", "Milk", 100.0),
    ("Enrofloxacin", "Meat", 100.0),
    ("Tylosin", "Milk", 50.0),
    ("Tylosin", "Meat", 100.0),
    ("Gentamicin", "Milk", 100.0),
    ("Gentamicin", "Meat", 100.0),
    ("Chloramphenicol", WILDCARD_SCOPE, 0.0),
];

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

// ==========================================
// MrlReferenceTable - 参考限量表
// ==========================================
// 不可变；构建后只读
#[derive(Debug, Clone)]
pub struct MrlReferenceTable {
    entries: HashMap<(String, String), ReferenceLimit>,
}

impl MrlReferenceTable {
    /// 从条目构建参考表
    ///
    /// # 校验
    /// - substance / scope 非空
    /// - limit_value 有限且 >= 0
    /// - 同一 (substance, scope) 至多一条
    pub fn new(limits: Vec<ReferenceLimit>) -> ComplianceResult<Self> {
        let mut entries = HashMap::with_capacity(limits.len());

        for limit in limits {
            if limit.substance.trim().is_empty() {
                return Err(ComplianceError::validation("substance", "药物名称为空"));
            }
            if limit.scope.trim().is_empty() {
                return Err(ComplianceError::validation("scope", "范围为空"));
            }
            if !limit.limit_value.is_finite() || limit.limit_value < 0.0 {
                return Err(ComplianceError::validation(
                    "limit_value",
                    format!("{} 的限量非法: {}", limit.substance, limit.limit_value),
                ));
            }

            let key = (normalize(&limit.substance), normalize(&limit.scope));
            if entries.contains_key(&key) {
                return Err(ComplianceError::validation(
                    "scope",
                    format!("重复的参考限量: ({}, {})", limit.substance, limit.scope),
                ));
            }
            entries.insert(key, limit);
        }

        Ok(Self { entries })
    }

    /// 内置参考数据
    pub fn with_defaults() -> Self {
        let entries = DEFAULT_LIMITS_UG_PER_KG
            .iter()
            .map(|(substance, scope, value)| {
                (
                    (normalize(substance), normalize(scope)),
                    ReferenceLimit::new(substance, scope, *value, ResidueUnit::UgPerKg),
                )
            })
            .collect();
        Self { entries }
    }

    /// 查找限量
    ///
    /// # 返回
    /// - `Ok(LimitLookup::Threshold)`: 普通阈值
    /// - `Ok(LimitLookup::Banned)`: 限量为 0
    /// - `Err(ReferenceNotFound)`: 精确与通配均未命中
    pub fn lookup_limit(&self, substance: &str, scope: &str) -> ComplianceResult<LimitLookup> {
        let substance_key = normalize(substance);

        if let Some(limit) = self.entries.get(&(substance_key.clone(), normalize(scope))) {
            let source = if limit.is_wildcard() {
                LimitSource::WildcardScope
            } else {
                LimitSource::ExactScope
            };
            return Ok(LimitLookup::from_entry(limit.clone(), source));
        }

        if let Some(limit) = self
            .entries
            .get(&(substance_key, normalize(WILDCARD_SCOPE)))
        {
            return Ok(LimitLookup::from_entry(
                limit.clone(),
                LimitSource::WildcardScope,
            ));
        }

        Err(ComplianceError::ReferenceNotFound {
            substance: substance.trim().to_string(),
            scope: scope.trim().to_string(),
        })
    }

    /// 任一 scope 限量为 0 即视为禁用
    pub fn is_banned(&self, substance: &str) -> bool {
        let substance_key = normalize(substance);
        self.entries
            .iter()
            .any(|((s, _), limit)| *s == substance_key && limit.is_ban())
    }

    /// 参考表全部条目（按 substance, scope 排序，用于展示）
    pub fn entries(&self) -> Vec<&ReferenceLimit> {
        let mut list: Vec<&ReferenceLimit> = self.entries.values().collect();
        list.sort_by(|a, b| {
            normalize(&a.substance)
                .cmp(&normalize(&b.substance))
                .then_with(|| normalize(&a.scope).cmp(&normalize(&b.scope)))
        });
        list
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MrlReferenceTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}
