// ==========================================
// 兽药残留合规核心 - 休药期计算引擎
// ==========================================
// 职责: 药物 + 途径 + 物种 + 用药日期 → 建议休药天数 / 结束日期
// 规则: suggested_days = ceil(base × route_factor × species_factor)
// 红线: 禁用药不计算休药期，登记必须被上游拒绝
// ==========================================

use crate::config::ComplianceConfig;
use crate::domain::types::{Route, Species};
use crate::domain::withdrawal::{WithdrawalRecommendation, WithdrawalSchedule};
use crate::engine::error::{ComplianceError, ComplianceResult};
use crate::engine::mrl_table::MrlReferenceTable;
use crate::i18n::{Localizer, MessageKey};
use chrono::{Days, NaiveDate};
use std::sync::Arc;
use tracing::{debug, warn};

/// 药代基准休药天数
const BASE_WITHDRAWAL_DAYS: &[(&str, u32)] = &[
    ("Oxytetracycline", 14),
    ("Penicillin", 7),
    ("Streptomycin", 21),
    ("Enrofloxacin", 10),
    ("Tylosin", 14),
];

/// 标签（标准）休药天数，用于对比提示
const LABEL_WITHDRAWAL_DAYS: &[(&str, u32)] = &[
    ("Amoxicillin", 7),
    ("Oxytetracycline", 14),
    ("Penicillin G", 10),
    ("Streptomycin", 21),
    ("Enrofloxacin", 12),
    ("Tylosin", 5),
    ("Cephalexin", 8),
];

/// 明令禁用清单（与参考表中限量为 0 的药物取并集）
const BANNED_SUBSTANCES: &[&str] = &["Chloramphenicol"];

fn table_lookup(table: &[(&str, u32)], substance: &str) -> Option<u32> {
    let key = substance.trim();
    table
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, days)| *days)
}

/// 标签休药天数
pub fn label_withdrawal_days(substance: &str) -> Option<u32> {
    table_lookup(LABEL_WITHDRAWAL_DAYS, substance)
}

/// 整数向上取整: ceil(base × route/10 × species/10)
///
/// 系数以十分位整数参与运算，避免 10 × 1.1 = 11.000000000000002 这类浮点误差；
/// 乘积溢出返回 None
fn suggested_days(base_days: u32, route_tenths: u32, species_tenths: u32) -> Option<u32> {
    let scaled = base_days
        .checked_mul(route_tenths)?
        .checked_mul(species_tenths)?;
    Some(scaled / 100 + u32::from(scaled % 100 != 0))
}

// ==========================================
// WithdrawalScheduler - 休药期计算引擎
// ==========================================
pub struct WithdrawalScheduler {
    table: Arc<MrlReferenceTable>,
    default_base_days: u32,
    confidence: f64,
    localizer: Arc<dyn Localizer>,
}

impl WithdrawalScheduler {
    pub fn new(
        table: Arc<MrlReferenceTable>,
        config: &ComplianceConfig,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            table,
            default_base_days: config.default_base_withdrawal_days,
            confidence: config.withdrawal_confidence,
            localizer,
        }
    }

    /// 基准休药天数（未知药物取配置默认值）
    pub fn base_days(&self, substance: &str) -> u32 {
        table_lookup(BASE_WITHDRAWAL_DAYS, substance).unwrap_or(self.default_base_days)
    }

    /// 禁用判定: 禁用清单 或 参考表限量为 0
    pub fn is_banned(&self, substance: &str) -> bool {
        let key = substance.trim();
        BANNED_SUBSTANCES
            .iter()
            .any(|name| name.eq_ignore_ascii_case(key))
            || self.table.is_banned(key)
    }

    /// 禁用药硬拒绝
    pub fn ensure_permitted(&self, substance: &str) -> ComplianceResult<()> {
        if self.is_banned(substance) {
            warn!(substance = substance.trim(), "禁用药物登记被拒绝");
            return Err(ComplianceError::BannedSubstance {
                substance: substance.trim().to_string(),
            });
        }
        Ok(())
    }

    /// 计算休药期
    ///
    /// # 返回
    /// - 禁用药: is_banned = true, suggested_days = 0, end_date = None
    /// - 其他: end_date = treatment_date + suggested_days
    ///
    /// # 错误
    /// - Validation: 药物名称为空 / 剂量非法 / 天数或日期溢出
    pub fn compute_withdrawal(
        &self,
        substance: &str,
        dose: f64,
        route: &Route,
        species: &Species,
        treatment_date: NaiveDate,
    ) -> ComplianceResult<WithdrawalSchedule> {
        if substance.trim().is_empty() {
            return Err(ComplianceError::validation("substance_name", "药物名称为空"));
        }
        if !dose.is_finite() || dose < 0.0 {
            return Err(ComplianceError::validation(
                "dose",
                format!("剂量非法: {}", dose),
            ));
        }

        if self.is_banned(substance) {
            return Ok(WithdrawalSchedule {
                end_date: None,
                suggested_days: 0,
                is_banned: true,
                recommendation: None,
            });
        }

        let base_days = self.base_days(substance);
        let days = suggested_days(base_days, route.factor_tenths(), species.factor_tenths())
            .ok_or_else(|| {
                ComplianceError::validation(
                    "base_days",
                    format!("休药天数超出范围: {}", base_days),
                )
            })?;

        let end_date = treatment_date
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or_else(|| {
                ComplianceError::validation("treatment_date", "休药期结束日期超出范围")
            })?;

        let rationale = self.localizer.render(
            MessageKey::WithdrawalRationale,
            &[
                ("substance", substance.trim().to_string()),
                ("species", species.to_string()),
                ("route", route.to_string()),
            ],
        );

        debug!(
            substance = substance.trim(),
            base_days,
            suggested_days = days,
            %end_date,
            "休药期计算完成"
        );

        Ok(WithdrawalSchedule {
            end_date: Some(end_date),
            suggested_days: days,
            is_banned: false,
            recommendation: Some(WithdrawalRecommendation {
                substance_name: substance.trim().to_string(),
                base_days,
                route_factor: route.factor(),
                species_factor: species.factor(),
                suggested_days: days,
                confidence: self.confidence,
                rationale,
            }),
        })
    }
}
