// ==========================================
// 兽药残留合规核心 - 休药期领域模型
// ==========================================
// 派生值，按需重算；仅允许缓存副本用于展示
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 休药期建议
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRecommendation {
    pub substance_name: String,
    pub base_days: u32,
    pub route_factor: f64,
    pub species_factor: f64,
    pub suggested_days: u32,
    /// 静态标注值，不来自任何统计模型
    pub confidence: f64,
    pub rationale: String,
}

/// 休药期计算结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalSchedule {
    pub end_date: Option<NaiveDate>, // 禁用药为 None
    pub suggested_days: u32,
    pub is_banned: bool,
    pub recommendation: Option<WithdrawalRecommendation>,
}
