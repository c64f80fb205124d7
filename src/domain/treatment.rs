// ==========================================
// 兽药残留合规核心 - 用药记录领域模型
// ==========================================
// 红线: 只追加，不修改（append-only）
// ==========================================

use crate::domain::types::{Route, Species};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// TreatmentInput - 用药登记输入
// ==========================================
// 来自表单层，进入核心前需经 importer::validator 校验
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentInput {
    pub substance_name: String,
    pub dose: f64,
    pub dose_unit: String,
    pub route: Route,
    pub species: Species,
    pub treatment_date: NaiveDate,
    pub animal_id: String,
}

// ==========================================
// TreatmentRecord - 用药记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentRecord {
    pub record_id: String,
    pub substance_name: String,
    pub dose: f64,
    pub dose_unit: String,
    pub route: Route,
    pub species: Species,
    pub treatment_date: NaiveDate,
    pub animal_id: String,
    pub recorded_by: String,
    pub recorded_at: NaiveDateTime,

    // ===== 展示缓存（非事实来源） =====
    pub cached_suggested_days: Option<u32>,
    pub cached_withdrawal_end: Option<NaiveDate>,
}
