// ==========================================
// 兽药残留合规核心 - 检测样本领域模型
// ==========================================
// 红线: 样本创建后不可变；pass/fail 不落库，每次按当前参考数据重算
// ==========================================

use crate::domain::reference::ReferenceLimit;
use crate::domain::types::{ComplianceStatus, LabSampleState, LimitSource, ResidueUnit, RiskBand};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// LabSample - 检测样本
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabSample {
    pub substance_name: String,
    pub measured_value: f64,
    pub unit: ResidueUnit,
    pub scope: String,        // 组织/物种范围，用于查表
    pub batch_id: String,
    pub farmer_id: Option<String>,
    pub animal_id: String,
    pub test_date: NaiveDate,
    pub lab_name: String,
}

// ==========================================
// Evaluation - 判定结果
// ==========================================
// ratio 对禁用药为 None（除零不计算）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub status: ComplianceStatus,
    pub ratio: Option<f64>,
    pub risk: RiskBand,
    pub limit: ReferenceLimit,
    pub limit_source: LimitSource,
    pub banned: bool,
    pub measured_in_limit_unit: f64,
}

impl Evaluation {
    pub fn is_fail(&self) -> bool {
        self.status == ComplianceStatus::Fail
    }
}

// ==========================================
// EvaluatedSample - 样本 + 判定
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedSample {
    pub sample: LabSample,
    pub evaluation: Evaluation,
    pub state: LabSampleState,
}
