// ==========================================
// 兽药残留合规核心 - 输入字段校验
// ==========================================
// 职责: 必填字段 / 数值格式，非法输入在进入引擎前拦截
// 输出: ComplianceError::Validation
// ==========================================

use crate::domain::lab::LabSample;
use crate::domain::treatment::TreatmentInput;
use crate::domain::types::Route;
use crate::engine::error::{ComplianceError, ComplianceResult};
use chrono::NaiveDate;

fn require_text(field: &str, value: &str) -> ComplianceResult<()> {
    if value.trim().is_empty() {
        return Err(ComplianceError::validation(field, "必填字段为空"));
    }
    Ok(())
}

fn require_non_negative(field: &str, value: f64) -> ComplianceResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ComplianceError::validation(
            field,
            format!("必须为非负数: {}", value),
        ));
    }
    Ok(())
}

/// 用药登记校验
///
/// 用药日期不得晚于 today
pub fn validate_treatment(
    input: &TreatmentInput,
    recorded_by: &str,
    today: NaiveDate,
) -> ComplianceResult<()> {
    require_text("substance_name", &input.substance_name)?;
    require_text("animal_id", &input.animal_id)?;
    require_text("dose_unit", &input.dose_unit)?;
    require_text("recorded_by", recorded_by)?;
    require_non_negative("dose", input.dose)?;

    if let Route::Other(name) = &input.route {
        require_text("route", name)?;
    }

    if input.treatment_date > today {
        return Err(ComplianceError::validation(
            "treatment_date",
            format!("用药日期晚于当前日期: {}", input.treatment_date),
        ));
    }
    Ok(())
}

/// 检测样本校验（直接提交路径；CSV 路径由解析器逐行校验）
pub fn validate_lab_sample(sample: &LabSample) -> ComplianceResult<()> {
    require_text("substance_name", &sample.substance_name)?;
    require_text("batch_id", &sample.batch_id)?;
    require_text("animal_id", &sample.animal_id)?;
    require_text("lab_name", &sample.lab_name)?;
    require_text("scope", &sample.scope)?;
    require_non_negative("measured_value", sample.measured_value)
}
