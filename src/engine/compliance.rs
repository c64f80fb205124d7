// ==========================================
// 兽药残留合规核心 - 合规判定引擎
// ==========================================
// 职责: 检测值 vs 参考限量 → Pass/Fail + 比值 + 风险分级
// 输入: LabSample + MrlReferenceTable
// 输出: Evaluation（纯函数，无状态）
// 红线: 限量为 0 不做除法；不产生 NaN / Infinity
// ==========================================

use crate::config::MissingReferencePolicy;
use crate::domain::lab::{EvaluatedSample, Evaluation, LabSample};
use crate::domain::reference::{LimitLookup, ReferenceLimit};
use crate::domain::types::{ComplianceStatus, LabSampleState, LimitSource, RiskBand};
use crate::engine::error::{ComplianceError, ComplianceResult};
use crate::engine::mrl_table::MrlReferenceTable;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

// ==========================================
// ComplianceEvaluator - 合规判定引擎
// ==========================================
pub struct ComplianceEvaluator {
    table: Arc<MrlReferenceTable>,
    policy: MissingReferencePolicy,
}

impl ComplianceEvaluator {
    pub fn new(table: Arc<MrlReferenceTable>, policy: MissingReferencePolicy) -> Self {
        Self { table, policy }
    }

    pub fn policy(&self) -> MissingReferencePolicy {
        self.policy
    }

    /// 解析限量（含缺失策略）
    ///
    /// - Reject: 透传 ReferenceNotFound
    /// - DefaultLimit: 生成 PolicyDefault 来源的阈值
    pub fn resolve_limit(&self, substance: &str, scope: &str) -> ComplianceResult<LimitLookup> {
        match self.table.lookup_limit(substance, scope) {
            Ok(lookup) => Ok(lookup),
            Err(ComplianceError::ReferenceNotFound { substance, scope }) => match self.policy {
                MissingReferencePolicy::Reject => {
                    Err(ComplianceError::ReferenceNotFound { substance, scope })
                }
                MissingReferencePolicy::DefaultLimit { value, unit } => {
                    warn!(
                        substance = %substance,
                        scope = %scope,
                        default_limit = value,
                        "参考限量未命中，按策略使用默认限量"
                    );
                    Ok(LimitLookup::Threshold {
                        limit: ReferenceLimit {
                            substance,
                            scope,
                            limit_value: value,
                            unit,
                        },
                        source: LimitSource::PolicyDefault,
                    })
                }
            },
            Err(other) => Err(other),
        }
    }

    /// 判定单个样本
    ///
    /// # 规则
    /// 1. 禁用药（限量 0）: 一律 Fail，ratio = None，风险 Critical
    /// 2. 其他: ratio = measured / limit，ratio > 1.0 为 Fail（等于限量为 Pass）
    pub fn evaluate(&self, sample: &LabSample) -> ComplianceResult<Evaluation> {
        validate_sample(sample)?;

        let lookup = self.resolve_limit(&sample.substance_name, &sample.scope)?;
        let source = lookup.source();

        let evaluation = match lookup {
            LimitLookup::Banned { limit, .. } => Evaluation {
                status: ComplianceStatus::Fail,
                ratio: None,
                risk: RiskBand::Critical,
                measured_in_limit_unit: sample.unit.convert(sample.measured_value, limit.unit),
                limit,
                limit_source: source,
                banned: true,
            },
            LimitLookup::Threshold { limit, .. } => {
                let measured = sample.unit.convert(sample.measured_value, limit.unit);
                let ratio = measured / limit.limit_value;
                let status = if ratio > 1.0 {
                    ComplianceStatus::Fail
                } else {
                    ComplianceStatus::Pass
                };
                Evaluation {
                    status,
                    ratio: Some(ratio),
                    risk: RiskBand::from_ratio(ratio),
                    measured_in_limit_unit: measured,
                    limit,
                    limit_source: source,
                    banned: false,
                }
            }
        };

        debug!(
            substance = %sample.substance_name,
            animal_id = %sample.animal_id,
            status = %evaluation.status,
            risk = %evaluation.risk,
            "样本判定完成"
        );

        Ok(evaluation)
    }

    /// 批量判定
    ///
    /// # 返回
    /// (已判定样本, 无法判定样本及原因)
    #[instrument(skip(self, samples), fields(count = samples.len()))]
    pub fn evaluate_batch(
        &self,
        samples: Vec<LabSample>,
    ) -> (Vec<EvaluatedSample>, Vec<(LabSample, ComplianceError)>) {
        let mut evaluated = Vec::with_capacity(samples.len());
        let mut unresolved = Vec::new();

        for sample in samples {
            match self.evaluate(&sample) {
                Ok(evaluation) => {
                    let state = LabSampleState::Uploaded
                        .advance(None)
                        .and_then(|s| s.advance(Some(evaluation.status)))
                        .unwrap_or(LabSampleState::Evaluated);
                    evaluated.push(EvaluatedSample {
                        sample,
                        evaluation,
                        state,
                    });
                }
                Err(err) => unresolved.push((sample, err)),
            }
        }

        (evaluated, unresolved)
    }
}

fn validate_sample(sample: &LabSample) -> ComplianceResult<()> {
    if sample.substance_name.trim().is_empty() {
        return Err(ComplianceError::validation("substance_name", "药物名称为空"));
    }
    if !sample.measured_value.is_finite() || sample.measured_value < 0.0 {
        return Err(ComplianceError::validation(
            "measured_value",
            format!("检测值非法: {}", sample.measured_value),
        ));
    }
    Ok(())
}
