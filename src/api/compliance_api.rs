// ==========================================
// 兽药残留合规核心 - 合规 API
// ==========================================
// 职责: 输入校验 → 引擎 → 持久化 的编排
// 红线:
// - 禁用药登记硬拒绝，不落库
// - 检测结果 pass/fail 不落库，读取时按当前参考数据重算
// - 批次之间串行化（告警去重不变量）
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::session::SessionContext;
use crate::config::ComplianceConfig;
use crate::domain::alert::Alert;
use crate::domain::lab::{EvaluatedSample, Evaluation, LabSample};
use crate::domain::reference::ReferenceLimit;
use crate::domain::treatment::{TreatmentInput, TreatmentRecord};
use crate::domain::withdrawal::WithdrawalSchedule;
use crate::engine::advisory::{MarketAdvisory, PriceForecast};
use crate::engine::alert_generator::AlertGenerator;
use crate::engine::compliance::ComplianceEvaluator;
use crate::engine::error::ComplianceError;
use crate::engine::mrl_table::MrlReferenceTable;
use crate::engine::withdrawal::WithdrawalScheduler;
use crate::i18n::{Localizer, RustI18nLocalizer};
use crate::importer::lab_csv::LabCsvParser;
use crate::importer::validator::{validate_lab_sample, validate_treatment};
use crate::repository::alert_repo::AlertRepository;
use crate::repository::lab_sample_repo::{LabSampleRepository, StoredLabSample};
use crate::repository::treatment_repo::TreatmentRepository;
use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// 返回结构
// ==========================================

/// 用药登记结果
#[derive(Debug, Clone, Serialize)]
pub struct TreatmentOutcome {
    pub record: TreatmentRecord,
    pub schedule: WithdrawalSchedule,
    pub alerts: Vec<Alert>,
}

/// 无法判定的样本（参考限量未命中）
#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedSample {
    pub sample: LabSample,
    pub reason: String,
    #[serde(skip)]
    pub error: ComplianceError,
}

/// 批次上传结果（整批完成后一次返回）
#[derive(Debug, Clone, Serialize)]
pub struct LabBatchReport {
    pub accepted: Vec<EvaluatedSample>,
    pub unresolved: Vec<UnresolvedSample>,
    pub alerts: Vec<Alert>,
}

impl LabBatchReport {
    pub fn failed_count(&self) -> usize {
        self.accepted
            .iter()
            .filter(|e| e.evaluation.is_fail())
            .count()
    }

    pub fn passed_count(&self) -> usize {
        self.accepted.len() - self.failed_count()
    }
}

/// 检测结果视图（读取时重算）
#[derive(Debug, Clone, Serialize)]
pub struct LabResultView {
    pub sample_id: String,
    pub sample: LabSample,
    pub evaluation: Option<Evaluation>,
    pub unresolved_reason: Option<String>,
}

// ==========================================
// ComplianceApi - 合规 API
// ==========================================
pub struct ComplianceApi {
    config: ComplianceConfig,
    table: Arc<MrlReferenceTable>,
    evaluator: ComplianceEvaluator,
    scheduler: WithdrawalScheduler,
    alerts: AlertGenerator,
    advisory: MarketAdvisory,
    parser: LabCsvParser,
    treatment_repo: TreatmentRepository,
    lab_repo: LabSampleRepository,
    alert_repo: AlertRepository,
    batch_lock: Mutex<()>,
}

impl ComplianceApi {
    /// 创建 API 实例
    ///
    /// 告警去重集合由已持久化告警初始化
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        config: ComplianceConfig,
        table: Arc<MrlReferenceTable>,
        localizer: Arc<dyn Localizer>,
    ) -> ApiResult<Self> {
        config.validate()?;

        let treatment_repo = TreatmentRepository::from_connection(conn.clone());
        let lab_repo = LabSampleRepository::from_connection(conn.clone());
        let alert_repo = AlertRepository::from_connection(conn);

        let existing = alert_repo.list(None)?;
        info!(existing_alerts = existing.len(), locale = localizer.locale(), "合规 API 初始化");

        Ok(Self {
            evaluator: ComplianceEvaluator::new(table.clone(), config.missing_reference_policy),
            scheduler: WithdrawalScheduler::new(table.clone(), &config, localizer.clone()),
            alerts: AlertGenerator::new(&config, localizer.clone()).with_existing(existing),
            advisory: MarketAdvisory::new(localizer),
            parser: LabCsvParser::new(&config),
            table,
            config,
            treatment_repo,
            lab_repo,
            alert_repo,
            batch_lock: Mutex::new(()),
        })
    }

    /// 默认参考表 + 配置语言
    pub fn with_defaults(conn: Arc<Mutex<Connection>>, config: ComplianceConfig) -> ApiResult<Self> {
        let localizer = Arc::new(RustI18nLocalizer::new(&config.alert_locale));
        Self::new(conn, config, Arc::new(MrlReferenceTable::with_defaults()), localizer)
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    fn lock_batch(&self) -> ApiResult<MutexGuard<'_, ()>> {
        self.batch_lock
            .lock()
            .map_err(|e| ApiError::InternalError(format!("批次锁获取失败: {}", e)))
    }

    /// 告警落库；失败时撤回内存中的去重键，保证重试仍能生成告警
    fn persist_alerts(&self, alerts: &[Alert]) -> ApiResult<()> {
        if let Err(err) = self.alert_repo.insert_all(alerts) {
            warn!(count = alerts.len(), error = %err, "告警落库失败，撤回本次告警");
            self.alerts.rollback(alerts);
            return Err(err.into());
        }
        Ok(())
    }

    // ==========================================
    // 参考数据 / 休药期
    // ==========================================

    pub fn reference_limits(&self) -> Vec<ReferenceLimit> {
        self.table.entries().into_iter().cloned().collect()
    }

    /// 休药期预览（不落库；禁用药返回 is_banned）
    pub fn preview_withdrawal(&self, input: &TreatmentInput) -> ApiResult<WithdrawalSchedule> {
        let schedule = self.scheduler.compute_withdrawal(
            &input.substance_name,
            input.dose,
            &input.route,
            &input.species,
            input.treatment_date,
        )?;
        Ok(schedule)
    }

    // ==========================================
    // 用药登记
    // ==========================================

    /// 登记用药
    ///
    /// # 流程
    /// 1. 字段校验
    /// 2. 禁用药硬拒绝（BannedSubstance，不落库）
    /// 3. 计算休药期，缓存到记录上
    /// 4. 落库后检查高频用药，并对比标签休药期
    ///
    /// # 错误
    /// - Compliance(Validation / BannedSubstance)
    /// - 数据库错误
    #[instrument(skip(self, input), fields(user_id = %ctx.user_id, role = %ctx.role, animal_id = %input.animal_id))]
    pub fn record_treatment(
        &self,
        ctx: &SessionContext,
        input: TreatmentInput,
        now: NaiveDateTime,
    ) -> ApiResult<TreatmentOutcome> {
        validate_treatment(&input, &ctx.user_id, now.date())?;
        self.scheduler.ensure_permitted(&input.substance_name)?;

        let schedule = self.preview_withdrawal(&input)?;

        let record = TreatmentRecord {
            record_id: Uuid::new_v4().to_string(),
            substance_name: input.substance_name.trim().to_string(),
            dose: input.dose,
            dose_unit: input.dose_unit.trim().to_string(),
            route: input.route,
            species: input.species,
            treatment_date: input.treatment_date,
            animal_id: input.animal_id.trim().to_string(),
            recorded_by: ctx.user_id.clone(),
            recorded_at: now,
            cached_suggested_days: Some(schedule.suggested_days),
            cached_withdrawal_end: schedule.end_date,
        };

        let _guard = self.lock_batch()?;
        self.treatment_repo.insert(&record)?;

        let history = self.treatment_repo.list_by_animal(&record.animal_id)?;
        let mut emitted = self.alerts.on_treatment_recorded(&history, now);
        if let Some(advice) = self.alerts.on_withdrawal_computed(&record, &schedule, now) {
            emitted.push(advice);
        }
        self.persist_alerts(&emitted)?;

        info!(
            record_id = %record.record_id,
            suggested_days = schedule.suggested_days,
            alerts = emitted.len(),
            "用药记录已登记"
        );

        Ok(TreatmentOutcome {
            record,
            schedule,
            alerts: emitted,
        })
    }

    pub fn list_treatments(&self, animal_id: Option<&str>) -> ApiResult<Vec<TreatmentRecord>> {
        let records = match animal_id {
            Some(id) => self.treatment_repo.list_by_animal(id)?,
            None => self.treatment_repo.list_all()?,
        };
        Ok(records)
    }

    // ==========================================
    // 检测结果
    // ==========================================

    /// 单样本判定（不落库）
    pub fn evaluate_sample(&self, sample: &LabSample) -> ApiResult<Evaluation> {
        validate_lab_sample(sample)?;
        Ok(self.evaluator.evaluate(sample)?)
    }

    /// 批量上传检测结果
    ///
    /// # 规则
    /// - 超过 max_batch_rows 整批拒绝（BatchSizeExceeded）
    /// - 任一样本字段非法整批拒绝（Validation）
    /// - 参考限量未命中的样本照常落库，进入 unresolved
    /// - 批次内判定 + 告警去重 + 落库在批次锁内完成
    #[instrument(skip(self, samples), fields(user_id = %ctx.user_id, count = samples.len()))]
    pub fn upload_lab_samples(
        &self,
        ctx: &SessionContext,
        samples: Vec<LabSample>,
        now: NaiveDateTime,
    ) -> ApiResult<LabBatchReport> {
        if samples.len() > self.config.max_batch_rows {
            warn!(rows = samples.len(), max = self.config.max_batch_rows, "批次超出上限，整批拒绝");
            return Err(ComplianceError::BatchSizeExceeded {
                rows: samples.len(),
                max: self.config.max_batch_rows,
            }
            .into());
        }
        for sample in &samples {
            validate_lab_sample(sample)?;
        }

        let _guard = self.lock_batch()?;

        let stored: Vec<StoredLabSample> = samples
            .iter()
            .map(|sample| StoredLabSample {
                sample_id: Uuid::new_v4().to_string(),
                sample: sample.clone(),
                uploaded_by: ctx.user_id.clone(),
                uploaded_at: now,
            })
            .collect();
        self.lab_repo.insert_batch(&stored)?;

        let (accepted, unresolved) = self.evaluator.evaluate_batch(samples);
        let alerts = self.alerts.on_lab_upload(&accepted, now);
        self.persist_alerts(&alerts)?;

        let report = LabBatchReport {
            accepted,
            unresolved: unresolved
                .into_iter()
                .map(|(sample, error)| UnresolvedSample {
                    sample,
                    reason: error.to_string(),
                    error,
                })
                .collect(),
            alerts,
        };

        info!(
            passed = report.passed_count(),
            failed = report.failed_count(),
            unresolved = report.unresolved.len(),
            alerts = report.alerts.len(),
            "检测批次处理完成"
        );
        Ok(report)
    }

    /// 上传 CSV 文件
    pub fn upload_lab_csv(
        &self,
        ctx: &SessionContext,
        path: &Path,
        now: NaiveDateTime,
    ) -> ApiResult<LabBatchReport> {
        let samples = self.parser.parse_file(path)?;
        self.upload_lab_samples(ctx, samples, now)
    }

    /// 异步批量上传：整批完成后一次返回，不中途取消
    pub async fn upload_lab_samples_async(
        self: Arc<Self>,
        ctx: SessionContext,
        samples: Vec<LabSample>,
        now: NaiveDateTime,
    ) -> ApiResult<LabBatchReport> {
        tokio::task::spawn_blocking(move || self.upload_lab_samples(&ctx, samples, now)).await?
    }

    /// 检测结果列表（按当前参考数据重算）
    pub fn list_lab_results(&self, animal_id: Option<&str>) -> ApiResult<Vec<LabResultView>> {
        let stored = match animal_id {
            Some(id) => self.lab_repo.list_by_animal(id)?,
            None => self.lab_repo.list_all()?,
        };

        let views = stored
            .into_iter()
            .map(|s| match self.evaluator.evaluate(&s.sample) {
                Ok(evaluation) => LabResultView {
                    sample_id: s.sample_id,
                    sample: s.sample,
                    evaluation: Some(evaluation),
                    unresolved_reason: None,
                },
                Err(err) => LabResultView {
                    sample_id: s.sample_id,
                    sample: s.sample,
                    evaluation: None,
                    unresolved_reason: Some(err.to_string()),
                },
            })
            .collect();
        Ok(views)
    }

    // ==========================================
    // 告警
    // ==========================================

    /// 告警列表（创建时间倒序）
    pub fn list_alerts(&self, subject_id: Option<&str>) -> ApiResult<Vec<Alert>> {
        Ok(self.alert_repo.list(subject_id)?)
    }

    /// 标记已读（软标记）
    pub fn mark_alert_read(&self, alert_id: &str) -> ApiResult<()> {
        self.alert_repo.mark_read(alert_id)?;
        self.alerts.mark_read(alert_id);
        Ok(())
    }

    // ==========================================
    // 行情提示（占位）
    // ==========================================

    pub fn market_forecasts(&self, region: &str) -> Vec<PriceForecast> {
        self.advisory.forecast_all(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::session::UserRole;
    use crate::domain::types::{ComplianceStatus, ResidueUnit, Route, Species};
    use chrono::NaiveDate;

    fn api() -> ComplianceApi {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ComplianceApi::with_defaults(Arc::new(Mutex::new(conn)), ComplianceConfig::default())
            .unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 28)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap()
    }

    fn sample(substance: &str, measured_mg: f64) -> LabSample {
        LabSample {
            substance_name: substance.to_string(),
            measured_value: measured_mg,
            unit: ResidueUnit::MgPerKg,
            scope: "Milk".to_string(),
            batch_id: "BATCH002".to_string(),
            farmer_id: Some("1".to_string()),
            animal_id: "COW002".to_string(),
            test_date: NaiveDate::from_ymd_opt(2024, 1, 28).unwrap(),
            lab_name: "Central Lab, Hyderabad".to_string(),
        }
    }

    #[test]
    fn test_unresolved_samples_are_stored_but_not_judged() {
        let api = api();
        let lab = SessionContext::new("lab-7", UserRole::Lab);
        let report = api
            .upload_lab_samples(&lab, vec![sample("Colistin", 0.05), sample("Tylosin", 0.01)], now())
            .unwrap();
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.unresolved.len(), 1);
        assert!(matches!(
            report.unresolved[0].error,
            ComplianceError::ReferenceNotFound { .. }
        ));

        let views = api.list_lab_results(Some("COW002")).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views.iter().filter(|v| v.evaluation.is_none()).count(), 1);
    }

    #[test]
    fn test_record_treatment_caches_schedule() {
        let api = api();
        let vet = SessionContext::new("vet-1", UserRole::Vet);
        let outcome = api
            .record_treatment(
                &vet,
                TreatmentInput {
                    substance_name: "Oxytetracycline".to_string(),
                    dose: 10.0,
                    dose_unit: "ml".to_string(),
                    route: Route::Intramuscular,
                    species: Species::Cattle,
                    treatment_date: NaiveDate::from_ymd_opt(2024, 1, 20).unwrap(),
                    animal_id: "COW001".to_string(),
                },
                now(),
            )
            .unwrap();

        assert_eq!(outcome.record.cached_suggested_days, Some(17));
        assert_eq!(outcome.record.recorded_by, "vet-1");
        // 17 天 > 标签 14 天
        assert_eq!(outcome.alerts.len(), 1);
        assert_eq!(api.list_treatments(Some("COW001")).unwrap().len(), 1);
    }

    #[test]
    fn test_evaluate_sample_is_pure() {
        let api = api();
        let eval = api.evaluate_sample(&sample("Penicillin", 0.012)).unwrap();
        assert_eq!(eval.status, ComplianceStatus::Fail);
        assert!(api.list_alerts(None).unwrap().is_empty());
        assert!(api.list_lab_results(None).unwrap().is_empty());
    }

    #[test]
    fn test_market_forecasts_are_placeholders() {
        let forecasts = api().market_forecasts("Local Market");
        assert!(!forecasts.is_empty());
        assert!(forecasts.iter().all(|f| f.is_placeholder));
    }
}
