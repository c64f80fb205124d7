// ==========================================
// 兽药残留合规核心 - 告警生成引擎
// ==========================================
// 职责: 由判定结果 / 用药历史派生告警
// 规则:
// - 每个 Fail 样本 → 一条 COMPLIANCE_FAILURE (ERROR)
// - 同一对象 30 天内登记用药 > 10 次 → 一条 HIGH_FREQUENCY (WARNING)
// - 建议休药期超过标签休药期 → 一条 ADVISORY (INFO)
// 红线: 只追加；按 (kind, subject_id, message) 去重，重试调用不产生重复告警
//       检测告警文本含批次号与检测日期，不同批次各自告警
// ==========================================

use crate::config::ComplianceConfig;
use crate::domain::alert::Alert;
use crate::domain::lab::EvaluatedSample;
use crate::domain::treatment::TreatmentRecord;
use crate::domain::types::{AlertKind, AlertSeverity};
use crate::domain::withdrawal::WithdrawalSchedule;
use crate::engine::withdrawal::label_withdrawal_days;
use crate::i18n::{Localizer, MessageKey};
use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, instrument};
use uuid::Uuid;

/// 数值展示: 最多 4 位小数，去掉末尾 0
fn fmt_amount(value: f64) -> String {
    let s = format!("{:.4}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

// ==========================================
// AlertLog - 告警存储（内存）
// ==========================================
#[derive(Debug, Default)]
pub struct AlertLog {
    alerts: Vec<Alert>,
    keys: HashSet<(AlertKind, String, String)>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由已持久化告警恢复（保证重启后去重仍然成立）
    pub fn from_existing(existing: Vec<Alert>) -> Self {
        let mut log = Self::new();
        for alert in existing {
            log.insert(alert);
        }
        log
    }

    /// 插入告警；重复返回 false
    fn insert(&mut self, alert: Alert) -> bool {
        if !self.keys.insert(alert.dedupe_key()) {
            return false;
        }
        self.alerts.push(alert);
        true
    }

    /// 按创建时间倒序
    pub fn list(&self, subject_id: Option<&str>) -> Vec<Alert> {
        let mut list: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|a| subject_id.map_or(true, |s| a.subject_id == s))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    /// 撤回尚未持久化的告警，释放其去重键
    fn remove(&mut self, alert: &Alert) {
        if let Some(pos) = self.alerts.iter().position(|a| a.alert_id == alert.alert_id) {
            let removed = self.alerts.remove(pos);
            self.keys.remove(&removed.dedupe_key());
        }
    }

    /// 标记已读（软标记）
    pub fn mark_read(&mut self, alert_id: &str) -> bool {
        match self.alerts.iter_mut().find(|a| a.alert_id == alert_id) {
            Some(alert) => {
                alert.read = true;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

// ==========================================
// AlertGenerator - 告警生成引擎
// ==========================================
// 唯一持有告警列表的组件；Mutex 串行化并发批次的去重+插入
pub struct AlertGenerator {
    log: Mutex<AlertLog>,
    localizer: Arc<dyn Localizer>,
    high_frequency_threshold: usize,
    high_frequency_window_days: i64,
}

impl AlertGenerator {
    pub fn new(config: &ComplianceConfig, localizer: Arc<dyn Localizer>) -> Self {
        Self {
            log: Mutex::new(AlertLog::new()),
            localizer,
            high_frequency_threshold: config.high_frequency_threshold,
            high_frequency_window_days: config.high_frequency_window_days,
        }
    }

    /// 用已持久化的告警初始化去重集合
    pub fn with_existing(mut self, existing: Vec<Alert>) -> Self {
        self.log = Mutex::new(AlertLog::from_existing(existing));
        self
    }

    fn lock_log(&self) -> MutexGuard<'_, AlertLog> {
        // 告警列表只追加，锁中毒时数据仍然一致
        self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn build(
        &self,
        kind: AlertKind,
        severity: AlertSeverity,
        subject_id: &str,
        message: String,
        now: NaiveDateTime,
    ) -> Alert {
        Alert {
            alert_id: Uuid::new_v4().to_string(),
            kind,
            severity,
            subject_id: subject_id.to_string(),
            message,
            created_at: now,
            read: false,
        }
    }

    /// 插入候选告警，返回实际新增的告警
    fn commit(&self, candidates: Vec<Alert>) -> Vec<Alert> {
        let mut log = self.lock_log();
        candidates
            .into_iter()
            .filter(|alert| log.insert(alert.clone()))
            .collect()
    }

    /// 检测结果上传
    #[instrument(skip(self, evaluated), fields(count = evaluated.len()))]
    pub fn on_lab_upload(&self, evaluated: &[EvaluatedSample], now: NaiveDateTime) -> Vec<Alert> {
        let candidates: Vec<Alert> = evaluated
            .iter()
            .filter(|e| e.evaluation.is_fail())
            .map(|e| {
                let eval = &e.evaluation;
                let unit = eval.limit.unit.to_string();
                let batch = e.sample.batch_id.clone();
                let date = e.sample.test_date.to_string();
                let message = match eval.ratio {
                    Some(ratio) => self.localizer.render(
                        MessageKey::LabFailure,
                        &[
                            ("substance", e.sample.substance_name.clone()),
                            ("measured", fmt_amount(eval.measured_in_limit_unit)),
                            ("limit", fmt_amount(eval.limit.limit_value)),
                            ("unit", unit),
                            ("ratio", format!("{:.1}", ratio)),
                            ("batch", batch),
                            ("date", date),
                        ],
                    ),
                    None => self.localizer.render(
                        MessageKey::LabFailureBanned,
                        &[
                            ("substance", e.sample.substance_name.clone()),
                            ("measured", fmt_amount(eval.measured_in_limit_unit)),
                            ("unit", unit),
                            ("batch", batch),
                            ("date", date),
                        ],
                    ),
                };
                self.build(
                    AlertKind::ComplianceFailure,
                    AlertSeverity::Error,
                    &e.sample.animal_id,
                    message,
                    now,
                )
            })
            .collect();

        let emitted = self.commit(candidates);
        info!(emitted = emitted.len(), "检测告警生成完成");
        emitted
    }

    /// 用药历史检查（高频用药）
    ///
    /// 窗口按登记时间 recorded_at 计: (now - window_days, now]，按 animal_id 分组。
    /// 告警文本只含阈值与窗口，超阈值后继续登记不再重复告警
    #[instrument(skip(self, treatments), fields(count = treatments.len()))]
    pub fn on_treatment_recorded(
        &self,
        treatments: &[TreatmentRecord],
        now: NaiveDateTime,
    ) -> Vec<Alert> {
        // 窗口超出日期范围时退化为统计全部历史
        let cutoff = Duration::try_days(self.high_frequency_window_days)
            .and_then(|window| now.checked_sub_signed(window));

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for t in treatments {
            let in_window =
                t.recorded_at <= now && cutoff.map_or(true, |c| t.recorded_at > c);
            if in_window {
                *counts.entry(t.animal_id.as_str()).or_default() += 1;
            }
        }

        let candidates: Vec<Alert> = counts
            .into_iter()
            .filter(|(_, count)| *count > self.high_frequency_threshold)
            .map(|(subject, count)| {
                info!(subject, count, "高频用药");
                let message = self.localizer.render(
                    MessageKey::HighFrequency,
                    &[
                        ("subject", subject.to_string()),
                        ("threshold", self.high_frequency_threshold.to_string()),
                        ("days", self.high_frequency_window_days.to_string()),
                    ],
                );
                self.build(
                    AlertKind::HighFrequency,
                    AlertSeverity::Warning,
                    subject,
                    message,
                    now,
                )
            })
            .collect();

        self.commit(candidates)
    }

    /// 休药期建议对比标签休药期
    pub fn on_withdrawal_computed(
        &self,
        treatment: &TreatmentRecord,
        schedule: &WithdrawalSchedule,
        now: NaiveDateTime,
    ) -> Option<Alert> {
        if schedule.is_banned {
            return None;
        }
        let standard = label_withdrawal_days(&treatment.substance_name)?;
        if schedule.suggested_days <= standard {
            return None;
        }

        let message = self.localizer.render(
            MessageKey::ExtendedWithdrawal,
            &[
                ("suggested", schedule.suggested_days.to_string()),
                ("substance", treatment.substance_name.clone()),
                ("standard", standard.to_string()),
            ],
        );
        let candidate = self.build(
            AlertKind::Advisory,
            AlertSeverity::Info,
            &treatment.animal_id,
            message,
            now,
        );
        self.commit(vec![candidate]).into_iter().next()
    }

    /// 告警列表（倒序）
    pub fn alerts(&self, subject_id: Option<&str>) -> Vec<Alert> {
        self.lock_log().list(subject_id)
    }

    pub fn mark_read(&self, alert_id: &str) -> bool {
        self.lock_log().mark_read(alert_id)
    }

    /// 持久化失败时撤回本次新增的告警，重试可再次生成
    pub fn rollback(&self, alerts: &[Alert]) {
        let mut log = self.lock_log();
        for alert in alerts {
            log.remove(alert);
        }
    }
}
