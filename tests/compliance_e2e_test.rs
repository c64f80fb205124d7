// ==========================================
// 检测结果端到端测试
// ==========================================
// 测试范围: 上传 → 判定 → 告警 → 落库 → 读取重算
// ==========================================

mod helpers;

use helpers::test_data_builder::*;
use helpers::test_env::TestEnv;
use std::sync::Arc;
use vetintel_mrl::api::{ComplianceApi, SessionContext, UserRole};
use vetintel_mrl::config::ComplianceConfig;
use vetintel_mrl::domain::reference::ReferenceLimit;
use vetintel_mrl::domain::types::{
    AlertKind, AlertSeverity, ComplianceStatus, LabSampleState, ResidueUnit, RiskBand,
};
use vetintel_mrl::engine::MrlReferenceTable;
use vetintel_mrl::i18n::RustI18nLocalizer;

fn lab_user() -> SessionContext {
    SessionContext::new("lab-central-01", UserRole::Lab)
}

// ==========================================
// 场景1: Penicillin 12 vs 限量 4 → 3.0×，Critical，一条 ERROR 告警
// ==========================================
#[test]
fn test_penicillin_three_times_limit_end_to_end() {
    let env = TestEnv::new();
    let sample = LabSampleBuilder::new("Penicillin")
        .measured(12.0, ResidueUnit::UgPerKg)
        .animal("COW002")
        .build();

    let report = env
        .api
        .upload_lab_samples(&lab_user(), vec![sample], at(2024, 1, 28, 10))
        .unwrap();

    assert_eq!(report.accepted.len(), 1);
    let evaluated = &report.accepted[0];
    assert_eq!(evaluated.evaluation.status, ComplianceStatus::Fail);
    assert_eq!(evaluated.evaluation.ratio, Some(3.0));
    assert_eq!(evaluated.evaluation.risk, RiskBand::Critical);
    assert_eq!(evaluated.state, LabSampleState::FailRecorded);

    assert_eq!(report.alerts.len(), 1);
    let alert = &report.alerts[0];
    assert_eq!(alert.kind, AlertKind::ComplianceFailure);
    assert_eq!(alert.severity, AlertSeverity::Error);
    assert_eq!(alert.subject_id, "COW002");
    assert!(alert.message.contains("3.0×"), "message: {}", alert.message);
    assert!(alert.message.contains("Penicillin"));

    // 落库
    assert_eq!(env.count_rows("lab_sample"), 1);
    assert_eq!(env.api.list_alerts(Some("COW002")).unwrap().len(), 1);
}

// ==========================================
// 场景2: 相同失败样本重复提交 → 仅一条告警
// ==========================================
#[test]
fn test_resubmitted_failure_yields_single_alert() {
    let env = TestEnv::new();
    let sample = LabSampleBuilder::new("Penicillin")
        .measured(12.0, ResidueUnit::UgPerKg)
        .build();

    let first = env
        .api
        .upload_lab_samples(&lab_user(), vec![sample.clone()], at(2024, 1, 28, 10))
        .unwrap();
    let second = env
        .api
        .upload_lab_samples(&lab_user(), vec![sample], at(2024, 1, 28, 11))
        .unwrap();

    assert_eq!(first.alerts.len(), 1);
    assert!(second.alerts.is_empty());
    assert_eq!(second.failed_count(), 1);
    assert_eq!(env.count_rows("alert"), 1);
    // 样本本身照常记录
    assert_eq!(env.count_rows("lab_sample"), 2);
}

// ==========================================
// 场景3: 重启后去重仍然成立
// ==========================================
#[test]
fn test_dedupe_survives_restart() {
    let env = TestEnv::new();
    let sample = LabSampleBuilder::new("Oxytetracycline")
        .measured(0.3, ResidueUnit::MgPerKg)
        .build();

    env.api
        .upload_lab_samples(&lab_user(), vec![sample.clone()], at(2024, 1, 28, 10))
        .unwrap();

    let restarted = env.reopen();
    let report = restarted
        .upload_lab_samples(&lab_user(), vec![sample], at(2024, 1, 29, 9))
        .unwrap();
    assert!(report.alerts.is_empty());
    assert_eq!(restarted.list_alerts(None).unwrap().len(), 1);
}

// ==========================================
// 场景4: 判定不落库，读取时按当前参考数据重算
// ==========================================
#[test]
fn test_lab_results_recomputed_against_current_reference() {
    let env = TestEnv::new();
    let sample = LabSampleBuilder::new("Penicillin")
        .measured(12.0, ResidueUnit::UgPerKg)
        .build();
    env.api
        .upload_lab_samples(&lab_user(), vec![sample], at(2024, 1, 28, 10))
        .unwrap();

    let views = env.api.list_lab_results(None).unwrap();
    assert_eq!(
        views[0].evaluation.as_ref().unwrap().status,
        ComplianceStatus::Fail
    );

    // 参考限量放宽后重新读取
    let relaxed = MrlReferenceTable::new(vec![ReferenceLimit::new(
        "Penicillin",
        "Milk",
        20.0,
        ResidueUnit::UgPerKg,
    )])
    .unwrap();
    let api = ComplianceApi::new(
        env.conn.clone(),
        ComplianceConfig::default(),
        Arc::new(relaxed),
        Arc::new(RustI18nLocalizer::new("en")),
    )
    .unwrap();

    let views = api.list_lab_results(None).unwrap();
    let eval = views[0].evaluation.as_ref().unwrap();
    assert_eq!(eval.status, ComplianceStatus::Pass);
    assert_eq!(eval.ratio, Some(0.6));
    assert_eq!(eval.risk, RiskBand::Medium);
}

// ==========================================
// 场景5: 禁用药检出（含 0 值）一律 Fail，不计算比值
// ==========================================
#[test]
fn test_banned_substance_detection_always_fails() {
    let env = TestEnv::new();
    let report = env
        .api
        .upload_lab_samples(
            &lab_user(),
            vec![
                LabSampleBuilder::new("Chloramphenicol")
                    .measured(0.0, ResidueUnit::UgPerKg)
                    .animal("COW010")
                    .build(),
                LabSampleBuilder::new("Chloramphenicol")
                    .measured(0.3, ResidueUnit::UgPerKg)
                    .scope("Meat")
                    .animal("COW011")
                    .build(),
            ],
            at(2024, 1, 28, 10),
        )
        .unwrap();

    assert_eq!(report.failed_count(), 2);
    assert!(report
        .accepted
        .iter()
        .all(|e| e.evaluation.ratio.is_none() && e.evaluation.banned));
    assert_eq!(report.alerts.len(), 2);
    assert!(report.alerts.iter().all(|a| a.message.contains("Chloramphenicol")));
}

// ==========================================
// 场景6: 标记已读为软标记
// ==========================================
#[test]
fn test_mark_alert_read_keeps_alert() {
    let env = TestEnv::new();
    let report = env
        .api
        .upload_lab_samples(
            &lab_user(),
            vec![LabSampleBuilder::new("Tylosin")
                .measured(0.2, ResidueUnit::MgPerKg)
                .build()],
            at(2024, 1, 28, 10),
        )
        .unwrap();
    let alert_id = report.alerts[0].alert_id.clone();

    env.api.mark_alert_read(&alert_id).unwrap();
    let alerts = env.api.list_alerts(None).unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].read);
    assert!(env.api.mark_alert_read("no-such-alert").is_err());
}

// ==========================================
// 场景7: 不同批次的相同读数各自告警
// ==========================================
#[test]
fn test_same_reading_in_new_batch_alerts_again() {
    let env = TestEnv::new();
    let january = LabSampleBuilder::new("Penicillin")
        .measured(12.0, ResidueUnit::UgPerKg)
        .animal("COW002")
        .batch("BATCH-JAN")
        .build();
    let mut march = january.clone();
    march.batch_id = "BATCH-MAR".to_string();
    march.test_date = date(2024, 3, 28);

    let first = env
        .api
        .upload_lab_samples(&lab_user(), vec![january], at(2024, 1, 28, 10))
        .unwrap();
    let second = env
        .api
        .upload_lab_samples(&lab_user(), vec![march], at(2024, 3, 28, 10))
        .unwrap();

    assert_eq!(first.alerts.len(), 1);
    assert_eq!(second.alerts.len(), 1);
    assert!(second.alerts[0].message.contains("BATCH-MAR"));
    assert!(second.alerts[0].message.contains("2024-03-28"));
    assert_eq!(env.api.list_alerts(Some("COW002")).unwrap().len(), 2);
}

// ==========================================
// 场景8: 告警落库失败后重试，告警不丢失
// ==========================================
#[test]
fn test_alert_write_failure_does_not_swallow_retry() {
    let env = TestEnv::new();
    let sample = LabSampleBuilder::new("Penicillin")
        .measured(12.0, ResidueUnit::UgPerKg)
        .animal("COW070")
        .build();

    env.conn
        .lock()
        .unwrap()
        .execute_batch("DROP TABLE alert;")
        .unwrap();
    assert!(env
        .api
        .upload_lab_samples(&lab_user(), vec![sample.clone()], at(2024, 1, 28, 10))
        .is_err());

    vetintel_mrl::db::init_schema(&env.conn.lock().unwrap()).unwrap();
    let retry = env
        .api
        .upload_lab_samples(&lab_user(), vec![sample], at(2024, 1, 28, 11))
        .unwrap();
    assert_eq!(retry.alerts.len(), 1);
    assert_eq!(env.count_rows("alert"), 1);
}
