// ==========================================
// 配置层集成测试
// ==========================================
// 测试目标: config_kv 覆写 → ComplianceApi 行为
// ==========================================

mod helpers;

use helpers::test_data_builder::*;
use helpers::test_env::{open_connection, TestEnv};
use vetintel_mrl::api::{ApiError, ComplianceApi, SessionContext, UserRole};
use vetintel_mrl::config::{
    config_keys, ComplianceConfig, ConfigError, ConfigManager, MissingReferencePolicy,
    MAX_BASE_WITHDRAWAL_DAYS,
};
use vetintel_mrl::domain::types::{ComplianceStatus, LimitSource, ResidueUnit, Route, Species};
use vetintel_mrl::engine::ComplianceError;

fn lab_user() -> SessionContext {
    SessionContext::new("lab-central-01", UserRole::Lab)
}

#[test]
fn test_default_limit_policy_loaded_from_store() {
    let env = TestEnv::new();
    let manager = ConfigManager::new(env.conn.clone());
    manager
        .set_value(config_keys::MISSING_REFERENCE_POLICY, "default_limit")
        .unwrap();
    manager
        .set_value(config_keys::DEFAULT_LIMIT_VALUE, "50")
        .unwrap();
    manager
        .set_value(config_keys::DEFAULT_LIMIT_UNIT, "µg/kg")
        .unwrap();

    let config = manager.load().unwrap();
    assert!(matches!(
        config.missing_reference_policy,
        MissingReferencePolicy::DefaultLimit { .. }
    ));

    let api = ComplianceApi::with_defaults(env.conn.clone(), config).unwrap();
    let eval = api
        .evaluate_sample(
            &LabSampleBuilder::new("Colistin")
                .measured(25.0, ResidueUnit::UgPerKg)
                .build(),
        )
        .unwrap();
    assert_eq!(eval.limit_source, LimitSource::PolicyDefault);
    assert_eq!(eval.status, ComplianceStatus::Pass);
    assert_eq!(eval.ratio, Some(0.5));

    // 参考表命中的物质不受策略影响
    let known = api
        .evaluate_sample(
            &LabSampleBuilder::new("Penicillin")
                .measured(2.0, ResidueUnit::UgPerKg)
                .build(),
        )
        .unwrap();
    assert_eq!(known.limit_source, LimitSource::ExactScope);
}

#[test]
fn test_reject_policy_is_default() {
    let env = TestEnv::new();
    let result = env.api.evaluate_sample(
        &LabSampleBuilder::new("Colistin")
            .measured(25.0, ResidueUnit::UgPerKg)
            .build(),
    );
    assert!(matches!(
        result,
        Err(ApiError::Compliance(ComplianceError::ReferenceNotFound { .. }))
    ));
}

#[test]
fn test_max_batch_rows_override() {
    let env = TestEnv::new();
    let manager = ConfigManager::new(env.conn.clone());
    manager.set_value(config_keys::MAX_BATCH_ROWS, "2").unwrap();
    let api = ComplianceApi::with_defaults(env.conn.clone(), manager.load().unwrap()).unwrap();

    let samples: Vec<_> = (0..3)
        .map(|i| {
            LabSampleBuilder::new("Tylosin")
                .measured(1.0, ResidueUnit::UgPerKg)
                .animal(&format!("COW{}", i))
                .build()
        })
        .collect();
    match api.upload_lab_samples(&lab_user(), samples, at(2024, 1, 28, 10)) {
        Err(ApiError::Compliance(ComplianceError::BatchSizeExceeded { rows, max })) => {
            assert_eq!((rows, max), (3, 2));
        }
        other => panic!("expected BatchSizeExceeded, got {:?}", other.map(|r| r.accepted.len())),
    }
    assert_eq!(env.count_rows("lab_sample"), 0);
}

#[test]
fn test_alert_locale_from_store() {
    let env = TestEnv::new();
    let manager = ConfigManager::new(env.conn.clone());
    manager.set_value(config_keys::ALERT_LOCALE, "hi").unwrap();
    let config = manager.load().unwrap();
    assert_eq!(config.alert_locale, "hi");

    let api = ComplianceApi::with_defaults(open_connection(&env.db_path), config).unwrap();
    let report = api
        .upload_lab_samples(
            &lab_user(),
            vec![LabSampleBuilder::new("Penicillin")
                .measured(12.0, ResidueUnit::UgPerKg)
                .build()],
            at(2024, 1, 28, 10),
        )
        .unwrap();
    assert_eq!(report.alerts.len(), 1);
    assert!(report.alerts[0].message.contains("Penicillin"));
    assert!(!report.alerts[0].message.starts_with("Lab test failed"));
}

#[test]
fn test_malformed_value_surfaces_as_config_error() {
    let env = TestEnv::new();
    let manager = ConfigManager::new(env.conn.clone());
    manager
        .set_value(config_keys::MISSING_REFERENCE_POLICY, "ignore")
        .unwrap();
    let err: ApiError = manager.load().unwrap_err().into();
    assert!(matches!(err, ApiError::ConfigError(_)));
}

#[test]
fn test_out_of_range_date_arithmetic_values_rejected_at_load() {
    let env = TestEnv::new();
    let manager = ConfigManager::new(env.conn.clone());

    manager
        .set_value(config_keys::DEFAULT_BASE_WITHDRAWAL_DAYS, "40000000")
        .unwrap();
    assert!(matches!(
        manager.load(),
        Err(ConfigError::ValueError { ref key, .. }) if key == config_keys::DEFAULT_BASE_WITHDRAWAL_DAYS
    ));

    manager
        .set_value(config_keys::DEFAULT_BASE_WITHDRAWAL_DAYS, "14")
        .unwrap();
    manager
        .set_value(config_keys::HIGH_FREQUENCY_WINDOW_DAYS, "200000000")
        .unwrap();
    assert!(matches!(
        manager.load(),
        Err(ConfigError::ValueError { ref key, .. }) if key == config_keys::HIGH_FREQUENCY_WINDOW_DAYS
    ));
}

#[test]
fn test_api_rejects_unvalidated_config() {
    let env = TestEnv::new();
    let config = ComplianceConfig {
        high_frequency_window_days: 200_000_000,
        ..ComplianceConfig::default()
    };
    assert!(matches!(
        ComplianceApi::with_defaults(env.conn.clone(), config),
        Err(ApiError::ConfigError(_))
    ));
}

#[test]
fn test_max_base_days_still_computes() {
    let env = TestEnv::new();
    let manager = ConfigManager::new(env.conn.clone());
    manager
        .set_value(
            config_keys::DEFAULT_BASE_WITHDRAWAL_DAYS,
            &MAX_BASE_WITHDRAWAL_DAYS.to_string(),
        )
        .unwrap();
    let api = ComplianceApi::with_defaults(env.conn.clone(), manager.load().unwrap()).unwrap();

    let schedule = api
        .preview_withdrawal(
            &TreatmentBuilder::new("Cephalexin")
                .route(Route::Intramuscular)
                .species(Species::Goat)
                .build(),
        )
        .unwrap();
    // ceil(3650 × 1.2 × 1.1) = 4818
    assert_eq!(schedule.suggested_days, 4818);
    assert!(schedule.end_date.is_some());
}
