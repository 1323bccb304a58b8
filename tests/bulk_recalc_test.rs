// ==========================================
// 批量重算集成测试
// ==========================================
// 测试目标: RecalcSummary 统计、跳过规则、设置缺失降级、single-flight
// ==========================================


use chrono::{DateTime, Duration, Utc};
use repair_pricing::api::ApiError;
use repair_pricing::config::{config_keys, PricingSettingsReader};
use repair_pricing::domain::{ActionType, AdminSettings, PricingState};
use repair_pricing::engine::{
    PricingError, PricingOrchestrator, PricingRecalcEngine, PricingRepositories,
};
use repair_pricing::repository::RepositoryResult;
use std::sync::{Arc, Barrier, Mutex};
use test_helpers::{
    assert_money, create_test_db, create_test_state, process, sample_settings, seed, selections,
    task_input,
};

#[test]
fn test_recalc_all_updates_and_skips() {
    let (_temp_file, state) = create_test_state();
    seed(&state);

    let solder = state
        .task_api
        .create_task(task_input("Solder", selections(&[("P-SOLDER", 1)], &[("M-WIRE", 1)])), "tester")
        .unwrap();
    state
        .task_api
        .create_task(task_input("Polish", selections(&[("P-POLISH", 1)], &[])), "tester")
        .unwrap();
    // 只有材料、没有工序的任务不参与重算
    let flux_only = state
        .task_api
        .create_task(task_input("Flux", selections(&[], &[("M-FLUX", 1)])), "tester")
        .unwrap();

    let flux_before = state.task_api.get_task(&flux_only.task_id).unwrap();

    // 工序变更后重算: 0.5h → 1h
    let mut longer = process("P-SOLDER", 1.0, Default::default());
    longer.updated_at = Utc::now() + Duration::hours(1);
    state.catalog_api.upsert_process(&longer).unwrap();
    assert_eq!(
        state.task_api.pricing_state(&solder.task_id).unwrap(),
        PricingState::Stale
    );

    let summary = state.pricing_api.recalc_all("nightly").unwrap();
    assert_eq!(summary.total_tasks, 3);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.skipped, 1);
    assert!(summary.errors.is_empty());
    assert!(!summary.degraded);
    assert!(!state.pricing_api.recalc_in_progress());

    // 黄金14K: 50 + 10 × 2 = 70 → 105.00
    let repriced = state.task_api.get_task(&solder.task_id).unwrap();
    assert_money(repriced.pricing["Yellow Gold 14K"].retail_price, 105.0);

    let untouched = state.task_api.get_task(&flux_only.task_id).unwrap();
    assert_eq!(untouched.pricing_updated_at, flux_before.pricing_updated_at);

    let recalc_log = state
        .pricing_api
        .last_recalc_all()
        .unwrap()
        .expect("RecalcAll log written");
    assert_eq!(recalc_log.action_type, ActionType::RecalcAll.as_str());
    assert_eq!(recalc_log.actor, "nightly");
    assert!(recalc_log.target_id.is_none());
    let payload = recalc_log.payload_json.as_ref().unwrap();
    assert_eq!(payload["summary"]["updated"], 2);
    assert!(payload["config_snapshot"].is_object());
}

#[test]
fn test_recalc_all_degrades_when_settings_missing() {
    let (temp_file, state) = create_test_state();
    seed(&state);

    let task = state
        .task_api
        .create_task(task_input("Solder", selections(&[("P-SOLDER", 1)], &[("M-WIRE", 1)])), "tester")
        .unwrap();

    let conn = repair_pricing::db::open_sqlite_connection(temp_file.path().to_str().unwrap()).unwrap();
    conn.execute("DELETE FROM config_kv WHERE key = ?1", [config_keys::WAGE])
        .unwrap();
    drop(conn);

    let summary = state.pricing_api.recalc_all("nightly").unwrap();
    assert!(summary.degraded);
    assert_eq!(summary.updated, 1);

    // 变体键保留，明细全零
    let zeroed = state.task_api.get_task(&task.task_id).unwrap();
    let keys: Vec<_> = zeroed.pricing.keys().cloned().collect();
    let original: Vec<_> = task.pricing.keys().cloned().collect();
    assert_eq!(keys, original);
    assert!(zeroed.pricing.values().all(|b| b.retail_price == 0.0 && b.wholesale_price == 0.0));

    // 单任务重算是交互路径，设置缺失直接报错
    let err = state.pricing_api.recalc_task(&task.task_id, "owner").unwrap_err();
    assert!(matches!(err, ApiError::ComputationError(_)));
}

#[test]
fn test_recalc_all_rewrites_unreadable_pricing() {
    let (temp_file, state) = create_test_state();
    seed(&state);

    let legacy = state
        .task_api
        .create_task(task_input("Solder", selections(&[("P-SOLDER", 1)], &[])), "tester")
        .unwrap();
    let healthy = state
        .task_api
        .create_task(task_input("Polish", selections(&[("P-POLISH", 1)], &[])), "tester")
        .unwrap();

    // 旧版 PriceBreakdown 形态
    let conn = repair_pricing::db::open_sqlite_connection(temp_file.path().to_str().unwrap()).unwrap();
    conn.execute(
        "UPDATE repair_task SET pricing_json = ?2 WHERE task_id = ?1",
        [legacy.task_id.as_str(), r#"{"universal":{"retailPrice":1}}"#],
    )
    .unwrap();
    drop(conn);

    let summary = state.pricing_api.recalc_all("nightly").unwrap();
    assert_eq!(summary.total_tasks, 2);
    assert_eq!(summary.updated, 2);
    assert!(summary.errors.is_empty());

    let repaired = state.task_api.get_task(&legacy.task_id).unwrap();
    assert_eq!(repaired.pricing, legacy.pricing);
    let other = state.task_api.get_task(&healthy.task_id).unwrap();
    assert_eq!(other.pricing, healthy.pricing);
}

#[test]
fn test_recalc_all_records_per_task_failure_and_continues() {
    let (temp_file, state) = create_test_state();
    seed(&state);

    let mut tasks = Vec::new();
    for title in ["A", "B", "C"] {
        tasks.push(
            state
                .task_api
                .create_task(task_input(title, selections(&[("P-SOLDER", 1)], &[])), "tester")
                .unwrap(),
        );
    }
    let broken = &tasks[1];

    let conn = repair_pricing::db::open_sqlite_connection(temp_file.path().to_str().unwrap()).unwrap();
    conn.execute(
        "UPDATE repair_task SET processes_json = 'not json' WHERE task_id = ?1",
        [broken.task_id.as_str()],
    )
    .unwrap();
    drop(conn);

    // 工序变更: 0.5h → 1h，健康任务应被重算
    let mut longer = process("P-SOLDER", 1.0, Default::default());
    longer.updated_at = Utc::now() + Duration::hours(1);
    state.catalog_api.upsert_process(&longer).unwrap();

    let summary = state.pricing_api.recalc_all("nightly").unwrap();
    assert_eq!(summary.total_tasks, 3);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].task_id, broken.task_id);
    assert!(summary.errors[0].message.contains("processes_json"));

    for task in [&tasks[0], &tasks[2]] {
        let repriced = state.task_api.get_task(&task.task_id).unwrap();
        // 1h × 50 = 50 → 75.00
        assert_money(repriced.pricing["universal"].retail_price, 75.0);
    }

    let recalc_log = state.pricing_api.last_recalc_all().unwrap().unwrap();
    let payload = recalc_log.payload_json.as_ref().unwrap();
    assert_eq!(payload["summary"]["errors"].as_array().unwrap().len(), 1);
}

#[test]
fn test_recalc_task_not_found() {
    let (_temp_file, state) = create_test_state();
    seed(&state);

    let err = state.pricing_api.recalc_task("nope", "owner").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    let err = state.pricing_api.recalc_task("  ", "owner").unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)));
}

/// 在 load_admin_settings 中阻塞，直到测试放行
struct GatedSettings {
    entered: Barrier,
    release: Barrier,
    settings: Mutex<Option<AdminSettings>>,
}

impl PricingSettingsReader for GatedSettings {
    fn load_admin_settings(&self) -> RepositoryResult<Option<AdminSettings>> {
        self.entered.wait();
        self.release.wait();
        Ok(self.settings.lock().unwrap().clone())
    }

    fn settings_updated_at(&self) -> RepositoryResult<Option<DateTime<Utc>>> {
        Ok(None)
    }
}

#[test]
fn test_concurrent_recalc_all_rejected() {
    let (_temp_file, db_path) = create_test_db().unwrap();
    let conn = repair_pricing::db::open_sqlite_connection(&db_path).unwrap();
    let repos = PricingRepositories::from_connection(Arc::new(Mutex::new(conn)));

    let reader = Arc::new(GatedSettings {
        entered: Barrier::new(2),
        release: Barrier::new(2),
        settings: Mutex::new(Some(sample_settings())),
    });
    let orchestrator = Arc::new(PricingOrchestrator::new(reader.clone()));
    let engine = PricingRecalcEngine::new(repos, orchestrator);

    std::thread::scope(|s| {
        let first = s.spawn(|| engine.recalc_all("first"));

        reader.entered.wait();
        assert!(engine.is_running());
        let second = engine.recalc_all("second");
        assert!(matches!(second, Err(PricingError::RecalcInProgress)));
        reader.release.wait();

        let summary = first.join().unwrap().unwrap();
        assert_eq!(summary.total_tasks, 0);
    });

    assert!(!engine.is_running());
}
