// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 管理设置在文件数据库中的保存、重新打开后的读取
// ==========================================


use repair_pricing::config::{config_keys, ConfigManager, PricingSettingsReader};
use test_helpers::{create_test_db, sample_settings};

#[test]
fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
    let config_manager = config_manager.unwrap();
    assert!(config_manager.load_admin_settings().unwrap().is_none());
    assert!(config_manager.settings_updated_at().unwrap().is_none());
}

#[test]
fn test_settings_survive_reopen() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let mut settings = sample_settings();
    settings
        .metal_complexity_multipliers
        .insert("platinum".to_string(), 1.4);
    ConfigManager::new(&db_path)
        .unwrap()
        .save_admin_settings(&settings)
        .unwrap();

    let reopened = ConfigManager::new(&db_path).unwrap();
    let loaded = reopened.load_admin_settings().unwrap().unwrap();
    assert_eq!(loaded, settings);
    assert!((loaded.business_multiplier() - 1.5).abs() < 1e-9);
    assert_eq!(loaded.metal_complexity_for("Platinum"), 1.4);
    assert_eq!(loaded.metal_complexity_for("palladium"), 1.0);

    assert_eq!(
        reopened
            .get_global_config_value(config_keys::MATERIAL_MARKUP)
            .unwrap()
            .as_deref(),
        Some("2")
    );
}

#[test]
fn test_settings_updated_at_advances_on_save() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let manager = ConfigManager::new(&db_path).unwrap();

    manager.save_admin_settings(&sample_settings()).unwrap();
    let first = manager.settings_updated_at().unwrap().unwrap();

    std::thread::sleep(std::time::Duration::from_millis(20));
    let mut changed = sample_settings();
    changed.wage = 65.0;
    manager.save_admin_settings(&changed).unwrap();
    let second = manager.settings_updated_at().unwrap().unwrap();

    assert!(second > first);
    assert_eq!(manager.load_admin_settings().unwrap().unwrap().wage, 65.0);
}

#[test]
fn test_snapshot_contains_all_saved_keys() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let manager = ConfigManager::new(&db_path).unwrap();
    manager.save_admin_settings(&sample_settings()).unwrap();

    let snapshot: serde_json::Value =
        serde_json::from_str(&manager.config_snapshot().unwrap().unwrap()).unwrap();
    for key in [
        config_keys::WAGE,
        config_keys::SKILL_LEVEL_MULTIPLIERS,
        config_keys::MATERIAL_MARKUP,
        config_keys::ADMINISTRATIVE_FEE,
        config_keys::BUSINESS_FEE,
        config_keys::CONSUMABLES_FEE,
        config_keys::METAL_COMPLEXITY_MULTIPLIERS,
    ] {
        assert!(snapshot.get(key).is_some(), "snapshot missing {}", key);
    }
}
