// ==========================================
// 珠宝维修定价系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{CatalogApi, PricingApi, TaskApi};
use crate::config::{ConfigManager, PricingSettingsReader};
use crate::engine::{PricingOrchestrator, PricingRecalcEngine, PricingRepositories};

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "REPAIR_PRICING_DB_PATH";

/// 应用状态
///
/// 包含所有API实例和共享资源（单一共享连接）
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 维修任务API
    pub task_api: Arc<TaskApi>,

    /// 定价管理API
    pub pricing_api: Arc<PricingApi>,

    /// 工序/材料目录API
    pub catalog_api: Arc<CatalogApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并初始化表结构（幂等）
    /// 2. 初始化Repository与Engine
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let mut conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("无法初始化表结构: {}", e))?;
        crate::perf::install_sqlite_tracing(&mut conn);
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let repos = PricingRepositories::from_connection(conn.clone());
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let settings_reader: Arc<dyn PricingSettingsReader> = config_manager.clone();
        let orchestrator = Arc::new(PricingOrchestrator::new(settings_reader));
        let recalc_engine = Arc::new(PricingRecalcEngine::new(repos.clone(), orchestrator.clone()));

        // ==========================================
        // 创建API实例
        // ==========================================
        let task_api = Arc::new(TaskApi::new(repos.clone(), orchestrator));
        let pricing_api = Arc::new(PricingApi::new(
            repos.clone(),
            recalc_engine,
            config_manager.clone(),
        ));
        let catalog_api = Arc::new(CatalogApi::new(repos));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            task_api,
            pricing_api,
            catalog_api,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: REPAIR_PRICING_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./repair_pricing.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("repair-pricing-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("repair-pricing");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("repair_pricing.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_initializes_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.db_path, db_path);
        assert!(state.pricing_api.get_admin_settings().unwrap().is_none());
        assert!(state.task_api.list_tasks().unwrap().is_empty());
    }
}
