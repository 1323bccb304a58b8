// ==========================================
// 珠宝维修定价系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合定价引擎所需的所有 Repository
// 目标: 减少 PricingRecalcEngine / TaskApi 的构造参数
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::domain::material::RepairMaterial;
use crate::domain::process::RepairProcess;
use crate::engine::lookup::PricingDocumentSource;
use crate::repository::{
    ActionLogRepository, MaterialRepository, ProcessRepository, RepairTaskRepository,
    RepositoryResult,
};

/// 定价引擎仓储集合
///
/// # 包含的仓储
/// - `process_repo`: 工序
/// - `material_repo`: 材料
/// - `task_repo`: 维修任务（含定价写回）
/// - `action_log_repo`: 操作日志
#[derive(Clone)]
pub struct PricingRepositories {
    pub process_repo: Arc<ProcessRepository>,
    pub material_repo: Arc<MaterialRepository>,
    pub task_repo: Arc<RepairTaskRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl PricingRepositories {
    /// 创建新的仓储集合
    pub fn new(
        process_repo: Arc<ProcessRepository>,
        material_repo: Arc<MaterialRepository>,
        task_repo: Arc<RepairTaskRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            process_repo,
            material_repo,
            task_repo,
            action_log_repo,
        }
    }

    /// 基于同一连接构建全部仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            process_repo: Arc::new(ProcessRepository::from_connection(conn.clone())),
            material_repo: Arc::new(MaterialRepository::from_connection(conn.clone())),
            task_repo: Arc::new(RepairTaskRepository::from_connection(conn.clone())),
            action_log_repo: Arc::new(ActionLogRepository::new(conn)),
        }
    }
}

impl PricingDocumentSource for PricingRepositories {
    fn fetch_process(&self, process_id: &str) -> RepositoryResult<Option<RepairProcess>> {
        self.process_repo.find_by_id(process_id)
    }

    fn fetch_material(&self, material_id: &str) -> RepositoryResult<Option<RepairMaterial>> {
        self.material_repo.find_by_id(material_id)
    }
}
