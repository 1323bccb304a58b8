// ==========================================
// 珠宝维修定价系统 - 定价管理 API
// ==========================================
// 职责: 批量/单任务重算、管理设置查询与更新、材料单价解析、操作日志查询
// ==========================================

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, PricingSettingsReader};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::settings::AdminSettings;
use crate::domain::task::RepairTask;
use crate::domain::variant::MetalVariant;
use crate::engine::price_source::{resolve_unit_price, UnitPrice};
use crate::engine::recalc::{PricingRecalcEngine, RecalcSummary};
use crate::engine::repositories::PricingRepositories;

// ==========================================
// PricingApi - 定价管理 API
// ==========================================

/// 定价管理API
///
/// 职责：
/// 1. 批量重算 / 单任务重算
/// 2. 管理设置读取与更新（记录 ActionLog）
/// 3. 材料在指定变体下的有效单价
pub struct PricingApi {
    repos: PricingRepositories,
    recalc_engine: Arc<PricingRecalcEngine<dyn PricingSettingsReader>>,
    config_manager: Arc<ConfigManager>,
}

impl PricingApi {
    /// 创建新的PricingApi实例
    pub fn new(
        repos: PricingRepositories,
        recalc_engine: Arc<PricingRecalcEngine<dyn PricingSettingsReader>>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            repos,
            recalc_engine,
            config_manager,
        }
    }

    /// 批量重算全部任务
    ///
    /// # 返回
    /// - Ok(RecalcSummary): 单任务失败不会导致整体失败
    /// - Err(RecalcInProgress): 已有批量重算在执行
    pub fn recalc_all(&self, actor: &str) -> ApiResult<RecalcSummary> {
        Ok(self.recalc_engine.recalc_all(actor)?)
    }

    /// 是否有批量重算在执行
    pub fn recalc_in_progress(&self) -> bool {
        self.recalc_engine.is_running()
    }

    /// 单任务重算
    pub fn recalc_task(&self, task_id: &str, actor: &str) -> ApiResult<RepairTask> {
        if task_id.trim().is_empty() {
            return Err(ApiError::ValidationError("task_id 不能为空".to_string()));
        }
        Ok(self.recalc_engine.recalc_task(task_id, actor)?)
    }

    /// 当前管理设置
    pub fn get_admin_settings(&self) -> ApiResult<Option<AdminSettings>> {
        Ok(self.config_manager.load_admin_settings()?)
    }

    /// 更新管理设置
    ///
    /// 更新后已有任务的定价变为过期，需要显式重算。
    pub fn update_admin_settings(&self, settings: &AdminSettings, actor: &str) -> ApiResult<()> {
        settings
            .validate()
            .map_err(|violations| ApiError::ValidationError(violations.join("; ")))?;

        let before = self.config_manager.load_admin_settings()?;
        self.config_manager.save_admin_settings(settings)?;

        let log = ActionLog::now(
            ActionType::SettingsUpdate,
            actor,
            None,
            Some(json!({ "before": before, "after": settings })),
            Some("管理设置更新，已有任务定价需重算".to_string()),
        );
        self.repos.action_log_repo.insert(&log)?;

        info!(actor, "管理设置已更新");
        Ok(())
    }

    /// 材料在指定变体下的有效每份单价
    ///
    /// # 参数
    /// - metal: None 表示通用定价
    ///
    /// # 返回
    /// - Ok(None): 随金属定价的材料不支持该变体
    pub fn material_unit_price(
        &self,
        material_id: &str,
        metal: Option<(&str, &str)>,
    ) -> ApiResult<Option<UnitPrice>> {
        let material = self
            .repos
            .material_repo
            .find_by_id(material_id)?
            .ok_or_else(|| ApiError::NotFound(format!("RepairMaterial(id={})不存在", material_id)))?;
        let variant = metal.map(|(metal_type, karat)| MetalVariant::new(metal_type, karat));
        Ok(resolve_unit_price(&material, variant.as_ref()))
    }

    /// 任务的操作历史（新 → 旧）
    pub fn task_history(&self, task_id: &str) -> ApiResult<Vec<ActionLog>> {
        Ok(self.repos.action_log_repo.list_by_target(task_id)?)
    }

    /// 最近一次批量重算的日志
    pub fn last_recalc_all(&self) -> ApiResult<Option<ActionLog>> {
        Ok(self
            .repos
            .action_log_repo
            .find_latest_by_type(ActionType::RecalcAll.as_str())?)
    }

    /// 最近的操作日志
    pub fn recent_actions(&self, limit: i32) -> ApiResult<Vec<ActionLog>> {
        Ok(self.repos.action_log_repo.list_recent(limit.max(1))?)
    }
}
