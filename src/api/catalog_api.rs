// ==========================================
// 珠宝维修定价系统 - 工序/材料目录 API
// ==========================================
// 职责: 工序与材料文档的导入、查询、停用
// 说明: 目录变更不会自动重算任务定价（任务变为 Stale）
// ==========================================

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::material::RepairMaterial;
use crate::domain::process::RepairProcess;
use crate::engine::repositories::PricingRepositories;
use chrono::Utc;

/// 目录导入文档
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    #[serde(default)]
    pub processes: Vec<RepairProcess>,
    #[serde(default)]
    pub materials: Vec<RepairMaterial>,
}

/// 导入结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogImportResult {
    pub processes: usize,
    pub materials: usize,
}

// ==========================================
// CatalogApi - 目录 API
// ==========================================
pub struct CatalogApi {
    repos: PricingRepositories,
}

impl CatalogApi {
    pub fn new(repos: PricingRepositories) -> Self {
        Self { repos }
    }

    /// 导入（新增或覆盖）工序与材料
    pub fn import(&self, doc: &CatalogDocument) -> ApiResult<CatalogImportResult> {
        for process in &doc.processes {
            self.upsert_process(process)?;
        }
        for material in &doc.materials {
            self.upsert_material(material)?;
        }

        info!(
            processes = doc.processes.len(),
            materials = doc.materials.len(),
            "目录导入完成"
        );
        Ok(CatalogImportResult {
            processes: doc.processes.len(),
            materials: doc.materials.len(),
        })
    }

    pub fn upsert_process(&self, process: &RepairProcess) -> ApiResult<()> {
        if process.process_id.trim().is_empty() {
            return Err(ApiError::ValidationError("processId 不能为空".to_string()));
        }
        if !process.labor_hours.is_finite() || process.labor_hours < 0.0 {
            return Err(ApiError::ValidationError(format!(
                "工序 {} 的 laborHours 必须为非负数",
                process.process_id
            )));
        }
        Ok(self.repos.process_repo.upsert(process)?)
    }

    pub fn upsert_material(&self, material: &RepairMaterial) -> ApiResult<()> {
        if material.material_id.trim().is_empty() {
            return Err(ApiError::ValidationError("materialId 不能为空".to_string()));
        }
        if !material.unit_cost.is_finite() || material.unit_cost < 0.0 {
            return Err(ApiError::ValidationError(format!(
                "材料 {} 的 unitCost 必须为非负数",
                material.material_id
            )));
        }
        Ok(self.repos.material_repo.upsert(material)?)
    }

    pub fn list_processes(&self) -> ApiResult<Vec<RepairProcess>> {
        Ok(self.repos.process_repo.list_active()?)
    }

    pub fn list_materials(&self) -> ApiResult<Vec<RepairMaterial>> {
        Ok(self.repos.material_repo.list_active()?)
    }

    /// 停用工序
    pub fn deactivate_process(&self, process_id: &str) -> ApiResult<()> {
        if !self.repos.process_repo.deactivate(process_id, Utc::now())? {
            return Err(ApiError::NotFound(format!("RepairProcess(id={})不存在", process_id)));
        }
        Ok(())
    }

    /// 停用材料
    pub fn deactivate_material(&self, material_id: &str) -> ApiResult<()> {
        if !self.repos.material_repo.deactivate(material_id, Utc::now())? {
            return Err(ApiError::NotFound(format!("RepairMaterial(id={})不存在", material_id)));
        }
        Ok(())
    }
}
