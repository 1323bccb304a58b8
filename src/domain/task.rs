// ==========================================
// 珠宝维修定价系统 - 维修任务领域模型
// ==========================================
// 职责: 维修任务定义（工序/材料选择）与按变体的定价结果
// 红线: 定价映射持久化在任务上；引用文档变更后不自动失效
// ==========================================

use crate::domain::variant::{MetalVariant, UNIVERSAL_VARIANT_KEY};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 变体键 → 价格明细
///
/// 使用 BTreeMap 保证序列化顺序稳定（重复计算结果逐字节一致）。
pub type PricingMap = BTreeMap<String, PriceBreakdown>;

// ==========================================
// 选择项
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSelection {
    pub process_id: String,
    pub quantity: u32, // ≥1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSelection {
    pub material_id: String,
    pub quantity: u32, // ≥1
}

/// 任务的工序与材料选择
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSelections {
    #[serde(default)]
    pub processes: Vec<ProcessSelection>,
    #[serde(default)]
    pub materials: Vec<MaterialSelection>,
}

// ==========================================
// PriceBreakdown - 单变体价格明细
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub metal_label: String,        // 变体键（或 "universal"）
    pub metal_type: Option<String>, // 通用定价时为 None
    pub karat: Option<String>,      // 通用定价时为 None
    pub total_labor_hours: f64,
    pub total_process_cost: f64,
    pub total_material_cost: f64,
    pub base_cost: f64,
    pub retail_price: f64,
    pub wholesale_price: f64,
    pub business_multiplier: f64,
    pub metal_complexity: f64,
}

impl PriceBreakdown {
    /// 全零明细（批量路径下管理设置缺失时的降级结果）
    pub fn zeroed(variant: Option<&MetalVariant>) -> Self {
        Self {
            metal_label: variant
                .map(|v| v.metal_label.clone())
                .unwrap_or_else(|| UNIVERSAL_VARIANT_KEY.to_string()),
            metal_type: variant.map(|v| v.metal_type.clone()),
            karat: variant.map(|v| v.karat.clone()),
            total_labor_hours: 0.0,
            total_process_cost: 0.0,
            total_material_cost: 0.0,
            base_cost: 0.0,
            retail_price: 0.0,
            wholesale_price: 0.0,
            business_multiplier: 0.0,
            metal_complexity: 0.0,
        }
    }

    pub fn is_universal(&self) -> bool {
        self.metal_label == UNIVERSAL_VARIANT_KEY
    }
}

// ==========================================
// RepairTask - 维修任务
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairTask {
    // ===== 主键 =====
    pub task_id: String,

    // ===== 基础信息 =====
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,

    // ===== 任务定义 =====
    #[serde(flatten)]
    pub selections: TaskSelections,

    // ===== 定价结果 =====
    #[serde(default)]
    pub pricing: PricingMap,
    #[serde(default)]
    pub pricing_updated_at: Option<DateTime<Utc>>,

    // ===== 审计字段 =====
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl RepairTask {
    /// 是否按通用定价（映射中仅有 "universal"）
    pub fn is_universally_priced(&self) -> bool {
        self.pricing.len() == 1 && self.pricing.contains_key(UNIVERSAL_VARIANT_KEY)
    }

    pub fn has_processes(&self) -> bool {
        !self.selections.processes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_breakdown_labels() {
        let universal = PriceBreakdown::zeroed(None);
        assert_eq!(universal.metal_label, "universal");
        assert!(universal.is_universal());
        assert!(universal.metal_type.is_none());

        let v = MetalVariant::new("rose_gold", "18K");
        let zero = PriceBreakdown::zeroed(Some(&v));
        assert_eq!(zero.metal_label, "Rose Gold 18K");
        assert_eq!(zero.metal_type.as_deref(), Some("rose_gold"));
        assert_eq!(zero.retail_price, 0.0);
    }

    #[test]
    fn test_task_document_flattens_selections() {
        let doc = serde_json::json!({
            "taskId": "T1",
            "title": "Ring sizing",
            "category": "shanks",
            "processes": [{ "processId": "P1", "quantity": 1 }],
            "materials": [],
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z"
        });
        let task: RepairTask = serde_json::from_value(doc).unwrap();
        assert_eq!(task.selections.processes.len(), 1);
        assert!(task.pricing.is_empty());
        assert!(task.has_processes());
    }
}
