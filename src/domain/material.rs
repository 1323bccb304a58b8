// ==========================================
// 珠宝维修定价系统 - 材料领域模型
// ==========================================
// 职责: 耗材库存与按金属类型/成色的供应商价格点 (stullerProducts)
// 红线: 同时具备 metalType 与 karat 的条目才定义一个定价变体；
//       两者皆无的条目为通用价格点
// ==========================================

use crate::domain::variant::MetalVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// StullerProduct - 供应商价格条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StullerProduct {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub metal_type: Option<String>,
    #[serde(default)]
    pub karat: Option<String>,
    #[serde(default)]
    pub stuller_price: Option<f64>,     // 整单位采购价（未加价）
    #[serde(default)]
    pub cost_per_portion: Option<f64>,  // 每份成本（未加价）
    #[serde(default)]
    pub price_per_portion: Option<f64>, // 每份售价（已含加价）
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl StullerProduct {
    /// 该条目定义的变体（metalType 与 karat 均存在时）
    pub fn variant(&self) -> Option<MetalVariant> {
        match (non_blank(&self.metal_type), non_blank(&self.karat)) {
            (Some(metal_type), Some(karat)) => Some(MetalVariant::new(metal_type, karat)),
            _ => None,
        }
    }

    /// 是否为通用价格点（metalType 与 karat 均缺失）
    pub fn is_universal(&self) -> bool {
        non_blank(&self.metal_type).is_none() && non_blank(&self.karat).is_none()
    }

    /// 是否与指定变体精确匹配
    pub fn matches_variant(&self, variant: &MetalVariant) -> bool {
        match (non_blank(&self.metal_type), non_blank(&self.karat)) {
            (Some(metal_type), Some(karat)) => variant.matches(metal_type, karat),
            _ => false,
        }
    }
}

// ==========================================
// RepairMaterial - 材料
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairMaterial {
    // ===== 主键 =====
    pub material_id: String,

    // ===== 基础信息 =====
    pub display_name: String,
    #[serde(default)]
    pub category: Option<String>,

    // ===== 计价 =====
    #[serde(default = "default_portions")]
    pub portions_per_unit: u32,    // 每单位份数（≥1）
    #[serde(default)]
    pub is_metal_dependent: bool,  // 是否随金属变体定价
    #[serde(default)]
    pub unit_cost: f64,            // 整单位成本（未加价）
    #[serde(default)]
    pub stuller_products: Vec<StullerProduct>,

    // ===== 审计字段 =====
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_portions() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl RepairMaterial {
    /// 有效份数（0 视为 1）
    pub fn effective_portions(&self) -> f64 {
        f64::from(self.portions_per_unit.max(1))
    }

    /// 查找与变体精确匹配的价格条目
    pub fn find_variant_product(&self, variant: &MetalVariant) -> Option<&StullerProduct> {
        self.stuller_products
            .iter()
            .find(|p| p.matches_variant(variant))
    }

    /// 第一个通用价格条目
    pub fn universal_product(&self) -> Option<&StullerProduct> {
        self.stuller_products.iter().find(|p| p.is_universal())
    }

    /// 该材料暴露的全部变体（按出现顺序，未去重）
    pub fn variants(&self) -> impl Iterator<Item = MetalVariant> + '_ {
        self.stuller_products.iter().filter_map(|p| p.variant())
    }
}
