// ==========================================
// 珠宝维修定价系统 - 成本聚合器
// ==========================================
// 职责: 对单个变体（或通用定价）汇总人工/工序成本与材料成本
// 输入: 变体 + 已解析的工序/材料 + 管理设置
// 输出: CostTotals（材料成本按 已加价 / 未加价 分桶）
// 红线: 纯内存计算，不访问存储；中间值不做舍入
// ==========================================

use crate::domain::process::RepairProcess;
use crate::domain::settings::AdminSettings;
use crate::domain::variant::MetalVariant;
use crate::engine::lookup::{ResolvedMaterial, ResolvedProcess};
use crate::engine::price_source::resolve_unit_price;
use serde::{Deserialize, Serialize};

/// 单变体成本合计（未舍入）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostTotals {
    pub total_labor_hours: f64,
    pub total_process_cost: f64,
    pub raw_material_subtotal: f64,
    pub premarked_material_subtotal: f64,
}

// ==========================================
// CostAggregator - 成本聚合器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct CostAggregator;

impl CostAggregator {
    pub fn new() -> Self {
        Self
    }

    /// 汇总指定变体的成本
    ///
    /// # 参数
    /// - variant: None 表示通用定价
    pub fn aggregate(
        &self,
        variant: Option<&MetalVariant>,
        processes: &[ResolvedProcess],
        materials: &[ResolvedMaterial],
        settings: &AdminSettings,
    ) -> CostTotals {
        let mut totals = CostTotals::default();

        for item in processes {
            let q = f64::from(item.quantity);
            totals.total_labor_hours += item.process.labor_hours.max(0.0) * q;
            totals.total_process_cost += self.process_unit_cost(&item.process, variant, settings) * q;
        }

        for item in materials {
            let q = f64::from(item.quantity);
            let Some(price) = resolve_unit_price(&item.material, variant) else {
                continue;
            };
            if price.already_marked_up {
                totals.premarked_material_subtotal += price.value * q;
            } else {
                totals.raw_material_subtotal += price.value * q;
            }
        }

        totals
    }

    /// 单个工序的单次成本
    ///
    /// 1. 该变体的存储价
    /// 2. 通用存储价
    /// 3. 兜底: 工时 × 时薪 × 技能系数 × 金属复杂度
    fn process_unit_cost(
        &self,
        process: &RepairProcess,
        variant: Option<&MetalVariant>,
        settings: &AdminSettings,
    ) -> f64 {
        let stored = &process.pricing.total_cost;
        if let Some(price) = variant.and_then(|v| stored.price_for(v.key())) {
            return price;
        }
        if let Some(price) = stored.universal_price() {
            return price;
        }

        process.labor_hours.max(0.0)
            * settings.wage
            * settings.skill_multiplier(process.skill_level)
            * metal_complexity(process, variant, settings)
    }
}

/// 兜底人工公式中的金属复杂度
///
/// 管理设置中登记了该金属类型时使用设置值，否则使用工序自身的系数（默认 1.0）。
fn metal_complexity(
    process: &RepairProcess,
    variant: Option<&MetalVariant>,
    settings: &AdminSettings,
) -> f64 {
    variant
        .and_then(|v| settings.metal_complexity_lookup(&v.metal_type))
        .unwrap_or(process.metal_complexity_multiplier)
}
