// ==========================================
// 珠宝维修定价系统 - 经营公式引擎
// ==========================================
// 公式:
//   材料合计 = 未加价小计 × materialMarkup + 已加价小计
//   基础成本 = 工序成本 + 材料合计
//   经营系数 = 行政费 + 经营费 + 耗材费 + 1
//   零售价   = round2(基础成本 × 经营系数)
//   批发价   = round2(零售价 × WHOLESALE_FACTOR)
// 红线: 仅在产出最终结果时舍入到 2 位小数
// ==========================================

use crate::domain::settings::AdminSettings;
use crate::engine::cost_aggregator::CostTotals;

/// 批发价系数（作用于已舍入的零售价）
pub const WHOLESALE_FACTOR: f64 = 0.5;

/// 舍入到 2 位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 公式结果（base/material 未舍入，retail/wholesale 已舍入）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormulaOutcome {
    pub total_material_cost: f64,
    pub base_cost: f64,
    pub business_multiplier: f64,
    pub retail_price: f64,
    pub wholesale_price: f64,
}

// ==========================================
// BusinessFormulaEngine - 经营公式引擎
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct BusinessFormulaEngine;

impl BusinessFormulaEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn apply(&self, totals: &CostTotals, settings: &AdminSettings) -> FormulaOutcome {
        let marked_up_materials = totals.raw_material_subtotal * settings.material_markup;
        let total_material_cost = marked_up_materials + totals.premarked_material_subtotal;
        let base_cost = totals.total_process_cost + total_material_cost;
        let business_multiplier = settings.business_multiplier();
        let retail_price = round2(base_cost * business_multiplier);
        let wholesale_price = round2(retail_price * WHOLESALE_FACTOR);

        FormulaOutcome {
            total_material_cost,
            base_cost,
            business_multiplier,
            retail_price,
            wholesale_price,
        }
    }
}
