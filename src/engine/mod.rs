// ==========================================
// 珠宝维修定价系统 - 定价引擎层
// ==========================================
// 职责: 变体解析 / 成本聚合 / 经营公式 / 编排 / 重算
// 红线: Engine 不拼 SQL；文档读取经由 PricingDocumentSource
// ==========================================

pub mod business_formula;
pub mod cost_aggregator;
pub mod error;
pub mod lookup;
pub mod orchestrator;
pub mod price_source;
pub mod recalc;
pub mod repositories;
pub mod staleness;
pub mod variant_resolver;

#[cfg(test)]
pub(crate) mod test_support;

// 重导出核心引擎
pub use business_formula::{round2, BusinessFormulaEngine, FormulaOutcome, WHOLESALE_FACTOR};
pub use cost_aggregator::{CostAggregator, CostTotals};
pub use error::{PricingError, PricingResult};
pub use lookup::{DocumentCache, PricingDocumentSource, ResolvedMaterial, ResolvedProcess, ResolvedTask};
pub use orchestrator::{
    compute_pricing_map, compute_variant_pricing, PricingMode, PricingOrchestrator, PricingOutcome,
};
pub use price_source::{resolve_product_price, resolve_universal_price, resolve_unit_price, PriceSource, UnitPrice};
pub use recalc::{PricingRecalcEngine, RecalcSummary, RecalcTaskError};
pub use repositories::PricingRepositories;
pub use staleness::PricingStateEvaluator;
pub use variant_resolver::{MetalVariantResolver, VariantResolution};
