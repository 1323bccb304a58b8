// ==========================================
// 珠宝维修定价系统 - 定价编排器
// ==========================================
// 用途: 协调 变体解析 → 成本聚合 → 经营公式，产出任务定价映射
// 红线: 交互路径与批量路径共用同一个纯函数 compute_variant_pricing
// 失败语义:
// - 引用缺失: 跳过并告警
// - 管理设置缺失: 交互路径报错；批量路径降级为全零明细
// ==========================================

use crate::config::PricingSettingsReader;
use crate::domain::settings::AdminSettings;
use crate::domain::task::{PriceBreakdown, PricingMap, TaskSelections};
use crate::domain::variant::{MetalVariant, UNIVERSAL_VARIANT_KEY};
use crate::engine::business_formula::{round2, BusinessFormulaEngine};
use crate::engine::cost_aggregator::CostAggregator;
use crate::engine::error::{PricingError, PricingResult};
use crate::engine::lookup::{DocumentCache, PricingDocumentSource, ResolvedMaterial, ResolvedProcess};
use crate::engine::variant_resolver::{MetalVariantResolver, VariantResolution};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// 纯函数入口
// ==========================================

/// 计算单个变体（None = 通用定价）的定价明细
pub fn compute_variant_pricing(
    processes: &[ResolvedProcess],
    materials: &[ResolvedMaterial],
    settings: &AdminSettings,
    variant: Option<&MetalVariant>,
) -> PriceBreakdown {
    let totals = CostAggregator::new().aggregate(variant, processes, materials, settings);
    let outcome = BusinessFormulaEngine::new().apply(&totals, settings);

    let metal_complexity = variant
        .map(|v| settings.metal_complexity_for(&v.metal_type))
        .unwrap_or(1.0);

    PriceBreakdown {
        metal_label: variant
            .map(|v| v.metal_label.clone())
            .unwrap_or_else(|| UNIVERSAL_VARIANT_KEY.to_string()),
        metal_type: variant.map(|v| v.metal_type.clone()),
        karat: variant.map(|v| v.karat.clone()),
        total_labor_hours: round2(totals.total_labor_hours),
        total_process_cost: round2(totals.total_process_cost),
        total_material_cost: round2(outcome.total_material_cost),
        base_cost: round2(outcome.base_cost),
        retail_price: outcome.retail_price,
        wholesale_price: outcome.wholesale_price,
        business_multiplier: outcome.business_multiplier,
        metal_complexity,
    }
}

/// 计算完整定价映射
///
/// - 无变体 → 仅 "universal" 一个键
/// - 有变体 → 每个变体一个键
/// - settings 为 None → 键集合不变，明细全零（批量降级）
pub fn compute_pricing_map(
    processes: &[ResolvedProcess],
    materials: &[ResolvedMaterial],
    settings: Option<&AdminSettings>,
) -> PricingMap {
    let resolution = MetalVariantResolver::new().resolve(processes, materials);
    let mut pricing = PricingMap::new();

    match resolution {
        VariantResolution::Universal => {
            let breakdown = match settings {
                Some(s) => compute_variant_pricing(processes, materials, s, None),
                None => PriceBreakdown::zeroed(None),
            };
            pricing.insert(UNIVERSAL_VARIANT_KEY.to_string(), breakdown);
        }
        VariantResolution::Variants(variants) => {
            for variant in &variants {
                let breakdown = match settings {
                    Some(s) => compute_variant_pricing(processes, materials, s, Some(variant)),
                    None => PriceBreakdown::zeroed(Some(variant)),
                };
                debug!(
                    variant = %variant,
                    retail_price = breakdown.retail_price,
                    "变体定价完成"
                );
                // 变体键与 (metal_type, karat) 一一对应
                debug_assert!(
                    !pricing.contains_key(variant.key()),
                    "duplicate variant key: {}",
                    variant.key()
                );
                if pricing.insert(variant.key().to_string(), breakdown).is_some() {
                    warn!(variant = %variant, "变体键重复，后者覆盖前者");
                }
            }
        }
    }

    pricing
}

// ==========================================
// PricingMode - 调用路径
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingMode {
    Interactive, // 单任务创建/保存/重算
    Batch,       // 批量重算
}

/// 单任务定价结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingOutcome {
    pub pricing: PricingMap,
    pub degraded: bool,                // 管理设置缺失导致全零
    pub missing_processes: Vec<String>,
    pub missing_materials: Vec<String>,
}

// ==========================================
// PricingOrchestrator - 定价编排器
// ==========================================
pub struct PricingOrchestrator<R>
where
    R: PricingSettingsReader + ?Sized,
{
    settings_reader: Arc<R>,
}

impl<R> PricingOrchestrator<R>
where
    R: PricingSettingsReader + ?Sized,
{
    /// 创建新的编排器实例
    pub fn new(settings_reader: Arc<R>) -> Self {
        Self { settings_reader }
    }

    pub fn settings_reader(&self) -> &Arc<R> {
        &self.settings_reader
    }

    /// 按调用路径加载管理设置
    ///
    /// # 返回
    /// - Interactive: 缺失/非法 → Err
    /// - Batch: 缺失/非法 → Ok(None)（调用方降级为全零）
    pub fn load_settings(&self, mode: PricingMode) -> PricingResult<Option<AdminSettings>> {
        let settings = match self.settings_reader.load_admin_settings()? {
            Some(s) => s,
            None => {
                return match mode {
                    PricingMode::Interactive => Err(PricingError::AdminSettingsMissing),
                    PricingMode::Batch => {
                        warn!("管理设置缺失，批量重算降级为全零定价");
                        Ok(None)
                    }
                };
            }
        };

        if let Err(violations) = settings.validate() {
            return match mode {
                PricingMode::Interactive => Err(PricingError::InvalidSettings(violations)),
                PricingMode::Batch => {
                    warn!(?violations, "管理设置非法，批量重算降级为全零定价");
                    Ok(None)
                }
            };
        }

        Ok(Some(settings))
    }

    /// 使用已加载的设置为一组选择项定价（共享缓存）
    pub fn price_with_cache<S>(
        &self,
        selections: &TaskSelections,
        cache: &mut DocumentCache<'_, S>,
        settings: Option<&AdminSettings>,
    ) -> PricingResult<PricingOutcome>
    where
        S: PricingDocumentSource + ?Sized,
    {
        let resolved = cache.resolve(selections)?;
        let pricing = compute_pricing_map(&resolved.processes, &resolved.materials, settings);

        Ok(PricingOutcome {
            pricing,
            degraded: settings.is_none(),
            missing_processes: resolved.missing_processes,
            missing_materials: resolved.missing_materials,
        })
    }

    /// 单次定价入口（加载设置 + 新建计算期缓存）
    #[instrument(skip(self, selections, source), fields(
        processes = selections.processes.len(),
        materials = selections.materials.len()
    ))]
    pub fn price_selections<S>(
        &self,
        selections: &TaskSelections,
        source: &S,
        mode: PricingMode,
    ) -> PricingResult<PricingOutcome>
    where
        S: PricingDocumentSource + ?Sized,
    {
        let settings = self.load_settings(mode)?;
        let mut cache = DocumentCache::new(source);
        let outcome = self.price_with_cache(selections, &mut cache, settings.as_ref())?;

        info!(
            variants = outcome.pricing.len(),
            degraded = outcome.degraded,
            missing_processes = outcome.missing_processes.len(),
            missing_materials = outcome.missing_materials.len(),
            "任务定价完成"
        );
        Ok(outcome)
    }
}
