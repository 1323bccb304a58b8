// ==========================================
// 珠宝维修定价系统 - 金属变体解析器
// ==========================================
// 职责: 从任务选中的材料/工序中发现定价相关的 (金属类型, 成色) 变体
// 输入: 已解析的工序与材料文档
// 输出: VariantResolution（Universal 或去重后的变体列表）
// 红线: 从不报错；没有变体是合法结果
// ==========================================

use crate::domain::variant::MetalVariant;
use crate::engine::lookup::{ResolvedMaterial, ResolvedProcess};
use std::collections::BTreeSet;

/// 变体解析结果
///
/// `Universal` 与“出错导致的空列表”严格区分：`Variants` 永远非空。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantResolution {
    Universal,
    Variants(Vec<MetalVariant>),
}

impl VariantResolution {
    pub fn is_universal(&self) -> bool {
        matches!(self, VariantResolution::Universal)
    }

    pub fn variant_count(&self) -> usize {
        match self {
            VariantResolution::Universal => 0,
            VariantResolution::Variants(v) => v.len(),
        }
    }
}

// ==========================================
// MetalVariantResolver - 金属变体解析器
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct MetalVariantResolver;

impl MetalVariantResolver {
    pub fn new() -> Self {
        Self
    }

    /// 解析任务的变体集合
    ///
    /// 来源:
    /// 1. 材料 stullerProducts 中同时具备 metalType 与 karat 的条目
    /// 2. 按变体定价工序的 pricing.totalCost 键（反解析为 metalType/karat）
    ///
    /// 按 (metal_type, karat) 去重，结果按规范顺序排列。
    pub fn resolve(
        &self,
        processes: &[ResolvedProcess],
        materials: &[ResolvedMaterial],
    ) -> VariantResolution {
        let mut found: BTreeSet<MetalVariant> = BTreeSet::new();

        for item in materials {
            found.extend(item.material.variants());
        }

        for item in processes {
            for key in item.process.pricing.total_cost.variant_keys() {
                match MetalVariant::from_key(key) {
                    Some(variant) => {
                        found.insert(variant);
                    }
                    None => tracing::debug!(
                        process_id = %item.process.process_id,
                        key,
                        "工序变体键无法反解析，已忽略"
                    ),
                }
            }
        }

        if found.is_empty() {
            VariantResolution::Universal
        } else {
            VariantResolution::Variants(found.into_iter().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::process::ProcessPricing;
    use crate::domain::material::StullerProduct;
    use crate::engine::test_support::{material, process, rm, rp, variant_product};
    use std::collections::BTreeMap;

    #[test]
    fn test_material_variants_are_deduplicated() {
        let mut solder = material("M1", 10, true, 0.0);
        solder.stuller_products = vec![
            variant_product("yellow_gold", "14K"),
            variant_product("Yellow Gold", "14k"),
            variant_product("white_gold", "14K"),
            StullerProduct::default(),
        ];
        let mut wire = material("M2", 1, true, 0.0);
        wire.stuller_products = vec![variant_product("yellow_gold", "14K")];

        let resolution = MetalVariantResolver::new().resolve(&[], &[rm(solder, 1), rm(wire, 1)]);
        let VariantResolution::Variants(variants) = resolution else {
            panic!("expected variants");
        };
        let keys: Vec<&str> = variants.iter().map(|v| v.key()).collect();
        assert_eq!(keys, vec!["White Gold 14K", "Yellow Gold 14K"]);
    }

    #[test]
    fn test_process_keys_union_with_material_variants() {
        let mut map = BTreeMap::new();
        map.insert("Platinum PT950".to_string(), 80.0);
        map.insert("Yellow Gold 14K".to_string(), 40.0);
        let sizing = process("P1", 1.0, ProcessPricing::PerVariant(map));

        let mut solder = material("M1", 10, true, 0.0);
        solder.stuller_products = vec![variant_product("yellow_gold", "14K")];

        let resolution = MetalVariantResolver::new().resolve(&[rp(sizing, 1)], &[rm(solder, 1)]);
        assert_eq!(resolution.variant_count(), 2);
    }

    #[test]
    fn test_no_variants_is_universal() {
        let mut glue = material("M1", 1, false, 2.0);
        glue.stuller_products = vec![StullerProduct {
            metal_type: Some("yellow_gold".into()),
            ..StullerProduct::default()
        }];
        let polish = process("P1", 0.5, ProcessPricing::Universal(15.0));

        let resolution = MetalVariantResolver::new().resolve(&[rp(polish, 1)], &[rm(glue, 1)]);
        assert!(resolution.is_universal());
        assert_eq!(resolution.variant_count(), 0);
    }
}
