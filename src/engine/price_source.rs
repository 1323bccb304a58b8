// ==========================================
// 珠宝维修定价系统 - 材料单价解析
// ==========================================
// 职责: 按固定优先级解析材料每份单价，并标记是否已含加价
// 优先级: pricePerPortion(已加价) → costPerPortion(未加价) → stullerPrice / portionsPerUnit(未加价)
// 红线: 加价只施加一次，由 already_marked_up 决定落入哪个小计
// ==========================================

use crate::domain::material::{RepairMaterial, StullerProduct};
use crate::domain::variant::MetalVariant;
use serde::{Deserialize, Serialize};

/// 单价来源字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriceSource {
    PricePerPortion,
    CostPerPortion,
    StullerPrice,
    UnitCost,
}

/// 已解析的每份单价
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitPrice {
    pub value: f64,
    pub already_marked_up: bool,
    pub source: PriceSource,
}

impl UnitPrice {
    fn raw(value: f64, source: PriceSource) -> Self {
        Self {
            value,
            already_marked_up: false,
            source,
        }
    }

    fn marked_up(value: f64) -> Self {
        Self {
            value,
            already_marked_up: true,
            source: PriceSource::PricePerPortion,
        }
    }
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

/// 解析单个价格条目的每份单价
///
/// # 返回
/// - None: 条目没有任何可用价格字段
pub fn resolve_product_price(product: &StullerProduct, portions: f64) -> Option<UnitPrice> {
    if let Some(v) = usable(product.price_per_portion) {
        return Some(UnitPrice::marked_up(v));
    }
    if let Some(v) = usable(product.cost_per_portion) {
        return Some(UnitPrice::raw(v, PriceSource::CostPerPortion));
    }
    usable(product.stuller_price)
        .map(|v| UnitPrice::raw(v / portions.max(1.0), PriceSource::StullerPrice))
}

/// 解析材料的通用单价
///
/// 第一个通用价格条目（无 metalType/karat）优先；否则 unitCost / portionsPerUnit。
pub fn resolve_universal_price(material: &RepairMaterial) -> UnitPrice {
    let portions = material.effective_portions();
    if let Some(price) = material
        .universal_product()
        .and_then(|p| resolve_product_price(p, portions))
    {
        return price;
    }
    let unit_cost = usable(Some(material.unit_cost)).unwrap_or(0.0);
    UnitPrice::raw(unit_cost / portions, PriceSource::UnitCost)
}

/// 解析材料在指定变体下的每份单价
///
/// # 参数
/// - variant: None 表示通用定价（"universal"）
///
/// # 返回
/// - Some(UnitPrice): 可计价
/// - None: 随金属定价的材料不支持该变体（对该变体贡献 0）
pub fn resolve_unit_price(
    material: &RepairMaterial,
    variant: Option<&MetalVariant>,
) -> Option<UnitPrice> {
    match variant {
        Some(variant) if material.is_metal_dependent => {
            let product = material.find_variant_product(variant)?;
            let price = resolve_product_price(product, material.effective_portions());
            if price.is_none() {
                tracing::debug!(
                    material_id = %material.material_id,
                    variant = %variant,
                    "变体价格条目没有可用价格字段"
                );
            }
            price
        }
        // 通用定价或非金属相关材料: 同一个值贡献给所有变体
        _ => Some(resolve_universal_price(material)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{material, variant_product};

    #[test]
    fn test_price_per_portion_wins_and_is_marked_up() {
        let product = StullerProduct {
            price_per_portion: Some(4.5),
            cost_per_portion: Some(3.0),
            stuller_price: Some(100.0),
            ..StullerProduct::default()
        };
        let price = resolve_product_price(&product, 10.0).unwrap();
        assert_eq!(price.value, 4.5);
        assert!(price.already_marked_up);
        assert_eq!(price.source, PriceSource::PricePerPortion);
    }

    #[test]
    fn test_cost_per_portion_then_stuller_price_are_raw() {
        let product = StullerProduct {
            cost_per_portion: Some(3.0),
            stuller_price: Some(100.0),
            ..StullerProduct::default()
        };
        let price = resolve_product_price(&product, 10.0).unwrap();
        assert_eq!(price, UnitPrice::raw(3.0, PriceSource::CostPerPortion));

        let product = StullerProduct {
            stuller_price: Some(100.0),
            ..StullerProduct::default()
        };
        let price = resolve_product_price(&product, 8.0).unwrap();
        assert_eq!(price, UnitPrice::raw(12.5, PriceSource::StullerPrice));

        assert!(resolve_product_price(&StullerProduct::default(), 1.0).is_none());
    }

    #[test]
    fn test_universal_price_falls_back_to_unit_cost() {
        let sheet = material("M1", 4, false, 10.0);
        let price = resolve_universal_price(&sheet);
        assert_eq!(price, UnitPrice::raw(2.5, PriceSource::UnitCost));

        let mut sheet = material("M1", 4, false, 10.0);
        sheet.stuller_products = vec![
            variant_product("yellow_gold", "14K"),
            StullerProduct {
                stuller_price: Some(20.0),
                ..StullerProduct::default()
            },
        ];
        let price = resolve_universal_price(&sheet);
        assert_eq!(price, UnitPrice::raw(5.0, PriceSource::StullerPrice));
    }

    #[test]
    fn test_metal_dependent_material_without_match_is_unsupported() {
        let mut solder = material("M1", 1, true, 9.0);
        let mut yg = variant_product("yellow_gold", "14K");
        yg.cost_per_portion = Some(2.0);
        solder.stuller_products = vec![yg];

        let yg14 = MetalVariant::new("yellow_gold", "14K");
        let wg14 = MetalVariant::new("white_gold", "14K");
        assert_eq!(resolve_unit_price(&solder, Some(&yg14)).unwrap().value, 2.0);
        assert!(resolve_unit_price(&solder, Some(&wg14)).is_none());

        // 通用定价路径
        let universal = resolve_unit_price(&solder, None).unwrap();
        assert_eq!(universal.source, PriceSource::UnitCost);
        assert_eq!(universal.value, 9.0);
    }
}
