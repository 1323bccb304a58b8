// ==========================================
// 珠宝维修定价系统 - 工序领域模型
// ==========================================
// 职责: 工序（可复用的人工配方）及其存储定价
// 红线: pricing.totalCost 的多态形态在加载时一次性解析为 ProcessPricing,
//       读取处不再做类型判断
// ==========================================

use crate::domain::types::SkillLevel;
use crate::domain::variant::{format_metal_key, parse_metal_key};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

// ==========================================
// ProcessPricing - 工序存储定价（标签联合）
// ==========================================
// 文档形态:
// - 数值            → Universal(amount)
// - {变体键: 数值}  → PerVariant(map)
// - 缺失/null/非法  → Unpriced（计算时走人工兜底公式）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum ProcessPricing {
    Universal(f64),
    PerVariant(BTreeMap<String, f64>),
    #[default]
    Unpriced,
}

impl ProcessPricing {
    /// 指定变体键的存储价（仅 PerVariant）
    pub fn price_for(&self, variant_key: &str) -> Option<f64> {
        match self {
            ProcessPricing::PerVariant(map) => map.get(variant_key).copied(),
            _ => None,
        }
    }

    /// 通用存储价（仅 Universal）
    pub fn universal_price(&self) -> Option<f64> {
        match self {
            ProcessPricing::Universal(amount) => Some(*amount),
            _ => None,
        }
    }

    /// 按变体定价的全部变体键
    pub fn variant_keys(&self) -> Vec<&str> {
        match self {
            ProcessPricing::PerVariant(map) => map.keys().map(|k| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_per_variant(&self) -> bool {
        matches!(self, ProcessPricing::PerVariant(_))
    }
}

fn json_amount(value: &JsonValue) -> Option<f64> {
    let amount = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if amount.is_finite() && amount >= 0.0 {
        Some(amount)
    } else {
        None
    }
}

impl From<JsonValue> for ProcessPricing {
    fn from(value: JsonValue) -> Self {
        match &value {
            JsonValue::Object(obj) => {
                let mut map = BTreeMap::new();
                for (key, raw) in obj {
                    // 变体键统一为规范格式；无法解析的键丢弃
                    let Some((metal_type, karat)) = parse_metal_key(key) else {
                        tracing::warn!(key = %key, "工序变体定价键无法解析，已忽略");
                        continue;
                    };
                    if let Some(amount) = json_amount(raw) {
                        map.insert(format_metal_key(&metal_type, &karat), amount);
                    }
                }
                if map.is_empty() {
                    ProcessPricing::Unpriced
                } else {
                    ProcessPricing::PerVariant(map)
                }
            }
            other => match json_amount(other) {
                Some(amount) => ProcessPricing::Universal(amount),
                None => ProcessPricing::Unpriced,
            },
        }
    }
}

impl From<ProcessPricing> for JsonValue {
    fn from(pricing: ProcessPricing) -> Self {
        match pricing {
            ProcessPricing::Universal(amount) => serde_json::json!(amount),
            ProcessPricing::PerVariant(map) => {
                let obj: Map<String, JsonValue> = map
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::json!(v)))
                    .collect();
                JsonValue::Object(obj)
            }
            ProcessPricing::Unpriced => JsonValue::Null,
        }
    }
}

// ==========================================
// ProcessPricingDoc - 工序定价子文档
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPricingDoc {
    #[serde(default)]
    pub total_cost: ProcessPricing,
}

// ==========================================
// ProcessMaterialEstimate - 工序内置材料估算
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessMaterialEstimate {
    #[serde(default)]
    pub material_id: Option<String>,
    #[serde(default)]
    pub estimated_cost: f64,
}

// ==========================================
// RepairProcess - 工序
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairProcess {
    // ===== 主键 =====
    pub process_id: String,

    // ===== 基础信息 =====
    pub display_name: String,
    #[serde(default)]
    pub category: Option<String>,

    // ===== 人工 =====
    pub labor_hours: f64,          // 工时（≥0）
    pub skill_level: SkillLevel,   // 技能等级
    #[serde(default)]
    pub materials: Vec<ProcessMaterialEstimate>,

    // ===== 定价 =====
    #[serde(default)]
    pub pricing: ProcessPricingDoc,
    #[serde(default = "default_metal_complexity")]
    pub metal_complexity_multiplier: f64,

    // ===== 审计字段 =====
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_metal_complexity() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pricing_from_number_is_universal() {
        assert_eq!(ProcessPricing::from(json!(45.5)), ProcessPricing::Universal(45.5));
        assert_eq!(ProcessPricing::from(json!("12.00")), ProcessPricing::Universal(12.0));
    }

    #[test]
    fn test_pricing_from_map_is_per_variant_with_canonical_keys() {
        let pricing = ProcessPricing::from(json!({
            "Yellow Gold 14K": 40.0,
            "white gold 14k": 42.5,
            "bogus": 10.0
        }));

        assert!(pricing.is_per_variant());
        assert_eq!(pricing.price_for("Yellow Gold 14K"), Some(40.0));
        assert_eq!(pricing.price_for("White Gold 14K"), Some(42.5));
        assert_eq!(pricing.variant_keys().len(), 2);
        assert_eq!(pricing.universal_price(), None);
    }

    #[test]
    fn test_pricing_from_null_or_negative_is_unpriced() {
        assert_eq!(ProcessPricing::from(JsonValue::Null), ProcessPricing::Unpriced);
        assert_eq!(ProcessPricing::from(json!(-3.0)), ProcessPricing::Unpriced);
        assert_eq!(ProcessPricing::from(json!({})), ProcessPricing::Unpriced);
    }

    #[test]
    fn test_process_document_deserialize() {
        let doc = json!({
            "processId": "P-SIZE-UP",
            "displayName": "Ring sizing up",
            "laborHours": 0.5,
            "skillLevel": "advanced",
            "pricing": { "totalCost": { "Yellow Gold 14K": 55.0 } },
            "createdAt": "2026-01-01T00:00:00Z",
            "updatedAt": "2026-01-01T00:00:00Z"
        });

        let process: RepairProcess = serde_json::from_value(doc).unwrap();
        assert_eq!(process.skill_level, SkillLevel::Advanced);
        assert_eq!(process.metal_complexity_multiplier, 1.0);
        assert!(process.is_active);
        assert_eq!(process.pricing.total_cost.price_for("Yellow Gold 14K"), Some(55.0));
    }
}
