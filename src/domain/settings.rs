// ==========================================
// 珠宝维修定价系统 - 管理设置 (AdminSettings)
// ==========================================
// 职责: 工资、技能系数、材料加价、费用系数、金属复杂度系数
// 红线: 对定价引擎只读；由配置层加载
// ==========================================

use crate::domain::types::SkillLevel;
use crate::domain::variant::normalize_metal_type;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// SkillLevelMultipliers - 技能等级系数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillLevelMultipliers {
    pub basic: f64,
    pub standard: f64,
    pub advanced: f64,
    pub expert: f64,
}

impl Default for SkillLevelMultipliers {
    fn default() -> Self {
        Self {
            basic: 0.75,
            standard: 1.0,
            advanced: 1.25,
            expert: 1.5,
        }
    }
}

impl SkillLevelMultipliers {
    pub fn for_level(&self, level: SkillLevel) -> f64 {
        match level {
            SkillLevel::Basic => self.basic,
            SkillLevel::Standard => self.standard,
            SkillLevel::Advanced => self.advanced,
            SkillLevel::Expert => self.expert,
        }
    }
}

// ==========================================
// AdminSettings - 管理设置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    pub wage: f64,                                        // 时薪
    pub skill_level_multipliers: SkillLevelMultipliers,   // 技能等级系数
    pub material_markup: f64,                             // 材料加价倍数（≥1）
    pub administrative_fee: f64,                          // 行政费率
    pub business_fee: f64,                                // 经营费率
    pub consumables_fee: f64,                             // 耗材费率
    pub metal_complexity_multipliers: BTreeMap<String, f64>, // 金属类型 → 复杂度系数
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            wage: 0.0,
            skill_level_multipliers: SkillLevelMultipliers::default(),
            material_markup: 1.0,
            administrative_fee: 0.0,
            business_fee: 0.0,
            consumables_fee: 0.0,
            metal_complexity_multipliers: BTreeMap::new(),
        }
    }
}

impl AdminSettings {
    /// 经营系数 = 行政费 + 经营费 + 耗材费 + 1
    pub fn business_multiplier(&self) -> f64 {
        self.administrative_fee + self.business_fee + self.consumables_fee + 1.0
    }

    /// 技能等级系数
    pub fn skill_multiplier(&self, level: SkillLevel) -> f64 {
        self.skill_level_multipliers.for_level(level)
    }

    /// 金属类型在管理设置中登记的复杂度系数（未登记返回 None）
    pub fn metal_complexity_lookup(&self, metal_type: &str) -> Option<f64> {
        let normalized = normalize_metal_type(metal_type);
        self.metal_complexity_multipliers
            .iter()
            .find(|(k, _)| normalize_metal_type(k) == normalized)
            .map(|(_, v)| *v)
    }

    /// 金属复杂度系数（未登记时默认 1.0）
    pub fn metal_complexity_for(&self, metal_type: &str) -> f64 {
        self.metal_complexity_lookup(metal_type).unwrap_or(1.0)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();

        if !self.wage.is_finite() || self.wage < 0.0 {
            violations.push(format!("wage 必须为非负数: {}", self.wage));
        }
        if !self.material_markup.is_finite() || self.material_markup < 1.0 {
            violations.push(format!(
                "materialMarkup 必须 ≥ 1: {}",
                self.material_markup
            ));
        }
        for (name, fee) in [
            ("administrativeFee", self.administrative_fee),
            ("businessFee", self.business_fee),
            ("consumablesFee", self.consumables_fee),
        ] {
            if !fee.is_finite() || fee < 0.0 {
                violations.push(format!("{} 必须为非负数: {}", name, fee));
            }
        }
        for (metal_type, m) in &self.metal_complexity_multipliers {
            if !m.is_finite() || *m < 0.0 {
                violations.push(format!("金属复杂度系数({}) 必须为非负数: {}", metal_type, m));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_multiplier() {
        let settings = AdminSettings {
            administrative_fee: 0.10,
            business_fee: 0.05,
            consumables_fee: 0.05,
            ..AdminSettings::default()
        };
        assert!((settings.business_multiplier() - 1.20).abs() < 1e-9);
    }

    #[test]
    fn test_metal_complexity_lookup_is_normalized() {
        let mut settings = AdminSettings::default();
        settings
            .metal_complexity_multipliers
            .insert("platinum".to_string(), 1.3);
        settings
            .metal_complexity_multipliers
            .insert("White Gold".to_string(), 1.1);

        assert_eq!(settings.metal_complexity_for("platinum"), 1.3);
        assert_eq!(settings.metal_complexity_for("white_gold"), 1.1);
        assert_eq!(settings.metal_complexity_for("yellow_gold"), 1.0);
    }

    #[test]
    fn test_validate_collects_all_violations() {
        let settings = AdminSettings {
            wage: -1.0,
            material_markup: 0.5,
            business_fee: -0.1,
            ..AdminSettings::default()
        };
        let violations = settings.validate().unwrap_err();
        assert_eq!(violations.len(), 3);

        assert!(AdminSettings {
            wage: 30.0,
            ..AdminSettings::default()
        }
        .validate()
        .is_ok());
    }
}
