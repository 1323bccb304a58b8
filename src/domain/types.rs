// ==========================================
// 珠宝维修定价系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 技能等级 (Skill Level)
// ==========================================
// 序列化格式: lowercase (与文档库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Basic,    // 基础
    #[default]
    Standard, // 标准
    Advanced, // 高级
    Expert,   // 专家
}

impl SkillLevel {
    /// 宽松解析（未知值回退为 Standard）
    pub fn from_str_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "basic" => SkillLevel::Basic,
            "advanced" => SkillLevel::Advanced,
            "expert" => SkillLevel::Expert,
            _ => SkillLevel::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Basic => "basic",
            SkillLevel::Standard => "standard",
            SkillLevel::Advanced => "advanced",
            SkillLevel::Expert => "expert",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 定价状态 (Pricing State)
// ==========================================
// Draft → Computed → Stale → (重新计算) → Computed
// 红线: 没有自动离开 Stale 的转换,必须显式触发重算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingState {
    Draft,    // 尚未计算过定价
    Computed, // 定价已计算且未过期
    Stale,    // 引用的工序/材料/管理设置在定价之后发生了变更
}

impl fmt::Display for PricingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingState::Draft => write!(f, "DRAFT"),
            PricingState::Computed => write!(f, "COMPUTED"),
            PricingState::Stale => write!(f, "STALE"),
        }
    }
}
