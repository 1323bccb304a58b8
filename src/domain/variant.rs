// ==========================================
// 珠宝维修定价系统 - 金属变体与变体键
// ==========================================
// 职责: 金属类型+成色 (metal type + karat) 的规范化与键格式
// 红线: VariantKey 格式 "<MetalLabel> <Karat>" 是定价引擎与所有调用方之间的稳定查找契约
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 与金属无关的定价条目键
pub const UNIVERSAL_VARIANT_KEY: &str = "universal";

/// 已知金属类型 → 显示名
///
/// 新增金属类型优先加入此表；未登记的类型回退为通用 Title Case 转换。
const METAL_TYPE_LABELS: &[(&str, &str)] = &[
    ("yellow_gold", "Yellow Gold"),
    ("white_gold", "White Gold"),
    ("rose_gold", "Rose Gold"),
    ("sterling_silver", "Sterling Silver"),
    ("fine_silver", "Fine Silver"),
    ("platinum", "Platinum"),
    ("palladium", "Palladium"),
    ("titanium", "Titanium"),
    ("stainless_steel", "Stainless Steel"),
];

// ==========================================
// MetalVariant - 金属变体
// ==========================================
// 去重口径: (metal_type, karat)；metal_label 由二者确定性派生
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalVariant {
    pub metal_type: String,  // 规范化后的金属类型（如 yellow_gold）
    pub karat: String,       // 规范化后的成色（如 14K）
    pub metal_label: String, // 变体键（如 "Yellow Gold 14K"）
}

impl MetalVariant {
    /// 由原始金属类型与成色构建变体（自动规范化）
    pub fn new(metal_type: &str, karat: &str) -> Self {
        let metal_type = normalize_metal_type(metal_type);
        let karat = normalize_karat(karat);
        let metal_label = format_metal_key(&metal_type, &karat);
        Self {
            metal_type,
            karat,
            metal_label,
        }
    }

    /// 从变体键反解析（"Yellow Gold 14K" → yellow_gold + 14K）
    pub fn from_key(key: &str) -> Option<Self> {
        parse_metal_key(key).map(|(metal_type, karat)| Self::new(&metal_type, &karat))
    }

    /// 变体键
    pub fn key(&self) -> &str {
        &self.metal_label
    }

    /// 是否与给定的 (metal_type, karat) 精确匹配（规范化后比较）
    pub fn matches(&self, metal_type: &str, karat: &str) -> bool {
        self.metal_type == normalize_metal_type(metal_type) && self.karat == normalize_karat(karat)
    }
}

impl fmt::Display for MetalVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.metal_label)
    }
}

// ==========================================
// 键格式化 / 反解析
// ==========================================

/// 金属类型规范化: 去空白、小写、空格与连字符转下划线
///
/// "Yellow Gold" / "yellow-gold" / "YELLOW_GOLD" → "yellow_gold"
pub fn normalize_metal_type(metal_type: &str) -> String {
    metal_type
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// 成色规范化: 去除全部空白、大写（"14k" / "14 K" → "14K"）
pub fn normalize_karat(karat: &str) -> String {
    karat
        .split_whitespace()
        .collect::<String>()
        .to_uppercase()
}

/// 金属类型显示名
pub fn metal_type_label(metal_type: &str) -> String {
    let normalized = normalize_metal_type(metal_type);
    if let Some((_, label)) = METAL_TYPE_LABELS.iter().find(|(k, _)| *k == normalized) {
        return (*label).to_string();
    }

    normalized
        .split('_')
        .filter(|s| !s.is_empty())
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 构建变体键: TitleCase(metal_type) + " " + karat
///
/// `yellow_gold` + `14K` → `"Yellow Gold 14K"`
pub fn format_metal_key(metal_type: &str, karat: &str) -> String {
    let label = metal_type_label(metal_type);
    let karat = normalize_karat(karat);
    if karat.is_empty() {
        label
    } else {
        format!("{} {}", label, karat)
    }
}

/// 变体键反解析为 (metal_type, karat)
///
/// 先按已知金属显示名匹配前缀，其余部分为成色（允许含空白，如 "14 K"）。
/// 未登记的显示名: 从第一个以数字开头的 token 起为成色，否则取最后一个 token。
/// 返回 None: 键为 "universal"、为空或缺少成色部分。
pub fn parse_metal_key(key: &str) -> Option<(String, String)> {
    let key = key.trim();
    if key.is_empty() || key.eq_ignore_ascii_case(UNIVERSAL_VARIANT_KEY) {
        return None;
    }

    let tokens: Vec<&str> = key.split_whitespace().collect();

    // 最长的已知显示名优先
    let known = METAL_TYPE_LABELS
        .iter()
        .filter_map(|(metal_type, label)| {
            let width = label.split_whitespace().count();
            let matched = tokens.len() > width
                && label
                    .split_whitespace()
                    .zip(&tokens)
                    .all(|(l, t)| l.eq_ignore_ascii_case(t));
            matched.then_some((width, *metal_type))
        })
        .max_by_key(|(width, _)| *width);

    let (metal_type, karat_tokens) = match known {
        Some((width, metal_type)) => (metal_type.to_string(), &tokens[width..]),
        None => {
            let split = tokens
                .iter()
                .skip(1)
                .position(|t| t.starts_with(|c: char| c.is_ascii_digit()))
                .map(|i| i + 1)
                .unwrap_or(tokens.len().saturating_sub(1));
            if split == 0 {
                return None;
            }
            (normalize_metal_type(&tokens[..split].join(" ")), &tokens[split..])
        }
    };

    let karat = normalize_karat(&karat_tokens.concat());
    if karat.is_empty() {
        return None;
    }
    Some((metal_type, karat))
}
