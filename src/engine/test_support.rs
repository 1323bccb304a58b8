// ==========================================
// 珠宝维修定价系统 - 引擎单元测试辅助
// ==========================================

use crate::domain::material::{RepairMaterial, StullerProduct};
use crate::domain::process::{ProcessPricing, ProcessPricingDoc, RepairProcess};
use crate::domain::settings::AdminSettings;
use crate::domain::types::SkillLevel;
use crate::engine::lookup::{PricingDocumentSource, ResolvedMaterial, ResolvedProcess};
use crate::repository::error::RepositoryResult;
use chrono::{TimeZone, Utc};
use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

/// 内存文档源（带读取计数）
#[derive(Default)]
pub struct InMemoryDocuments {
    processes: HashMap<String, RepairProcess>,
    materials: HashMap<String, RepairMaterial>,
    fetches: Cell<usize>,
}

impl InMemoryDocuments {
    pub fn with_process(mut self, process: RepairProcess) -> Self {
        self.processes.insert(process.process_id.clone(), process);
        self
    }

    pub fn with_material(mut self, material: RepairMaterial) -> Self {
        self.materials.insert(material.material_id.clone(), material);
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

impl PricingDocumentSource for InMemoryDocuments {
    fn fetch_process(&self, process_id: &str) -> RepositoryResult<Option<RepairProcess>> {
        self.fetches.set(self.fetches.get() + 1);
        Ok(self.processes.get(process_id).cloned())
    }

    fn fetch_material(&self, material_id: &str) -> RepositoryResult<Option<RepairMaterial>> {
        self.fetches.set(self.fetches.get() + 1);
        Ok(self.materials.get(material_id).cloned())
    }
}

pub fn process(id: &str, labor_hours: f64, total_cost: ProcessPricing) -> RepairProcess {
    let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    RepairProcess {
        process_id: id.to_string(),
        display_name: id.to_string(),
        category: None,
        labor_hours,
        skill_level: SkillLevel::Standard,
        materials: vec![],
        pricing: ProcessPricingDoc { total_cost },
        metal_complexity_multiplier: 1.0,
        is_active: true,
        created_at: ts,
        updated_at: ts,
    }
}

pub fn material(id: &str, portions: u32, metal_dependent: bool, unit_cost: f64) -> RepairMaterial {
    let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    RepairMaterial {
        material_id: id.to_string(),
        display_name: id.to_string(),
        category: None,
        portions_per_unit: portions,
        is_metal_dependent: metal_dependent,
        unit_cost,
        stuller_products: vec![],
        is_active: true,
        created_at: ts,
        updated_at: ts,
    }
}

pub fn variant_product(metal_type: &str, karat: &str) -> StullerProduct {
    StullerProduct {
        metal_type: Some(metal_type.to_string()),
        karat: Some(karat.to_string()),
        ..StullerProduct::default()
    }
}

pub fn settings(wage: f64, markup: f64) -> AdminSettings {
    AdminSettings {
        wage,
        material_markup: markup,
        ..AdminSettings::default()
    }
}

pub fn rp(process: RepairProcess, quantity: u32) -> ResolvedProcess {
    ResolvedProcess {
        process: Arc::new(process),
        quantity,
    }
}

pub fn rm(material: RepairMaterial, quantity: u32) -> ResolvedMaterial {
    ResolvedMaterial {
        material: Arc::new(material),
        quantity,
    }
}
