// ==========================================
// 珠宝维修定价系统 - 定价文档查找与计算期缓存
// ==========================================
// 职责: 把任务选择项解析为工序/材料文档
// 红线: 无法解析的引用跳过并告警，不中断整个任务的定价
// 缓存: 生命周期 = 一次编排调用或一次批量重算
// ==========================================

use crate::domain::material::RepairMaterial;
use crate::domain::process::RepairProcess;
use crate::domain::task::TaskSelections;
use crate::repository::error::RepositoryResult;
use std::collections::HashMap;
use std::sync::Arc;

// ==========================================
// PricingDocumentSource Trait
// ==========================================
// 实现者: PricingRepositories（SQLite）；测试中使用内存实现
pub trait PricingDocumentSource {
    /// 按 ID 读取工序（不存在返回 None）
    fn fetch_process(&self, process_id: &str) -> RepositoryResult<Option<RepairProcess>>;

    /// 按 ID 读取材料（不存在返回 None）
    fn fetch_material(&self, material_id: &str) -> RepositoryResult<Option<RepairMaterial>>;
}

/// 已解析的工序选择项
#[derive(Debug, Clone)]
pub struct ResolvedProcess {
    pub process: Arc<RepairProcess>,
    pub quantity: u32,
}

/// 已解析的材料选择项
#[derive(Debug, Clone)]
pub struct ResolvedMaterial {
    pub material: Arc<RepairMaterial>,
    pub quantity: u32,
}

/// 任务选择项的解析结果
#[derive(Debug, Clone, Default)]
pub struct ResolvedTask {
    pub processes: Vec<ResolvedProcess>,
    pub materials: Vec<ResolvedMaterial>,
    pub missing_processes: Vec<String>,
    pub missing_materials: Vec<String>,
}

impl ResolvedTask {
    pub fn has_missing_references(&self) -> bool {
        !self.missing_processes.is_empty() || !self.missing_materials.is_empty()
    }
}

// ==========================================
// DocumentCache - 计算期文档缓存
// ==========================================
// 同一 ID 只读取一次（包括“不存在”的结果）
pub struct DocumentCache<'a, S: PricingDocumentSource + ?Sized> {
    source: &'a S,
    processes: HashMap<String, Option<Arc<RepairProcess>>>,
    materials: HashMap<String, Option<Arc<RepairMaterial>>>,
    fetch_count: usize,
}

impl<'a, S: PricingDocumentSource + ?Sized> DocumentCache<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            processes: HashMap::new(),
            materials: HashMap::new(),
            fetch_count: 0,
        }
    }

    /// 实际访问数据源的次数
    pub fn fetch_count(&self) -> usize {
        self.fetch_count
    }

    pub fn process(&mut self, process_id: &str) -> RepositoryResult<Option<Arc<RepairProcess>>> {
        if let Some(cached) = self.processes.get(process_id) {
            return Ok(cached.clone());
        }
        self.fetch_count += 1;
        let fetched = self.source.fetch_process(process_id)?.map(Arc::new);
        self.processes
            .insert(process_id.to_string(), fetched.clone());
        Ok(fetched)
    }

    pub fn material(&mut self, material_id: &str) -> RepositoryResult<Option<Arc<RepairMaterial>>> {
        if let Some(cached) = self.materials.get(material_id) {
            return Ok(cached.clone());
        }
        self.fetch_count += 1;
        let fetched = self.source.fetch_material(material_id)?.map(Arc::new);
        self.materials
            .insert(material_id.to_string(), fetched.clone());
        Ok(fetched)
    }

    /// 解析任务选择项
    ///
    /// # 返回
    /// - Ok(ResolvedTask): 缺失的引用记录在 missing_* 中
    /// - Err: 数据源读取失败
    pub fn resolve(&mut self, selections: &TaskSelections) -> RepositoryResult<ResolvedTask> {
        let mut resolved = ResolvedTask::default();

        for selection in &selections.processes {
            match self.process(&selection.process_id)? {
                Some(process) => resolved.processes.push(ResolvedProcess {
                    process,
                    quantity: selection.quantity,
                }),
                None => {
                    tracing::warn!(
                        process_id = %selection.process_id,
                        "引用的工序不存在，已跳过"
                    );
                    resolved.missing_processes.push(selection.process_id.clone());
                }
            }
        }

        for selection in &selections.materials {
            match self.material(&selection.material_id)? {
                Some(material) => resolved.materials.push(ResolvedMaterial {
                    material,
                    quantity: selection.quantity,
                }),
                None => {
                    tracing::warn!(
                        material_id = %selection.material_id,
                        "引用的材料不存在，已跳过"
                    );
                    resolved.missing_materials.push(selection.material_id.clone());
                }
            }
        }

        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{MaterialSelection, ProcessSelection};
    use crate::engine::test_support::{material, process, InMemoryDocuments};
    use crate::domain::process::ProcessPricing;

    #[test]
    fn test_resolve_skips_missing_references() {
        let docs = InMemoryDocuments::default()
            .with_process(process("P1", 1.0, ProcessPricing::Unpriced))
            .with_material(material("M1", 1, false, 4.0));
        let mut cache = DocumentCache::new(&docs);

        let selections = TaskSelections {
            processes: vec![
                ProcessSelection { process_id: "P1".into(), quantity: 1 },
                ProcessSelection { process_id: "GONE".into(), quantity: 2 },
            ],
            materials: vec![
                MaterialSelection { material_id: "M1".into(), quantity: 3 },
                MaterialSelection { material_id: "M404".into(), quantity: 1 },
            ],
        };

        let resolved = cache.resolve(&selections).unwrap();
        assert_eq!(resolved.processes.len(), 1);
        assert_eq!(resolved.materials[0].quantity, 3);
        assert_eq!(resolved.missing_processes, vec!["GONE".to_string()]);
        assert_eq!(resolved.missing_materials, vec!["M404".to_string()]);
        assert!(resolved.has_missing_references());
    }

    #[test]
    fn test_cache_fetches_each_id_once() {
        let docs = InMemoryDocuments::default()
            .with_process(process("P1", 1.0, ProcessPricing::Unpriced));
        let mut cache = DocumentCache::new(&docs);

        let selections = TaskSelections {
            processes: vec![
                ProcessSelection { process_id: "P1".into(), quantity: 1 },
                ProcessSelection { process_id: "MISSING".into(), quantity: 1 },
            ],
            materials: vec![],
        };

        cache.resolve(&selections).unwrap();
        cache.resolve(&selections).unwrap();
        assert_eq!(cache.fetch_count(), 2);
        assert_eq!(docs.fetches(), 2);
    }
}
