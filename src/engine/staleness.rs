// ==========================================
// 珠宝维修定价系统 - 定价状态判定
// ==========================================
// Draft    : 从未计算过定价
// Computed : 定价晚于所有引用文档与管理设置的最后变更
// Stale    : 任一引用的工序/材料或管理设置在定价之后发生变更
// 红线: 只判定，不触发重算
// ==========================================

use crate::domain::task::RepairTask;
use crate::domain::types::PricingState;
use crate::engine::lookup::{DocumentCache, PricingDocumentSource};
use crate::repository::error::RepositoryResult;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default)]
pub struct PricingStateEvaluator;

impl PricingStateEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate<S>(
        &self,
        task: &RepairTask,
        cache: &mut DocumentCache<'_, S>,
        settings_updated_at: Option<DateTime<Utc>>,
    ) -> RepositoryResult<PricingState>
    where
        S: PricingDocumentSource + ?Sized,
    {
        let Some(priced_at) = task.pricing_updated_at else {
            return Ok(PricingState::Draft);
        };
        if task.pricing.is_empty() {
            return Ok(PricingState::Draft);
        }

        if settings_updated_at.is_some_and(|ts| ts > priced_at) {
            return Ok(PricingState::Stale);
        }

        let resolved = cache.resolve(&task.selections)?;
        let newest_reference = resolved
            .processes
            .iter()
            .map(|p| p.process.updated_at)
            .chain(resolved.materials.iter().map(|m| m.material.updated_at))
            .max();

        if newest_reference.is_some_and(|ts| ts > priced_at) {
            return Ok(PricingState::Stale);
        }
        Ok(PricingState::Computed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::process::ProcessPricing;
    use crate::domain::task::{PriceBreakdown, PricingMap, ProcessSelection, TaskSelections};
    use crate::engine::test_support::{process, InMemoryDocuments};
    use chrono::{Duration, TimeZone};

    fn task(priced_at: Option<DateTime<Utc>>) -> RepairTask {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let mut pricing = PricingMap::new();
        if priced_at.is_some() {
            pricing.insert("universal".into(), PriceBreakdown::zeroed(None));
        }
        RepairTask {
            task_id: "T1".into(),
            title: "Solder chain".into(),
            category: "chains".into(),
            description: None,
            selections: TaskSelections {
                processes: vec![ProcessSelection { process_id: "P1".into(), quantity: 1 }],
                materials: vec![],
            },
            pricing,
            pricing_updated_at: priced_at,
            is_active: true,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn test_state_transitions() {
        // test_support 中的文档 updated_at = 2026-01-01
        let docs = InMemoryDocuments::default()
            .with_process(process("P1", 1.0, ProcessPricing::Unpriced));
        let mut cache = DocumentCache::new(&docs);
        let evaluator = PricingStateEvaluator::new();
        let doc_ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let draft = task(None);
        assert_eq!(evaluator.evaluate(&draft, &mut cache, None).unwrap(), PricingState::Draft);

        let fresh = task(Some(doc_ts + Duration::hours(1)));
        assert_eq!(evaluator.evaluate(&fresh, &mut cache, None).unwrap(), PricingState::Computed);

        let settings_changed = Some(doc_ts + Duration::hours(2));
        assert_eq!(
            evaluator.evaluate(&fresh, &mut cache, settings_changed).unwrap(),
            PricingState::Stale
        );

        let old = task(Some(doc_ts - Duration::hours(1)));
        assert_eq!(evaluator.evaluate(&old, &mut cache, None).unwrap(), PricingState::Stale);
    }
}
