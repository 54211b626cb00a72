use crate::domain::a002_product::repository as products;
use crate::domain::a004_material_component::from_erp::{self, ErpBomLineRecord};
use crate::domain::a004_material_component::repository;
use crate::shared::bulk;
use crate::shared::context::SyncContext;
use crate::shared::erp::{self, ErpSource};
use crate::shared::error::SyncError;
use crate::shared::identity_index::KeySet;
use crate::shared::sync_lock::EntityKind;
use contracts::usecases::common::{SyncCounts, SyncResult};
use sea_orm::TransactionTrait;
use serde_json::json;
use std::sync::Arc;

/// Executor для перестроения спецификаций (mrp.bom.line)
pub struct MaterialSyncExecutor {
    ctx: SyncContext,
    erp: Arc<dyn ErpSource>,
}

impl MaterialSyncExecutor {
    pub fn new(ctx: SyncContext, erp: Arc<dyn ErpSource>) -> Self {
        Self { ctx, erp }
    }

    /// Удалить все ребра спецификаций и записать их заново из ERP
    pub async fn rebuild_materials(&self) -> SyncResult {
        self.run_rebuild()
            .await
            .unwrap_or_else(|e| e.into_result("materials rebuild"))
    }

    async fn run_rebuild(&self) -> Result<SyncResult, SyncError> {
        let _guard = self.ctx.locks.try_acquire(&[EntityKind::Materials])?;

        // выгрузка до удаления: при ошибке ERP старые ребра остаются
        let records = self
            .erp
            .search_read(from_erp::MODEL, from_erp::domain(), from_erp::FIELDS)
            .await?;
        let received = records.len();
        tracing::info!("Materials rebuild: received {} BOM lines", received);

        let known_products = KeySet::build(
            products::list_all(self.ctx.db())
                .await?
                .into_iter()
                .map(|p| p.temporary_id),
        );

        let mut counts = SyncCounts::default();
        let mut seen = KeySet::default();
        let mut unresolved = 0;
        let mut rows = Vec::new();
        for record in erp::decode_each::<ErpBomLineRecord>(records, "id") {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Skipping BOM line: {}", e);
                    counts.errors += 1;
                    continue;
                }
            };
            if !seen.claim(record.id) {
                counts.skipped += 1;
                continue;
            }
            let component = record.to_component(&known_products);
            if component.parent_id.is_none() || component.child_id.is_none() {
                tracing::debug!("BOM line {} has an end outside the product table", record.id);
                unresolved += 1;
            }
            rows.push((component.id, repository::active_model(&component)));
        }

        let txn = self.ctx.db().begin().await?;
        let deleted = repository::delete_all(&txn).await?;
        let outcome = bulk::insert_chunked(&txn, rows, self.ctx.settings.chunk_size).await;
        txn.commit().await?;

        counts.inserted = outcome.inserted as i64;
        counts.errors += outcome.errors() as i64;

        tracing::info!(
            "Materials rebuild finished: deleted={}, inserted={}, unresolved_ends={}, errors={}",
            deleted,
            counts.inserted,
            unresolved,
            counts.errors
        );
        Ok(SyncResult::success(
            format!("Rebuilt {} BOM lines of {}", counts.inserted, received),
            counts,
        )
        .with_details(json!({ "deleted": deleted, "unresolved_ends": unresolved })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::context::test_context;
    use crate::shared::erp::fake::FakeErp;
    use contracts::domain::a002_product::aggregate::{Product, ProductType};
    use contracts::domain::a004_material_component::aggregate::MaterialComponent;

    fn product(temporary_id: i64) -> Product {
        Product {
            temporary_id,
            confirmed_id: 0,
            name: format!("Material {}", temporary_id),
            sku: String::new(),
            brand: String::new(),
            category: String::new(),
            stock_on_hand: 0.0,
            stock_on_order: 0.0,
            max_qty: 0.0,
            min_qty: 0.0,
            product_type: ProductType::Other,
            creation_date: None,
            supplier: String::new(),
            lead_time_days: 0,
        }
    }

    fn bom_lines() -> Vec<serde_json::Value> {
        vec![
            json!({"id": 1, "parent_product_tmpl_id": [10, "Crema"], "product_tmpl_id": [20, "Frasco"], "product_qty": 1}),
            json!({"id": 2, "parent_product_tmpl_id": [11, "Gel"], "product_tmpl_id": [20, "Frasco"], "product_qty": 2}),
            json!({"id": 3, "parent_product_tmpl_id": [10, "Crema"], "product_tmpl_id": [99, "Tapa"], "product_qty": 1}),
        ]
    }

    #[tokio::test]
    async fn rebuild_replaces_previous_edges() {
        let ctx = test_context().await;
        for id in [10, 11, 20] {
            products::insert(ctx.db(), &product(id)).await.unwrap();
        }
        let stale = MaterialComponent {
            id: 77,
            parent_id: Some(10),
            child_id: Some(11),
            quantity: 9.0,
        };
        crate::shared::bulk::insert_chunked(
            ctx.db(),
            vec![(77, repository::active_model(&stale))],
            10,
        )
        .await;

        let erp = Arc::new(FakeErp::default().with(from_erp::MODEL, bom_lines()));
        let result = MaterialSyncExecutor::new(ctx.clone(), erp).rebuild_materials().await;
        assert_eq!(result.counts().unwrap().inserted, 3);

        let stored = repository::list_all(ctx.db()).await.unwrap();
        let ids: Vec<_> = stored.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        // shared child
        assert_eq!(stored[0].child_id, Some(20));
        assert_eq!(stored[1].child_id, Some(20));
        assert_eq!(stored[2].child_id, None);
    }

    #[tokio::test]
    async fn erp_failure_keeps_existing_edges() {
        let ctx = test_context().await;
        products::insert(ctx.db(), &product(10)).await.unwrap();
        let edge = MaterialComponent {
            id: 5,
            parent_id: Some(10),
            child_id: None,
            quantity: 1.0,
        };
        crate::shared::bulk::insert_chunked(ctx.db(), vec![(5, repository::active_model(&edge))], 10)
            .await;

        let erp = Arc::new(FakeErp::default().failing(from_erp::MODEL, "1", "Session expired"));
        let result = MaterialSyncExecutor::new(ctx.clone(), erp).rebuild_materials().await;
        assert!(!result.is_success());
        assert_eq!(repository::list_all(ctx.db()).await.unwrap().len(), 1);
    }
}
