use crate::domain::a002_product::repository as products;
use crate::domain::a005_expiry_lot::from_erp::{self, ErpLotRecord};
use crate::domain::a005_expiry_lot::repository;
use crate::shared::bulk;
use crate::shared::context::SyncContext;
use crate::shared::erp::{self, ErpSource};
use crate::shared::error::SyncError;
use crate::shared::identity_index::{IdentityIndex, KeySet};
use crate::shared::normalizer;
use crate::shared::sync_lock::EntityKind;
use contracts::usecases::common::{SyncCounts, SyncResult};
use std::sync::Arc;

/// Товар склада по ссылке партии: сначала подтвержденный id варианта,
/// затем временный id
struct ProductRef {
    by_confirmed: IdentityIndex<i64, i64>,
    temporary: KeySet<i64>,
}

impl ProductRef {
    async fn load(ctx: &SyncContext) -> Result<Self, SyncError> {
        let all = products::list_all(ctx.db()).await?;
        Ok(Self {
            by_confirmed: IdentityIndex::from_pairs(
                all.iter()
                    .filter(|p| p.has_confirmed_id())
                    .map(|p| (p.confirmed_id, p.temporary_id)),
            ),
            temporary: KeySet::build(all.iter().map(|p| p.temporary_id)),
        })
    }

    fn resolve(&self, record: &ErpLotRecord) -> Result<i64, SyncError> {
        let id = normalizer::id_of(&record.product_id)
            .ok_or_else(|| SyncError::record(record.id, "lot without product"))?;
        if let Some(temporary) = self.by_confirmed.get(&id) {
            return Ok(*temporary);
        }
        if self.temporary.contains(&id) {
            return Ok(id);
        }
        Err(SyncError::record(record.id, format!("unknown product {}", id)))
    }
}

/// Executor для партий со сроком годности
pub struct ExpiryLotSyncExecutor {
    ctx: SyncContext,
    erp: Arc<dyn ErpSource>,
}

impl ExpiryLotSyncExecutor {
    pub fn new(ctx: SyncContext, erp: Arc<dyn ErpSource>) -> Self {
        Self { ctx, erp }
    }

    /// Добавить партии, которых еще нет на складе
    pub async fn insert_expiry_lots(&self) -> SyncResult {
        self.run_insert()
            .await
            .unwrap_or_else(|e| e.into_result("insert expiry lots"))
    }

    /// Обновить остаток известных партий
    pub async fn update_expiry_lots(&self) -> SyncResult {
        self.run_update()
            .await
            .unwrap_or_else(|e| e.into_result("update expiry lots"))
    }

    async fn pull(&self) -> Result<Vec<Result<ErpLotRecord, SyncError>>, SyncError> {
        let records = self
            .erp
            .search_read(from_erp::MODEL, from_erp::domain(), from_erp::FIELDS)
            .await?;
        Ok(erp::decode_each(records, "id"))
    }

    async fn run_insert(&self) -> Result<SyncResult, SyncError> {
        let _guard = self.ctx.locks.try_acquire(&[EntityKind::ExpiryLots])?;
        let conn = self.ctx.db();

        let records = self.pull().await?;
        let received = records.len();
        tracing::info!("Expiry lot insert: received {} lots", received);

        let product_ref = ProductRef::load(&self.ctx).await?;
        let mut known = KeySet::build(repository::list_ids(conn).await?);

        let mut counts = SyncCounts::default();
        let mut rows = Vec::new();
        for record in records {
            let lot = record.and_then(|r| {
                if known.contains(&r.id) {
                    return Ok(None);
                }
                let product_id = product_ref.resolve(&r)?;
                r.to_lot(product_id).map(Some)
            });
            match lot {
                Ok(Some(lot)) if known.claim(lot.lot_id) => {
                    rows.push((lot.lot_id, repository::active_model(&lot)))
                }
                Ok(_) => counts.skipped += 1,
                Err(e) => {
                    tracing::warn!("Skipping expiry lot: {}", e);
                    counts.errors += 1;
                }
            }
        }

        let outcome = bulk::insert_chunked(conn, rows, self.ctx.settings.chunk_size).await;
        counts.inserted = outcome.inserted as i64;
        counts.errors += outcome.errors() as i64;

        tracing::info!(
            "Expiry lot insert finished: inserted={}, skipped={}, errors={}",
            counts.inserted,
            counts.skipped,
            counts.errors
        );
        Ok(SyncResult::success(
            format!("Inserted {} expiry lots of {}", counts.inserted, received),
            counts,
        ))
    }

    async fn run_update(&self) -> Result<SyncResult, SyncError> {
        let _guard = self.ctx.locks.try_acquire(&[EntityKind::ExpiryLots])?;
        let conn = self.ctx.db();

        let records = self.pull().await?;
        let received = records.len();
        tracing::info!("Expiry lot update: received {} lots", received);

        let index = IdentityIndex::build(repository::list_all(conn).await?, |l| l.lot_id);

        let mut counts = SyncCounts::default();
        for record in records {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Skipping expiry lot: {}", e);
                    counts.errors += 1;
                    continue;
                }
            };
            let Some(stored) = index.get(&record.id) else {
                counts.skipped += 1;
                continue;
            };
            let quantity = record.product_qty.round() as i64;
            if stored.quantity == quantity {
                counts.unchanged += 1;
                continue;
            }
            match repository::update_quantity(conn, record.id, quantity).await {
                Ok(()) => counts.updated += 1,
                Err(e) => {
                    tracing::error!("Failed to update expiry lot {}: {}", record.id, e);
                    counts.errors += 1;
                }
            }
        }

        tracing::info!(
            "Expiry lot update finished: updated={}, unchanged={}, skipped={}, errors={}",
            counts.updated,
            counts.unchanged,
            counts.skipped,
            counts.errors
        );
        Ok(SyncResult::success(
            format!("Updated {} expiry lots of {}", counts.updated, received),
            counts,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::context::test_context;
    use crate::shared::erp::fake::FakeErp;
    use chrono::NaiveDate;
    use contracts::domain::a002_product::aggregate::{Product, ProductType};
    use serde_json::json;

    fn product(temporary_id: i64, confirmed_id: i64) -> Product {
        Product {
            temporary_id,
            confirmed_id,
            name: "Crema".into(),
            sku: "PT-01".into(),
            brand: String::new(),
            category: String::new(),
            stock_on_hand: 0.0,
            stock_on_order: 0.0,
            max_qty: 0.0,
            min_qty: 0.0,
            product_type: ProductType::Replenishable,
            creation_date: None,
            supplier: String::new(),
            lead_time_days: 0,
        }
    }

    fn lots(qty: f64) -> Vec<serde_json::Value> {
        vec![
            json!({"id": 1, "name": "31\u{2013}03\u{2013}2026", "product_id": [901, "Crema"], "product_qty": qty}),
            json!({"id": 2, "name": "15-06-2026", "product_id": [502, "Gel"], "product_qty": 5}),
            json!({"id": 3, "name": "LOTE-A1", "product_id": [901, "Crema"], "product_qty": 5}),
            json!({"id": 4, "name": "15-06-2026", "product_id": [777, "?"], "product_qty": 5}),
        ]
    }

    async fn seeded() -> SyncContext {
        let ctx = test_context().await;
        products::insert(ctx.db(), &product(501, 901)).await.unwrap();
        products::insert(ctx.db(), &product(502, 0)).await.unwrap();
        ctx
    }

    #[tokio::test]
    async fn lots_link_to_products_by_confirmed_then_temporary_id() {
        let ctx = seeded().await;
        let erp = Arc::new(FakeErp::default().with(from_erp::MODEL, lots(12.0)));
        let executor = ExpiryLotSyncExecutor::new(ctx.clone(), erp);

        let counts = executor.insert_expiry_lots().await.counts().cloned().unwrap();
        assert_eq!(counts.inserted, 2);
        assert_eq!(counts.errors, 2);

        let stored = repository::list_all(ctx.db()).await.unwrap();
        assert_eq!(stored[0].product_id, 501);
        assert_eq!(stored[0].expiry_date, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
        assert_eq!(stored[1].product_id, 502);

        let again = executor.insert_expiry_lots().await.counts().cloned().unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.skipped, 2);
    }

    #[tokio::test]
    async fn update_changes_only_quantity() {
        let ctx = seeded().await;
        let first = Arc::new(FakeErp::default().with(from_erp::MODEL, lots(12.0)));
        ExpiryLotSyncExecutor::new(ctx.clone(), first)
            .insert_expiry_lots()
            .await;

        let second = Arc::new(FakeErp::default().with(from_erp::MODEL, lots(7.4)));
        let counts = ExpiryLotSyncExecutor::new(ctx.clone(), second)
            .update_expiry_lots()
            .await
            .counts()
            .cloned()
            .unwrap();
        assert_eq!(counts.updated, 1);
        assert_eq!(counts.unchanged, 1);
        assert_eq!(counts.skipped, 2);

        let stored = repository::list_all(ctx.db()).await.unwrap();
        assert_eq!(stored[0].quantity, 7);
        assert_eq!(stored[0].product_id, 501);
    }
}
