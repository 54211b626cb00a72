use crate::domain::a002_product::from_erp::{self, ErpProductRecord};
use crate::domain::a002_product::product_type::ProductProfile;
use crate::domain::a002_product::repository;
use crate::shared::bulk;
use crate::shared::context::SyncContext;
use crate::shared::erp::{self, ErpSource};
use crate::shared::error::SyncError;
use crate::shared::identity_index::{IdentityIndex, KeySet};
use crate::shared::sync_lock::EntityKind;
use contracts::usecases::common::{SyncCounts, SyncResult};
use serde_json::{json, Value};
use std::sync::Arc;

/// Executor для выгрузки готовой продукции и материалов из ERP
pub struct ProductSyncExecutor {
    ctx: SyncContext,
    erp: Arc<dyn ErpSource>,
}

impl ProductSyncExecutor {
    pub fn new(ctx: SyncContext, erp: Arc<dyn ErpSource>) -> Self {
        Self { ctx, erp }
    }

    pub async fn insert_products(&self, profile: ProductProfile) -> SyncResult {
        self.run_insert(profile)
            .await
            .unwrap_or_else(|e| e.into_result(&format!("insert {}", profile.as_str())))
    }

    pub async fn update_products(&self, profile: ProductProfile) -> SyncResult {
        self.run_update(profile)
            .await
            .unwrap_or_else(|e| e.into_result(&format!("update {}", profile.as_str())))
    }

    /// Шаблоны профиля, дополненные вариантами, а для материалов еще
    /// правилами пополнения и поставщиками
    async fn pull(
        &self,
        profile: ProductProfile,
    ) -> Result<Vec<Result<ErpProductRecord, SyncError>>, SyncError> {
        let mut templates = self
            .erp
            .search_read(
                from_erp::TEMPLATE_MODEL,
                from_erp::template_domain(profile),
                &from_erp::template_fields(profile),
            )
            .await?;

        let without_variant: Vec<i64> = templates
            .iter()
            .filter(|t| !matches!(t.get("product_variant_id"), Some(Value::Array(_))))
            .filter_map(|t| t.get("id").and_then(Value::as_i64))
            .collect();
        if !without_variant.is_empty() {
            tracing::debug!("{} templates have no variant in the answer", without_variant.len());
            let variants = self
                .erp
                .search_read(
                    from_erp::VARIANT_MODEL,
                    json!([["product_tmpl_id", "in", without_variant]]),
                    from_erp::VARIANT_FIELDS,
                )
                .await?;
            from_erp::fill_missing_variants(&mut templates, &variants);
        }

        if profile == ProductProfile::Supply {
            let orderpoints = self
                .erp
                .search_read(from_erp::ORDERPOINT_MODEL, json!([]), from_erp::ORDERPOINT_FIELDS)
                .await?;
            let suppliers = self
                .erp
                .search_read(from_erp::SUPPLIER_MODEL, json!([]), from_erp::SUPPLIER_FIELDS)
                .await?;
            from_erp::merge_supply_extras(&mut templates, &orderpoints, &suppliers);
        }

        Ok(erp::decode_each(templates, "id"))
    }

    async fn run_insert(&self, profile: ProductProfile) -> Result<SyncResult, SyncError> {
        let _guard = self.ctx.locks.try_acquire(&[EntityKind::Products])?;
        let conn = self.ctx.db();

        let records = self.pull(profile).await?;
        let received = records.len();
        tracing::info!("Insert {}: received {} records", profile.as_str(), received);

        let existing = repository::list_all(conn).await?;
        let mut known = KeySet::build(existing.iter().map(|p| p.temporary_id));

        let mut counts = SyncCounts::default();
        let mut rows = Vec::new();
        for record in records {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Skipping product: {}", e);
                    counts.errors += 1;
                    continue;
                }
            };
            if !known.claim(record.id) {
                counts.skipped += 1;
                continue;
            }
            let product = record.to_aggregate(profile);
            tracing::debug!(
                "New product {} '{}' typed {}",
                product.temporary_id,
                product.sku,
                product.product_type.label()
            );
            rows.push((product.temporary_id, repository::active_model(&product)));
        }

        let outcome = bulk::insert_chunked(conn, rows, self.ctx.settings.chunk_size).await;
        counts.inserted = outcome.inserted as i64;
        counts.errors += outcome.errors() as i64;

        tracing::info!(
            "Insert {} finished: inserted={}, skipped={}, errors={}",
            profile.as_str(),
            counts.inserted,
            counts.skipped,
            counts.errors
        );
        Ok(SyncResult::success(
            format!("Inserted {} new {} of {}", counts.inserted, profile.as_str(), received),
            counts,
        ))
    }

    async fn run_update(&self, profile: ProductProfile) -> Result<SyncResult, SyncError> {
        let _guard = self.ctx.locks.try_acquire(&[EntityKind::Products])?;
        let conn = self.ctx.db();

        let records = self.pull(profile).await?;
        let received = records.len();
        tracing::info!("Update {}: received {} records", profile.as_str(), received);

        let mut index = IdentityIndex::build(repository::list_all(conn).await?, |p| p.temporary_id);

        let mut counts = SyncCounts::default();
        for record in records {
            let incoming = match record {
                Ok(r) => r.to_aggregate(profile),
                Err(e) => {
                    tracing::warn!("Skipping product: {}", e);
                    counts.errors += 1;
                    continue;
                }
            };
            let Some(stored) = index.get_mut(&incoming.temporary_id) else {
                counts.skipped += 1;
                continue;
            };
            if stored.same_mutable_fields(&incoming) {
                counts.unchanged += 1;
                continue;
            }
            stored.apply_mutable_fields(&incoming);
            match repository::update(conn, stored).await {
                Ok(()) => counts.updated += 1,
                Err(e) => {
                    tracing::error!("Failed to update product {}: {}", incoming.temporary_id, e);
                    counts.errors += 1;
                }
            }
        }

        tracing::info!(
            "Update {} finished: updated={}, unchanged={}, skipped={}, errors={}",
            profile.as_str(),
            counts.updated,
            counts.unchanged,
            counts.skipped,
            counts.errors
        );
        Ok(SyncResult::success(
            format!("Updated {} {} of {}", counts.updated, profile.as_str(), received),
            counts,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::context::test_context;
    use crate::shared::erp::fake::FakeErp;
    use contracts::domain::a002_product::aggregate::ProductType;

    fn templates(qty: f64) -> Vec<Value> {
        vec![
            json!({"id": 501, "name": "Crema", "default_code": "PT-01", "qty_available": qty,
                   "product_brand_id": [1, "DNA"], "categ_id": [2, "Saleable"], "route_ids": [3],
                   "product_variant_id": [901, "Crema"], "sale_ok": true, "active": true,
                   "create_date": "2024-01-02 03:04:05"}),
            json!({"id": 502, "name": "Old", "default_code": "PT-02", "categ_id": [2, "Saleable"],
                   "route_ids": [], "product_variant_id": false, "sale_ok": true, "active": false}),
        ]
    }

    #[tokio::test]
    async fn finished_goods_are_inserted_with_variants_and_types() {
        let ctx = test_context().await;
        let erp = Arc::new(
            FakeErp::default()
                .with(from_erp::TEMPLATE_MODEL, templates(5.0))
                .with(from_erp::VARIANT_MODEL, vec![json!({"id": 902, "product_tmpl_id": [502, "Old"]})]),
        );
        let executor = ProductSyncExecutor::new(ctx.clone(), erp.clone());

        let result = executor.insert_products(ProductProfile::FinishedGood).await;
        assert_eq!(result.counts().unwrap().inserted, 2);

        let old = repository::get_by_temporary_id(ctx.db(), 502).await.unwrap().unwrap();
        assert_eq!(old.confirmed_id, 902);
        assert_eq!(old.product_type, ProductType::Discontinued);

        let again = executor.insert_products(ProductProfile::FinishedGood).await;
        assert_eq!(again.counts().unwrap().inserted, 0);
        assert_eq!(again.counts().unwrap().skipped, 2);

        // supplies are never queried for finished goods
        let calls = erp.calls.lock().unwrap().clone();
        assert!(!calls.iter().any(|m| m == from_erp::ORDERPOINT_MODEL));
    }

    #[tokio::test]
    async fn update_counts_changed_and_unchanged() {
        let ctx = test_context().await;
        let first = Arc::new(FakeErp::default().with(from_erp::TEMPLATE_MODEL, templates(5.0)));
        ProductSyncExecutor::new(ctx.clone(), first)
            .insert_products(ProductProfile::FinishedGood)
            .await;

        let second = Arc::new(FakeErp::default().with(from_erp::TEMPLATE_MODEL, templates(9.0)));
        let result = ProductSyncExecutor::new(ctx.clone(), second)
            .update_products(ProductProfile::FinishedGood)
            .await;
        let counts = result.counts().unwrap();
        assert_eq!(counts.updated, 1);
        assert_eq!(counts.unchanged, 1);

        let stored = repository::get_by_temporary_id(ctx.db(), 501).await.unwrap().unwrap();
        assert_eq!(stored.stock_on_hand, 9.0);
        assert!(stored.creation_date.is_some());
    }

    #[tokio::test]
    async fn supplies_carry_reorder_and_supplier_fields() {
        let ctx = test_context().await;
        let erp = Arc::new(
            FakeErp::default()
                .with(
                    from_erp::TEMPLATE_MODEL,
                    vec![json!({"id": 700, "name": "Frasco", "default_code": "E-1",
                                "categ_id": [5, "Insumos"], "route_ids": [1], "purchase_ok": true,
                                "incoming_qty": 300, "product_variant_id": [7000, "Frasco"], "active": true})],
                )
                .with(
                    from_erp::ORDERPOINT_MODEL,
                    vec![json!({"product_tmpl_id": [700, "Frasco"], "product_min_qty": 100, "product_max_qty": 500})],
                )
                .with(
                    from_erp::SUPPLIER_MODEL,
                    vec![json!({"product_tmpl_id": [700, "Frasco"], "partner_id": [9, "Vidrios SA"], "delay": 15})],
                ),
        );

        let result = ProductSyncExecutor::new(ctx.clone(), erp)
            .insert_products(ProductProfile::Supply)
            .await;
        assert_eq!(result.counts().unwrap().inserted, 1);

        let supply = repository::get_by_temporary_id(ctx.db(), 700).await.unwrap().unwrap();
        assert_eq!(supply.product_type, ProductType::Replenishable);
        assert_eq!(supply.stock_on_order, 300.0);
        assert_eq!(supply.min_qty, 100.0);
        assert_eq!(supply.max_qty, 500.0);
        assert_eq!(supply.supplier, "Vidrios SA");
        assert_eq!(supply.lead_time_days, 15);
    }
}
