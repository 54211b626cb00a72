use super::classification::{self, ClientState, SaleEvent};
use super::line_resolver::{self, LineResolution, ProductLookup};
use crate::domain::a001_client::repository as clients;
use crate::domain::a002_product::repository as products;
use crate::domain::a003_sale::from_erp::{self, ErpSaleLineRecord, ErpSaleRecord};
use crate::domain::a003_sale::{line_repository, repository};
use crate::shared::bulk;
use crate::shared::context::SyncContext;
use crate::shared::erp::{self, ErpSource};
use crate::shared::error::SyncError;
use crate::shared::identity_index::{IdentityIndex, KeySet};
use crate::shared::normalizer;
use crate::shared::sync_lock::EntityKind;
use contracts::domain::a001_client::aggregate::{ClientId, CustomerType};
use contracts::domain::a003_sale::aggregate::{MoveType, Sale};
use contracts::usecases::common::{SyncCounts, SyncResult};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Новая продажа, прошедшая нормализацию и разрешение клиента
struct PreparedSale {
    sale: Sale,
    move_type: MoveType,
    lines: Vec<ErpSaleLineRecord>,
}

#[derive(Debug, Default)]
struct LineStats {
    inserted: usize,
    unresolved: usize,
    dropped: usize,
    errors: usize,
}

/// Executor для выгрузки счетов и кредитных нот из ERP
pub struct SalesSyncExecutor {
    ctx: SyncContext,
    erp: Arc<dyn ErpSource>,
}

impl SalesSyncExecutor {
    pub fn new(ctx: SyncContext, erp: Arc<dyn ErpSource>) -> Self {
        Self { ctx, erp }
    }

    /// Добавить новые продажи со строками и пересчитать классификацию клиентов
    pub async fn sync_sales(&self) -> SyncResult {
        self.run_sync()
            .await
            .unwrap_or_else(|e| e.into_result("sales sync"))
    }

    async fn pull_moves(&self) -> Result<Vec<Result<ErpSaleRecord, SyncError>>, SyncError> {
        let records = self
            .erp
            .search_read(from_erp::MOVE_MODEL, from_erp::move_domain(), from_erp::MOVE_FIELDS)
            .await?;
        Ok(erp::decode_each(records, "name"))
    }

    /// Строки только для переданных документов, сгруппированные по id документа
    async fn pull_lines(
        &self,
        move_ids: &[i64],
    ) -> Result<(HashMap<i64, Vec<ErpSaleLineRecord>>, usize), SyncError> {
        if move_ids.is_empty() {
            return Ok((HashMap::new(), 0));
        }
        let records = self
            .erp
            .search_read(
                from_erp::LINE_MODEL,
                from_erp::line_domain(move_ids),
                from_erp::LINE_FIELDS,
            )
            .await?;

        let mut grouped: HashMap<i64, Vec<ErpSaleLineRecord>> = HashMap::new();
        let mut errors = 0;
        for record in erp::decode_each::<ErpSaleLineRecord>(records, "id") {
            match record {
                Ok(line) => match normalizer::id_of(&line.move_id) {
                    Some(move_id) => grouped.entry(move_id).or_default().push(line),
                    None => {
                        tracing::warn!("Sale line {} has no parent document", line.id);
                        errors += 1;
                    }
                },
                Err(e) => {
                    tracing::warn!("Skipping sale line: {}", e);
                    errors += 1;
                }
            }
        }
        Ok((grouped, errors))
    }

    async fn run_sync(&self) -> Result<SyncResult, SyncError> {
        let _guard = self
            .ctx
            .locks
            .try_acquire(&[EntityKind::Clients, EntityKind::Sales])?;
        let conn = self.ctx.db();
        let recovery_days = self.ctx.settings.recovery_days;

        let records = self.pull_moves().await?;
        let received = records.len();
        tracing::info!("Sales sync: received {} documents", received);

        let mut counts = SyncCounts::default();

        // 1. Отсечь известные коды и дубликаты внутри выгрузки
        let mut known = KeySet::build(repository::list_codes(conn).await?);
        let mut fresh = Vec::new();
        for record in records {
            match record {
                Ok(r) if known.claim(r.name.clone()) => fresh.push(r),
                Ok(r) => {
                    tracing::debug!("Sale {} already exists", r.name);
                    counts.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping sale: {}", e);
                    counts.errors += 1;
                }
            }
        }

        let move_ids: Vec<i64> = fresh.iter().map(|r| r.id).collect();
        let (mut lines_by_move, line_decode_errors) = self.pull_lines(&move_ids).await?;

        // 2. Разрешить клиента и дату каждой новой продажи
        let client_index = IdentityIndex::build(clients::list_all(conn).await?, |c| c.id);
        let last_dates = repository::last_sale_dates(conn).await?;

        let mut prepared = Vec::with_capacity(fresh.len());
        for record in fresh {
            let resolved = record
                .client_id()
                .and_then(|id| client_index.get(&id))
                .ok_or_else(|| {
                    SyncError::record(
                        &record.name,
                        format!("unknown client {:?}", record.client_id()),
                    )
                })
                .and_then(|client| record.to_sale(client));
            match resolved {
                Ok(sale) => prepared.push(PreparedSale {
                    sale,
                    move_type: record.move_type,
                    lines: lines_by_move.remove(&record.id).unwrap_or_default(),
                }),
                Err(e) => {
                    tracing::warn!("Skipping sale: {}", e);
                    counts.errors += 1;
                }
            }
        }

        // 3. Свертка классификации по клиенту в порядке (дата, код)
        let mut initial: HashMap<ClientId, ClientState> = HashMap::new();
        for p in &prepared {
            if let Some(client) = client_index.get(&p.sale.client_id) {
                initial.entry(client.id).or_insert_with(|| {
                    ClientState::from_client(client, last_dates.get(&client.id).copied())
                });
            }
        }

        let mut events: Vec<SaleEvent<'_>> = prepared
            .iter()
            .map(|p| SaleEvent {
                code: &p.sale.code,
                client_id: p.sale.client_id,
                date: p.sale.date,
                move_type: p.move_type,
            })
            .collect();
        classification::sort_events(&mut events);

        let mut states = initial.clone();
        let snapshots = classification::fold_history(&mut states, &events, recovery_days);

        // 4. Запись продаж со снимком классификации
        let rows = prepared
            .iter()
            .map(|p| {
                let mut sale = p.sale.clone();
                sale.customer_type_at_time = snapshots.get(p.sale.code.as_str()).copied();
                (sale.code.clone(), repository::active_model(&sale))
            })
            .collect();
        let outcome = bulk::insert_chunked(conn, rows, self.ctx.settings.chunk_size).await;
        counts.inserted = outcome.inserted as i64;
        counts.errors += outcome.errors() as i64;

        let failed: HashSet<String> = outcome.failed_keys().cloned().collect();
        if !failed.is_empty() {
            counts.errors += self
                .refold_after_failures(&prepared, &events, &failed, &initial, &snapshots, &mut states)
                .await as i64;
        }

        // 5. Строки сохраненных продаж
        let lookup = ProductLookup::build(products::list_all(conn).await?);
        let lines = self.insert_lines(&lookup, &prepared, &failed).await;
        counts.errors += (lines.errors + line_decode_errors) as i64;

        // 6. Итоговое состояние клиентов
        let mut clients_updated = 0;
        for (client_id, state) in &states {
            let Some(stored) = client_index.get(client_id) else {
                continue;
            };
            if stored.customer_type == state.customer_type
                && stored.transaction_count == state.transaction_count
            {
                continue;
            }
            let mut client = stored.clone();
            client.customer_type = state.customer_type;
            client.transaction_count = state.transaction_count;
            match clients::update(conn, &client).await {
                Ok(()) => clients_updated += 1,
                Err(e) => {
                    tracing::error!("Failed to update client {}: {}", client_id, e);
                    counts.errors += 1;
                }
            }
        }
        counts.updated = clients_updated;

        let persisted = prepared.iter().filter(|p| !failed.contains(&p.sale.code));
        let (invoices, credit_notes) = persisted.fold((0, 0), |(inv, cn), p| match p.move_type {
            MoveType::Invoice => (inv + 1, cn),
            MoveType::Refund => (inv, cn + 1),
        });

        tracing::info!(
            "Sales sync finished: invoices={}, credit_notes={}, skipped={}, errors={}, lines={} (unresolved {}, dropped {}), clients_updated={}",
            invoices,
            credit_notes,
            counts.skipped,
            counts.errors,
            lines.inserted,
            lines.unresolved,
            lines.dropped,
            clients_updated
        );

        Ok(SyncResult::success(
            format!(
                "Inserted {} invoices and {} credit notes, {} of {}",
                invoices, credit_notes, counts.inserted, received
            ),
            counts,
        )
        .with_details(json!({
            "invoices": invoices,
            "credit_notes": credit_notes,
            "lines_inserted": lines.inserted,
            "lines_unresolved": lines.unresolved,
            "lines_dropped": lines.dropped,
            "clients_updated": clients_updated,
        })))
    }

    /// Часть продаж не записалась: клиенты этих продаж сворачиваются заново
    /// только по сохраненным продажам, расхождения снимков дописываются.
    /// Возвращает число снимков, которые не удалось дописать.
    async fn refold_after_failures(
        &self,
        prepared: &[PreparedSale],
        events: &[SaleEvent<'_>],
        failed: &HashSet<String>,
        initial: &HashMap<ClientId, ClientState>,
        snapshots: &HashMap<&str, CustomerType>,
        states: &mut HashMap<ClientId, ClientState>,
    ) -> usize {
        let affected: HashSet<ClientId> = prepared
            .iter()
            .filter(|p| failed.contains(&p.sale.code))
            .map(|p| p.sale.client_id)
            .collect();
        tracing::warn!(
            "{} sales failed to insert, reclassifying {} clients",
            failed.len(),
            affected.len()
        );

        let persisted: Vec<SaleEvent<'_>> = events
            .iter()
            .filter(|e| affected.contains(&e.client_id) && !failed.contains(e.code))
            .copied()
            .collect();
        let mut retry: HashMap<ClientId, ClientState> = initial
            .iter()
            .filter(|(id, _)| affected.contains(id))
            .map(|(id, state)| (*id, *state))
            .collect();
        let corrected =
            classification::fold_history(&mut retry, &persisted, self.ctx.settings.recovery_days);

        let mut errors = 0;
        for event in &persisted {
            let fixed = corrected.get(event.code).copied();
            if fixed == snapshots.get(event.code).copied() {
                continue;
            }
            tracing::debug!("Backfilling classification of sale {}", event.code);
            if let Err(e) =
                repository::set_customer_type_at_time(self.ctx.db(), event.code, fixed).await
            {
                tracing::error!("Failed to backfill classification of sale {}: {}", event.code, e);
                errors += 1;
            }
        }

        states.extend(retry);
        errors
    }

    async fn insert_lines(
        &self,
        lookup: &ProductLookup,
        prepared: &[PreparedSale],
        failed: &HashSet<String>,
    ) -> LineStats {
        let mut stats = LineStats::default();
        let mut rows = Vec::new();
        for p in prepared.iter().filter(|p| !failed.contains(&p.sale.code)) {
            for line in &p.lines {
                let sale_line = match line_resolver::resolve_line(lookup, &p.sale.code, line) {
                    LineResolution::Resolved(l) => l,
                    LineResolution::Unresolved(l) => {
                        stats.unresolved += 1;
                        l
                    }
                    LineResolution::Dropped => {
                        stats.dropped += 1;
                        continue;
                    }
                };
                rows.push((
                    format!("{}#{}", p.sale.code, line.id),
                    line_repository::active_model(&sale_line),
                ));
            }
        }

        let outcome = bulk::insert_chunked(self.ctx.db(), rows, self.ctx.settings.chunk_size).await;
        stats.inserted = outcome.inserted;
        stats.errors = outcome.errors();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::context::test_context;
    use crate::shared::erp::fake::FakeErp;
    use chrono::NaiveDate;
    use contracts::domain::a001_client::aggregate::Client;
    use contracts::domain::a002_product::aggregate::{Product, ProductType};
    use sea_orm::ConnectionTrait;
    use serde_json::Value;

    fn invoice(id: i64, code: &str, date: &str, partner: i64) -> Value {
        json!({
            "id": id,
            "name": code,
            "invoice_date": date,
            "partner_id": [partner, "Farmacia"],
            "move_type": if code.starts_with('R') { "out_refund" } else { "out_invoice" },
            "branch_id": [1, "Guadalajara"],
            "invoice_user_id": [2, "Ana"],
            "amount_total_signed": if code.starts_with('R') { -50.0 } else { 100.0 }
        })
    }

    /// I1..I5 из жизненного цикла клиента, в перемешанном порядке
    fn lifecycle_moves() -> Vec<Value> {
        vec![
            invoice(3, "I3", "2025-09-01", 1),
            invoice(1, "I1", "2025-01-05", 1),
            invoice(5, "I5", "2026-03-01", 1),
            invoice(2, "I2", "2025-01-20", 1),
            invoice(4, "I4", "2025-09-10", 1),
        ]
    }

    fn lines() -> Vec<Value> {
        vec![
            json!({"id": 10, "move_id": [1, "I1"], "product_id": false, "name": "[SKU123] Widget",
                   "quantity": 2, "price_unit": 50, "price_subtotal": 100}),
            json!({"id": 11, "move_id": [1, "I1"], "product_id": false, "name": "Nota",
                   "quantity": 1, "price_unit": 0, "price_subtotal": 0}),
            json!({"id": 12, "move_id": [2, "I2"], "product_id": [901, "X"], "name": "X",
                   "quantity": 1, "price_unit": 100, "price_subtotal": 100}),
            json!({"id": 13, "move_id": [4, "I4"], "product_id": false, "name": "Flete",
                   "quantity": 1, "price_unit": 100, "price_subtotal": 100}),
        ]
    }

    fn product(temporary_id: i64, confirmed_id: i64, sku: &str) -> Product {
        Product {
            temporary_id,
            confirmed_id,
            name: format!("Product {}", sku),
            sku: sku.into(),
            brand: "DNA".into(),
            category: "Saleable".into(),
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

    async fn seeded() -> SyncContext {
        let ctx = test_context().await;
        clients::insert(
            ctx.db(),
            &Client::new(1, "Farmacia".into(), "Zapopan".into(), "Jalisco".into(), "México".into()),
        )
        .await
        .unwrap();
        products::insert(ctx.db(), &product(501, 901, "PT-01")).await.unwrap();
        products::insert(ctx.db(), &product(502, 0, "SKU123")).await.unwrap();
        ctx
    }

    fn erp_with(moves: Vec<Value>) -> Arc<FakeErp> {
        Arc::new(
            FakeErp::default()
                .with(from_erp::MOVE_MODEL, moves)
                .with(from_erp::LINE_MODEL, lines()),
        )
    }

    async fn snapshot(ctx: &SyncContext, code: &str) -> Option<CustomerType> {
        repository::get_by_code(ctx.db(), code)
            .await
            .unwrap()
            .unwrap()
            .customer_type_at_time
    }

    #[tokio::test]
    async fn lifecycle_is_classified_in_date_order() {
        let ctx = seeded().await;
        let result = SalesSyncExecutor::new(ctx.clone(), erp_with(lifecycle_moves()))
            .sync_sales()
            .await;

        assert!(result.is_success(), "{:?}", result);
        assert_eq!(result.message(), "Inserted 5 invoices and 0 credit notes, 5 of 5");
        assert_eq!(result.counts().unwrap().updated, 1);

        assert_eq!(snapshot(&ctx, "I1").await, Some(CustomerType::NewCustomer));
        assert_eq!(snapshot(&ctx, "I2").await, Some(CustomerType::NewCustomer));
        assert_eq!(snapshot(&ctx, "I3").await, Some(CustomerType::Recovered));
        assert_eq!(snapshot(&ctx, "I4").await, Some(CustomerType::Recovered));
        // 172 days after I4, so the gap rule does not fire
        assert_eq!(snapshot(&ctx, "I5").await, Some(CustomerType::Portfolio));

        let client = clients::get_by_id(ctx.db(), 1).await.unwrap().unwrap();
        assert_eq!(client.transaction_count, 5);
        assert_eq!(client.customer_type, CustomerType::Portfolio);
    }

    #[tokio::test]
    async fn lines_are_resolved_or_dropped() {
        let ctx = seeded().await;
        let result = SalesSyncExecutor::new(ctx.clone(), erp_with(lifecycle_moves()))
            .sync_sales()
            .await;

        let SyncResult::Success { data: Some(details), .. } = &result else {
            panic!("unexpected {:?}", result);
        };
        assert_eq!(details["lines_inserted"], 3);
        assert_eq!(details["lines_dropped"], 1);
        assert_eq!(details["lines_unresolved"], 1);

        let i1 = line_repository::list_by_sale(ctx.db(), "I1").await.unwrap();
        assert_eq!(i1.len(), 1);
        assert_eq!(i1[0].product_id, Some(502));
        assert_eq!(i1[0].sku, "SKU123");

        let i2 = line_repository::list_by_sale(ctx.db(), "I2").await.unwrap();
        assert_eq!(i2[0].product_id, Some(501));

        let i4 = line_repository::list_by_sale(ctx.db(), "I4").await.unwrap();
        assert_eq!(i4[0].product_id, None);
        assert_eq!(i4[0].name, "Flete");
        assert_eq!(i4[0].brand, "");
    }

    #[tokio::test]
    async fn second_run_inserts_nothing() {
        let ctx = seeded().await;
        let erp = erp_with(lifecycle_moves());
        let executor = SalesSyncExecutor::new(ctx.clone(), erp.clone());

        executor.sync_sales().await;
        let before = clients::get_by_id(ctx.db(), 1).await.unwrap();

        let second = executor.sync_sales().await;
        let counts = second.counts().unwrap();
        assert_eq!(counts.inserted, 0);
        assert_eq!(counts.skipped, 5);
        assert_eq!(counts.updated, 0);
        assert_eq!(clients::get_by_id(ctx.db(), 1).await.unwrap(), before);
        assert_eq!(line_repository::count_all(ctx.db()).await.unwrap(), 3);

        let line_calls = erp
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.as_str() == from_erp::LINE_MODEL)
            .count();
        assert_eq!(line_calls, 1);
    }

    #[tokio::test]
    async fn credit_note_keeps_count_and_sign() {
        let ctx = seeded().await;
        let moves = vec![
            invoice(1, "I1", "2025-01-05", 1),
            invoice(6, "R0001", "2025-02-10", 1),
            invoice(7, "I9", "2025-03-15", 1),
        ];
        let result = SalesSyncExecutor::new(ctx.clone(), erp_with(moves)).sync_sales().await;
        assert_eq!(result.message(), "Inserted 2 invoices and 1 credit notes, 3 of 3");

        let credit = repository::get_by_code(ctx.db(), "R0001").await.unwrap().unwrap();
        assert_eq!(credit.total_amount, -50.0);
        assert_eq!(credit.customer_type_at_time, Some(CustomerType::NewCustomer));

        // the credit note moved the last sale date but did not count as a transaction
        assert_eq!(snapshot(&ctx, "I9").await, Some(CustomerType::Portfolio));
        let client = clients::get_by_id(ctx.db(), 1).await.unwrap().unwrap();
        assert_eq!(client.transaction_count, 2);
    }

    #[tokio::test]
    async fn unknown_client_and_bad_date_are_skipped() {
        let ctx = seeded().await;
        let moves = vec![
            invoice(1, "I1", "2025-01-05", 1),
            invoice(2, "I2", "2025-01-06", 99),
            invoice(3, "I3", "05/01/2025", 1),
        ];
        let result = SalesSyncExecutor::new(ctx.clone(), erp_with(moves)).sync_sales().await;
        let counts = result.counts().unwrap();
        assert_eq!(counts.inserted, 1);
        assert_eq!(counts.errors, 2);
        assert!(repository::get_by_code(ctx.db(), "I2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_insert_reclassifies_the_client() {
        let ctx = seeded().await;
        ctx.db()
            .execute_unprepared(
                "CREATE TRIGGER reject_i4 BEFORE INSERT ON a003_sale WHEN NEW.code = 'I4' \
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .await
            .unwrap();

        let result = SalesSyncExecutor::new(ctx.clone(), erp_with(lifecycle_moves()))
            .sync_sales()
            .await;
        let counts = result.counts().unwrap();
        assert_eq!(counts.inserted, 4);
        assert_eq!(counts.errors, 1);

        assert!(repository::get_by_code(ctx.db(), "I4").await.unwrap().is_none());
        assert!(line_repository::list_by_sale(ctx.db(), "I4").await.unwrap().is_empty());
        // without I4 the gap before I5 is 181 days
        assert_eq!(snapshot(&ctx, "I5").await, Some(CustomerType::Recovered));

        let client = clients::get_by_id(ctx.db(), 1).await.unwrap().unwrap();
        assert_eq!(client.transaction_count, 4);
        assert_eq!(client.customer_type, CustomerType::Recovered);
        assert_eq!(
            repository::list_by_client(ctx.db(), 1).await.unwrap().last().map(|s| s.date),
            NaiveDate::from_ymd_opt(2026, 3, 1)
        );
    }

    #[tokio::test]
    async fn failed_backfill_still_writes_lines_and_client() {
        let ctx = seeded().await;
        ctx.db()
            .execute_unprepared(
                "CREATE TRIGGER reject_i4 BEFORE INSERT ON a003_sale WHEN NEW.code = 'I4' \
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .await
            .unwrap();
        ctx.db()
            .execute_unprepared(
                "CREATE TRIGGER freeze_sales BEFORE UPDATE ON a003_sale \
                 BEGIN SELECT RAISE(ABORT, 'read only'); END;",
            )
            .await
            .unwrap();

        let result = SalesSyncExecutor::new(ctx.clone(), erp_with(lifecycle_moves()))
            .sync_sales()
            .await;
        assert!(result.is_success(), "{:?}", result);
        let counts = result.counts().unwrap();
        assert_eq!(counts.inserted, 4);
        // I4 insert plus the I5 snapshot that could not be corrected
        assert_eq!(counts.errors, 2);

        // snapshot written at insert time stays as it was
        assert_eq!(snapshot(&ctx, "I5").await, Some(CustomerType::Portfolio));
        assert_eq!(line_repository::list_by_sale(ctx.db(), "I1").await.unwrap().len(), 1);
        assert_eq!(line_repository::list_by_sale(ctx.db(), "I2").await.unwrap().len(), 1);

        let client = clients::get_by_id(ctx.db(), 1).await.unwrap().unwrap();
        assert_eq!(client.transaction_count, 4);
        assert_eq!(client.customer_type, CustomerType::Recovered);
    }
}
