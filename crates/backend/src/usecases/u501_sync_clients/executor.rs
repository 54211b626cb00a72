use crate::domain::a001_client::{from_erp, from_erp::ErpClientRecord, repository};
use crate::shared::bulk;
use crate::shared::context::SyncContext;
use crate::shared::erp::{self, ErpSource};
use crate::shared::error::SyncError;
use crate::shared::identity_index::{IdentityIndex, KeySet};
use crate::shared::sync_lock::EntityKind;
use contracts::usecases::common::{SyncCounts, SyncResult};
use std::sync::Arc;

/// Executor для выгрузки клиентов из ERP
pub struct ClientSyncExecutor {
    ctx: SyncContext,
    erp: Arc<dyn ErpSource>,
}

impl ClientSyncExecutor {
    pub fn new(ctx: SyncContext, erp: Arc<dyn ErpSource>) -> Self {
        Self { ctx, erp }
    }

    /// Добавить клиентов, которых еще нет на складе
    pub async fn insert_clients(&self) -> SyncResult {
        self.run_insert()
            .await
            .unwrap_or_else(|e| e.into_result("insert clients"))
    }

    /// Перезаписать профиль уже известных клиентов
    pub async fn update_clients(&self) -> SyncResult {
        self.run_update()
            .await
            .unwrap_or_else(|e| e.into_result("update clients"))
    }

    async fn pull(&self) -> Result<Vec<Result<ErpClientRecord, SyncError>>, SyncError> {
        let records = self
            .erp
            .search_read(from_erp::MODEL, from_erp::domain(), from_erp::FIELDS)
            .await?;
        Ok(erp::decode_each(records, "id"))
    }

    async fn run_insert(&self) -> Result<SyncResult, SyncError> {
        let _guard = self.ctx.locks.try_acquire(&[EntityKind::Clients])?;
        let conn = self.ctx.db();

        let records = self.pull().await?;
        let received = records.len();
        tracing::info!("Client insert: received {} records", received);

        let existing = repository::list_all(conn).await?;
        let mut known = KeySet::build(existing.iter().map(|c| c.id));

        let mut counts = SyncCounts::default();
        let mut rows = Vec::new();
        for record in records {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Skipping client: {}", e);
                    counts.errors += 1;
                    continue;
                }
            };
            if !known.claim(record.id) {
                counts.skipped += 1;
                continue;
            }
            let client = record.to_aggregate();
            rows.push((client.id, repository::active_model(&client)));
        }

        let outcome = bulk::insert_chunked(conn, rows, self.ctx.settings.chunk_size).await;
        counts.inserted = outcome.inserted as i64;
        counts.errors += outcome.errors() as i64;

        tracing::info!(
            "Client insert finished: inserted={}, skipped={}, errors={}",
            counts.inserted,
            counts.skipped,
            counts.errors
        );
        Ok(SyncResult::success(
            format!("Inserted {} new clients of {}", counts.inserted, received),
            counts,
        ))
    }

    async fn run_update(&self) -> Result<SyncResult, SyncError> {
        let _guard = self.ctx.locks.try_acquire(&[EntityKind::Clients])?;
        let conn = self.ctx.db();

        let records = self.pull().await?;
        let received = records.len();
        tracing::info!("Client update: received {} records", received);

        let mut index = IdentityIndex::build(repository::list_all(conn).await?, |c| c.id);

        let mut counts = SyncCounts::default();
        for record in records {
            let incoming = match record {
                Ok(r) => r.to_aggregate(),
                Err(e) => {
                    tracing::warn!("Skipping client: {}", e);
                    counts.errors += 1;
                    continue;
                }
            };
            let Some(stored) = index.get_mut(&incoming.id) else {
                tracing::debug!("Client {} is not in the warehouse yet", incoming.id);
                counts.skipped += 1;
                continue;
            };
            if stored.same_profile(&incoming) {
                counts.unchanged += 1;
                continue;
            }
            stored.apply_profile(&incoming);
            match repository::update(conn, stored).await {
                Ok(()) => counts.updated += 1,
                Err(e) => {
                    tracing::error!("Failed to update client {}: {}", incoming.id, e);
                    counts.errors += 1;
                }
            }
        }

        tracing::info!(
            "Client update finished: updated={}, unchanged={}, skipped={}, errors={}",
            counts.updated,
            counts.unchanged,
            counts.skipped,
            counts.errors
        );
        Ok(SyncResult::success(
            format!("Updated {} clients of {}", counts.updated, received),
            counts,
        ))
    }
}
