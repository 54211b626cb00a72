use crate::domain::a006_ad_account::repository;
use crate::shared::config::AdAccountConfig;
use crate::shared::context::SyncContext;
use crate::shared::error::SyncError;
use crate::shared::identity_index::{IdentityIndex, KeySet};
use crate::shared::sync_lock::EntityKind;
use contracts::domain::a006_ad_account::aggregate::AdAccount;
use contracts::usecases::common::{SyncCounts, SyncResult};

fn to_account(config: &AdAccountConfig) -> Result<AdAccount, SyncError> {
    let account_id = config.account_id.trim();
    if account_id.is_empty() {
        return Err(SyncError::record(&config.account_name, "empty account id"));
    }
    if config.account_key.trim().is_empty() {
        return Err(SyncError::record(account_id, "empty account key"));
    }
    Ok(AdAccount {
        account_id: account_id.to_string(),
        account_name: config.account_name.trim().to_string(),
        account_key: config.account_key.trim().to_string(),
        is_active: config.is_active,
        has_valid_token: true,
        last_sync_date: None,
    })
}

/// Executor для реестра рекламных аккаунтов
pub struct AdAccountSyncExecutor {
    ctx: SyncContext,
    accounts: Vec<AdAccountConfig>,
}

impl AdAccountSyncExecutor {
    pub fn new(ctx: SyncContext, accounts: Vec<AdAccountConfig>) -> Self {
        Self { ctx, accounts }
    }

    /// Сверить описания аккаунтов с сохраненными
    pub async fn sync_accounts(&self) -> SyncResult {
        self.run_sync()
            .await
            .unwrap_or_else(|e| e.into_result("ad accounts sync"))
    }

    async fn run_sync(&self) -> Result<SyncResult, SyncError> {
        let _guard = self.ctx.locks.try_acquire(&[EntityKind::AdAccounts])?;
        let conn = self.ctx.db();
        let received = self.accounts.len();
        tracing::info!("Ad accounts sync: {} configured accounts", received);

        let index = IdentityIndex::build(repository::list_all(conn).await?, |a| {
            a.account_id.clone()
        });
        let mut seen = KeySet::default();

        let mut counts = SyncCounts::default();
        for config in &self.accounts {
            let incoming = match to_account(config) {
                Ok(a) => a,
                Err(e) => {
                    tracing::warn!("Skipping ad account: {}", e);
                    counts.errors += 1;
                    continue;
                }
            };
            if !seen.claim(incoming.account_id.clone()) {
                tracing::warn!("Ad account {} is listed twice", incoming.account_id);
                counts.skipped += 1;
                continue;
            }

            let write = match index.get(&incoming.account_id) {
                None => repository::insert(conn, &incoming).await.map(|_| false),
                Some(stored) if stored.same_descriptor(&incoming) => {
                    counts.unchanged += 1;
                    continue;
                }
                Some(_) => repository::update_descriptor(conn, &incoming).await.map(|_| true),
            };
            match write {
                Ok(false) => counts.inserted += 1,
                Ok(true) => counts.updated += 1,
                Err(e) => {
                    tracing::error!("Failed to write ad account {}: {}", incoming.account_id, e);
                    counts.errors += 1;
                }
            }
        }

        tracing::info!(
            "Ad accounts sync finished: inserted={}, updated={}, unchanged={}, errors={}",
            counts.inserted,
            counts.updated,
            counts.unchanged,
            counts.errors
        );
        Ok(SyncResult::success(
            format!(
                "Inserted {} and updated {} ad accounts of {}",
                counts.inserted, counts.updated, received
            ),
            counts,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::context::test_context;

    fn config(id: &str, name: &str, key: &str) -> AdAccountConfig {
        AdAccountConfig {
            account_id: id.into(),
            account_name: name.into(),
            account_key: key.into(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn accounts_are_inserted_then_compared() {
        let ctx = test_context().await;
        let first = AdAccountSyncExecutor::new(
            ctx.clone(),
            vec![config("111", "DNA", "dna"), config("222", "Labs", "labs"), config("", "x", "x")],
        )
        .sync_accounts()
        .await;
        let counts = first.counts().unwrap();
        assert_eq!(counts.inserted, 2);
        assert_eq!(counts.errors, 1);

        let second = AdAccountSyncExecutor::new(
            ctx.clone(),
            vec![config("111", "DNA Shop", "dna"), config("222", "Labs", "labs")],
        )
        .sync_accounts()
        .await;
        let counts = second.counts().unwrap();
        assert_eq!(counts.updated, 1);
        assert_eq!(counts.unchanged, 1);

        let stored = repository::get_by_id(ctx.db(), "111").await.unwrap().unwrap();
        assert_eq!(stored.account_name, "DNA Shop");
    }

    #[tokio::test]
    async fn key_collision_is_counted_not_fatal() {
        let ctx = test_context().await;
        let result = AdAccountSyncExecutor::new(
            ctx.clone(),
            vec![config("1", "A", "same"), config("2", "B", "same"), config("1", "A", "same")],
        )
        .sync_accounts()
        .await;
        let counts = result.counts().unwrap();
        assert_eq!(counts.inserted, 1);
        assert_eq!(counts.errors, 1);
        assert_eq!(counts.skipped, 1);
    }
}
