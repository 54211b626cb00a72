use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, IntoActiveModel};
use std::fmt::Display;

/// Максимальный размер одной пачки вставки
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRow<K> {
    pub key: K,
    pub error: String,
}

/// Итог пакетной записи
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome<K> {
    pub inserted: usize,
    pub failed: Vec<FailedRow<K>>,
}

impl<K> Default for BulkOutcome<K> {
    fn default() -> Self {
        Self {
            inserted: 0,
            failed: Vec::new(),
        }
    }
}

impl<K> BulkOutcome<K> {
    pub fn errors(&self) -> usize {
        self.failed.len()
    }

    pub fn failed_keys(&self) -> impl Iterator<Item = &K> {
        self.failed.iter().map(|f| &f.key)
    }
}

/// Вставить новые строки пачками по `chunk_size`.
///
/// Каждая пачка пишется одним многострочным INSERT. Если он падает, пачка
/// повторяется построчно: каждая строка пишется независимо, ошибка строки
/// логируется с ее ключом и не прерывает остальные.
pub async fn insert_chunked<C, A, K>(
    conn: &C,
    rows: Vec<(K, A)>,
    chunk_size: usize,
) -> BulkOutcome<K>
where
    C: ConnectionTrait,
    A: ActiveModelTrait + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    K: Display + Clone,
{
    let mut outcome = BulkOutcome::default();
    let chunk_size = chunk_size.max(1);

    for chunk in rows.chunks(chunk_size) {
        let models: Vec<A> = chunk.iter().map(|(_, model)| model.clone()).collect();
        match <A::Entity as EntityTrait>::insert_many(models).exec_without_returning(conn).await {
            Ok(_) => {
                outcome.inserted += chunk.len();
                tracing::debug!("Bulk insert of {} rows succeeded", chunk.len());
            }
            Err(e) => {
                tracing::warn!(
                    "Bulk insert of {} rows failed, falling back to row-by-row: {}",
                    chunk.len(),
                    e
                );
                for (key, model) in chunk {
                    match <A::Entity as EntityTrait>::insert(model.clone())
                        .exec_without_returning(conn)
                        .await
                    {
                        Ok(_) => outcome.inserted += 1,
                        Err(e) => {
                            tracing::error!("Failed to insert row {}: {}", key, e);
                            outcome.failed.push(FailedRow {
                                key: key.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }
    }

    outcome
}
