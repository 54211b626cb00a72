use super::error::SyncError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Набор сущностей, которые синхронизируются независимо
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Clients,
    Products,
    Sales,
    Materials,
    ExpiryLots,
    AdAccounts,
    AdMetrics,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Clients,
        EntityKind::Products,
        EntityKind::Sales,
        EntityKind::Materials,
        EntityKind::ExpiryLots,
        EntityKind::AdAccounts,
        EntityKind::AdMetrics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Clients => "clients",
            EntityKind::Products => "products",
            EntityKind::Sales => "sales",
            EntityKind::Materials => "materials",
            EntityKind::ExpiryLots => "expiry lots",
            EntityKind::AdAccounts => "ad accounts",
            EntityKind::AdMetrics => "ad metrics",
        }
    }
}

/// Рекомендательные блокировки: не более одного прогона на тип сущности.
#[derive(Clone)]
pub struct SyncLocks {
    locks: Arc<HashMap<EntityKind, Arc<Mutex<()>>>>,
}

/// Удерживаемые блокировки; снимаются при drop
pub struct SyncGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl SyncLocks {
    pub fn new() -> Self {
        let locks = EntityKind::ALL
            .iter()
            .map(|kind| (*kind, Arc::new(Mutex::new(()))))
            .collect();
        Self {
            locks: Arc::new(locks),
        }
    }

    /// Захватить блокировки в порядке `kinds` без ожидания.
    /// Если хоть одна занята, уже взятые отпускаются и возвращается `Busy`.
    pub fn try_acquire(&self, kinds: &[EntityKind]) -> Result<SyncGuard, SyncError> {
        let mut guards = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let lock = self
                .locks
                .get(kind)
                .ok_or_else(|| anyhow::anyhow!("no lock registered for {}", kind.as_str()))?;
            match Arc::clone(lock).try_lock_owned() {
                Ok(guard) => guards.push(guard),
                Err(_) => {
                    tracing::warn!("Sync of {} is already running", kind.as_str());
                    return Err(SyncError::Busy(kind.as_str()));
                }
            }
        }
        Ok(SyncGuard { _guards: guards })
    }
}

impl Default for SyncLocks {
    fn default() -> Self {
        Self::new()
    }
}
