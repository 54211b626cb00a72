use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Снимок существующих строк склада по натуральному ключу.
///
/// Строится заново в начале каждого прогона, между прогонами не кэшируется.
#[derive(Debug, Clone)]
pub struct IdentityIndex<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V> IdentityIndex<K, V> {
    pub fn build<I, F>(rows: I, key_of: F) -> Self
    where
        I: IntoIterator<Item = V>,
        F: Fn(&V) -> K,
    {
        let entries = rows.into_iter().map(|row| (key_of(&row), row)).collect();
        Self { entries }
    }

    /// Индекс из готовых пар (ключ, строка)
    pub fn from_pairs<I: IntoIterator<Item = (K, V)>>(pairs: I) -> Self {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Зарегистрировать строку, записанную в текущем прогоне
    pub fn insert(&mut self, key: K, row: V) -> Option<V> {
        self.entries.insert(key, row)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }
}

/// Множество известных ключей, когда нужна только проверка существования
#[derive(Debug, Clone, Default)]
pub struct KeySet<K> {
    keys: HashSet<K>,
}

impl<K: Eq + Hash> KeySet<K> {
    pub fn build<I: IntoIterator<Item = K>>(keys: I) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    /// true, если ключ новый; ключ сразу помечается как занятый,
    /// поэтому дубликаты внутри одной выгрузки тоже отсекаются
    pub fn claim(&mut self, key: K) -> bool {
        self.keys.insert(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
