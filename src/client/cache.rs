use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::utils::time::Clock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    /// Drop an entry when a write for its key is confirmed remotely.
    pub invalidate_on_write: bool,
}

impl CachePolicy {
    pub fn student_grades() -> Self {
        Self {
            ttl: Duration::minutes(5),
            invalidate_on_write: true,
        }
    }

    pub fn upcoming_tests() -> Self {
        Self {
            ttl: Duration::minutes(15),
            invalidate_on_write: false,
        }
    }
}

/// Map whose entries each carry the time they were stored. An entry is
/// fresh while `now - stored_at < ttl`.
pub struct TtlCache<K, V> {
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
    entries: HashMap<K, (V, DateTime<Utc>)>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            entries: HashMap::new(),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Fresh value only; stale entries stay in place for `peek_mut`.
    pub fn get(&self, key: &K) -> Option<V> {
        let (value, stored_at) = self.entries.get(key)?;
        (self.clock.now() - *stored_at < self.policy.ttl).then(|| value.clone())
    }

    /// Any cached value regardless of age.
    pub fn peek_mut(&mut self, key: &K) -> Option<&mut V> {
        self.entries.get_mut(key).map(|(value, _)| value)
    }

    pub fn insert(&mut self, key: K, value: V) {
        let now = self.clock.now();
        self.entries.insert(key, (value, now));
    }

    /// Returns the cached value, inserting `make()` first when absent. An
    /// inserted value is stamped with the current time.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        let now = self.clock.now();
        &mut self.entries.entry(key).or_insert_with(|| (make(), now)).0
    }

    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Applies the policy after a confirmed remote write for `key`.
    pub fn on_write(&mut self, key: &K) {
        if self.policy.invalidate_on_write {
            self.invalidate(key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
