use std::{collections::HashMap, time::Duration};

use jiff::Timestamp;

use crate::rdb::Snapshot;

#[derive(Debug, PartialEq, Clone)]
pub struct Value {
    pub data: String,
    pub expiration: Option<Timestamp>,
}

impl Value {
    fn is_expired(&self, now: Timestamp) -> bool {
        match self.expiration {
            Some(expiration) => now >= expiration,
            None => false,
        }
    }
}

/// String keys mapped to string values with an optional wall-clock expiry.
///
/// Expired keys are evicted lazily, when a lookup or a key listing runs into them.
#[derive(Debug, Default)]
pub struct KeyValueStore {
    entries: HashMap<String, Value>,
}

impl KeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &str) -> Option<String> {
        let now = Timestamp::now();

        match self.entries.get(key) {
            Some(value) if value.is_expired(now) => {
                self.entries.remove(key);
                None
            }
            Some(value) => Some(value.data.clone()),
            None => None,
        }
    }

    /// Stores `value` under `key`, replacing any previous value and expiry.
    ///
    /// Fails only when `now + ttl` cannot be represented as a timestamp.
    pub fn set(
        &mut self,
        key: String,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<(), jiff::Error> {
        let expiration = match ttl {
            Some(ttl) => Some(Timestamp::now().checked_add(ttl)?),
            None => None,
        };

        self.insert(
            key,
            Value {
                data: value,
                expiration,
            },
        );

        Ok(())
    }

    pub fn insert(&mut self, key: String, value: Value) {
        self.entries.insert(key, value);
    }

    /// Returns every live key, evicting the expired ones on the way.
    pub fn keys(&mut self) -> Vec<String> {
        let now = Timestamp::now();
        self.entries.retain(|_, value| !value.is_expired(now));

        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copies every entry of every database in `snapshot` into the store, keeping the
    /// epoch-millisecond expiry. Returns the number of keys merged.
    pub fn merge_snapshot(&mut self, snapshot: Snapshot) -> usize {
        let mut merged = 0;

        for database in snapshot.databases {
            for (key, entry) in database.entries {
                let expiration = entry.expire_at_millis.map(|millis| {
                    i64::try_from(millis)
                        .ok()
                        .and_then(|millis| Timestamp::from_millisecond(millis).ok())
                        .unwrap_or(Timestamp::MAX)
                });

                self.insert(
                    key,
                    Value {
                        data: entry.value,
                        expiration,
                    },
                );
                merged += 1;
            }
        }

        merged
    }
}
