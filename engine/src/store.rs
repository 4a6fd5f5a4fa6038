//! Typed read/modify/exists/delete surface over a logical key-value store with four
//! value kinds: hash, sorted set, list, counter. `MemoryStore` is the one production
//! implementation — an in-process stand-in for the Redis pool the source drove
//! through `redigo`. It is not transactional; the batch lock in `dispatch` is what
//! makes a batch observably atomic.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

/// A sorted set resolves equal-score ties by insertion order in both directions,
/// which is exactly the price/time priority rule the order books need. Each member
/// is keyed internally by `(score, insertion_sequence)`; `first_asc` is the plain
/// minimum of that composite key, while `first_desc` has to find the maximum score
/// bucket first and then take the earliest sequence number within it.
#[derive(Debug, Default, Clone)]
pub struct SortedSet {
    by_key: BTreeMap<(Decimal, u64), String>,
    index: HashMap<String, (Decimal, u64)>,
    next_seq: u64,
}

impl SortedSet {
    fn insert(&mut self, member: &str, score: Decimal) {
        if let Some(&old_key) = self.index.get(member) {
            if old_key.0 == score {
                return;
            }
            self.by_key.remove(&old_key);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_key.insert((score, seq), member.to_string());
        self.index.insert(member.to_string(), (score, seq));
    }

    fn remove(&mut self, member: &str) {
        if let Some(key) = self.index.remove(member) {
            self.by_key.remove(&key);
        }
    }

    fn first_asc(&self) -> Option<(String, Decimal)> {
        self.by_key
            .iter()
            .next()
            .map(|(&(score, _), member)| (member.clone(), score))
    }

    fn first_desc(&self) -> Option<(String, Decimal)> {
        let &(max_score, _) = self.by_key.keys().next_back()?;
        self.by_key
            .range((max_score, u64::MIN)..=(max_score, u64::MAX))
            .next()
            .map(|(&(score, _), member)| (member.clone(), score))
    }

    fn card(&self) -> u64 {
        self.by_key.len() as u64
    }
}

#[derive(Debug, Clone)]
enum StoredValue {
    Hash(HashMap<String, String>),
    SortedSet(SortedSet),
    List(Vec<String>),
    Counter(u64),
}

/// The operations the engine needs out of the KV layer. All numeric hash fields are
/// decimal strings; callers convert to/from `Decimal` at the edge.
pub trait Store: Send + Sync {
    fn hset(&self, key: &str, field: &str, value: &str) -> EngineResult<()>;
    fn hmset(&self, key: &str, fields: &[(&str, &str)]) -> EngineResult<()>;
    fn hget(&self, key: &str, field: &str) -> EngineResult<Option<String>>;
    fn hmget(&self, key: &str, fields: &[&str]) -> EngineResult<Vec<Option<String>>>;
    fn hincrby_decimal(&self, key: &str, field: &str, delta: Decimal) -> EngineResult<Decimal>;
    fn exists(&self, key: &str) -> EngineResult<bool>;
    fn delete(&self, key: &str) -> EngineResult<()>;

    fn zadd(&self, key: &str, score: Decimal, member: &str) -> EngineResult<()>;
    fn zrem(&self, key: &str, member: &str) -> EngineResult<()>;
    fn zfirst_asc(&self, key: &str) -> EngineResult<Option<(String, Decimal)>>;
    fn zfirst_desc(&self, key: &str) -> EngineResult<Option<(String, Decimal)>>;
    fn zcard(&self, key: &str) -> EngineResult<u64>;

    fn rpush(&self, key: &str, value: &str) -> EngineResult<()>;
    fn lrange_all(&self, key: &str) -> EngineResult<Vec<String>>;

    fn incr(&self, key: &str) -> EngineResult<u64>;
}

/// In-memory keyspace guarded by a single `parking_lot::RwLock`, the same lock the
/// teacher reaches for around its own hot in-process state.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keyspace: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_decimal(field: &str, raw: &str) -> EngineResult<Decimal> {
        raw.parse::<Decimal>().map_err(|e| {
            EngineError::StorageError(format!("field {field} is not a decimal: {e}"))
        })
    }
}

impl Store for MemoryStore {
    fn hset(&self, key: &str, field: &str, value: &str) -> EngineResult<()> {
        let mut ks = self.keyspace.write();
        match ks.entry(key.to_string()).or_insert_with(|| StoredValue::Hash(HashMap::new())) {
            StoredValue::Hash(h) => {
                h.insert(field.to_string(), value.to_string());
                Ok(())
            }
            _ => Err(EngineError::StorageError(format!("{key} is not a hash"))),
        }
    }

    fn hmset(&self, key: &str, fields: &[(&str, &str)]) -> EngineResult<()> {
        let mut ks = self.keyspace.write();
        match ks.entry(key.to_string()).or_insert_with(|| StoredValue::Hash(HashMap::new())) {
            StoredValue::Hash(h) => {
                for (field, value) in fields {
                    h.insert((*field).to_string(), (*value).to_string());
                }
                Ok(())
            }
            _ => Err(EngineError::StorageError(format!("{key} is not a hash"))),
        }
    }

    fn hget(&self, key: &str, field: &str) -> EngineResult<Option<String>> {
        let ks = self.keyspace.read();
        match ks.get(key) {
            Some(StoredValue::Hash(h)) => Ok(h.get(field).cloned()),
            Some(_) => Err(EngineError::StorageError(format!("{key} is not a hash"))),
            None => Ok(None),
        }
    }

    fn hmget(&self, key: &str, fields: &[&str]) -> EngineResult<Vec<Option<String>>> {
        let ks = self.keyspace.read();
        match ks.get(key) {
            Some(StoredValue::Hash(h)) => {
                Ok(fields.iter().map(|f| h.get(*f).cloned()).collect())
            }
            Some(_) => Err(EngineError::StorageError(format!("{key} is not a hash"))),
            None => Ok(vec![None; fields.len()]),
        }
    }

    fn hincrby_decimal(&self, key: &str, field: &str, delta: Decimal) -> EngineResult<Decimal> {
        let mut ks = self.keyspace.write();
        let entry = ks.entry(key.to_string()).or_insert_with(|| StoredValue::Hash(HashMap::new()));
        match entry {
            StoredValue::Hash(h) => {
                let current = match h.get(field) {
                    Some(raw) => Self::parse_decimal(field, raw)?,
                    None => Decimal::ZERO,
                };
                let updated = current + delta;
                h.insert(field.to_string(), updated.to_string());
                Ok(updated)
            }
            _ => Err(EngineError::StorageError(format!("{key} is not a hash"))),
        }
    }

    fn exists(&self, key: &str) -> EngineResult<bool> {
        Ok(self.keyspace.read().contains_key(key))
    }

    fn delete(&self, key: &str) -> EngineResult<()> {
        self.keyspace.write().remove(key);
        Ok(())
    }

    fn zadd(&self, key: &str, score: Decimal, member: &str) -> EngineResult<()> {
        let mut ks = self.keyspace.write();
        match ks.entry(key.to_string()).or_insert_with(|| StoredValue::SortedSet(SortedSet::default())) {
            StoredValue::SortedSet(z) => {
                z.insert(member, score);
                Ok(())
            }
            _ => Err(EngineError::StorageError(format!("{key} is not a sorted set"))),
        }
    }

    fn zrem(&self, key: &str, member: &str) -> EngineResult<()> {
        let mut ks = self.keyspace.write();
        match ks.get_mut(key) {
            Some(StoredValue::SortedSet(z)) => {
                z.remove(member);
                Ok(())
            }
            Some(_) => Err(EngineError::StorageError(format!("{key} is not a sorted set"))),
            None => Ok(()),
        }
    }

    fn zfirst_asc(&self, key: &str) -> EngineResult<Option<(String, Decimal)>> {
        let ks = self.keyspace.read();
        match ks.get(key) {
            Some(StoredValue::SortedSet(z)) => Ok(z.first_asc()),
            Some(_) => Err(EngineError::StorageError(format!("{key} is not a sorted set"))),
            None => Ok(None),
        }
    }

    fn zfirst_desc(&self, key: &str) -> EngineResult<Option<(String, Decimal)>> {
        let ks = self.keyspace.read();
        match ks.get(key) {
            Some(StoredValue::SortedSet(z)) => Ok(z.first_desc()),
            Some(_) => Err(EngineError::StorageError(format!("{key} is not a sorted set"))),
            None => Ok(None),
        }
    }

    fn zcard(&self, key: &str) -> EngineResult<u64> {
        let ks = self.keyspace.read();
        match ks.get(key) {
            Some(StoredValue::SortedSet(z)) => Ok(z.card()),
            Some(_) => Err(EngineError::StorageError(format!("{key} is not a sorted set"))),
            None => Ok(0),
        }
    }

    fn rpush(&self, key: &str, value: &str) -> EngineResult<()> {
        let mut ks = self.keyspace.write();
        match ks.entry(key.to_string()).or_insert_with(|| StoredValue::List(Vec::new())) {
            StoredValue::List(l) => {
                l.push(value.to_string());
                Ok(())
            }
            _ => Err(EngineError::StorageError(format!("{key} is not a list"))),
        }
    }

    fn lrange_all(&self, key: &str) -> EngineResult<Vec<String>> {
        let ks = self.keyspace.read();
        match ks.get(key) {
            Some(StoredValue::List(l)) => Ok(l.clone()),
            Some(_) => Err(EngineError::StorageError(format!("{key} is not a list"))),
            None => Ok(Vec::new()),
        }
    }

    fn incr(&self, key: &str) -> EngineResult<u64> {
        let mut ks = self.keyspace.write();
        match ks.entry(key.to_string()).or_insert(StoredValue::Counter(0)) {
            StoredValue::Counter(c) => {
                *c += 1;
                Ok(*c)
            }
            _ => Err(EngineError::StorageError(format!("{key} is not a counter"))),
        }
    }
}
