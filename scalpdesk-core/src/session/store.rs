//! Key-value persistence hook for the trade ledger.
//!
//! The session only ever reads and writes two string keys; the backing store
//! (in-memory, a JSON file, a browser-style local storage) lives outside the
//! core.

use crate::domain::Trade;
use crate::position::LedgerSnapshot;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub const TRADES_KEY: &str = "scalpdesk_trades";
pub const BALANCE_KEY: &str = "scalpdesk_balance";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend failed: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed value under {key}: {source}")]
    Malformed {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
}

/// String key-value storage.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;

    /// Write several keys as one update. Stores that can commit them
    /// together override this; the default writes them in order.
    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// In-memory store. Clones share the same map, so a caller can keep a handle
/// after giving one to a session.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_map<R>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> R) -> Result<R, StoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(f(&mut map))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_map(|m| m.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_map(|m| {
            m.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.with_map(|m| {
            m.remove(key);
        })
    }

    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        self.with_map(|m| {
            for (key, value) in entries {
                m.insert(key.to_string(), value.to_string());
            }
        })
    }
}

/// Read the persisted ledger. `Ok(None)` when nothing has been saved yet.
///
/// A missing balance with trades present is treated as unknown and left to
/// the caller's default.
pub fn load_snapshot(store: &dyn KeyValueStore) -> Result<Option<LedgerSnapshot>, StoreError> {
    let trades = store.get(TRADES_KEY)?;
    let balance = store.get(BALANCE_KEY)?;
    if trades.is_none() && balance.is_none() {
        return Ok(None);
    }

    let trades: Vec<Trade> = match trades {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
            key: TRADES_KEY,
            source,
        })?,
        None => Vec::new(),
    };
    let balance: f64 = match balance {
        Some(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
            key: BALANCE_KEY,
            source,
        })?,
        None => f64::NAN,
    };
    Ok(Some(LedgerSnapshot { balance, trades }))
}

pub fn save_snapshot(store: &mut dyn KeyValueStore, snapshot: &LedgerSnapshot) -> Result<(), StoreError> {
    let trades = serde_json::to_string(&snapshot.trades).map_err(StoreError::Encode)?;
    let balance = serde_json::to_string(&snapshot.balance).map_err(StoreError::Encode)?;
    store.set_many(&[(TRADES_KEY, trades.as_str()), (BALANCE_KEY, balance.as_str())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExitReason, Side, TradeId};

    fn trade() -> Trade {
        Trade {
            id: TradeId(3),
            side: Side::Short,
            entry_price: 100.0,
            exit_price: 99.0,
            size: 1000.0,
            leverage: 20.0,
            pnl: 200.0,
            opened_at: 0,
            closed_at: 60,
            reason: ExitReason::TakeProfit,
        }
    }

    #[test]
    fn empty_store_has_no_snapshot() {
        let store = MemoryStore::new();
        assert!(load_snapshot(&store).unwrap().is_none());
    }

    #[test]
    fn snapshot_round_trip() {
        let mut store = MemoryStore::new();
        let snap = LedgerSnapshot {
            balance: 50_200.0,
            trades: vec![trade()],
        };
        save_snapshot(&mut store, &snap).unwrap();
        assert_eq!(load_snapshot(&store).unwrap(), Some(snap));
    }

    #[test]
    fn clones_share_state() {
        let mut a = MemoryStore::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
        a.remove("k").unwrap();
        assert!(b.get("k").unwrap().is_none());
    }

    /// Counts writes so tests can see how a snapshot reaches the backend.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        single_writes: usize,
        batch_writes: usize,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            self.single_writes += 1;
            self.inner.set(key, value)
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }

        fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
            self.batch_writes += 1;
            self.inner.set_many(entries)
        }
    }

    #[test]
    fn snapshot_is_saved_as_one_batch() {
        let mut store = CountingStore::default();
        let snap = LedgerSnapshot {
            balance: 50_200.0,
            trades: vec![trade()],
        };
        save_snapshot(&mut store, &snap).unwrap();
        assert_eq!(store.batch_writes, 1);
        assert_eq!(store.single_writes, 0);
        assert_eq!(load_snapshot(&store).unwrap(), Some(snap));
    }

    #[test]
    fn corrupt_trades_are_reported() {
        let mut store = MemoryStore::new();
        store.set(TRADES_KEY, "not json").unwrap();
        assert!(matches!(
            load_snapshot(&store),
            Err(StoreError::Malformed { key: TRADES_KEY, .. })
        ));
    }
}
