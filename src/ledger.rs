// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Append-only ledger of signed monetary deltas per (user, currency).
//!
//! Entries optionally carry an external transaction hash; that hash is
//! unique across all entries and is the sole replay protection for
//! externally funded payments. A user's balance is a derived sum over
//! entries, never an independently mutable field.

use crate::error::{ContestError, ContestResult};
use crate::types::{LedgerEntry, NewLedgerEntry};
use crate::utils::now_ms;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append one entry. Fails with `DuplicateExternalTx` if the entry
    /// carries an external tx hash already present in the ledger; the
    /// uniqueness check and the insert are atomic.
    async fn append(&self, entry: NewLedgerEntry) -> ContestResult<LedgerEntry>;

    /// Append a batch all-or-nothing. Either every entry is written or
    /// none is; used by reward distribution so a mid-batch failure cannot
    /// leave a partially paid contest.
    async fn append_batch(&self, entries: Vec<NewLedgerEntry>) -> ContestResult<Vec<LedgerEntry>>;

    /// Look up an entry by its external tx hash.
    async fn find_by_external_tx(&self, tx_hash: &str) -> ContestResult<Option<LedgerEntry>>;

    /// Derived balance: sum of deltas for (user, currency).
    async fn balance(&self, user_id: &str, currency: &str) -> ContestResult<i64>;

    /// All entries tagged with a contest, in insertion order.
    async fn entries_for_contest(&self, contest_id: &str) -> ContestResult<Vec<LedgerEntry>>;
}

#[derive(Default)]
struct LedgerInner {
    entries: Vec<LedgerEntry>,
    /// external tx hash -> index into `entries`
    by_external_tx: HashMap<String, usize>,
    next_id: u64,
}

impl LedgerInner {
    fn materialize(&mut self, entry: NewLedgerEntry) -> LedgerEntry {
        let id = self.next_id;
        self.next_id += 1;
        let entry = LedgerEntry {
            id,
            user_id: entry.user_id,
            currency: entry.currency,
            delta: entry.delta,
            reason: entry.reason,
            external_tx_hash: entry.external_tx_hash,
            related_contest_id: entry.related_contest_id,
            related_submission_id: entry.related_submission_id,
            created_at_ms: now_ms(),
        };
        if let Some(hash) = &entry.external_tx_hash {
            self.by_external_tx.insert(hash.clone(), self.entries.len());
        }
        self.entries.push(entry.clone());
        entry
    }
}

/// In-memory ledger store. The write lock is the transactional boundary:
/// uniqueness of `external_tx_hash` is checked and the insert applied
/// under the same exclusive lock, so concurrent writers cannot both pass
/// the check.
pub struct InMemoryLedgerStore {
    inner: RwLock<LedgerInner>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerInner::default()),
        }
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn append(&self, entry: NewLedgerEntry) -> ContestResult<LedgerEntry> {
        let mut inner = self.inner.write().await;
        if let Some(hash) = &entry.external_tx_hash {
            if inner.by_external_tx.contains_key(hash) {
                return Err(ContestError::DuplicateExternalTx(hash.clone()));
            }
        }
        let entry = inner.materialize(entry);
        debug!(
            "[Ledger] Appended entry id={} user={} delta={} reason={:?}",
            entry.id, entry.user_id, entry.delta, entry.reason
        );
        Ok(entry)
    }

    async fn append_batch(&self, entries: Vec<NewLedgerEntry>) -> ContestResult<Vec<LedgerEntry>> {
        let mut inner = self.inner.write().await;
        // Validate the whole batch, including duplicates within the batch
        // itself, before writing anything.
        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if let Some(hash) = &entry.external_tx_hash {
                if inner.by_external_tx.contains_key(hash) || !seen.insert(hash.clone()) {
                    return Err(ContestError::DuplicateExternalTx(hash.clone()));
                }
            }
        }
        let written: Vec<LedgerEntry> = entries
            .into_iter()
            .map(|entry| inner.materialize(entry))
            .collect();
        debug!("[Ledger] Appended batch of {} entries", written.len());
        Ok(written)
    }

    async fn find_by_external_tx(&self, tx_hash: &str) -> ContestResult<Option<LedgerEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_external_tx
            .get(tx_hash)
            .map(|&idx| inner.entries[idx].clone()))
    }

    async fn balance(&self, user_id: &str, currency: &str) -> ContestResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.user_id == user_id && e.currency == currency)
            .map(|e| e.delta)
            .sum())
    }

    async fn entries_for_contest(&self, contest_id: &str) -> ContestResult<Vec<LedgerEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|e| e.related_contest_id.as_deref() == Some(contest_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(user: &str, delta: i64, tx: Option<&str>) -> NewLedgerEntry {
        NewLedgerEntry {
            user_id: user.to_string(),
            currency: "SOL".to_string(),
            delta,
            reason: "test credit".to_string(),
            external_tx_hash: tx.map(|s| s.to_string()),
            related_contest_id: None,
            related_submission_id: None,
        }
    }

    #[tokio::test]
    async fn test_append_and_balance() {
        let store = InMemoryLedgerStore::new();
        store.append(entry("alice", 100, None)).await.unwrap();
        store.append(entry("alice", -30, None)).await.unwrap();
        store.append(entry("bob", 7, None)).await.unwrap();

        assert_eq!(store.balance("alice", "SOL").await.unwrap(), 70);
        assert_eq!(store.balance("bob", "SOL").await.unwrap(), 7);
        assert_eq!(store.balance("alice", "USDC").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_external_tx_hash_unique() {
        let store = InMemoryLedgerStore::new();
        store.append(entry("alice", 10, Some("sig1"))).await.unwrap();

        let err = store
            .append(entry("bob", 10, Some("sig1")))
            .await
            .unwrap_err();
        assert_eq!(err, ContestError::DuplicateExternalTx("sig1".to_string()));

        // Original entry is intact and the duplicate wrote nothing
        assert_eq!(store.balance("alice", "SOL").await.unwrap(), 10);
        assert_eq!(store.balance("bob", "SOL").await.unwrap(), 0);
        let found = store.find_by_external_tx("sig1").await.unwrap().unwrap();
        assert_eq!(found.user_id, "alice");
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = InMemoryLedgerStore::new();
        store.append(entry("alice", 10, Some("sig1"))).await.unwrap();

        // Second element collides with an existing entry
        let err = store
            .append_batch(vec![entry("bob", 5, None), entry("carol", 5, Some("sig1"))])
            .await
            .unwrap_err();
        assert_eq!(err, ContestError::DuplicateExternalTx("sig1".to_string()));
        assert_eq!(store.balance("bob", "SOL").await.unwrap(), 0);

        // Intra-batch duplicates are also rejected before any write
        let err = store
            .append_batch(vec![
                entry("bob", 5, Some("sig2")),
                entry("carol", 5, Some("sig2")),
            ])
            .await
            .unwrap_err();
        assert_eq!(err, ContestError::DuplicateExternalTx("sig2".to_string()));
        assert!(store.find_by_external_tx("sig2").await.unwrap().is_none());

        let written = store
            .append_batch(vec![entry("bob", 5, Some("sig3")), entry("carol", 6, None)])
            .await
            .unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(store.balance("carol", "SOL").await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_entries_for_contest() {
        let store = InMemoryLedgerStore::new();
        let mut e = entry("alice", 40, None);
        e.related_contest_id = Some("c1".to_string());
        store.append(e).await.unwrap();
        store.append(entry("alice", 1, None)).await.unwrap();

        let entries = store.entries_for_contest("c1").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].delta, 40);
        assert!(store.entries_for_contest("c2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_single_winner() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryLedgerStore::new());
        let mut handles = vec![];
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(entry(&format!("user{}", i), 1, Some("race"))).await
            }));
        }
        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(store.find_by_external_tx("race").await.unwrap().is_some());
    }
}
