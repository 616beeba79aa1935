//! Mempool: admission, fee market, replace-by-fee, and deterministic
//! eviction over pending transactions.

use std::collections::BTreeMap;

use crate::types::{AccountId, Transaction};

use super::config::MempoolConfig;
use super::entry::{Entry, EntryState};
use super::error::MempoolError;

/// Pluggable mempool surface, generalized the same way
/// [`crate::engine::store::BlockStore`] is: a trait seam so a producer
/// or validator can be built against "some pool of pending
/// transactions" without committing to a specific admission policy.
pub trait TxPool: Send + Sync {
    fn try_admit(&mut self, tx: Transaction, height: u64) -> Result<(), MempoolError>;
    fn mark_included(&mut self, sender: AccountId, nonce: u64);
    fn expire(&mut self, height: u64);
    fn ready(&self) -> Vec<Transaction>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reference in-memory [`TxPool`] implementation.
pub struct MemPool {
    config: MempoolConfig,
    entries: BTreeMap<(AccountId, u64), Entry>,
    ema_min_fee_rate: u64,
}

impl MemPool {
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            config,
            entries: BTreeMap::new(),
            ema_min_fee_rate: 0,
        }
    }

    fn live_count(&self) -> usize {
        self.entries.values().filter(|e| !e.is_terminal()).count()
    }

    fn live_count_for(&self, sender: AccountId) -> usize {
        self.entries
            .values()
            .filter(|e| !e.is_terminal() && e.tx.sender == sender)
            .count()
    }

    /// EMA minimum fee rate, scaled up by the surge multiplier once pool
    /// utilization crosses the configured threshold.
    pub fn effective_min_fee_rate(&self) -> u64 {
        let utilization_bp = if self.config.capacity == 0 {
            0
        } else {
            (self.live_count() as u64 * 10_000) / self.config.capacity as u64
        };

        if utilization_bp as u32 >= self.config.surge_utilization_bp {
            ((self.ema_min_fee_rate as u128 * self.config.surge_multiplier_bp as u128) / 10_000)
                as u64
        } else {
            self.ema_min_fee_rate
        }
    }

    fn observe_fee_rate(&mut self, fee_rate: u64) {
        let alpha_num = self.config.fee_ema_alpha_numerator as u128;
        let alpha_den = self.config.fee_ema_alpha_denominator.max(1) as u128;
        let prev = self.ema_min_fee_rate as u128;
        let sample = fee_rate as u128;
        let blended = (alpha_num * prev + (alpha_den - alpha_num) * sample) / alpha_den;
        self.ema_min_fee_rate = blended as u64;
    }

    /// Finds the lowest fee-rate, non-terminal entry, if any, that is
    /// not the parent nonce of another still-admitted entry — the
    /// deterministic eviction candidate when the pool is at capacity.
    /// Ties are broken by `(sender, nonce)` ascending, i.e. the BTreeMap's
    /// own iteration order, so eviction choice never depends on
    /// insertion order or hashing.
    ///
    /// An entry is a parent nonce of another live entry when the same
    /// sender has a live entry at a higher nonce; evicting it would
    /// strand that higher-nonce entry (it could never become ready
    /// ahead of a hole in the sender's nonce sequence), so such entries
    /// are excluded from consideration entirely.
    fn cheapest_evictable(&self) -> Option<(AccountId, u64)> {
        let mut max_live_nonce: BTreeMap<AccountId, u64> = BTreeMap::new();
        for ((sender, nonce), entry) in self.entries.iter() {
            if entry.is_terminal() {
                continue;
            }
            let slot = max_live_nonce.entry(*sender).or_insert(*nonce);
            if *nonce > *slot {
                *slot = *nonce;
            }
        }

        self.entries
            .iter()
            .filter(|((sender, nonce), e)| {
                !e.is_terminal() && max_live_nonce.get(sender) == Some(nonce)
            })
            .min_by_key(|(key, e)| (e.tx.fee_rate(), *key))
            .map(|(key, _)| *key)
    }
}

impl TxPool for MemPool {
    fn try_admit(&mut self, tx: Transaction, height: u64) -> Result<(), MempoolError> {
        let fee_rate = tx.fee_rate();
        let min_rate = self.effective_min_fee_rate();
        if fee_rate < min_rate {
            return Err(MempoolError::Underpriced {
                offered: fee_rate,
                minimum: min_rate,
            });
        }

        let key = (tx.sender, tx.nonce);

        if let Some(existing) = self.entries.get(&key) {
            if !existing.is_terminal() {
                let required = (existing.tx.fee_rate() as u128
                    * (100 + self.config.rbf_bump_pct as u128))
                    / 100;
                if (fee_rate as u128) <= required {
                    return Err(MempoolError::ReplacementUnderpriced {
                        offered: fee_rate,
                        existing: existing.tx.fee_rate(),
                    });
                }
                self.entries.insert(key, Entry::new(tx, height));
                self.observe_fee_rate(fee_rate);
                if let Some(e) = self.entries.get_mut(&key) {
                    e.mark_ready();
                }
                return Ok(());
            }
        }

        let sender_count = self.live_count_for(tx.sender);
        if sender_count >= self.config.per_sender_quota {
            return Err(MempoolError::SenderQuotaExceeded {
                count: sender_count,
                quota: self.config.per_sender_quota,
            });
        }

        if self.live_count() >= self.config.capacity {
            match self.cheapest_evictable() {
                Some(evict_key) if self.entries[&evict_key].tx.fee_rate() < fee_rate => {
                    if let Some(e) = self.entries.get_mut(&evict_key) {
                        e.state = EntryState::Evicted;
                    }
                }
                _ => {
                    return Err(MempoolError::PoolFull {
                        size: self.live_count(),
                        capacity: self.config.capacity,
                    });
                }
            }
        }

        let mut entry = Entry::new(tx, height);
        entry.mark_ready();
        self.entries.insert(key, entry);
        self.observe_fee_rate(fee_rate);
        Ok(())
    }

    fn mark_included(&mut self, sender: AccountId, nonce: u64) {
        if let Some(entry) = self.entries.get_mut(&(sender, nonce)) {
            entry.state = EntryState::Included;
        }
    }

    fn expire(&mut self, height: u64) {
        for entry in self.entries.values_mut() {
            if !entry.is_terminal()
                && height.saturating_sub(entry.admitted_height) > self.config.expiry_blocks
            {
                entry.state = EntryState::Expired;
            }
        }
    }

    /// Ready transactions ordered by fee rate descending, tie-broken by
    /// `(sender, nonce)` ascending for determinism across nodes
    /// assembling the same candidate set.
    fn ready(&self) -> Vec<Transaction> {
        let mut ready: Vec<(&(AccountId, u64), &Entry)> = self
            .entries
            .iter()
            .filter(|(_, e)| e.state == EntryState::Ready)
            .collect();
        ready.sort_by(|(key_a, a), (key_b, b)| {
            b.tx.fee_rate()
                .cmp(&a.tx.fee_rate())
                .then_with(|| key_a.cmp(key_b))
        });
        ready.into_iter().map(|(_, e)| e.tx.clone()).collect()
    }

    fn len(&self) -> usize {
        self.live_count()
    }
}

impl MemPool {
    /// Ready transactions ordered the same way [`TxPool::ready`] orders
    /// them, but capped at `max_per_sender` entries per sender — the
    /// block-template fairness cap a producer applies on top of the
    /// pool's own admission-time per-sender quota, so one sender with a
    /// deep, well-funded queue can't crowd an entire block template.
    pub fn ready_template(&self, max_per_sender: usize) -> Vec<Transaction> {
        let mut taken: BTreeMap<AccountId, usize> = BTreeMap::new();
        self.ready()
            .into_iter()
            .filter(|tx| {
                let count = taken.entry(tx.sender).or_insert(0);
                if *count >= max_per_sender {
                    false
                } else {
                    *count += 1;
                    true
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Hash256, Signature};

    fn cfg(capacity: usize, quota: usize) -> MempoolConfig {
        MempoolConfig {
            capacity,
            per_sender_quota: quota,
            fee_ema_alpha_numerator: 1,
            fee_ema_alpha_denominator: 2,
            surge_utilization_bp: 8000,
            surge_multiplier_bp: 20_000,
            rbf_bump_pct: 10,
            expiry_blocks: 100,
        }
    }

    fn tx(sender_seed: u8, nonce: u64, fee: u64, size: u32) -> Transaction {
        Transaction {
            sender: AccountId(Hash256([sender_seed; 32])),
            nonce,
            fee,
            size_bytes: size,
            blob_size: 0,
            payload: vec![],
            signature: Signature(vec![0u8; 4]),
        }
    }

    #[test]
    fn admits_transaction_above_floor() {
        let mut pool = MemPool::new(cfg(10, 10));
        assert!(pool.try_admit(tx(1, 0, 100, 10), 0).is_ok());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn rbf_requires_bump_over_existing() {
        let mut pool = MemPool::new(cfg(10, 10));
        pool.try_admit(tx(1, 0, 1000, 10), 0).unwrap(); // rate 100
        let err = pool.try_admit(tx(1, 0, 1010, 10), 0).unwrap_err();
        assert!(matches!(err, MempoolError::ReplacementUnderpriced { .. }));

        // 100 * 1.10 = 110/byte => fee must exceed 1100
        assert!(pool.try_admit(tx(1, 0, 1200, 10), 0).is_ok());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn per_sender_quota_is_enforced() {
        let mut pool = MemPool::new(cfg(10, 1));
        pool.try_admit(tx(1, 0, 100, 10), 0).unwrap();
        let err = pool.try_admit(tx(1, 1, 100, 10), 0).unwrap_err();
        assert!(matches!(err, MempoolError::SenderQuotaExceeded { .. }));
    }

    #[test]
    fn capacity_evicts_cheapest_when_incoming_is_pricier() {
        let mut pool = MemPool::new(cfg(1, 10));
        pool.try_admit(tx(1, 0, 100, 10), 0).unwrap(); // rate 10
        assert!(pool.try_admit(tx(2, 0, 1000, 10), 0).is_ok()); // rate 100
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn capacity_rejects_when_incoming_is_cheaper() {
        let mut pool = MemPool::new(cfg(1, 10));
        pool.try_admit(tx(1, 0, 1000, 10), 0).unwrap(); // rate 100
        let err = pool.try_admit(tx(2, 0, 100, 10), 0).unwrap_err();
        assert!(matches!(err, MempoolError::PoolFull { .. }));
    }

    #[test]
    fn eviction_never_strands_a_higher_nonce_entry() {
        // sender 1 has nonce 0 (cheapest overall, but the parent nonce 1
        // depends on) and nonce 1 (pricier than nonce 0, but still
        // cheaper than what's about to be admitted). Without the
        // parent-nonce guard, the naive cheapest-first rule would evict
        // nonce 0 and strand nonce 1; the guard must instead evict
        // nonce 1 (the only eligible candidate) and leave nonce 0 in
        // place.
        let mut pool = MemPool::new(cfg(2, 10));
        pool.try_admit(tx(1, 0, 100, 10), 0).unwrap(); // rate 10, parent nonce
        pool.try_admit(tx(1, 1, 200, 10), 0).unwrap(); // rate 20, depends on nonce 0
        assert!(pool.try_admit(tx(2, 0, 1000, 10), 0).is_ok()); // rate 100

        let sender_one = AccountId(Hash256([1; 32]));
        let ready = pool.ready();
        assert!(ready.iter().any(|t| t.sender == sender_one && t.nonce == 0));
        assert!(!ready.iter().any(|t| t.sender == sender_one && t.nonce == 1));
    }

    #[test]
    fn expire_marks_old_entries() {
        let mut pool = MemPool::new(cfg(10, 10));
        pool.try_admit(tx(1, 0, 100, 10), 0).unwrap();
        pool.expire(50);
        assert_eq!(pool.len(), 1);
        pool.expire(200);
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn ready_orders_by_fee_rate_descending() {
        let mut pool = MemPool::new(cfg(10, 10));
        pool.try_admit(tx(1, 0, 100, 10), 0).unwrap(); // rate 10
        pool.try_admit(tx(2, 0, 500, 10), 0).unwrap(); // rate 50
        let ready = pool.ready();
        assert_eq!(ready.len(), 2);
        assert!(ready[0].fee_rate() >= ready[1].fee_rate());
    }

    #[test]
    fn mark_included_removes_from_ready() {
        let mut pool = MemPool::new(cfg(10, 10));
        pool.try_admit(tx(1, 0, 100, 10), 0).unwrap();
        pool.mark_included(AccountId(Hash256([1; 32])), 0);
        assert!(pool.ready().is_empty());
    }

    #[test]
    fn ready_template_caps_entries_per_sender() {
        let mut pool = MemPool::new(cfg(10, 10));
        pool.try_admit(tx(1, 0, 500, 10), 0).unwrap();
        pool.try_admit(tx(1, 1, 400, 10), 0).unwrap();
        pool.try_admit(tx(2, 0, 300, 10), 0).unwrap();

        let template = pool.ready_template(1);
        assert_eq!(template.len(), 2);
        let sender_one_count = template
            .iter()
            .filter(|tx| tx.sender == AccountId(Hash256([1; 32])))
            .count();
        assert_eq!(sender_one_count, 1);
    }
}
