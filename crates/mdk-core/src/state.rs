//! Payment State Store
//!
//! Tracks which payment hashes have been confirmed locally. Marking is
//! idempotent: replaying a webhook for an already-recorded payment is a
//! no-op rather than an error.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::payment::PaymentHash;

/// Local record of confirmed payments
pub trait PaymentStateStore: Send + Sync {
    /// Mark a payment as received.
    ///
    /// Returns `true` if the payment was newly recorded, `false` if it
    /// was already known.
    fn mark_payment_received(&self, payment_hash: &PaymentHash) -> Result<bool>;

    /// Check whether a payment has been recorded
    fn is_received(&self, payment_hash: &PaymentHash) -> Result<bool>;

    /// Number of recorded payments
    fn received_count(&self) -> Result<usize>;
}

/// In-memory payment state store (for development)
pub struct MemoryPaymentStateStore {
    received: RwLock<HashMap<PaymentHash, DateTime<Utc>>>,
}

impl Default for MemoryPaymentStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPaymentStateStore {
    pub fn new() -> Self {
        Self {
            received: RwLock::new(HashMap::new()),
        }
    }
}

impl PaymentStateStore for MemoryPaymentStateStore {
    fn mark_payment_received(&self, payment_hash: &PaymentHash) -> Result<bool> {
        let mut received = self.received.write().unwrap();
        if received.contains_key(payment_hash) {
            return Ok(false);
        }
        received.insert(payment_hash.clone(), Utc::now());
        Ok(true)
    }

    fn is_received(&self, payment_hash: &PaymentHash) -> Result<bool> {
        let received = self.received.read().unwrap();
        Ok(received.contains_key(payment_hash))
    }

    fn received_count(&self) -> Result<usize> {
        let received = self.received.read().unwrap();
        Ok(received.len())
    }
}
