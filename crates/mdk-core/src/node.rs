//! Node Backend Abstraction
//!
//! The relay never talks to a Lightning node directly; it goes through
//! [`PaymentNode`], acquired fresh from a [`NodeFactory`] for every sync
//! attempt so a wedged handle cannot poison later retries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{CoreError, Result};
use crate::payment::{Amount, PaymentHash, ReceivedPayment};

/// A handle to the payment node backend
#[async_trait]
pub trait PaymentNode: Send + Sync {
    /// Force a wallet sync against on-chain and channel state.
    ///
    /// Must complete before [`receive_payments`](Self::receive_payments)
    /// reflects newly settled invoices.
    async fn sync_wallets(&self) -> Result<()>;

    /// Drain payments settled since the last check
    async fn receive_payments(&self) -> Result<Vec<ReceivedPayment>>;
}

/// Factory producing fresh node handles
#[async_trait]
pub trait NodeFactory: Send + Sync {
    /// Acquire a fresh handle to the node backend
    async fn connect(&self) -> Result<Arc<dyn PaymentNode>>;
}

#[derive(Default)]
struct FakeNodeState {
    sync_calls: u64,
    receive_calls: u64,
    /// (visible once this many syncs have run, payment)
    pending: Vec<(u64, ReceivedPayment)>,
    sync_error: Option<String>,
    receive_error: Option<String>,
}

/// In-memory node for development and tests.
///
/// Payments are scripted to appear after a given number of wallet syncs,
/// mimicking a node whose view lags the network.
#[derive(Clone, Default)]
pub struct FakeNode {
    state: Arc<Mutex<FakeNodeState>>,
}

impl FakeNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a payment to appear once `syncs` wallet syncs have run
    pub fn deliver_after_syncs(&self, syncs: u64, payment: ReceivedPayment) {
        self.state.lock().unwrap().pending.push((syncs, payment));
    }

    /// Schedule a generated payment; returns the hash it will settle under
    pub fn deliver_generated(&self, syncs: u64, amount: Amount) -> PaymentHash {
        let hash = PaymentHash::generate();
        self.deliver_after_syncs(syncs, ReceivedPayment::new(hash.clone(), amount));
        hash
    }

    /// Make every wallet sync fail with the given message
    pub fn fail_sync(&self, message: impl Into<String>) {
        self.state.lock().unwrap().sync_error = Some(message.into());
    }

    /// Make every payment check fail with the given message
    pub fn fail_receive(&self, message: impl Into<String>) {
        self.state.lock().unwrap().receive_error = Some(message.into());
    }

    /// Number of wallet syncs performed
    pub fn sync_calls(&self) -> u64 {
        self.state.lock().unwrap().sync_calls
    }

    /// Number of payment checks performed
    pub fn receive_calls(&self) -> u64 {
        self.state.lock().unwrap().receive_calls
    }
}

#[async_trait]
impl PaymentNode for FakeNode {
    async fn sync_wallets(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(msg) = &state.sync_error {
            return Err(CoreError::Node(msg.clone()));
        }
        state.sync_calls += 1;
        Ok(())
    }

    async fn receive_payments(&self) -> Result<Vec<ReceivedPayment>> {
        let mut state = self.state.lock().unwrap();
        if let Some(msg) = &state.receive_error {
            return Err(CoreError::Node(msg.clone()));
        }
        state.receive_calls += 1;
        let synced = state.sync_calls;
        let pending = std::mem::take(&mut state.pending);
        let (ready, rest): (Vec<_>, Vec<_>) =
            pending.into_iter().partition(|(after, _)| *after <= synced);
        state.pending = rest;
        Ok(ready.into_iter().map(|(_, payment)| payment).collect())
    }
}

/// Factory handing out handles to a shared [`FakeNode`]
#[derive(Clone, Default)]
pub struct FakeNodeFactory {
    node: FakeNode,
    connects: Arc<AtomicU64>,
}

impl FakeNodeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared node, for scripting deliveries and reading counters
    pub fn node(&self) -> &FakeNode {
        &self.node
    }

    /// Number of handles handed out
    pub fn connect_calls(&self) -> u64 {
        self.connects.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NodeFactory for FakeNodeFactory {
    async fn connect(&self) -> Result<Arc<dyn PaymentNode>> {
        self.connects.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(self.node.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_payments_appear_after_scheduled_syncs() {
        let node = FakeNode::new();
        let hash = node.deliver_generated(2, Amount::from_sat(100));

        node.sync_wallets().await.unwrap();
        assert!(node.receive_payments().await.unwrap().is_empty());

        node.sync_wallets().await.unwrap();
        let payments = node.receive_payments().await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].payment_hash, hash);

        // Drained once reported
        assert!(node.receive_payments().await.unwrap().is_empty());
        assert_eq!(node.sync_calls(), 2);
        assert_eq!(node.receive_calls(), 3);
    }

    #[tokio::test]
    async fn test_sync_failure() {
        let node = FakeNode::new();
        node.fail_sync("node offline");
        assert!(node.sync_wallets().await.is_err());
        assert_eq!(node.sync_calls(), 0);
    }

    #[tokio::test]
    async fn test_factory_hands_out_shared_state() {
        let factory = FakeNodeFactory::new();
        factory.node().deliver_generated(1, Amount::from_sat(5));

        let first = factory.connect().await.unwrap();
        first.sync_wallets().await.unwrap();

        let second = factory.connect().await.unwrap();
        let payments = second.receive_payments().await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(factory.connect_calls(), 2);
    }
}
