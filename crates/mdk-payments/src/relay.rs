//! Webhook Payment Confirmation Relay
//!
//! Converts a possibly-premature "payment incoming" webhook into confirmed,
//! locally recorded, upstream-acknowledged payments. The node's view of the
//! network can lag the notification, so the relay resynchronizes wallets
//! and re-queries on a bounded backoff schedule instead of trusting the
//! first read.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use mdk_core::node::NodeFactory;
use mdk_core::payment::{PaymentReceivedEntry, ReceivedPayment};
use mdk_core::state::PaymentStateStore;

use crate::client::MdkApi;
use crate::error::{PaymentError, Result};

/// Header carrying the shared webhook secret
pub const WEBHOOK_SECRET_HEADER: &str = "x-moneydevkit-webhook-secret";

/// Default event name that triggers payment confirmation
pub const INCOMING_PAYMENT_EVENT: &str = "incoming-payment";

/// Relay tuning knobs
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Event name that triggers confirmation; everything else is a no-op
    pub event: String,

    /// Maximum sync-and-query attempts per notification
    pub max_attempts: usize,

    /// Backoff after each unsuccessful attempt, indexed by attempt.
    /// The final attempt is never followed by a sleep.
    pub retry_delays: Vec<Duration>,

    /// Environment flag forwarded with upstream confirmations
    pub sandbox: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            event: INCOMING_PAYMENT_EVENT.to_string(),
            max_attempts: 5,
            retry_delays: vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(3000),
                Duration::from_millis(5000),
                Duration::from_millis(8000),
            ],
            sandbox: false,
        }
    }
}

impl RelayConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let sandbox = std::env::var("MDK_SANDBOX")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            sandbox,
            ..Self::default()
        }
    }

    /// Backoff after the given zero-based attempt, clamped to the last
    /// schedule entry when attempts outnumber delays
    fn delay_after(&self, attempt: usize) -> Duration {
        self.retry_delays
            .get(attempt)
            .or_else(|| self.retry_delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// An incoming webhook notification, untrusted until the secret checks out
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WebhookNotification {
    /// Event name; anything but `incoming-payment` is acknowledged unprocessed
    #[serde(default)]
    pub event: Option<String>,

    /// Provider correlation fields, carried but never interpreted
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WebhookNotification {
    /// Notification carrying only an event name
    pub fn for_event(event: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            ..Self::default()
        }
    }
}

/// What processing a verified notification resolved to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Event was not `incoming-payment`; acknowledged without action
    Ignored { event: Option<String> },

    /// Retry budget exhausted with no payments visible; acknowledged so
    /// the provider does not re-deliver
    Exhausted { attempts: usize },

    /// Payments confirmed and recorded locally
    Confirmed {
        payments: Vec<ReceivedPayment>,
        /// Whether the upstream accepted the confirmation
        notified: bool,
    },
}

/// Drives webhook verification, node resync, local marking, and the
/// best-effort upstream confirmation
pub struct WebhookRelay {
    secret: Option<String>,
    config: RelayConfig,
    nodes: Arc<dyn NodeFactory>,
    state: Arc<dyn PaymentStateStore>,
    upstream: Arc<dyn MdkApi>,
}

impl WebhookRelay {
    pub fn new(
        secret: Option<String>,
        config: RelayConfig,
        nodes: Arc<dyn NodeFactory>,
        state: Arc<dyn PaymentStateStore>,
        upstream: Arc<dyn MdkApi>,
    ) -> Self {
        Self {
            secret,
            config,
            nodes,
            state,
            upstream,
        }
    }

    /// Whether a webhook secret is configured
    pub fn secret_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Relay tuning in effect
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Check the provided secret against configuration.
    ///
    /// A missing configured secret is a server error, not an authorization
    /// failure, and is reported as such even when no header was sent.
    pub fn verify_secret(&self, provided: Option<&str>) -> Result<()> {
        let Some(expected) = self.secret.as_deref() else {
            tracing::error!("MDK_ACCESS_TOKEN not configured, rejecting webhook");
            return Err(PaymentError::SecretNotConfigured);
        };

        match provided {
            Some(value) if value == expected => Ok(()),
            _ => {
                tracing::error!("Unauthorized webhook request");
                Err(PaymentError::Unauthorized)
            }
        }
    }

    /// Process a webhook notification end to end.
    ///
    /// Returns `Ok` for every outcome the provider should not re-deliver,
    /// including an exhausted retry budget. Errors are mapped to HTTP
    /// statuses at the server edge.
    pub async fn process(
        &self,
        provided_secret: Option<&str>,
        notification: &WebhookNotification,
    ) -> Result<RelayOutcome> {
        self.verify_secret(provided_secret)?;

        if notification.event.as_deref() != Some(self.config.event.as_str()) {
            tracing::info!(event = ?notification.event, "Ignoring unrecognized webhook event");
            return Ok(RelayOutcome::Ignored {
                event: notification.event.clone(),
            });
        }

        let payments = self.sync_until_payments_found().await?;

        if payments.is_empty() {
            tracing::warn!(
                attempts = self.config.max_attempts,
                "Retry budget exhausted with no payments visible, acknowledging anyway"
            );
            return Ok(RelayOutcome::Exhausted {
                attempts: self.config.max_attempts,
            });
        }

        for payment in &payments {
            let newly_recorded = self.state.mark_payment_received(&payment.payment_hash)?;
            tracing::info!(
                payment_hash = %payment.payment_hash,
                amount_msat = payment.amount.as_msat(),
                newly_recorded,
                "Marked payment received"
            );
        }

        let notified = self.notify_upstream(&payments).await;

        Ok(RelayOutcome::Confirmed { payments, notified })
    }

    /// Sync wallets and query payments until something shows up or the
    /// retry budget runs out. Every attempt uses a fresh node handle.
    async fn sync_until_payments_found(&self) -> Result<Vec<ReceivedPayment>> {
        for attempt in 1..=self.config.max_attempts {
            let node = self.nodes.connect().await?;

            tracing::info!(attempt, "Syncing wallets");
            node.sync_wallets().await?;

            tracing::info!(attempt, "Wallet sync complete, checking for received payments");
            let payments = node.receive_payments().await?;

            if !payments.is_empty() {
                tracing::info!(attempt, count = payments.len(), "Found received payments");
                return Ok(payments);
            }

            if attempt < self.config.max_attempts {
                let delay = self.config.delay_after(attempt - 1);
                tracing::info!(attempt, delay = ?delay, "No payments yet, retrying after backoff");
                tokio::time::sleep(delay).await;
            }
        }

        Ok(Vec::new())
    }

    /// Report confirmed payments upstream. Best effort: local state is
    /// already marked, so failure here is logged and swallowed.
    async fn notify_upstream(&self, payments: &[ReceivedPayment]) -> bool {
        let entries: Vec<PaymentReceivedEntry> = payments
            .iter()
            .map(|p| PaymentReceivedEntry::from_payment(p, self.config.sandbox))
            .collect();

        match self.upstream.payments_received(&entries).await {
            Ok(()) => {
                tracing::info!(count = entries.len(), "Notified upstream of received payments");
                true
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to notify upstream, local state is already marked"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockMdkApi;
    use mdk_core::node::FakeNodeFactory;
    use mdk_core::payment::{Amount, PaymentHash};
    use mdk_core::state::MemoryPaymentStateStore;

    const SECRET: &str = "mdk_test_secret";

    struct Harness {
        relay: WebhookRelay,
        nodes: FakeNodeFactory,
        state: Arc<MemoryPaymentStateStore>,
        upstream: MockMdkApi,
    }

    fn fast_config() -> RelayConfig {
        RelayConfig {
            retry_delays: vec![Duration::from_millis(1); 5],
            ..RelayConfig::default()
        }
    }

    fn harness_with(secret: Option<&str>, config: RelayConfig) -> Harness {
        let nodes = FakeNodeFactory::new();
        let state = Arc::new(MemoryPaymentStateStore::new());
        let upstream = MockMdkApi::new();
        let relay = WebhookRelay::new(
            secret.map(str::to_string),
            config,
            Arc::new(nodes.clone()),
            state.clone(),
            Arc::new(upstream.clone()),
        );
        Harness {
            relay,
            nodes,
            state,
            upstream,
        }
    }

    fn harness() -> Harness {
        harness_with(Some(SECRET), fast_config())
    }

    fn incoming_payment() -> WebhookNotification {
        WebhookNotification::for_event(INCOMING_PAYMENT_EVENT)
    }

    #[tokio::test]
    async fn test_missing_config_beats_missing_header() {
        let h = harness_with(None, fast_config());

        // Even a correct-looking header cannot rescue a misconfigured server
        let err = h
            .relay
            .process(Some("anything"), &incoming_payment())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::SecretNotConfigured));
        assert_eq!(h.nodes.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_wrong_or_missing_secret_is_unauthorized() {
        let h = harness();

        let err = h
            .relay
            .process(Some("wrong"), &incoming_payment())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Unauthorized));

        let err = h.relay.process(None, &incoming_payment()).await.unwrap_err();
        assert!(matches!(err, PaymentError::Unauthorized));
        assert_eq!(h.nodes.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_event_acknowledged_without_node_contact() {
        let h = harness();
        let notification = WebhookNotification::for_event("checkout-updated");

        let outcome = h.relay.process(Some(SECRET), &notification).await.unwrap();
        assert_eq!(
            outcome,
            RelayOutcome::Ignored {
                event: Some("checkout-updated".into())
            }
        );
        assert_eq!(h.nodes.connect_calls(), 0);
        assert!(h.upstream.notified_batches().is_empty());
    }

    #[tokio::test]
    async fn test_missing_event_field_is_ignored() {
        let h = harness();
        let outcome = h
            .relay
            .process(Some(SECRET), &WebhookNotification::default())
            .await
            .unwrap();
        assert_eq!(outcome, RelayOutcome::Ignored { event: None });
    }

    #[tokio::test]
    async fn test_payment_confirmed_on_first_attempt() {
        let h = harness();
        let hash = h.nodes.node().deliver_generated(1, Amount::from_sat(250));

        let outcome = h
            .relay
            .process(Some(SECRET), &incoming_payment())
            .await
            .unwrap();

        match outcome {
            RelayOutcome::Confirmed { payments, notified } => {
                assert_eq!(payments.len(), 1);
                assert_eq!(payments[0].payment_hash, hash);
                assert!(notified);
            }
            other => panic!("expected confirmation, got {:?}", other),
        }

        assert_eq!(h.nodes.connect_calls(), 1);
        assert_eq!(h.nodes.node().sync_calls(), 1);
        assert!(h.state.is_received(&hash).unwrap());

        let batches = h.upstream.notified_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0][0].amount_sats, 250);
    }

    #[tokio::test]
    async fn test_stops_at_first_attempt_with_payments() {
        let h = harness();
        h.nodes.node().deliver_generated(3, Amount::from_sat(100));

        let outcome = h
            .relay
            .process(Some(SECRET), &incoming_payment())
            .await
            .unwrap();

        assert!(matches!(outcome, RelayOutcome::Confirmed { .. }));
        // Attempt 3 found the payment; no further attempts ran
        assert_eq!(h.nodes.node().sync_calls(), 3);
        assert_eq!(h.nodes.node().receive_calls(), 3);
        // Fresh node handle per attempt
        assert_eq!(h.nodes.connect_calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_budget_is_acknowledged() {
        let h = harness();

        let outcome = h
            .relay
            .process(Some(SECRET), &incoming_payment())
            .await
            .unwrap();

        assert_eq!(outcome, RelayOutcome::Exhausted { attempts: 5 });
        assert_eq!(h.nodes.node().sync_calls(), 5);
        assert_eq!(h.nodes.connect_calls(), 5);
        assert!(h.upstream.notified_batches().is_empty());
        assert_eq!(h.state.received_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upstream_failure_keeps_local_marking() {
        let h = harness();
        h.upstream.fail_notifications();
        let hash = h.nodes.node().deliver_generated(1, Amount::from_sat(50));

        let outcome = h
            .relay
            .process(Some(SECRET), &incoming_payment())
            .await
            .unwrap();

        match outcome {
            RelayOutcome::Confirmed { notified, .. } => assert!(!notified),
            other => panic!("expected confirmation, got {:?}", other),
        }
        assert!(h.state.is_received(&hash).unwrap());
    }

    #[tokio::test]
    async fn test_replayed_webhook_is_idempotent() {
        let h = harness();
        let hash = PaymentHash::from_preimage(b"replayed-invoice");
        let payment = ReceivedPayment::new(hash.clone(), Amount::from_sat(10));

        h.nodes.node().deliver_after_syncs(1, payment.clone());
        h.relay
            .process(Some(SECRET), &incoming_payment())
            .await
            .unwrap();

        // Same settled payment shows up again on a replayed delivery
        h.nodes.node().deliver_after_syncs(2, payment);
        let outcome = h
            .relay
            .process(Some(SECRET), &incoming_payment())
            .await
            .unwrap();

        assert!(matches!(outcome, RelayOutcome::Confirmed { .. }));
        assert_eq!(h.state.received_count().unwrap(), 1);
        assert!(h.state.is_received(&hash).unwrap());
    }

    #[tokio::test]
    async fn test_node_failure_bubbles_up() {
        let h = harness();
        h.nodes.node().fail_sync("node offline");

        let err = h
            .relay
            .process(Some(SECRET), &incoming_payment())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Backend(_)));
        assert!(h.upstream.notified_batches().is_empty());
        assert_eq!(h.state.received_count().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_schedule_sleeps_between_attempts_only() {
        let h = harness_with(Some(SECRET), RelayConfig::default());
        let started = tokio::time::Instant::now();

        let outcome = h
            .relay
            .process(Some(SECRET), &incoming_payment())
            .await
            .unwrap();

        assert_eq!(outcome, RelayOutcome::Exhausted { attempts: 5 });
        // Four backoffs (1s + 2s + 3s + 5s); the fifth attempt ends the loop
        // without sleeping, so the 8s entry is never consumed
        assert_eq!(started.elapsed(), Duration::from_secs(11));
    }

    #[test]
    fn test_default_schedule_values() {
        let config = RelayConfig::default();
        assert_eq!(config.event, "incoming-payment");
        assert_eq!(config.max_attempts, 5);
        let millis: Vec<u128> = config.retry_delays.iter().map(Duration::as_millis).collect();
        assert_eq!(millis, vec![1000, 2000, 3000, 5000, 8000]);
    }

    #[test]
    fn test_delay_clamps_to_last_entry() {
        let config = RelayConfig {
            retry_delays: vec![Duration::from_millis(10), Duration::from_millis(20)],
            ..RelayConfig::default()
        };
        assert_eq!(config.delay_after(0), Duration::from_millis(10));
        assert_eq!(config.delay_after(1), Duration::from_millis(20));
        assert_eq!(config.delay_after(4), Duration::from_millis(20));
    }

    #[test]
    fn test_sandbox_flag_reaches_upstream_entries() {
        let payment = ReceivedPayment::new(PaymentHash::generate(), Amount::from_sat(7));
        let entry = PaymentReceivedEntry::from_payment(&payment, true);
        assert!(entry.sandbox);
    }
}
