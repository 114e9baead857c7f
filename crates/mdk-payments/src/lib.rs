//! # mdk-payments
//!
//! Webhook payment confirmation relay and MoneyDevKit API client.
//!
//! ## The Confirmation Problem
//!
//! The payment provider fires an `incoming-payment` webhook as soon as it
//! sees a payment in flight. The local Lightning node may not have caught
//! up yet, so confirming on the first query would drop real payments.
//!
//! ## Relay Flow
//!
//! ```text
//! webhook ──▶ verify secret ──▶ event == incoming-payment?
//!                                      │ yes
//!                 ┌────────────────────▼─────────────────────┐
//!                 │  up to 5 attempts, backoff 1s/2s/3s/5s   │
//!                 │  fresh node ▶ sync_wallets ▶ receive     │
//!                 └────────────────────┬─────────────────────┘
//!                                      │ payments found
//!                    mark locally (idempotent, always)
//!                                      │
//!                    notify upstream (best effort, once)
//! ```
//!
//! Every outcome short of a node failure acknowledges the webhook with
//! 200 so the provider does not re-deliver; local marking is the source
//! of truth and upstream notification is advisory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mdk_core::{FakeNodeFactory, MemoryPaymentStateStore};
//! use mdk_payments::{MdkClient, RelayConfig, WebhookNotification, WebhookRelay};
//!
//! let relay = WebhookRelay::new(
//!     Some("mdk_access_token".into()),
//!     RelayConfig::from_env(),
//!     Arc::new(FakeNodeFactory::new()),
//!     Arc::new(MemoryPaymentStateStore::new()),
//!     Arc::new(MdkClient::from_env()?),
//! );
//!
//! let notification = WebhookNotification::for_event("incoming-payment");
//! let outcome = relay.process(Some("mdk_access_token"), &notification).await?;
//! ```

mod client;
mod error;
mod relay;
mod urls;

pub use client::{
    Checkout, CheckoutCurrency, CheckoutInvoice, CheckoutStatus, CreateCheckoutParams, Customer,
    CustomerIdentifier, ForwardedResponse, MdkApi, MdkClient, MockMdkApi, Subscription,
    DEFAULT_API_URL,
};
pub use error::{PaymentError, Result};
pub use relay::{
    RelayConfig, RelayOutcome, WebhookNotification, WebhookRelay, INCOMING_PAYMENT_EVENT,
    WEBHOOK_SECRET_HEADER,
};
pub use urls::{CheckoutUrls, SubscriptionAction};
