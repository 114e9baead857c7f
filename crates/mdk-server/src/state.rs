//! Application State

use std::sync::Arc;

use mdk_payments::{CheckoutUrls, MdkApi, WebhookRelay};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Webhook payment confirmation relay
    pub relay: Arc<WebhookRelay>,

    /// Upstream MoneyDevKit API client
    pub upstream: Arc<dyn MdkApi>,

    /// Checkout and subscription URL builder
    pub urls: CheckoutUrls,
}
