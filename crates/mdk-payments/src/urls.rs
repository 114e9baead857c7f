//! Checkout and Subscription URLs
//!
//! Builds the hosted-flow URLs the frontend redirects customers to.
//! Renewal reuses the site's own checkout path; cancellation lands on
//! the upstream-hosted portal page.

use serde::{Deserialize, Serialize};

use crate::client::DEFAULT_API_URL;

/// Subscription portal actions a client may request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionAction {
    Renew,
    Cancel,
}

impl SubscriptionAction {
    /// Parse a client-provided action string (exact match, lowercase)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "renew" => Some(Self::Renew),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// URL builder for checkout and subscription flows
#[derive(Clone, Debug)]
pub struct CheckoutUrls {
    checkout_path: String,
    api_url: String,
}

impl Default for CheckoutUrls {
    fn default() -> Self {
        Self::new("/checkout", DEFAULT_API_URL)
    }
}

impl CheckoutUrls {
    pub fn new(checkout_path: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            checkout_path: checkout_path.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        let checkout_path =
            std::env::var("MDK_CHECKOUT_PATH").unwrap_or_else(|_| "/checkout".into());
        let api_url = std::env::var("MDK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        Self::new(checkout_path, api_url)
    }

    /// Checkout page for a hosted checkout id
    pub fn checkout(&self, checkout_id: &str) -> String {
        format!("{}/{}", self.checkout_path, checkout_id)
    }

    /// Renewal checkout for an existing subscription
    pub fn subscription_renewal(&self, subscription_id: &str) -> String {
        format!(
            "{}?subscription={}&intent=renew",
            self.checkout_path, subscription_id
        )
    }

    /// Upstream-hosted cancellation page
    pub fn subscription_cancel(&self, subscription_id: &str) -> String {
        format!("{}/subscriptions/{}/cancel", self.api_url, subscription_id)
    }

    /// URL for the requested subscription action
    pub fn subscription_url(&self, action: SubscriptionAction, subscription_id: &str) -> String {
        match action {
            SubscriptionAction::Renew => self.subscription_renewal(subscription_id),
            SubscriptionAction::Cancel => self.subscription_cancel(subscription_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parsing_is_exact() {
        assert_eq!(SubscriptionAction::parse("renew"), Some(SubscriptionAction::Renew));
        assert_eq!(SubscriptionAction::parse("cancel"), Some(SubscriptionAction::Cancel));
        assert_eq!(SubscriptionAction::parse("Renew"), None);
        assert_eq!(SubscriptionAction::parse("refund"), None);
    }

    #[test]
    fn test_checkout_url() {
        let urls = CheckoutUrls::new("/checkout/", "https://api.example.com");
        assert_eq!(urls.checkout("mock-1"), "/checkout/mock-1");
    }

    #[test]
    fn test_subscription_urls() {
        let urls = CheckoutUrls::new("/checkout", "https://api.example.com/");
        assert_eq!(
            urls.subscription_url(SubscriptionAction::Renew, "sub_42"),
            "/checkout?subscription=sub_42&intent=renew"
        );
        assert_eq!(
            urls.subscription_url(SubscriptionAction::Cancel, "sub_42"),
            "https://api.example.com/subscriptions/sub_42/cancel"
        );
    }
}
