//! MoneyDevKit API Client
//!
//! Talks to the hosted MoneyDevKit API. The wire protocol is a single
//! POST endpoint taking `{ "handler": ..., ...params }` bodies and
//! answering with `{ "data": ... }` on success or `{ "error": ... }`
//! with a non-2xx status on failure.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use mdk_core::payment::PaymentReceivedEntry;

use crate::error::{PaymentError, Result};

/// Hosted API endpoint used when `MDK_API_URL` is not set
pub const DEFAULT_API_URL: &str = "https://api.moneydevkit.com";

/// Checkout pricing currency
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckoutCurrency {
    /// Fiat amount in cents
    Usd,
    /// Amount in satoshis
    Sat,
}

/// Checkout lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStatus {
    PendingPayment,
    PaymentReceived,
}

/// Parameters for creating a hosted checkout
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckoutParams {
    /// Amount in the given currency's smallest unit
    pub amount: u64,

    /// Pricing currency
    pub currency: CheckoutCurrency,

    /// Opaque metadata echoed back on the checkout
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,

    /// Where to send the customer after payment
    #[serde(default)]
    pub success_url: Option<String>,
}

/// Lightning invoice attached to a checkout
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInvoice {
    /// BOLT11 invoice string
    pub invoice: String,

    /// Invoice amount in satoshis
    pub amount_sats: u64,

    /// Satoshis received so far
    #[serde(default)]
    pub amount_sats_received: u64,

    /// Invoice expiry
    pub expires_at: DateTime<Utc>,
}

/// A hosted checkout as reported by the upstream
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkout {
    pub id: String,
    pub status: CheckoutStatus,
    pub currency: CheckoutCurrency,

    #[serde(default)]
    pub success_url: Option<String>,

    #[serde(default)]
    pub user_metadata: Option<serde_json::Value>,

    /// Invoice amount in satoshis
    pub invoice_amount_sats: u64,

    #[serde(default)]
    pub invoice: Option<CheckoutInvoice>,
}

/// A customer subscription as reported by the upstream
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub product_id: String,
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,

    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// Recurring amount in the subscription currency's smallest unit
    pub amount: u64,
    pub currency: String,
    pub recurring_interval: String,
}

/// A customer record
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub external_id: Option<String>,

    #[serde(default)]
    pub subscriptions: Vec<Subscription>,

    #[serde(default)]
    pub has_active_subscription: bool,
}

/// Exactly one way to address a customer.
///
/// Serializes to the upstream identifier object, e.g.
/// `{ "externalId": "user_123" }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CustomerIdentifier {
    ExternalId(String),
    Email(String),
    Id(String),
}

/// Raw upstream reply from a passthrough request
#[derive(Clone, Debug)]
pub struct ForwardedResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Upstream MoneyDevKit API surface the relay and handlers depend on
#[async_trait]
pub trait MdkApi: Send + Sync {
    /// Create a hosted checkout
    async fn create_checkout(&self, params: &CreateCheckoutParams) -> Result<Checkout>;

    /// Look up a customer; `None` when the upstream has no match
    async fn get_customer(&self, identifier: &CustomerIdentifier) -> Result<Option<Customer>>;

    /// Report confirmed payments
    async fn payments_received(&self, payments: &[PaymentReceivedEntry]) -> Result<()>;

    /// Pass an opaque SDK request body through to the upstream
    async fn forward(&self, body: &[u8]) -> Result<ForwardedResponse>;
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

fn decode_body(bytes: &[u8]) -> serde_json::Value {
    if bytes.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn error_message(value: &serde_json::Value) -> String {
    value
        .get("error")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("request failed")
        .to_string()
}

/// HTTP client for the hosted MoneyDevKit API
pub struct MdkClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl MdkClient {
    /// Create a new client. Requests carry a bearer token only when an
    /// access token is configured.
    pub fn new(base_url: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("MDK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let access_token = std::env::var("MDK_ACCESS_TOKEN")
            .map_err(|_| PaymentError::Config("MDK_ACCESS_TOKEN not set".into()))?;

        Ok(Self::new(base_url, Some(access_token)))
    }

    /// API endpoint requests go to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self) -> reqwest::RequestBuilder {
        let mut builder = self.http.post(&self.base_url);
        if let Some(token) = &self.access_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn call(&self, body: &serde_json::Value) -> Result<(u16, serde_json::Value)> {
        let response = self
            .request()
            .json(body)
            .send()
            .await
            .map_err(|e| PaymentError::Upstream(e.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PaymentError::Upstream(e.to_string()))?;

        Ok((status, decode_body(&bytes)))
    }

    fn expect_data<T: DeserializeOwned>(status: u16, value: serde_json::Value) -> Result<T> {
        if !(200..300).contains(&status) {
            return Err(PaymentError::UpstreamStatus {
                status,
                message: error_message(&value),
            });
        }
        let envelope: DataEnvelope<T> = serde_json::from_value(value)
            .map_err(|e| PaymentError::Upstream(format!("unexpected response shape: {}", e)))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl MdkApi for MdkClient {
    async fn create_checkout(&self, params: &CreateCheckoutParams) -> Result<Checkout> {
        let body = serde_json::json!({ "handler": "create_checkout", "params": params });
        let (status, value) = self.call(&body).await?;
        Self::expect_data(status, value)
    }

    async fn get_customer(&self, identifier: &CustomerIdentifier) -> Result<Option<Customer>> {
        let body = serde_json::json!({ "handler": "get_customer", "identifier": identifier });
        let (status, value) = self.call(&body).await?;
        if status == 404 {
            return Ok(None);
        }
        Self::expect_data(status, value).map(Some)
    }

    async fn payments_received(&self, payments: &[PaymentReceivedEntry]) -> Result<()> {
        let body = serde_json::json!({ "handler": "payment_received", "payments": payments });
        let (status, value) = self.call(&body).await?;
        if !(200..300).contains(&status) {
            return Err(PaymentError::UpstreamStatus {
                status,
                message: error_message(&value),
            });
        }
        Ok(())
    }

    async fn forward(&self, body: &[u8]) -> Result<ForwardedResponse> {
        let response = self
            .request()
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| PaymentError::Upstream(e.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PaymentError::Upstream(e.to_string()))?;

        Ok(ForwardedResponse {
            status,
            body: decode_body(&bytes),
        })
    }
}

#[derive(Default)]
struct MockState {
    checkouts: u64,
    customers: Vec<Customer>,
    notified: Vec<Vec<PaymentReceivedEntry>>,
    forwarded: Vec<serde_json::Value>,
    fail_notifications: bool,
}

/// Scriptable in-memory upstream (for development and tests)
#[derive(Clone, Default)]
pub struct MockMdkApi {
    state: Arc<Mutex<MockState>>,
}

impl MockMdkApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make payment notifications fail with an upstream error
    pub fn fail_notifications(&self) {
        self.state.lock().unwrap().fail_notifications = true;
    }

    /// Register a customer for lookup
    pub fn add_customer(&self, customer: Customer) {
        self.state.lock().unwrap().customers.push(customer);
    }

    /// Batches reported via `payments_received`
    pub fn notified_batches(&self) -> Vec<Vec<PaymentReceivedEntry>> {
        self.state.lock().unwrap().notified.clone()
    }

    /// Bodies passed through `forward`
    pub fn forwarded_bodies(&self) -> Vec<serde_json::Value> {
        self.state.lock().unwrap().forwarded.clone()
    }
}

#[async_trait]
impl MdkApi for MockMdkApi {
    async fn create_checkout(&self, params: &CreateCheckoutParams) -> Result<Checkout> {
        let mut state = self.state.lock().unwrap();
        state.checkouts += 1;

        let amount_sats = match params.currency {
            CheckoutCurrency::Sat => params.amount,
            // Pretend conversion from cents at a fixed test rate
            CheckoutCurrency::Usd => (params.amount * 4).max(50_000),
        };

        Ok(Checkout {
            id: format!("mock-{}", state.checkouts),
            status: CheckoutStatus::PendingPayment,
            currency: params.currency,
            success_url: params
                .success_url
                .clone()
                .or_else(|| Some("/checkout/success".into())),
            user_metadata: params.metadata.clone(),
            invoice_amount_sats: amount_sats,
            invoice: Some(CheckoutInvoice {
                invoice: format!("lnmock{:032x}", state.checkouts),
                amount_sats,
                amount_sats_received: 0,
                expires_at: Utc::now() + chrono::Duration::minutes(10),
            }),
        })
    }

    async fn get_customer(&self, identifier: &CustomerIdentifier) -> Result<Option<Customer>> {
        let state = self.state.lock().unwrap();
        let found = state.customers.iter().find(|c| match identifier {
            CustomerIdentifier::ExternalId(v) => c.external_id.as_deref() == Some(v),
            CustomerIdentifier::Email(v) => c.email.as_deref() == Some(v),
            CustomerIdentifier::Id(v) => c.id.as_deref() == Some(v),
        });
        Ok(found.cloned())
    }

    async fn payments_received(&self, payments: &[PaymentReceivedEntry]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_notifications {
            return Err(PaymentError::Upstream("mock upstream unavailable".into()));
        }
        state.notified.push(payments.to_vec());
        Ok(())
    }

    async fn forward(&self, body: &[u8]) -> Result<ForwardedResponse> {
        let value = decode_body(body);
        self.state.lock().unwrap().forwarded.push(value.clone());
        Ok(ForwardedResponse {
            status: 200,
            body: serde_json::json!({ "ok": true, "echo": value }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdk_core::payment::{Amount, PaymentHash, ReceivedPayment};

    #[test]
    fn test_identifier_wire_shape() {
        let id = CustomerIdentifier::ExternalId("user_123".into());
        assert_eq!(
            serde_json::to_value(&id).unwrap(),
            serde_json::json!({ "externalId": "user_123" })
        );

        let email = CustomerIdentifier::Email("nat@moneydevkit.com".into());
        assert_eq!(
            serde_json::to_value(&email).unwrap(),
            serde_json::json!({ "email": "nat@moneydevkit.com" })
        );
    }

    #[test]
    fn test_payment_entry_wire_shape() {
        let payment =
            ReceivedPayment::new(PaymentHash::from_preimage(b"abc"), Amount::from_msat(21_000));
        let entry = PaymentReceivedEntry::from_payment(&payment, false);
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["amountSats"], 21);
        assert_eq!(value["sandbox"], false);
        assert!(value["paymentHash"].is_string());
    }

    #[test]
    fn test_checkout_parsing_tolerates_extra_fields() {
        let value = serde_json::json!({
            "id": "mock-1755000000000",
            "status": "PENDING_PAYMENT",
            "currency": "USD",
            "successUrl": "/checkout/success",
            "invoiceAmountSats": 50000,
            "invoice": {
                "invoice": "lnmockdeadbeef",
                "amountSats": 50000,
                "amountSatsReceived": 0,
                "expiresAt": "2026-01-01T00:10:00Z",
                "fiatAmount": 5000.0,
                "btcPrice": 68000
            }
        });

        let checkout: Checkout = serde_json::from_value(value).unwrap();
        assert_eq!(checkout.status, CheckoutStatus::PendingPayment);
        assert_eq!(checkout.invoice.unwrap().amount_sats, 50_000);
    }

    #[test]
    fn test_base_url_normalization() {
        let client = MdkClient::new("https://api.example.com/", None);
        assert_eq!(client.base_url(), "https://api.example.com");
    }

    #[tokio::test]
    async fn test_mock_checkout_ids_are_sequential() {
        let api = MockMdkApi::new();
        let params = CreateCheckoutParams {
            amount: 2500,
            currency: CheckoutCurrency::Usd,
            metadata: None,
            success_url: None,
        };

        let first = api.create_checkout(&params).await.unwrap();
        let second = api.create_checkout(&params).await.unwrap();
        assert_eq!(first.id, "mock-1");
        assert_eq!(second.id, "mock-2");
        assert_eq!(first.invoice_amount_sats, 50_000);
    }

    #[tokio::test]
    async fn test_mock_customer_lookup() {
        let api = MockMdkApi::new();
        api.add_customer(Customer {
            email: Some("nat@moneydevkit.com".into()),
            has_active_subscription: true,
            ..Default::default()
        });

        let found = api
            .get_customer(&CustomerIdentifier::Email("nat@moneydevkit.com".into()))
            .await
            .unwrap();
        assert!(found.unwrap().has_active_subscription);

        let missing = api
            .get_customer(&CustomerIdentifier::Id("cus_404".into()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
