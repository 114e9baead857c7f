//! HTTP Handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use mdk_payments::{
    CheckoutCurrency, CreateCheckoutParams, Customer, CustomerIdentifier, PaymentError,
    SubscriptionAction, WebhookNotification, WEBHOOK_SECRET_HEADER,
};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub secret_configured: bool,
    pub sandbox: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    /// Amount in the currency's smallest unit
    pub amount: u64,
    #[serde(default)]
    pub currency: Option<CheckoutCurrency>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub success_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub checkout_id: String,
    pub checkout_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerLookupRequest {
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl CustomerLookupRequest {
    /// Exactly one identifier must be provided
    fn identifier(self) -> Option<CustomerIdentifier> {
        match (self.external_id, self.email, self.id) {
            (Some(v), None, None) => Some(CustomerIdentifier::ExternalId(v)),
            (None, Some(v), None) => Some(CustomerIdentifier::Email(v)),
            (None, None, Some(v)) => Some(CustomerIdentifier::Id(v)),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUrlRequest {
    /// Values stay raw JSON: a non-string id or action gets the route's
    /// own 400 body, not a deserialization rejection
    #[serde(default)]
    pub subscription_id: Option<serde_json::Value>,
    #[serde(default)]
    pub action: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionUrlResponse {
    pub url: String,
}

// ============================================================================
// Error Mapping
// ============================================================================

fn error_status(err: &PaymentError) -> StatusCode {
    match err {
        PaymentError::Unauthorized => StatusCode::UNAUTHORIZED,
        PaymentError::CustomerNotFound => StatusCode::NOT_FOUND,
        PaymentError::Upstream(_) | PaymentError::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &PaymentError) -> (StatusCode, Json<ErrorResponse>) {
    (
        error_status(err),
        Json(ErrorResponse {
            error: err.user_message().to_string(),
        }),
    )
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        secret_configured: state.relay.secret_configured(),
        sandbox: state.relay.config().sandbox,
    })
}

/// Which handler an SDK body addresses: the first of `handler`, `route`,
/// `target` carrying a string value. Non-string values fall through to
/// the next field.
fn handler_from_body(value: &serde_json::Value) -> Option<String> {
    ["handler", "route", "target"]
        .into_iter()
        .filter_map(|key| value.get(key))
        .find_map(serde_json::Value::as_str)
        .map(str::to_lowercase)
}

/// SDK dispatcher.
///
/// Webhook deliveries are confirmed through the relay; every other
/// handler (checkout widget calls and the like) passes through to the
/// upstream API untouched, including bodies that fail to parse.
pub async fn mdk_dispatch(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let parsed: Option<serde_json::Value> = serde_json::from_slice(&body).ok();
    let handler = parsed.as_ref().and_then(handler_from_body);

    if !matches!(handler.as_deref(), Some("webhook" | "webhooks")) {
        tracing::debug!(handler = ?handler, "Forwarding SDK request upstream");
        return forward_upstream(&state, &body).await;
    }

    let value = parsed.unwrap_or(serde_json::Value::Null);
    let notification: WebhookNotification = match serde_json::from_value(value) {
        Ok(notification) => notification,
        Err(e) => {
            let err = PaymentError::MalformedNotification(e.to_string());
            tracing::error!(error = %err, "Webhook body rejected");
            return error_response(&err).into_response();
        }
    };

    let secret = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.relay.process(secret, &notification).await {
        Ok(_) => (StatusCode::OK, "OK").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Webhook processing failed");
            error_response(&e).into_response()
        }
    }
}

async fn forward_upstream(state: &AppState, body: &[u8]) -> Response {
    match state.upstream.forward(body).await {
        Ok(forwarded) => {
            let status =
                StatusCode::from_u16(forwarded.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, Json(forwarded.body)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Upstream forward failed");
            error_response(&e).into_response()
        }
    }
}

/// Create a hosted checkout and hand back the local checkout page URL
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, (StatusCode, Json<ErrorResponse>)> {
    let params = CreateCheckoutParams {
        amount: payload.amount,
        currency: payload.currency.unwrap_or(CheckoutCurrency::Usd),
        metadata: payload.metadata,
        success_url: payload.success_url,
    };

    let checkout = state.upstream.create_checkout(&params).await.map_err(|e| {
        tracing::error!(error = %e, "Checkout creation failed");
        error_response(&e)
    })?;

    let checkout_url = state.urls.checkout(&checkout.id);

    Ok(Json(CheckoutResponse {
        checkout_id: checkout.id,
        checkout_url,
    }))
}

/// Look up a customer by exactly one identifier
pub async fn lookup_customer(
    State(state): State<AppState>,
    Json(payload): Json<CustomerLookupRequest>,
) -> Result<Json<Customer>, (StatusCode, Json<ErrorResponse>)> {
    let identifier = payload
        .identifier()
        .ok_or_else(|| bad_request("Provide exactly one of externalId, email, or id"))?;

    let customer = state
        .upstream
        .get_customer(&identifier)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Customer lookup failed");
            error_response(&e)
        })?
        .ok_or_else(|| error_response(&PaymentError::CustomerNotFound))?;

    Ok(Json(customer))
}

/// Build the renewal or cancellation URL for a subscription
pub async fn subscription_urls(
    State(state): State<AppState>,
    Json(payload): Json<SubscriptionUrlRequest>,
) -> Result<Json<SubscriptionUrlResponse>, (StatusCode, Json<ErrorResponse>)> {
    let subscription_id = payload
        .subscription_id
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| bad_request("Missing or invalid subscriptionId"))?;

    let action = payload
        .action
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(SubscriptionAction::parse)
        .ok_or_else(|| bad_request("Invalid action. Must be \"renew\" or \"cancel\""))?;

    let url = state.urls.subscription_url(action, subscription_id);

    Ok(Json(SubscriptionUrlResponse { url }))
}
