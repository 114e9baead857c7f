//! mdk-relay HTTP Server
//!
//! Axum-based server providing the MoneyDevKit SDK routes: webhook
//! payment confirmation with node resync, checkout creation, customer
//! lookup, and subscription portal URLs.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mdk_core::{FakeNodeFactory, MemoryPaymentStateStore};
use mdk_payments::{CheckoutUrls, MdkClient, RelayConfig, WebhookRelay, DEFAULT_API_URL};

use mdk_server::router;
use mdk_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let access_token = std::env::var("MDK_ACCESS_TOKEN").ok();
    let api_url = std::env::var("MDK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());

    if access_token.is_some() {
        tracing::info!("✓ MoneyDevKit access token configured");
    } else {
        tracing::warn!("⚠ MDK_ACCESS_TOKEN not set - webhooks and upstream calls will fail");
        tracing::warn!("  Set MDK_ACCESS_TOKEN in .env");
    }

    let config = RelayConfig::from_env();
    if config.sandbox {
        tracing::info!("Sandbox mode enabled");
    }

    // Dev node backend; a production deployment wires a real Lightning
    // node factory here
    let nodes = Arc::new(FakeNodeFactory::new());
    let store = Arc::new(MemoryPaymentStateStore::new());
    let upstream = Arc::new(MdkClient::new(api_url, access_token.clone()));

    let relay = WebhookRelay::new(access_token, config, nodes, store, upstream.clone());

    // Build application state
    let state = AppState {
        relay: Arc::new(relay),
        upstream,
        urls: CheckoutUrls::from_env(),
    };

    let app = router(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 mdk-relay server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                - Health check");
    tracing::info!("  POST /api/mdk               - SDK dispatcher (webhooks + passthrough)");
    tracing::info!("  POST /api/checkout          - Create hosted checkout");
    tracing::info!("  POST /api/customer          - Customer lookup");
    tracing::info!("  POST /api/subscription-urls - Subscription renew/cancel URLs");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
