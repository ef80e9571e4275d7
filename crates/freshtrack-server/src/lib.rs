//! HTTP surface for the product list and on-demand expiry checks.
//!
//! Every route is served twice: at the root and under `/api`, which is
//! where the browser client has always pointed.
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/products` | list, soonest expiry first |
//! | POST | `/products` | create from `{name, expiry}` |
//! | DELETE | `/products/{id}` | remove |
//! | POST | `/send-expiry-email` | mail `{email, products, daysBeforeExpiry}` now |
//! | GET | `/health` | liveness |
//!
//! The daily scheduler is not wired here; the binary starts it next to
//! [`serve`].
use std::{future::Future, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod error;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::AppState;

use routes::{create_product, delete_product, health, list_products, send_expiry_email};

/// Photos travel inline as data URLs
const BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", delete(delete_product))
        .route("/send-expiry-email", post(send_expiry_email))
        .route("/health", get(health));

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(state: Arc<AppState>, port: u16, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);

    let address = format!("0.0.0.0:{port}");
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutting down...");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
