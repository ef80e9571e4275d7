use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Local;
use freshtrack_core::{NotificationWindow, OnDemandRequest, RunOutcome};
use freshtrack_store::{NewProduct, Product};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub expiry: String,
    pub image_url: Option<String>,
    /// Captured photo from the browser; accepted for compatibility, not stored
    #[allow(dead_code)]
    pub image_data: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendExpiryEmail {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub products: Vec<Product>,
    pub days_before_expiry: Option<u32>,
}

/// GET /products
///
/// All tracked products, soonest expiry first.
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = state.store.list().await?;
    Ok(Json(products))
}

/// POST /products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateProduct>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let Json(payload) = payload.map_err(|e| AppError::MalformedPayload(e.body_text()))?;

    let input = NewProduct::parse(&payload.name, &payload.expiry, payload.image_url)?;
    let product = state.store.create(input).await?;
    info!("Tracking {} (expires {})", product.name, product.expiry);

    Ok((StatusCode::CREATED, Json(product)))
}

/// DELETE /products/:id
///
/// Ids that are not UUIDs cannot exist, so they are a plain 404.
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::NotFound)?;
    let removed = state.store.delete(id).await?;
    info!("Deleted product {} ({})", removed.name, removed.id);

    Ok(Json(json!({ "message": "Product deleted" })))
}

/// POST /send-expiry-email
///
/// Immediate check over a client-supplied product list, mailed to the
/// address in the request instead of the operator. The list only picks
/// products; expiry and notification state are read back from the store.
pub async fn send_expiry_email(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SendExpiryEmail>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::MalformedPayload(e.body_text()))?;

    let window = payload
        .days_before_expiry
        .map(NotificationWindow::new)
        .transpose()?;

    let request = OnDemandRequest {
        recipient: payload.email,
        products: payload.products,
        window,
    };

    let today = Local::now().date_naive();
    let outcome = state.pipeline.run_on_demand(request, today).await?;

    let body = match outcome {
        RunOutcome::NothingToSend => json!({
            "message": "No products expiring soon",
            "notified": [],
        }),
        RunOutcome::Sent { notified, .. } => json!({
            "message": "Email sent successfully",
            "notified": notified,
        }),
    };

    Ok(Json(body))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
