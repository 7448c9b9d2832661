use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::{
    error::{ApiError, ApiResult},
    extract::ApiJson,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub client_secret: String,
}

pub fn payment_routes() -> Router<AppState> {
    Router::new().route("/payment", post(create_payment))
}

#[instrument(skip(state))]
pub async fn create_payment(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PaymentRequest>,
) -> ApiResult<Json<PaymentResponse>> {
    if payload.amount <= 0 {
        return Err(ApiError::BadRequest("Amount must be a positive integer".into()));
    }

    let intent = state
        .payments
        .create_intent(payload.amount)
        .await
        .map_err(|e| {
            error!(error = %e, amount = payload.amount, "payment intent failed");
            ApiError::Vendor(e.to_string())
        })?;

    info!(intent_id = %intent.id, amount = payload.amount, "payment intent created");
    Ok(Json(PaymentResponse {
        client_secret: intent.client_secret,
    }))
}
