use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo_types::{DateRange, NewOrder, Order};
use super::services::{price_items, summarize, SalesReport};
use crate::{
    auth::{AdminUser, AuthUser},
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiQuery},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLine>,
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub upload_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CreatedOrderResponse {
    pub id: Uuid,
    pub total: f64,
}

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    #[serde(default, deserialize_with = "query_datetime")]
    pub from: Option<OffsetDateTime>,
    #[serde(default, deserialize_with = "query_datetime")]
    pub to: Option<OffsetDateTime>,
}

/// RFC 3339 bound from a query string. An unencoded `+02:00` offset arrives
/// as ` 02:00`, so spaces are read back as `+`.
fn query_datetime<'de, D>(d: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(d)? else {
        return Ok(None);
    };
    OffsetDateTime::parse(&raw.replace(' ', "+"), &Rfc3339)
        .map(Some)
        .map_err(de::Error::custom)
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/admin/sales", get(sales_report))
}

#[instrument(skip(state, body))]
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<CreatedOrderResponse>)> {
    let lines: Vec<(Uuid, i32)> = body
        .items
        .iter()
        .map(|l| (l.product_id, l.quantity))
        .collect();
    let items = price_items(&state, &lines).await?;

    let order = state
        .orders
        .create(NewOrder {
            id: Uuid::new_v4(),
            user_id: auth.id,
            payment_intent_id: body.payment_intent_id,
            items,
            upload_ids: body.upload_ids,
        })
        .await?;

    info!(order_id = %order.id, user_id = %auth.id, total = order.total, "order created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedOrderResponse {
            id: order.id,
            total: order.total,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.orders.list_by_user(auth.id).await?))
}

#[instrument(skip(state, q))]
pub async fn sales_report(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(q): ApiQuery<SalesQuery>,
) -> ApiResult<Json<SalesReport>> {
    if let (Some(from), Some(to)) = (q.from, q.to) {
        if from > to {
            return Err(ApiError::BadRequest("`from` must not be after `to`".into()));
        }
    }
    let orders = state
        .orders
        .list_in_range(DateRange {
            from: q.from,
            to: q.to,
        })
        .await?;
    Ok(Json(summarize(&orders)))
}
