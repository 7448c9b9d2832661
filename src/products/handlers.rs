use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    products::{
        dto::{CreateProductRequest, CreatedProductResponse},
        repo_types::{NewProduct, Product},
    },
    state::AppState,
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id", get(get_product))
}

#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateProductRequest>,
) -> ApiResult<(StatusCode, Json<CreatedProductResponse>)> {
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Product name is required".into()));
    }
    if !payload.price.is_finite() || payload.price < 0.0 {
        warn!(price = payload.price, "rejected product price");
        return Err(ApiError::BadRequest("Price must be a non-negative number".into()));
    }

    let product = state
        .products
        .create(NewProduct {
            name: payload.name,
            category: payload.category,
            image: payload.image,
            price: payload.price,
        })
        .await?;

    info!(product_id = %product.id, name = %product.name, "product created");
    Ok((
        StatusCode::CREATED,
        Json(CreatedProductResponse {
            message: "Product created successfully".into(),
            id: product.id,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.products.list().await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Product>> {
    state
        .products
        .find(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))
}
