use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub category: String,
    pub image: String,
    pub price: f64,
}

#[derive(Debug, Serialize)]
pub struct CreatedProductResponse {
    pub message: String,
    pub id: Uuid,
}
