use crate::state::AppState;
use axum::Router;

pub mod gateway;
pub mod handlers;

pub use gateway::{PaymentError, PaymentGateway, PaymentIntent, StripeGateway};

pub fn router() -> Router<AppState> {
    handlers::payment_routes()
}
