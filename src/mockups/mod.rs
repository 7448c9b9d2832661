use crate::state::AppState;
use axum::Router;

mod dynamic_mockups;
pub mod handlers;
mod mediamodifier;
mod printful;
pub mod provider;

pub use provider::{MockupRegistry, MockupVendor};

pub fn router() -> Router<AppState> {
    handlers::mockup_routes()
}
