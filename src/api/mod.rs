// src/api/mod.rs
pub mod routes;
pub mod handlers;
pub mod state;

pub use routes::configure_routes;
pub use state::AppState;

use actix_cors::Cors;

/// CORS policy admitting a single browser origin with any method and header.
/// Requests carrying any other `Origin` are rejected with 400 before reaching a handler.
pub fn cors(allowed_origin: &str) -> Cors {
    Cors::default()
        .allowed_origin(allowed_origin)
        .block_on_origin_mismatch(true)
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
        .max_age(3600)
}
