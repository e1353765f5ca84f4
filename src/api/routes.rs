// src/api/routes.rs
use actix_web::web;
use super::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check))
        .route("/reasoning", web::post().to(handlers::reasoning))
        .route("/debug", web::post().to(handlers::debug));
}
