use actix_web::web;

pub mod health;
pub mod realtime;

/// Configure application routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Health check: /health
    cfg.service(web::scope("/health").configure(health::configure_routes));

    // Realtime match traffic: /api/ws
    cfg.service(web::scope("/api/ws").configure(realtime::configure_routes));
}
