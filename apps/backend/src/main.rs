use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use crowdchess::auth::jwt::JwtVerifier;
use crowdchess::auth::{IdentityVerifier, PlainVerifier};
use crowdchess::config::MatchSettings;
use crowdchess::middleware::cors::cors_middleware;
use crowdchess::routes;
use crowdchess::services::match_flow::MatchService;
use crowdchess::state::app_state::AppState;
use crowdchess::store::MemoryStore;
use crowdchess::validator::ChessRules;

mod telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables are supplied by the runtime environment
    // (docker env_file, or a sourced .env for local dev).
    let host = std::env::var("CROWDCHESS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("CROWDCHESS_PORT")
        .unwrap_or_else(|_| "3001".to_string())
        .parse::<u16>()
        .unwrap_or_else(|_| {
            eprintln!("CROWDCHESS_PORT must be a valid port number");
            std::process::exit(1);
        });

    let verifier: Arc<dyn IdentityVerifier> = match std::env::var("CROWDCHESS_JWT_SECRET") {
        Ok(secret) if !secret.trim().is_empty() => Arc::new(JwtVerifier::new(secret.as_bytes())),
        _ => {
            tracing::warn!("CROWDCHESS_JWT_SECRET not set; accepting plain tokens as identities");
            Arc::new(PlainVerifier)
        }
    };

    let settings = MatchSettings::from_env();
    tracing::info!(?settings, "match settings loaded");

    let service = MatchService::new(
        settings,
        Arc::new(MemoryStore::new()),
        verifier,
        Box::new(ChessRules::new()),
    );
    service.load_win_stats().await;

    let data = web::Data::new(AppState::new(service));

    tracing::info!(host = %host, port, "starting crowdchess backend");

    HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware())
            .app_data(data.clone())
            .configure(routes::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
