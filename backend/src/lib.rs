use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;

use auth::jwt::SessionManager;
use auth::rate_limit::RateLimitState;
use config::Config;
use services::sms::SmsScheduler;
use storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub config: Arc<Config>,
    pub sessions: SessionManager,
    /// `None` when the SMS provider is not configured.
    pub sms: Option<SmsScheduler>,
    pub rate_limiter: RateLimitState,
}

impl AppState {
    pub fn new(store: Arc<dyn Storage>, config: Arc<Config>, sms: Option<SmsScheduler>) -> Self {
        Self {
            store,
            sessions: SessionManager::from_config(&config),
            rate_limiter: RateLimitState::new(
                config.auth_rate_limit_max,
                Duration::from_secs(config.auth_rate_limit_window_secs),
            ),
            config,
            sms,
        }
    }
}

/// The whole HTTP surface: `/health`, `/readyz`, the JSON API under `/api`,
/// and static files for everything else.
pub fn router(state: AppState) -> Router {
    // Unauthenticated, rate limited per IP and path
    let public_routes = Router::new()
        .route("/signup", post(handlers::auth::signup))
        .route("/login", post(handlers::auth::login))
        .route("/twilio-access-request", post(handlers::sms::request_access))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_public,
        ));

    let protected_routes = Router::new()
        .route("/verify", get(handlers::auth::verify))
        .route("/user/data", get(handlers::user_data::get_user_data))
        .route("/user/mood", put(handlers::user_data::put_mood))
        .route("/user/tasks", put(handlers::user_data::put_tasks))
        .route("/schedule-sms", post(handlers::sms::schedule_sms))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    // Unknown API paths answer JSON, never the static client
    let api = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(api_not_found);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .nest("/api", api)
        .fallback_service(static_files(&state.config.static_dir))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn api_not_found() -> error::AppError {
    error::AppError::NotFound("Not found".into())
}

/// Unknown paths get `index.html` so the single-page client can route them.
fn static_files(dir: &str) -> ServeDir<ServeFile> {
    let index = std::path::Path::new(dir).join("index.html");
    ServeDir::new(dir).fallback(ServeFile::new(index))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = std::iter::once(&config.frontend_url)
        .chain(config.cors_extra_origins.iter())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}
