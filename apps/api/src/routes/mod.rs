pub mod health;
pub mod rate_limit;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
};
use tracing::warn;

use crate::config::CorsOrigins;
use crate::errors::panic_response;
use crate::pipeline::handlers;
use crate::state::AppState;
use rate_limit::RateLimiter;

pub fn build_router(state: AppState) -> Router {
    let limits = state.config.rate_limits;
    let health_limit = RateLimiter::new("health", limits.health_per_window, limits.window);
    let generate_limit = RateLimiter::new("generate", limits.generate_per_window, limits.window);
    let templates_limit = RateLimiter::new("templates", limits.generate_per_window, limits.window);
    let edit_limit = RateLimiter::new("edit", limits.edit_per_window, limits.window);

    let cors = cors_layer(&state.config.cors);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    Router::new()
        .route(
            "/health",
            get(health::health_handler).layer(middleware::from_fn_with_state(
                health_limit,
                rate_limit::enforce,
            )),
        )
        .route(
            "/generate-resume",
            post(handlers::handle_generate_resume).layer(middleware::from_fn_with_state(
                generate_limit,
                rate_limit::enforce,
            )),
        )
        .route(
            "/edit-latex",
            post(handlers::handle_edit_latex).layer(middleware::from_fn_with_state(
                edit_limit,
                rate_limit::enforce,
            )),
        )
        .route(
            "/templates",
            get(handlers::handle_list_templates).layer(middleware::from_fn_with_state(
                templates_limit,
                rate_limit::enforce,
            )),
        )
        .layer(body_limit)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    match origins {
        CorsOrigins::Any => CorsLayer::permissive(),
        CorsOrigins::List(list) => {
            let allowed: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring malformed CORS origin {origin:?}");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed))
                .allow_methods(Any)
                .allow_headers(Any)
        }
    }
}
