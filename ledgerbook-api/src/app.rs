/// Application state and router builder
///
/// Defines the shared application state and assembles the axum router with
/// all routes and middleware.
///
/// # Router layout
///
/// ```text
/// /
/// ├── /health                              # Health check (public)
/// └── /v1/
///     ├── /auth/                           # Session lifecycle (public, rate limited)
///     │   ├── POST /register
///     │   ├── POST /login
///     │   ├── POST /refresh
///     │   └── POST /logout
///     ├── /users/me                        # Profile (authenticated)
///     └── /organizations/...               # Tenant-scoped resources (authenticated)
/// ```
///
/// # Middleware stack
///
/// Applied in order (outermost first): security headers, CORS, request
/// tracing; then bearer authentication on the protected subtree and rate
/// limiting on the session endpoints.

use crate::{config::Config, error::ApiError, middleware as mw, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::Duration;
use ledgerbook_shared::auth::{middleware::authenticate, tokens::TokenIssuer};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned per request via axum's `State` extractor; everything inside is
/// cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Token issuer (both secrets and lifetimes baked in)
    pub tokens: Arc<TokenIssuer>,

    /// In-memory rate limiter for the session endpoints
    pub auth_limiter: Arc<mw::rate_limit::RateLimiter>,
}

impl AppState {
    /// Creates new application state from configuration
    pub fn new(db: PgPool, config: Config) -> Self {
        let tokens = TokenIssuer::new(
            config.jwt.access_secret.clone(),
            config.jwt.refresh_secret.clone(),
            Duration::minutes(config.jwt.access_ttl_minutes),
            Duration::days(config.jwt.refresh_ttl_days),
        );

        Self {
            db,
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            auth_limiter: Arc::new(mw::rate_limit::RateLimiter::new()),
        }
    }
}

/// Builds the complete axum router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Session lifecycle (public; register/login are rate limited)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/logout", post(routes::auth::logout))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            mw::rate_limit::auth_rate_limit,
        ));

    // Everything below requires a valid access token
    let protected_routes = Router::new()
        .route(
            "/users/me",
            get(routes::users::me).patch(routes::users::update_profile),
        )
        .route(
            "/organizations",
            get(routes::organizations::list).post(routes::organizations::create),
        )
        .route(
            "/organizations/:id",
            get(routes::organizations::get)
                .patch(routes::organizations::update)
                .delete(routes::organizations::delete),
        )
        .route(
            "/organizations/:id/members",
            get(routes::members::list).post(routes::members::invite),
        )
        .route(
            "/organizations/:id/members/:member_id",
            axum::routing::patch(routes::members::update_role).delete(routes::members::remove),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            mw::security::security_headers,
        ))
        .with_state(state)
}

/// Bearer authentication middleware
///
/// Verifies the access token and injects [`CurrentUser`] into request
/// extensions. Rejects with a uniform 401 before any handler logic runs.
///
/// [`CurrentUser`]: ledgerbook_shared::auth::middleware::CurrentUser
async fn auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state.tokens, req.headers())?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
