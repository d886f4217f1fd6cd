/// Application state and router builder
///
/// This module defines the shared application state and assembles the Axum
/// router from the per-resource route tables in [`crate::routes`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use twix_api::{app::AppState, config::Config};
/// use twix_shared::assignment::AssignmentEngine;
/// use twix_shared::notify::LogNotifier;
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let engine = AssignmentEngine::new(Arc::new(LogNotifier));
/// let state = AppState::new(pool, config, engine);
/// let app = twix_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use twix_shared::assignment::AssignmentEngine;
use twix_shared::auth::principal::authenticate;
use twix_shared::notify::{LogNotifier, Notifier, NotifyError, PushConfig, PushNotifier};

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,

    /// Task saves go through the engine so assignments stay reconciled
    pub engine: AssignmentEngine,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, engine: AssignmentEngine) -> Self {
        Self {
            db,
            config: Arc::new(config),
            engine,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Picks the notifier: the push gateway when configured, the log otherwise
pub fn build_notifier(db: &PgPool, config: &Config) -> Result<Arc<dyn Notifier>, NotifyError> {
    let Some(url) = config.push.url.as_deref() else {
        tracing::warn!("PUSH_GATEWAY_URL not set, notifications will only be logged");
        return Ok(Arc::new(LogNotifier));
    };

    let push = PushConfig {
        api_key: config.push.api_key.clone(),
        ..PushConfig::new(url)
    };
    Ok(Arc::new(PushNotifier::new(db.clone(), push)?))
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                         # public
/// └── /v1/
///     ├── /auth/{register,login,refresh}   # public
///     ├── /user, /users                    # authenticated
///     ├── /devices
///     ├── /boards
///     ├── /tasks
///     ├── /groups (+ add_member, remove_member)
///     └── /assigned-tasks
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .merge(routes::health::routes())
        .merge(routes::auth::routes());

    let protected = Router::new()
        .merge(routes::users::routes())
        .merge(routes::devices::routes())
        .merge(routes::boards::routes())
        .merge(routes::tasks::routes())
        .merge(routes::groups::routes())
        .merge(routes::assigned_tasks::routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
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
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static(crate::routes::auth::APP_TOKEN_HEADER),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Resolves the bearer token into a [`Principal`](twix_shared::auth::principal::Principal)
/// and stores it in the request extensions
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let principal = authenticate(&state.db, state.jwt_secret(), header.as_deref()).await?;
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
