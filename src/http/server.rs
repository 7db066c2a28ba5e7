//! HTTP API server.
//!
//! | Method | Path                      | Auth       |
//! |--------|---------------------------|------------|
//! | GET    | `/api/health`             | none       |
//! | GET    | `/api/search`             | none       |
//! | GET    | `/api/search/suggestions` | none       |
//! | GET    | `/api/search/stats`       | none       |
//! | POST   | `/api/apps/{id}/notify`   | editor JWT |
//!
//! The services behind the routes are synchronous; handlers run them on
//! the blocking thread pool.

use crate::http::auth::{Claims, JwtAuthenticator};
use crate::models::{DEFAULT_LIMIT, KindFilters, MAX_LIMIT, SearchRequest};
use crate::services::{NotifyService, SearchService};
use crate::{Error, Result};
use axum::extract::{ConnectInfo, DefaultBodyLimit, MatchedPath, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size. Notification payloads are small; anything
/// larger is rejected before parsing.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Default maximum requests per rate limit window.
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: usize = 100;

/// Default rate limit window duration (15 minutes).
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 900;

/// Tracked-client count past which expired windows are pruned on acquire.
const RATE_LIMIT_PRUNE_THRESHOLD: usize = 1024;

/// API rate limit configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: usize,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

impl RateLimitConfig {
    /// Creates config from environment variables.
    ///
    /// Reads `LECTERN_RATE_LIMIT_MAX_REQUESTS` and
    /// `LECTERN_RATE_LIMIT_WINDOW_SECS` from the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let max_requests = std::env::var("LECTERN_RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS);

        let window_secs = std::env::var("LECTERN_RATE_LIMIT_WINDOW_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);

        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Sets maximum requests per window.
    #[must_use]
    pub const fn with_max_requests(mut self, max: usize) -> Self {
        self.max_requests = max;
        self
    }

    /// Sets window duration in seconds.
    #[must_use]
    pub const fn with_window_secs(mut self, secs: u64) -> Self {
        self.window = Duration::from_secs(secs);
        self
    }
}

#[derive(Debug)]
struct Window {
    request_count: usize,
    window_start: Instant,
}

/// Fixed-window request limiter with one window per client key.
///
/// Each caller gets its own budget, so one noisy client cannot starve the
/// public search routes for everyone else.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    /// Creates a limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn try_acquire(&self, client: &str) -> bool {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if windows.len() > RATE_LIMIT_PRUNE_THRESHOLD {
            let window = self.config.window;
            windows.retain(|_, w| w.window_start.elapsed() <= window);
        }

        let window = windows
            .entry(client.to_string())
            .or_insert_with(|| Window {
                request_count: 0,
                window_start: Instant::now(),
            });

        if window.window_start.elapsed() > self.config.window {
            window.request_count = 0;
            window.window_start = Instant::now();
        }

        if window.request_count >= self.config.max_requests {
            return false;
        }

        window.request_count += 1;
        true
    }
}

/// Shared state for the API router.
#[derive(Clone)]
pub struct AppState {
    search: Arc<SearchService>,
    notify: Arc<NotifyService>,
    authenticator: JwtAuthenticator,
    rate_limiter: RateLimiter,
}

impl AppState {
    /// Creates the router state from its services.
    #[must_use]
    pub fn new(
        search: Arc<SearchService>,
        notify: Arc<NotifyService>,
        authenticator: JwtAuthenticator,
        rate_limit: RateLimitConfig,
    ) -> Self {
        Self {
            search,
            notify,
            authenticator,
            rate_limiter: RateLimiter::new(rate_limit),
        }
    }
}

/// Builds the API router with security headers and rate limiting.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/search", get(search))
        .route("/api/search/suggestions", get(suggestions))
        .route("/api/search/stats", get(stats))
        .route("/api/apps/{app_id}/notify", post(notify_signups))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_rate_limit,
        ))
        .layer(middleware::from_fn(track_requests))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        // Security headers (OWASP recommendations)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            header::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            header::HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            header::HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the API server until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::OperationFailed {
            operation: "bind".to_string(),
            cause: format!("{addr}: {e}"),
        })?;

    tracing::info!(addr = %addr, "API server listening");

    // Peer addresses feed the per-client rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| Error::OperationFailed {
        operation: "serve".to_string(),
        cause: e.to_string(),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(_) => std::future::pending().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

async fn track_requests(request: Request, next: middleware::Next) -> Response {
    let start = Instant::now();
    let route = request.extensions().get::<MatchedPath>().map_or_else(
        || request.uri().path().to_string(),
        |path| path.as_str().to_string(),
    );
    let method = request.method().to_string();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        "http_requests_total",
        "route" => route.clone(),
        "method" => method.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(
        "http_request_duration_ms",
        "route" => route,
        "method" => method
    )
    .record(start.elapsed().as_secs_f64() * 1000.0);

    response
}

/// Identifies the caller for rate limiting.
///
/// Authenticated callers are keyed by their JWT subject; everyone else by
/// peer address, honoring the first `X-Forwarded-For` hop when a proxy in
/// front of the server sets it.
fn client_key(state: &AppState, request: &Request) -> String {
    if let Some(value) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Ok(claims) = state.authenticator.validate_header(value) {
            return format!("sub:{}", claims.sub);
        }
    }

    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        let first = forwarded.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return format!("ip:{first}");
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(
            || "ip:unknown".to_string(),
            |ConnectInfo(addr)| format!("ip:{}", addr.ip()),
        )
}

async fn enforce_rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: middleware::Next,
) -> Response {
    let client = client_key(&state, &request);
    if state.rate_limiter.try_acquire(&client) {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), client = %client, "rate limit exceeded");
    metrics::counter!("http_rate_limit_exceeded_total").increment(1);
    error_response(
        StatusCode::TOO_MANY_REQUESTS,
        "Too many requests, please try again later",
    )
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

const fn error_status(error: &Error) -> StatusCode {
    match error {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Renders a service error without leaking backend detail.
///
/// Client-caused errors keep their message; store and internal failures get
/// a generic retryable body, with the cause left to the logs.
fn render_error(error: &Error) -> Response {
    match error {
        Error::InvalidInput(_) | Error::NotFound(_) | Error::Unauthorized(_) => {
            error_response(error_status(error), &error.to_string())
        },
        _ => {
            tracing::error!(error = %error, "request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        },
    }
}

/// Runs a blocking service call and renders the result as JSON.
async fn run_blocking<T, F>(operation: &'static str, task: F) -> Response
where
    T: serde::Serialize + Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(Ok(value)) => (StatusCode::OK, Json(value)).into_response(),
        Ok(Err(e)) => render_error(&e),
        Err(e) => {
            tracing::error!(operation, error = %e, "blocking task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        },
    }
}

async fn health() -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "OK",
            "message": "Lectern API is running",
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
    blogs: Option<String>,
    webinars: Option<String>,
    apps: Option<String>,
    limit: Option<String>,
}

// A kind is included unless its parameter is exactly "false"
fn kind_filters(params: &SearchParams) -> KindFilters {
    KindFilters {
        blogs: params.blogs.as_deref() != Some("false"),
        webinars: params.webinars.as_deref() != Some("false"),
        apps: params.apps.as_deref() != Some("false"),
    }
}

fn requested_limit(params: &SearchParams) -> usize {
    params
        .limit
        .as_deref()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT)
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let request = SearchRequest::new(&params.q)
        .with_filters(kind_filters(&params))
        .with_limit(requested_limit(&params));

    let service = Arc::clone(&state.search);
    run_blocking("search", move || service.search(&request)).await
}

#[derive(Debug, Deserialize)]
struct SuggestParams {
    #[serde(default)]
    q: String,
}

async fn suggestions(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> Response {
    let service = Arc::clone(&state.search);
    run_blocking("suggest", move || service.suggest(&params.q)).await
}

async fn stats(State(state): State<AppState>) -> Response {
    let service = Arc::clone(&state.search);
    run_blocking("stats", move || service.stats()).await
}

#[derive(Debug, Deserialize)]
struct NotifyBody {
    subject: Option<String>,
    message: Option<String>,
}

async fn notify_signups(
    State(state): State<AppState>,
    Path(app_id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<NotifyBody>,
) -> Response {
    let claims = match authorize_editor(&state.authenticator, &headers) {
        Ok(claims) => claims,
        Err(response) => return response,
    };

    let subject = body.subject.unwrap_or_default();
    let message = body.message.unwrap_or_default();
    if subject.is_empty() || message.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Subject and message are required");
    }

    tracing::info!(app_id, editor = %claims.sub, "notification requested");

    let service = Arc::clone(&state.notify);
    let result = tokio::task::spawn_blocking(move || {
        service.notify_app_signups(app_id, &subject, &message)
    })
    .await;

    match result {
        Ok(Ok(summary)) => {
            let message = format!(
                "Notification sent to {} users, failed for {}",
                summary.sent_count, summary.failed_count
            );
            (
                StatusCode::OK,
                Json(json!({ "message": message, "details": summary })),
            )
                .into_response()
        },
        Ok(Err(e)) => render_error(&e),
        Err(e) => {
            tracing::error!(error = %e, "notification task failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        },
    }
}

fn authorize_editor(
    authenticator: &JwtAuthenticator,
    headers: &HeaderMap,
) -> std::result::Result<Claims, Response> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        metrics::counter!("http_auth_failures_total", "reason" => "missing_header").increment(1);
        return Err(error_response(
            StatusCode::UNAUTHORIZED,
            "Missing Authorization header",
        ));
    };
    let Ok(value) = value.to_str() else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Invalid Authorization header encoding",
        ));
    };

    let claims = match authenticator.validate_header(value) {
        Ok(claims) => claims,
        Err(e) => {
            metrics::counter!("http_auth_failures_total", "reason" => "invalid_token")
                .increment(1);
            return Err(error_response(
                StatusCode::UNAUTHORIZED,
                &format!("Authentication failed: {e}"),
            ));
        },
    };

    if !claims.can_manage_content() {
        tracing::warn!(sub = %claims.sub, role = %claims.role, "editor access denied");
        metrics::counter!("http_auth_failures_total", "reason" => "forbidden_role").increment(1);
        return Err(error_response(
            StatusCode::FORBIDDEN,
            "Editor access required",
        ));
    }

    Ok(claims)
}
