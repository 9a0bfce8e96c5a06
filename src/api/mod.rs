//! Router assembly and server startup.

use anyhow::{Context, Result};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, info_span, warn};
use ulid::Ulid;

use crate::auth::catalog::Role;
use crate::auth::chain;
use crate::auth::rate_limit::{RateLimiter, SlidingWindowRateLimiter};
use crate::auth::state::{AppConfig, AppState};
use crate::store::{MemoryCounterStore, MemoryUserStore, PgUserStore, StoreBackend, UserStore};

pub mod handlers;

/// Every response carries an id so a user-visible failure can be matched to
/// its server-side log entries.
#[derive(Clone, Copy, Default)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Ulid::new().to_string();
        axum::http::HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build the application router with the authorization chain wrapped around
/// every route.
#[must_use]
pub fn app(state: AppState) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(
        |request: &axum::http::Request<axum::body::Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|value| value.to_str().ok())
                .unwrap_or("unknown")
                .to_string();
            info_span!(
                "http.request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %request_id,
            )
        },
    );

    Router::new()
        .route("/", get(handlers::home::home))
        .route("/health", get(handlers::health::health))
        .route(
            "/login",
            get(handlers::login::form).post(handlers::login::submit),
        )
        .route("/logout", post(handlers::login::logout))
        .route("/admin/books", get(handlers::admin::books))
        .route("/admin/books/create", post(handlers::admin::books_create))
        .route("/admin/borrowings", get(handlers::admin::borrowings))
        .route(
            "/admin/borrowings/return",
            post(handlers::admin::borrowings_return),
        )
        .route("/admin/visitors", get(handlers::admin::visitors))
        .route("/teacher/grades", get(handlers::teacher::grades))
        .route("/teacher/grades/save", post(handlers::teacher::grades_save))
        .route("/student/grades", get(handlers::student::grades))
        .route("/student/borrowings", get(handlers::student::borrowings))
        .route("/student/profile", get(handlers::student::profile))
        .route(
            "/student/profile/update",
            post(handlers::student::profile_update),
        )
        .layer(middleware::from_fn_with_state(state.clone(), chain::guard))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUlid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    backend: StoreBackend,
    dsn: Option<SecretString>,
    config: AppConfig,
) -> Result<()> {
    let users: Arc<dyn UserStore> = match backend {
        StoreBackend::Postgres => {
            let dsn = dsn.context("--dsn is required for the postgres store")?;
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(dsn.expose_secret())
                .await
                .context("Failed to connect to database")?;
            Arc::new(PgUserStore::new(pool))
        }
        StoreBackend::Memory => {
            let store = MemoryUserStore::new();
            store
                .seed(
                    "admin",
                    "admin123",
                    Role::Admin,
                    "Site Administrator",
                    "admin@pustaka.sch.id",
                )
                .await?;
            warn!("memory store active with a seeded admin account; development use only");
            Arc::new(store)
        }
    };

    let limiter: Arc<dyn RateLimiter> = Arc::new(SlidingWindowRateLimiter::new(
        Arc::new(MemoryCounterStore::new()),
        config.rate_limit_max_requests(),
        config.rate_limit_window(),
    ));

    let state = AppState::new(config, users, limiter);
    let app = app(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;
    info!(port, backend = %backend, "pustaka listening");

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
