//! HTTP surface: routes, shared state and server bootstrap.

use crate::{
    anagram::{AnagramService, PgAnagramStore},
    oidc::AuthFlow,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{FromRef, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Router,
};
use axum_extra::extract::cookie::Key;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Instrument, Span};
use ulid::Ulid;

mod error;
mod guard;
pub mod handlers;
mod openapi;
mod session;

pub use self::error::AppError;
pub use self::guard::AuthenticatedSubject;
pub use self::openapi::openapi;
pub use self::session::{cookie_key, Session, SessionConfig, SESSION_COOKIE};

const SCHEMA: &str = include_str!("../../sql/schema.sql");

/// Shared, read-only request state.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthFlow>,
    pub anagrams: AnagramService,
    pub cookie_key: Key,
    pub session: SessionConfig,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("auth", &self.auth)
            .field("anagrams", &self.anagrams)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/protected_resource", get(handlers::protected_resource))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            guard::require_subject,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::auth::login))
        .route("/callback", get(handlers::auth::callback))
        .route("/logout", get(handlers::auth::logout))
        .route("/AddStrings", post(handlers::strings::add_strings))
        .route("/health", get(handlers::health::health))
        .route("/api-docs/openapi.json", get(handlers::openapi_json))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span)),
        )
        .with_state(state)
}

/// Connect the database, apply the schema and serve until Ctrl-C or SIGTERM.
///
/// # Errors
/// Returns an error if the database is unreachable, the schema cannot be applied
/// or the listener fails.
pub async fn new(
    port: u16,
    dsn: String,
    db_timeout: Duration,
    auth: AuthFlow,
    session: SessionConfig,
    cookie_key: Key,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .acquire_timeout(db_timeout)
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    apply_schema(&pool).await?;

    let state = AppState {
        auth: Arc::new(auth),
        anagrams: AnagramService::new(Arc::new(PgAnagramStore::new(pool, db_timeout))),
        cookie_key,
        session,
    };

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn apply_schema(pool: &PgPool) -> Result<()> {
    let span = info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "CREATE",
        db.statement = SCHEMA
    );

    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .instrument(span)
        .await
        .context("Failed to apply database schema")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
