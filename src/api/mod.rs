//! HTTP surface: unlock forms, access checks and health.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

use crate::{cli::globals::GlobalArgs, store::PgStore};

pub mod handlers;
mod openapi;
mod state;

pub use openapi::openapi;
pub use state::{AccessConfig, AccessState};

const REQUEST_ID: &str = "x-request-id";

/// Connect to the database and serve until interrupted.
/// # Errors
/// Return error if the database is unreachable or the listener fails
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs, config: AccessConfig) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    let store = Arc::new(PgStore::new(pool));
    let secrets = globals.secret_provider(store.clone());
    let state = Arc::new(AccessState::new(config, store, secrets));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app(state).into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

/// Router with every route, the request-id and trace layers and `state`.
pub fn app(state: Arc<AccessState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health).options(handlers::health::health))
        .route(
            "/content/:kind/:slug/authentication",
            post(handlers::content::authenticate),
        )
        .route(
            "/api/content/categories/:slug/access",
            get(handlers::content::category_access),
        )
        .route(
            "/api/content/posts/:slug/access",
            get(handlers::content::post_access),
        )
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
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
