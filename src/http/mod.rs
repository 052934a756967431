//! HTTP surface.
//!
//! Every route is mounted under `/api`. Handlers stay thin: they extract
//! request data, call into the domain services held by [`AppState`], and
//! map failures through [`ApiError`]. Debate and taxonomy writes take an
//! [`AdminCaller`](auth::AdminCaller) extractor; issue writes take the
//! stricter [`SuperAdminCaller`](auth::SuperAdminCaller).

mod auth;
mod debates;
mod error;
mod form;
mod issues;
mod pdf;
mod state;
mod taxonomy;

pub use error::ApiError;
pub use state::{AppState, StateError};

use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const CORS_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Builds the application router.
#[must_use]
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(CORS_MAX_AGE);

    Router::new()
        .route("/api/debates", get(debates::list))
        .route("/api/debate", get(debates::detail))
        .route("/api/debates/proxy", get(debates::proxy))
        .route("/api/debates/upload", post(debates::upload))
        .route("/api/issues/years", get(issues::years))
        .route("/api/issues/content", get(issues::content))
        .route("/api/issues/upload", post(issues::upload))
        .route("/api/issues/pdf-proxy/{id}", get(issues::pdf))
        .route("/api/issues/pdf/{*public_id}", get(issues::pdf_by_public_id))
        .route(
            "/api/issues/{id}",
            get(issues::get)
                .put(issues::update_meta)
                .delete(issues::delete),
        )
        .route(
            "/api/categories",
            get(taxonomy::list_categories).post(taxonomy::create_category),
        )
        .route(
            "/api/tags",
            get(taxonomy::list_tags).post(taxonomy::create_tag),
        )
        .route(
            "/api/image-categories",
            get(taxonomy::list_image_categories).post(taxonomy::create_image_category),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves `app` until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns the I/O error that stopped the server.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
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
}
