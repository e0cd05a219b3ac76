//! Callback listener for the redirect workflow.
//!
//! Routes:
//! - `GET /home`: status page, also used as a liveness check
//! - `GET /dropbox-auth-finish?...`: provider callback, runs the finish step
//! - `GET /doc/:name`: static documentation passthrough
//! - anything else: 404 (405 for non-GET methods)
//!
//! Every request's URL is recorded to the latest-URL artifact before dispatch.

mod pages;

pub use pages::{html_page, render_result};

use crate::config::AuthflowConfig;
use crate::latest_url::LatestUrlFile;
use crate::workflow::RedirectWorkflow;
use axum::{
    extract::{Path, RawQuery, Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Static details shown on the home page and used to build routes
#[derive(Clone, Debug)]
pub struct SiteInfo {
    pub app_name: String,
    pub app_key: String,
    /// Provider console where the app is registered
    pub app_website: String,
    pub base_url: String,
    pub home_page: String,
    pub finish_page: String,
    pub finish_url: String,
    pub files_directory: PathBuf,
    pub credential_file: PathBuf,
    pub doc_directory: PathBuf,
}

impl SiteInfo {
    pub fn from_config(config: &AuthflowConfig) -> Self {
        Self {
            app_name: config.app.name.clone(),
            app_key: config.app.key.clone(),
            app_website: config.app.website.clone(),
            base_url: config.http.base_url(),
            home_page: config.http.home_page.clone(),
            finish_page: config.http.finish_page.clone(),
            finish_url: config.http.finish_url(),
            files_directory: config.files.directory.clone(),
            credential_file: config.files.credential_path(),
            doc_directory: config.files.doc_directory.clone(),
        }
    }
}

/// Shared state for the listener routes
#[derive(Clone)]
pub struct ListenerState {
    pub workflow: Arc<RedirectWorkflow>,
    pub latest_url: Arc<LatestUrlFile>,
    pub site: Arc<SiteInfo>,
}

/// Create the callback listener router
pub fn create_listener_router(state: ListenerState) -> Router {
    let home_route = format!("/{}", state.site.home_page);
    let finish_route = format!("/{}", state.site.finish_page);

    Router::new()
        .route(&home_route, get(home))
        .route(&finish_route, get(finish))
        .route("/doc/", get(doc_index))
        .route("/doc/:name", get(doc))
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), record_latest_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `router` until `shutdown` fires, then let in-flight requests finish
pub async fn serve(
    listener: tokio::net::TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Callback listener accepting connections");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Callback listener stopped");
    Ok(())
}

/// Record the request URL; failures are logged and never fail the request
async fn record_latest_url(
    State(state): State<ListenerState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = match request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
    {
        Some(host) => format!("http://{host}{path}"),
        None => path.to_string(),
    };

    debug!(method = %request.method(), url = %url, "Request received");
    if let Err(e) = state.latest_url.save(&url) {
        warn!(error = %e, "Failed to record latest URL");
    }

    next.run(request).await
}

/// GET /home
async fn home(State(state): State<ListenerState>) -> Response {
    debug!("Sending home page");
    pages::html_response(StatusCode::OK, &pages::home_body(&state.site))
}

/// GET /dropbox-auth-finish
///
/// Provider callback: validates the CSRF token, exchanges the code and
/// stores the credential.
async fn finish(State(state): State<ListenerState>, RawQuery(query): RawQuery) -> Response {
    let result = state.workflow.finish(query.as_deref().unwrap_or("")).await;
    info!(status = result.status_code, "Finish handler complete");
    render_result(&result)
}

/// GET /doc/ has no index; send the browser home
async fn doc_index(State(state): State<ListenerState>) -> Response {
    pages::redirect_response(&format!("/{}", state.site.home_page))
}

/// GET /doc/:name
async fn doc(State(state): State<ListenerState>, Path(name): Path<String>) -> Response {
    if name.contains("..") || name.contains('\\') || name.contains('/') {
        warn!(name = %name, "Rejected documentation path");
        return pages::error_response(StatusCode::NOT_FOUND, "Not Found");
    }

    let path = state.site.doc_directory.join(&name);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Documentation file not found");
            return pages::error_response(StatusCode::NOT_FOUND, "Not Found");
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read documentation file");
            return pages::error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("internal server error (request=/doc/{name})"),
            );
        }
    };

    if name.ends_with(".txt") {
        let body = format!("<pre>{}</pre>", pages::escape_html(&content));
        pages::html_response(StatusCode::OK, &body)
    } else if name.ends_with(".html") {
        pages::no_cache(StatusCode::OK, Some("text/html; charset=utf-8"), content)
    } else {
        pages::no_cache(StatusCode::OK, Some("text/plain; charset=utf-8"), content)
    }
}

async fn fallback(method: Method, uri: axum::http::Uri) -> Response {
    if method != Method::GET && method != Method::HEAD {
        debug!(%method, path = %uri.path(), "Method not allowed");
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET")],
            "Method Not Allowed",
        )
            .into_response();
    }

    if uri.path().ends_with("favicon.ico") {
        return pages::error_response(StatusCode::NOT_FOUND, "Not Found");
    }
    pages::error_response(
        StatusCode::NOT_FOUND,
        &format!("unsupported request {}", uri.path()),
    )
}
