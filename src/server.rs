use crate::extractors::Extractor;
use crate::persist::Persister;
use crate::scrape_and_persist;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

pub const MISSING_URL: &str = "URL is required as a query parameter";
pub const MISSING_PATH: &str = "Path is required as a query parameter";
pub const SCRAPE_FAILED: &str = "Error occurred while scraping";

/// Shared, read-only state for request handlers
pub struct AppState<E> {
    pub extractor: E,
    pub persister: Persister,
}

/// Query parameters of `GET /scrape`
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ScrapeParams {
    /// Listing page to scrape
    pub url: Option<String>,
    /// Directory the archive folder is created in
    pub path: Option<String>,
}

impl ScrapeParams {
    /// Decode a raw query string; a repeated key keeps its first value
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "url" => &mut params.url,
                "path" => &mut params.path,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// Build the HTTP router
///
/// Responses allow any origin.
pub fn router<E: Extractor + 'static>(state: Arc<AppState<E>>) -> Router {
    Router::new()
        .route("/scrape", get(scrape::<E>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until the process exits
pub async fn serve<E: Extractor + 'static>(
    addr: SocketAddr,
    state: Arc<AppState<E>>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    ::log::info!(
        "Server running on http://localhost:{}",
        listener.local_addr()?.port()
    );

    axum::serve(listener, router(state)).await
}

async fn scrape<E: Extractor + 'static>(
    State(state): State<Arc<AppState<E>>>,
    RawQuery(query): RawQuery,
) -> Response {
    let params = ScrapeParams::from_query(query.as_deref().unwrap_or_default());

    let Some(url) = params.url.filter(|url| !url.is_empty()) else {
        return (StatusCode::BAD_REQUEST, MISSING_URL).into_response();
    };
    let Some(path) = params.path.filter(|path| !path.is_empty()) else {
        return (StatusCode::BAD_REQUEST, MISSING_PATH).into_response();
    };

    ::log::info!("Scrape requested for {} into {}", url, path);

    match scrape_and_persist(&state.extractor, &state.persister, &url, Path::new(&path)).await {
        Ok(run) => Json(run.listing).into_response(),
        Err(e) => {
            ::log::error!("Scrape of {} failed: {}", url, e);
            (StatusCode::INTERNAL_SERVER_ERROR, SCRAPE_FAILED).into_response()
        }
    }
}
