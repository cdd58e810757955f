use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use catalog_core::{CatalogQuery, GenreId};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;
use crate::proxy::Fetched;
use crate::server::AppState;

pub const CACHE_STATUS_HEADER: &str = "x-cache";

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

#[derive(Serialize)]
pub struct ReadinessResponse<'a> {
    status: &'a str,
    cache: &'a str,
    cache_mode: &'a str,
}

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "catalog-server",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Always ready: the cache is optional, so its state is reported but never fails the probe.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.proxy.cache();
    let cache_status = if cache.is_available().await { "up" } else { "down" };
    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            cache: cache_status,
            cache_mode: cache.mode(),
        }),
    )
}

pub async fn metrics() -> Response {
    match crate::metrics::render_metrics() {
        Some(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

// ---- Catalog ----

pub async fn top_movies(State(state): State<AppState>) -> Result<Response, ApiError> {
    let fetched = state.proxy.fetch(&CatalogQuery::Top).await?;
    Ok(catalog_response(fetched))
}

pub async fn top_movies_nocache(State(state): State<AppState>) -> Result<Response, ApiError> {
    let fetched = state.proxy.fetch_live(&CatalogQuery::Top).await?;
    Ok(catalog_response(fetched))
}

pub async fn movies_by_genre(
    State(state): State<AppState>,
    Path(genre_id): Path<String>,
) -> Result<Response, ApiError> {
    let genre = GenreId::new(&genre_id)?;
    let fetched = state.proxy.fetch(&CatalogQuery::ByGenre(genre)).await?;
    Ok(catalog_response(fetched))
}

fn catalog_response(fetched: Fetched) -> Response {
    let mut res = (StatusCode::OK, Json(fetched.payload)).into_response();
    res.headers_mut().insert(
        HeaderName::from_static(CACHE_STATUS_HEADER),
        HeaderValue::from_static(fetched.source.as_str()),
    );
    res
}
