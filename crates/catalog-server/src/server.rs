use std::{net::SocketAddr, sync::Arc};

use axum::{Router, middleware, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppConfig, create_cache_store, handlers, middleware as app_middleware,
    proxy::CatalogFetchProxy, upstream::TmdbClient,
};

/// Shared handler state. The proxy owns the process-wide cache handle.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Arc<CatalogFetchProxy>,
}

impl AppState {
    pub fn new(proxy: CatalogFetchProxy) -> Self {
        Self {
            proxy: Arc::new(proxy),
        }
    }
}

pub struct CatalogServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        // Health and info endpoints
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        // Catalog
        .route("/catalog/top", get(handlers::top_movies))
        .route("/catalog/top-nocache", get(handlers::top_movies_nocache))
        .route("/catalog/by-genre/{genre_id}", get(handlers::movies_by_genre))
        .route_layer(middleware::from_fn(app_middleware::http_metrics))
        .with_state(state)
        // Middleware stack (outermost last: trace -> cors -> request id)
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    let req_id = req
                        .headers()
                        .get(app_middleware::REQUEST_ID_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<CatalogServer> {
        if self.config.upstream.api_key.is_empty() {
            tracing::warn!("upstream.api_key is empty; TMDb will reject requests");
        }
        let cache = create_cache_store(&self.config.redis).await;
        let upstream = TmdbClient::from_config(&self.config.upstream)?;
        let proxy =
            CatalogFetchProxy::new(cache, Arc::new(upstream)).with_ttl(self.config.cache.ttl());

        Ok(CatalogServer {
            addr: self.addr,
            app: build_app(AppState::new(proxy)),
        })
    }
}

impl CatalogServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
