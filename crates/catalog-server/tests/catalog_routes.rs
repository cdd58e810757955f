//! End-to-end tests for the catalog routes.
//!
//! A real server is bound to an ephemeral port and TMDb is replaced by a
//! wiremock server, so every request goes through routing, the fetch proxy,
//! the cache store and the reqwest client.

use std::sync::Arc;
use std::time::Duration;

use catalog_core::CatalogQuery;
use catalog_server::{
    AppState, CacheStore, CatalogFetchProxy, LocalCacheStore, RedisCacheStore, RedisConfig,
    TmdbClient, UpstreamConfig, build_app,
};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

async fn start_server(proxy: CatalogFetchProxy) -> (String, tokio::sync::oneshot::Sender<()>, JoinHandle<()>) {
    let app = build_app(AppState::new(proxy));

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), tx, server)
}

fn tmdb_client(base_url: &str) -> Arc<TmdbClient> {
    let config = UpstreamConfig {
        base_url: base_url.to_string(),
        api_key: API_KEY.to_string(),
        ..UpstreamConfig::default()
    };
    Arc::new(TmdbClient::from_config(&config).expect("build client"))
}

fn popular_body() -> Value {
    json!({
        "page": 1,
        "results": [{"id": 550, "title": "El club de la lucha"}],
        "total_pages": 500
    })
}

/// Address with nothing listening on it.
async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    listener.local_addr().unwrap().port()
}

fn cache_header(resp: &reqwest::Response) -> String {
    resp.headers()
        .get("x-cache")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn top_is_fetched_once_then_served_from_cache() {
    let tmdb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .and(query_param("api_key", API_KEY))
        .and(query_param("language", "es-ES"))
        .respond_with(ResponseTemplate::new(200).set_body_json(popular_body()))
        .expect(1)
        .mount(&tmdb)
        .await;

    let store = LocalCacheStore::new();
    let proxy = CatalogFetchProxy::new(Arc::new(store.clone()), tmdb_client(&tmdb.uri()));
    let (base, shutdown_tx, handle) = start_server(proxy).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/catalog/top")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(cache_header(&resp), "MISS");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, popular_body());

    let resp = client.get(format!("{base}/catalog/top")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(cache_header(&resp), "HIT");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, popular_body());

    assert!(store.get(&CatalogQuery::Top.cache_key()).await.is_some());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn genres_are_cached_independently() {
    let tmdb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .and(query_param("with_genres", "28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"genre": 28})))
        .expect(1)
        .mount(&tmdb)
        .await;
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .and(query_param("with_genres", "12"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"genre": 12})))
        .expect(1)
        .mount(&tmdb)
        .await;

    let proxy = CatalogFetchProxy::new(Arc::new(LocalCacheStore::new()), tmdb_client(&tmdb.uri()));
    let (base, shutdown_tx, handle) = start_server(proxy).await;
    let client = reqwest::Client::new();

    for (genre, expected_cache) in [("28", "MISS"), ("12", "MISS"), ("28", "HIT"), ("12", "HIT")] {
        let resp = client
            .get(format!("{base}/catalog/by-genre/{genre}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(cache_header(&resp), expected_cache, "genre {genre}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["genre"].to_string(), genre);
    }

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn nocache_route_always_hits_upstream_and_never_writes() {
    let tmdb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(popular_body()))
        .expect(2)
        .mount(&tmdb)
        .await;

    let store = LocalCacheStore::new();
    let proxy = CatalogFetchProxy::new(Arc::new(store.clone()), tmdb_client(&tmdb.uri()));
    let (base, shutdown_tx, handle) = start_server(proxy).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let resp = client
            .get(format!("{base}/catalog/top-nocache"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(cache_header(&resp), "BYPASS");
    }
    assert!(store.is_empty());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn upstream_status_is_forwarded_and_not_cached() {
    let tmdb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/discover/movie"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"status_code": 34})))
        .expect(2)
        .mount(&tmdb)
        .await;

    let store = LocalCacheStore::new();
    let proxy = CatalogFetchProxy::new(Arc::new(store.clone()), tmdb_client(&tmdb.uri()));
    let (base, shutdown_tx, handle) = start_server(proxy).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let resp = client
            .get(format!("{base}/catalog/by-genre/9999"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 404);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], 404);
    }
    assert!(store.is_empty());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn upstream_transport_failure_is_internal_error() {
    let port = closed_port().await;
    let proxy = CatalogFetchProxy::new(
        Arc::new(LocalCacheStore::new()),
        tmdb_client(&format!("http://127.0.0.1:{port}")),
    );
    let (base, shutdown_tx, handle) = start_server(proxy).await;
    let client = reqwest::Client::new();

    for route in ["/catalog/top", "/catalog/top-nocache", "/catalog/by-genre/28"] {
        let resp = client.get(format!("{base}{route}")).send().await.unwrap();
        assert_eq!(resp.status(), 500, "{route}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "internal error");
    }

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn non_json_upstream_body_is_internal_error() {
    let tmdb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&tmdb)
        .await;

    let store = LocalCacheStore::new();
    let proxy = CatalogFetchProxy::new(Arc::new(store.clone()), tmdb_client(&tmdb.uri()));
    let (base, shutdown_tx, handle) = start_server(proxy).await;

    let resp = reqwest::get(format!("{base}/catalog/top")).await.unwrap();
    assert_eq!(resp.status(), 500);
    assert!(store.is_empty());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn corrupt_cache_entry_is_replaced() {
    let tmdb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(popular_body()))
        .expect(1)
        .mount(&tmdb)
        .await;

    let store = LocalCacheStore::new();
    let key = CatalogQuery::Top.cache_key();
    store
        .set(&key, b"{\"page\": 1, \"res".to_vec(), Duration::from_secs(600))
        .await
        .unwrap();

    let proxy = CatalogFetchProxy::new(Arc::new(store.clone()), tmdb_client(&tmdb.uri()));
    let (base, shutdown_tx, handle) = start_server(proxy).await;

    let resp = reqwest::get(format!("{base}/catalog/top")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(cache_header(&resp), "MISS");

    let cached = store.get(&key).await.expect("entry rewritten");
    let cached: Value = serde_json::from_slice(&cached).unwrap();
    assert_eq!(cached, popular_body());

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn unreachable_redis_degrades_to_upstream() {
    let tmdb = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/popular"))
        .respond_with(ResponseTemplate::new(200).set_body_json(popular_body()))
        .expect(2)
        .mount(&tmdb)
        .await;

    let redis = RedisCacheStore::from_config(&RedisConfig {
        enabled: true,
        host: "127.0.0.1".to_string(),
        port: closed_port().await,
        pool_size: 2,
        timeout_ms: 500,
    })
    .expect("pool");
    assert!(redis.connect().await.is_err());

    let proxy = CatalogFetchProxy::new(Arc::new(redis), tmdb_client(&tmdb.uri()));
    let (base, shutdown_tx, handle) = start_server(proxy).await;
    let client = reqwest::Client::new();

    // Every request misses and still succeeds
    for _ in 0..2 {
        let resp = client.get(format!("{base}/catalog/top")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(cache_header(&resp), "MISS");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body, popular_body());
    }

    let resp = client.get(format!("{base}/readyz")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["cache"], "down");
    assert_eq!(body["cache_mode"], "redis");

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}

#[tokio::test]
async fn service_endpoints_work() {
    let proxy = CatalogFetchProxy::new(
        Arc::new(LocalCacheStore::new()),
        tmdb_client("http://127.0.0.1:9"),
    );
    let (base, shutdown_tx, handle) = start_server(proxy).await;
    let client = reqwest::Client::new();

    // GET /
    let resp = client.get(format!("{base}/")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["service"], "catalog-server");
    assert_eq!(body["status"], "ok");

    // GET /healthz
    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    // GET /readyz
    let resp = client.get(format!("{base}/readyz")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["cache"], "up");
    assert_eq!(body["cache_mode"], "local");

    // Request id is generated, or echoed when supplied
    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
    let resp = client
        .get(format!("{base}/healthz"))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "abc-123");

    // Every middleware layer is in place: CORS answers cross-origin callers
    let resp = client
        .get(format!("{base}/catalog/by-genre/%20"))
        .header("origin", "http://example.test")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    assert!(resp.headers().contains_key("x-request-id"));

    // Blank genre id
    let resp = client
        .get(format!("{base}/catalog/by-genre/%20"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let _ = shutdown_tx.send(());
    let _ = handle.await;
}
