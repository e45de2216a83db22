#![allow(dead_code)]

use axum::{Router, extract::ConnectInfo};
use chrono::{DateTime, Duration, Utc};
use snaplink::api::routes::public_routes;
use snaplink::application::services::{ShortenPolicy, ShortenService};
use snaplink::domain::clock::ManualClock;
use snaplink::infrastructure::persistence::{
    SqliteShortUrlRepository, SqliteWindowRepository, pool,
};
use snaplink::state::AppState;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::Layer;

/// Start of every test clock; aligned to a minute so windows start fresh.
pub const START: i64 = 1_700_000_040;

pub const BASE_URL: &str = "https://s.example.com";

pub const STORE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

pub async fn test_pool() -> SqlitePool {
    let pool = pool::connect_in_memory().await.unwrap();
    pool::migrate(&pool).await.unwrap();
    pool
}

/// File-backed pool with several connections, for tests that need real
/// concurrent access. The directory must outlive the pool.
pub async fn file_pool() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}", dir.path().join("snaplink.db").display());
    let pool = pool::connect(&url, 8, STORE_TIMEOUT).await.unwrap();
    pool::migrate(&pool).await.unwrap();
    (dir, pool)
}

pub fn short_url_repository(pool: &SqlitePool) -> SqliteShortUrlRepository {
    SqliteShortUrlRepository::new(Arc::new(pool.clone()), STORE_TIMEOUT)
}

pub fn window_repository(pool: &SqlitePool) -> SqliteWindowRepository {
    SqliteWindowRepository::new(Arc::new(pool.clone()), STORE_TIMEOUT)
}

pub fn test_policy() -> ShortenPolicy {
    ShortenPolicy {
        base_url: format!("{BASE_URL}/"),
        ..ShortenPolicy::default()
    }
}

pub fn create_test_state(
    pool: &SqlitePool,
    policy: ShortenPolicy,
    behind_proxy: bool,
) -> (AppState, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_epoch(START));

    let service = ShortenService::new(
        Arc::new(short_url_repository(pool)),
        Arc::new(window_repository(pool)),
        clock.clone(),
        policy,
    );

    (AppState::new(Arc::new(service), behind_proxy), clock)
}

/// Public routes with a fixed peer address of 127.0.0.1.
pub fn test_app(state: AppState) -> Router {
    public_routes().layer(MockConnectInfoLayer).with_state(state)
}

pub async fn insert_short_url(
    pool: &SqlitePool,
    code: &str,
    url: &str,
    created_at: i64,
    ttl: Duration,
) {
    sqlx::query(
        "INSERT INTO short_urls (code, original_url, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(code)
    .bind(url)
    .bind(created_at)
    .bind(created_at + ttl.num_seconds())
    .execute(pool)
    .await
    .unwrap();
}

pub async fn click_count(pool: &SqlitePool, code: &str) -> i64 {
    sqlx::query_scalar("SELECT click_count FROM short_urls WHERE code = ?1")
        .bind(code)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}
