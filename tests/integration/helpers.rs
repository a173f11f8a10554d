//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use assetdesk_auth::JwtEncoder;
use assetdesk_cache::CacheManager;
use assetdesk_core::config::{AppConfig, DatabaseConfig};
use assetdesk_core::types::UserId;
use assetdesk_database::memory::{
    MemoryJobStore, MemoryReportFileStore, MemoryReportStore, MemoryRowSource,
};
use assetdesk_entity::report::{ReportKind, Row};
use assetdesk_entity::user::UserRole;
use assetdesk_service::{Pipeline, Stores};
use assetdesk_storage::StorageManager;
use assetdesk_storage::providers::LocalStorageProvider;

/// Response captured from the router
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
    pub body: Value,
}

/// Test application over in-memory stores and a temporary disk
pub struct TestApp {
    pub router: Router,
    pub config: AppConfig,
    pub dir: TempDir,
    pub files: Arc<MemoryReportFileStore>,
    pub jobs: Arc<MemoryJobStore>,
    pub rows: Arc<MemoryRowSource>,
    encoder: JwtEncoder,
}

/// Config with everything needed and no database.
pub fn test_config(dir: &TempDir) -> AppConfig {
    let mut config: AppConfig = serde_json::from_value(json!({
        "database": {
            "url": "postgres://unused",
            "max_connections": 1,
            "min_connections": 0,
            "connect_timeout_seconds": 1,
            "idle_timeout_seconds": 1,
        },
    }))
    .expect("minimal config");
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.storage.data_root = dir.path().display().to_string();
    config.worker.enabled = false;
    config
}

impl TestApp {
    /// Build an app seeded with `asset_count` asset rows.
    pub async fn new(asset_count: i64) -> Self {
        Self::with_config(asset_count, |_| {}).await
    }

    /// Build an app after letting `tweak` adjust the configuration.
    pub async fn with_config(asset_count: i64, tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = test_config(&dir);
        tweak(&mut config);

        let storage = Arc::new(StorageManager::new("local"));
        let disk = LocalStorageProvider::new(dir.path().join("disk"))
            .await
            .expect("local disk");
        storage.register("local", Arc::new(disk)).await;

        let files = Arc::new(MemoryReportFileStore::new());
        let jobs = Arc::new(MemoryJobStore::new());
        let rows = Arc::new(MemoryRowSource::new());
        rows.extend(ReportKind::Asset, (1..=asset_count).map(asset)).await;

        let stores = Stores {
            reports: Arc::new(MemoryReportStore::new()),
            files: files.clone(),
            jobs: jobs.clone(),
            rows: rows.clone(),
        };
        let cache = Arc::new(CacheManager::new(&config.cache));
        let pipeline = Pipeline::build(&config, stores, storage, cache);
        let router = assetdesk_api::build_app(assetdesk_api::app_state(&config, &pipeline));
        let encoder = JwtEncoder::new(&config.auth);

        Self {
            router,
            config,
            dir,
            files,
            jobs,
            rows,
            encoder,
        }
    }

    /// Issue a bearer token for a fresh user with `role`.
    pub fn token(&self, role: UserRole) -> (UserId, String) {
        let user_id = UserId::new();
        let (token, _) = self
            .encoder
            .issue(user_id, role, "tester")
            .expect("token");
        (user_id, token)
    }

    /// Send a request through the router.
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        self.request_with(method, uri, body, token, &[]).await
    }

    /// Send a request with extra headers.
    pub async fn request_with(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body")
            .to_vec();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }

    /// Create a report owned by the token's user and return its id.
    pub async fn create_report(&self, token: &str, body: Value) -> String {
        let response = self.request("POST", "/api/reports", Some(body), Some(token)).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["data"]["id"]
            .as_str()
            .expect("report id")
            .to_string()
    }
}

/// Minimal asset report body.
pub fn asset_report(name: &str) -> Value {
    json!({
        "name": name,
        "kind": "asset",
        "format": "csv",
        "columns": ["asset_tag", "name"],
        "sort_field": "id",
        "sort_direction": "asc",
    })
}

/// One asset source row.
pub fn asset(id: i64) -> Row {
    match json!({
        "id": id,
        "asset_tag": format!("AT-{id:04}"),
        "name": format!("Asset {id}"),
        "category": "Laptop",
        "status": "deployed",
        "purchase_date": "2024-01-15",
        "created_at": format!("2024-01-{:02}T08:00:00Z", (id % 28) + 1),
    }) {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}
