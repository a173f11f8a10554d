//! Integration tests for the report endpoints.

mod helpers;

use axum::http::{StatusCode, header};
use chrono::{Duration, Utc};
use serde_json::json;

use assetdesk_core::types::{ReportFileId, ReportId};
use assetdesk_entity::report::ExportFormat;
use assetdesk_entity::report_file::ReportFile;
use assetdesk_entity::user::UserRole;

use helpers::{TestApp, asset_report};

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new(0).await;
    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_reports_require_token() {
    let app = TestApp::new(0).await;

    let response = app.request("GET", "/api/reports", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");

    let response = app
        .request("GET", "/api/reports", None, Some("not-a-jwt"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_and_show_with_preview() {
    let app = TestApp::new(3).await;
    let (_, token) = app.token(UserRole::User);
    let id = app.create_report(&token, asset_report("Deployed assets")).await;

    let response = app
        .request("GET", &format!("/api/reports/{id}"), None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    let data = &response.body["data"];
    assert_eq!(data["report"]["name"], "Deployed assets");
    assert_eq!(data["total_rows"], 3);
    assert_eq!(data["rows"].as_array().map(Vec::len), Some(3));
    assert_eq!(data["columns"][0]["name"], "asset_tag");
    assert_eq!(data["rows"][0]["asset_tag"], "AT-0001");
}

#[tokio::test]
async fn test_invalid_definitions_are_unprocessable() {
    let app = TestApp::new(0).await;
    let (_, token) = app.token(UserRole::User);

    let response = app
        .request("POST", "/api/reports", Some(asset_report("")), Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");

    let mut body = asset_report("Bad column");
    body["columns"] = json!(["asset_tag", "password"]);
    let response = app
        .request("POST", "/api/reports", Some(body), Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_private_report_hidden_from_other_users() {
    let app = TestApp::new(1).await;
    let (_, owner) = app.token(UserRole::User);
    let (_, other) = app.token(UserRole::User);
    let (_, admin) = app.token(UserRole::Admin);
    let id = app.create_report(&owner, asset_report("Private")).await;

    let response = app
        .request("GET", &format!("/api/reports/{id}"), None, Some(&other))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request(
            "PUT",
            &format!("/api/reports/{id}"),
            Some(json!({"name": "Hijacked"})),
            Some(&other),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request("GET", &format!("/api/reports/{id}"), None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let listed = app.request("GET", "/api/reports", None, Some(&other)).await;
    assert_eq!(listed.body["data"]["total"], 0);
    let listed = app.request("GET", "/api/reports", None, Some(&admin)).await;
    assert_eq!(listed.body["data"]["total"], 1);
}

#[tokio::test]
async fn test_update_then_delete() {
    let app = TestApp::new(1).await;
    let (_, token) = app.token(UserRole::User);
    let id = app.create_report(&token, asset_report("Before")).await;

    let response = app
        .request(
            "PUT",
            &format!("/api/reports/{id}"),
            Some(json!({"name": "After", "is_public": true})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["data"]["name"], "After");
    assert_eq!(response.body["data"]["is_public"], true);

    let response = app
        .request("DELETE", &format!("/api/reports/{id}"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("GET", &format!("/api/reports/{id}"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inline_export_then_download() {
    let app = TestApp::new(3).await;
    let (_, token) = app.token(UserRole::User);
    let id = app.create_report(&token, asset_report("Fleet")).await;

    let response = app
        .request(
            "POST",
            &format!("/api/reports/{id}/export"),
            Some(json!({"format": "csv"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    let file_id = response.body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(response.body["data"]["row_count"], 3);

    let files = app
        .request("GET", &format!("/api/reports/{id}/files"), None, Some(&token))
        .await;
    assert_eq!(files.body["data"].as_array().map(Vec::len), Some(1));

    let download = app
        .request(
            "GET",
            &format!("/api/reports/files/{file_id}/download"),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(download.headers[header::CONTENT_TYPE], "text/csv");
    let disposition = download.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"fleet_"));
    assert!(disposition.ends_with(".csv\""));
    let text = String::from_utf8(download.bytes).unwrap();
    assert!(text.starts_with("Asset Tag,Name\n"));
    assert_eq!(text.lines().count(), 4);
}

#[tokio::test]
async fn test_large_export_is_queued() {
    let app = TestApp::with_config(5, |config| config.reports.async_threshold_rows = 2).await;
    let (_, token) = app.token(UserRole::User);
    let id = app.create_report(&token, asset_report("Big")).await;

    let response = app
        .request("POST", &format!("/api/reports/{id}/export"), None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::ACCEPTED, "{}", response.body);
    assert_eq!(response.body["data"]["status"], "queued");
    let jobs = app.jobs.all().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(response.body["data"]["job_id"], jobs[0].id.to_string());
}

#[tokio::test]
async fn test_expired_file_is_gone() {
    let app = TestApp::new(1).await;
    let (_, token) = app.token(UserRole::User);
    let id = app.create_report(&token, asset_report("Old")).await;

    let now = Utc::now();
    let file = ReportFile {
        id: ReportFileId::new(),
        report_id: id.parse::<uuid::Uuid>().map(ReportId::from).unwrap(),
        file_name: "old.csv".to_string(),
        file_path: "reports/old.csv".to_string(),
        disk: "local".to_string(),
        file_size: 4,
        mime_type: "text/csv".to_string(),
        format: ExportFormat::Csv,
        row_count: 1,
        generated_by: None,
        expires_at: Some(now - Duration::seconds(1)),
        created_at: now - Duration::days(7),
    };
    app.files.insert(file.clone()).await;

    let response = app
        .request(
            "GET",
            &format!("/api/reports/files/{}/download", file.id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::GONE);
    assert_eq!(response.body["error"], "EXPIRED");
}

#[tokio::test]
async fn test_unknown_file_is_not_found() {
    let app = TestApp::new(0).await;
    let (_, token) = app.token(UserRole::User);

    let response = app
        .request(
            "GET",
            &format!("/api/reports/files/{}/download", ReportFileId::new()),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
