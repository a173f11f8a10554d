//! Integration tests for per-request preferences.

mod helpers;

use axum::http::StatusCode;

use assetdesk_entity::user::UserRole;

use helpers::TestApp;

#[tokio::test]
async fn test_theme_defaults_to_light() {
    let app = TestApp::new(0).await;
    let (_, token) = app.token(UserRole::User);

    let response = app
        .request("GET", "/api/me/preferences", None, Some(&token))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["theme"], "light");
    assert_eq!(response.body["data"]["username"], "tester");
}

#[tokio::test]
async fn test_theme_header_wins_over_cookie() {
    let app = TestApp::new(0).await;
    let (_, token) = app.token(UserRole::User);

    let response = app
        .request_with(
            "GET",
            "/api/me/preferences",
            None,
            Some(&token),
            &[("x-theme", "dark"), ("cookie", "theme=light")],
        )
        .await;
    assert_eq!(response.body["data"]["theme"], "dark");

    let response = app
        .request_with(
            "GET",
            "/api/me/preferences",
            None,
            Some(&token),
            &[("cookie", "session=abc; theme=dark")],
        )
        .await;
    assert_eq!(response.body["data"]["theme"], "dark");
}

#[tokio::test]
async fn test_preferences_do_not_leak_between_requests() {
    let app = TestApp::new(0).await;
    let (_, token) = app.token(UserRole::User);

    let dark = app
        .request_with(
            "GET",
            "/api/me/preferences",
            None,
            Some(&token),
            &[("x-theme", "dark")],
        )
        .await;
    let plain = app
        .request("GET", "/api/me/preferences", None, Some(&token))
        .await;

    assert_eq!(dark.body["data"]["theme"], "dark");
    assert_eq!(plain.body["data"]["theme"], "light");
}
