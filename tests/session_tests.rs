// Integration tests for the HTTP login session against a mock Discourse
// backend.

use linuxdo_checkin::session::ForumSession;
use linuxdo_checkin::AppError;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_csrf(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/session/csrf"))
        .and(header("X-Requested-With", "XMLHttpRequest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "csrf": token,
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetch_csrf_returns_token() {
    let server = MockServer::start().await;
    mock_csrf(&server, "tok-123").await;

    let session = ForumSession::with_base(&server.uri()).unwrap();
    let token = session.fetch_csrf().await.unwrap();
    assert_eq!(token, "tok-123");
}

#[tokio::test]
async fn configured_timeout_cuts_off_slow_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session/csrf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "csrf": "tok-slow" }))
                .set_delay(std::time::Duration::from_secs(1)),
        )
        .mount(&server)
        .await;

    let session = ForumSession::with_base_and_timeout(
        &server.uri(),
        std::time::Duration::from_millis(200),
    )
    .unwrap();
    let err = session.fetch_csrf().await.unwrap_err();
    assert!(matches!(err, AppError::Http(_)));

    // A generous timeout against the same endpoint goes through.
    let session = ForumSession::with_base_and_timeout(
        &server.uri(),
        std::time::Duration::from_secs(30),
    )
    .unwrap();
    assert_eq!(session.fetch_csrf().await.unwrap(), "tok-slow");
}

#[tokio::test]
async fn fetch_csrf_reports_cloudflare_403() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session/csrf"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let session = ForumSession::with_base(&server.uri()).unwrap();
    let err = session.fetch_csrf().await.unwrap_err();
    assert!(matches!(err, AppError::Login(_)));
    assert!(err.to_string().contains("Cloudflare"));
}

#[tokio::test]
async fn fetch_csrf_reports_cloudflare_interstitial() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/session/csrf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><title>Just a moment...</title></html>"),
        )
        .mount(&server)
        .await;

    let session = ForumSession::with_base(&server.uri()).unwrap();
    let err = session.fetch_csrf().await.unwrap_err();
    assert!(matches!(err, AppError::Login(_)));
}

#[tokio::test]
async fn login_posts_form_with_csrf_header() {
    let server = MockServer::start().await;
    mock_csrf(&server, "tok-abc").await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .and(header("X-CSRF-Token", "tok-abc"))
        .and(body_string_contains("login=alice"))
        .and(body_string_contains("password=hunter2"))
        .and(body_string_contains("second_factor_method=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "user": { "username": "alice" },
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = ForumSession::with_base(&server.uri()).unwrap();
    session.login("alice", "hunter2").await.unwrap();
}

#[tokio::test]
async fn login_surfaces_api_error_message() {
    let server = MockServer::start().await;
    mock_csrf(&server, "tok").await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": "Incorrect username or password",
        })))
        .mount(&server)
        .await;

    let session = ForumSession::with_base(&server.uri()).unwrap();
    let err = session.login("alice", "wrong").await.unwrap_err();
    match err {
        AppError::Login(msg) => assert_eq!(msg, "Incorrect username or password"),
        other => panic!("expected Login error, got {other}"),
    }
}

#[tokio::test]
async fn login_rejects_non_success_status() {
    let server = MockServer::start().await;
    mock_csrf(&server, "tok").await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let session = ForumSession::with_base(&server.uri()).unwrap();
    let err = session.login("alice", "pw").await.unwrap_err();
    assert!(err.to_string().contains("429"));
}

#[tokio::test]
async fn login_collects_session_cookies() {
    let server = MockServer::start().await;
    mock_csrf(&server, "tok").await;

    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "_t=abc123; Path=/; HttpOnly")
                .set_body_json(serde_json::json!({ "user": {} })),
        )
        .mount(&server)
        .await;

    let session = ForumSession::with_base(&server.uri()).unwrap();
    session.login("alice", "pw").await.unwrap();

    let pairs = session.cookie_pairs();
    assert!(pairs.contains(&("_t".to_string(), "abc123".to_string())));
}

#[tokio::test]
async fn get_html_follows_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connect"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let session = ForumSession::with_base(&server.uri()).unwrap();
    let result = session.get_html(&format!("{}/connect", server.uri())).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn get_html_returns_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
        .mount(&server)
        .await;

    let session = ForumSession::with_base(&server.uri()).unwrap();
    let body = session
        .get_html(&format!("{}/connect", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, "<table></table>");
}
