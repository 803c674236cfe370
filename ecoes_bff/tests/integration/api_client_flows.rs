use std::time::Duration;

use ecoes_bff::{ApiClientError, ApiRequest, AUTH_TOKEN_COOKIE};
use http::StatusCode;
use http::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use serde_json::json;

use crate::common::{MockBackend, RefreshMode, client_for};

#[tokio::test]
async fn test_valid_token_passes_without_refresh() {
    let backend = MockBackend::start("good").await;
    let client = client_for(&backend, &[("auth_token", "good"), ("refresh_token", "r")]);

    let response = client.get("api/empresas").await.unwrap();
    assert_eq!(response.status, StatusCode::OK);

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, "/api/empresas");
    assert_eq!(calls[0].authorization.as_deref(), Some("Bearer good"));
    assert_eq!(calls[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(
        calls[0].cookie.as_deref(),
        Some("auth_token=good; refresh_token=r")
    );
    assert!(client.take_refreshed_cookies().await.is_empty());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_retried() {
    let backend = MockBackend::start("stale-is-not-accepted").await;
    backend.set_refresh_mode(RefreshMode::Issue("fresh".to_string()));
    let client = client_for(&backend, &[("auth_token", "stale"), ("refresh_token", "r")]);

    let response = client
        .request(ApiRequest::post("/api/hardware").json(json!({"nombre": "sensor"})))
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["body"]["nombre"], "sensor");

    let paths: Vec<_> = backend.calls().into_iter().map(|c| c.path).collect();
    assert_eq!(paths, vec!["/api/hardware", "/auth/refresh", "/api/hardware"]);

    let retried = backend.calls_to("/api/hardware").pop().unwrap();
    assert_eq!(retried.authorization.as_deref(), Some("Bearer fresh"));
    assert!(retried.cookie.unwrap().contains("auth_token=fresh"));

    let refreshed = client.take_refreshed_cookies().await;
    assert_eq!(refreshed.len(), 1);
    assert_eq!(refreshed[0].name, AUTH_TOKEN_COOKIE);
    assert_eq!(refreshed[0].value, "fresh");
}

#[tokio::test]
async fn test_second_call_reuses_refreshed_token() {
    let backend = MockBackend::start("nobody-has-this").await;
    backend.set_refresh_mode(RefreshMode::Issue("fresh".to_string()));
    let client = client_for(&backend, &[("auth_token", "stale"), ("refresh_token", "r")]);

    assert_eq!(client.get("/api/hardware").await.unwrap().status, StatusCode::OK);
    assert_eq!(client.get("/api/alertas").await.unwrap().status, StatusCode::OK);

    assert_eq!(backend.refresh_count(), 1);
    let second = backend.calls_to("/api/alertas");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].authorization.as_deref(), Some("Bearer fresh"));
    assert_eq!(
        client.cached_cookies().await.unwrap().get(AUTH_TOKEN_COOKIE),
        Some("fresh")
    );
}

#[tokio::test]
async fn test_second_unauthorized_is_returned_without_third_attempt() {
    let backend = MockBackend::start("never").await;
    backend.set_refresh_mode(RefreshMode::IssueStillRejected("fresh".to_string()));
    let client = client_for(&backend, &[("auth_token", "stale"), ("refresh_token", "r")]);

    let response = client.get("/api/hardware").await.unwrap();
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(backend.calls_to("/api/hardware").len(), 2);
    assert_eq!(backend.refresh_count(), 1);
}

#[tokio::test]
async fn test_auth_endpoints_never_trigger_refresh() {
    let backend = MockBackend::start("good").await;
    backend.set_refresh_mode(RefreshMode::Issue("fresh".to_string()));
    let client = client_for(&backend, &[("auth_token", "stale"), ("refresh_token", "r")]);

    let login = client
        .post("/auth/login", json!({"usuario": "ana", "password": "wrong"}))
        .await
        .unwrap();
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);

    let paths: Vec<_> = backend.calls().into_iter().map(|c| c.path).collect();
    assert_eq!(paths, vec!["/auth/login"]);

    backend.set_refresh_mode(RefreshMode::Reject);
    let refresh = client.post("/auth/refresh", json!({})).await.unwrap();
    assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);
    assert_eq!(backend.refresh_count(), 1);
}

#[tokio::test]
async fn test_no_refresh_without_refresh_token() {
    let backend = MockBackend::start("good").await;
    backend.set_refresh_mode(RefreshMode::Issue("fresh".to_string()));

    for cookies in [
        vec![("auth_token", "stale")],
        vec![("auth_token", "stale"), ("refresh_token", "")],
    ] {
        let client = client_for(&backend, &cookies);
        let response = client.get("/api/hardware").await.unwrap();
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
    assert_eq!(backend.refresh_count(), 0);
}

#[tokio::test]
async fn test_rejected_refresh_returns_original_response() {
    let backend = MockBackend::start("good").await;
    backend.set_refresh_mode(RefreshMode::Reject);
    let client = client_for(&backend, &[("auth_token", "stale"), ("refresh_token", "r")]);

    let response = client.get("/api/hardware").await.unwrap();
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body["error"], "Token expirado");

    assert_eq!(backend.calls_to("/api/hardware").len(), 1);
    assert!(client.cached_cookies().await.is_none());
    assert!(client.take_refreshed_cookies().await.is_empty());
}

#[tokio::test]
async fn test_refresh_timeout_is_not_an_error() {
    let backend = MockBackend::start("good").await;
    backend.set_refresh_mode(RefreshMode::Hang(Duration::from_secs(2)));
    let client = client_for(&backend, &[("auth_token", "stale"), ("refresh_token", "r")]);

    let response = client.get("/api/hardware").await.unwrap();
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(client.cached_cookies().await.is_none());
}

#[tokio::test]
async fn test_primary_network_error_propagates() {
    // Bind then drop a listener so the port is known to be closed
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let http = ecoes_bff::build_http_client(Duration::from_millis(500)).unwrap();
    let client = ecoes_bff::ApiClient::new(http, &format!("http://{addr}"), [("auth_token", "t")]);

    let err = client.get("/api/hardware").await.unwrap_err();
    assert!(matches!(err, ApiClientError::Http(_) | ApiClientError::Timeout(_)));
    assert!(!client.health_check().await);
}

#[tokio::test]
async fn test_caller_headers_and_explicit_cookies_win() {
    let backend = MockBackend::start("explicit").await;
    let client = client_for(&backend, &[("auth_token", "inbound"), ("refresh_token", "r")]);

    let response = client
        .request(
            ApiRequest::get("/api/usuarios")
                .params(&[("rol", "empresa")])
                .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
                .cookies(vec![
                    ("auth_token".to_string(), "explicit".to_string()),
                    ("theme".to_string(), "dark".to_string()),
                ]),
        )
        .await
        .unwrap();
    assert_eq!(response.status, StatusCode::OK);

    let call = &backend.calls()[0];
    assert_eq!(call.query.as_deref(), Some("rol=empresa"));
    assert_eq!(call.content_type.as_deref(), Some("text/plain"));
    assert_eq!(call.authorization.as_deref(), Some("Bearer explicit"));
    assert_eq!(
        call.cookie.as_deref(),
        Some("auth_token=explicit; refresh_token=r; theme=dark")
    );

    let with_auth = client
        .request(
            ApiRequest::get("/api/usuarios")
                .header(AUTHORIZATION, HeaderValue::from_static("Bearer explicit")),
        )
        .await
        .unwrap();
    assert_eq!(with_auth.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_caches_and_queues_cookies() {
    let backend = MockBackend::start("issued-at-login").await;
    let client = client_for(&backend, &[]);

    let response = client.login("ana", "secret").await.unwrap();
    assert!(response.is_success());

    let queued = client.take_refreshed_cookies().await;
    let names: Vec<_> = queued.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["auth_token", "refresh_token"]);
    assert_eq!(queued[0].max_age, Some(900));

    // Later calls in the same request use the cookies issued at login
    assert_eq!(client.get("/api/empresas").await.unwrap().status, StatusCode::OK);
    let call = backend.calls_to("/api/empresas").pop().unwrap();
    assert_eq!(call.authorization.as_deref(), Some("Bearer issued-at-login"));
}

#[tokio::test]
async fn test_failed_login_queues_nothing() {
    let backend = MockBackend::start("good").await;
    let client = client_for(&backend, &[]);

    let response = client.login("ana", "nope").await.unwrap();
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(client.take_refreshed_cookies().await.is_empty());
    assert!(client.cached_cookies().await.is_none());
}

#[tokio::test]
async fn test_health_check_and_logout() {
    let backend = MockBackend::start("good").await;
    let client = client_for(&backend, &[("auth_token", "good")]);

    assert!(client.health_check().await);
    backend.set_healthy(false);
    assert!(!client.health_check().await);

    assert!(client.logout().await);
    assert_eq!(backend.calls_to("/auth/logout").len(), 1);
}

#[tokio::test]
async fn test_clients_do_not_share_request_state() {
    let backend = MockBackend::start("nobody").await;
    backend.set_refresh_mode(RefreshMode::Issue("fresh".to_string()));

    let first = client_for(&backend, &[("auth_token", "stale"), ("refresh_token", "r")]);
    let second = client_for(&backend, &[("auth_token", "other")]);

    assert_eq!(first.get("/api/hardware").await.unwrap().status, StatusCode::OK);
    assert!(second.cached_cookies().await.is_none());

    // A clone shares the state of the request it was made for
    let clone = first.clone();
    assert_eq!(clone.take_refreshed_cookies().await.len(), 1);
    assert!(first.take_refreshed_cookies().await.is_empty());
}
