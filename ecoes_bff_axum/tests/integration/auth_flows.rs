use axum::http::StatusCode;
use serde_json::json;

use crate::common::{TestApp, body_json, get, location, post_json, set_cookies};

#[tokio::test]
async fn test_login_starts_session_and_sets_backend_cookies() {
    let app = TestApp::start("tok").await;

    let response = app
        .send(post_json(
            "/api/login",
            None,
            json!({"usuario": "root", "password": "secret"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 3);
    assert!(cookies[0].starts_with("session="));
    assert!(cookies[0].contains("Max-Age=3600"));
    assert!(cookies.contains(&"auth_token=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=900".to_string()));
    assert!(cookies.contains(&"refresh_token=refresh-1; HttpOnly; SameSite=Lax; Path=/".to_string()));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["redirect"], "/admin");
    assert_eq!(body["user"]["role"], "super_admin");

    // The new session opens the admin area
    let session = cookies[0].split(';').next().unwrap().to_string();
    let page = app.send(get("/admin", Some(&session))).await;
    assert_eq!(page.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_failure_relays_backend_answer() {
    let app = TestApp::start("tok").await;

    let response = app
        .send(post_json(
            "/api/login",
            None,
            json!({"usuario": "ana", "password": "wrong"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    assert_eq!(body_json(response).await["error"], "Credenciales inválidas");
    assert_eq!(app.backend.paths(), vec!["/auth/login"]);
}

#[tokio::test]
async fn test_login_with_unknown_role_is_forbidden() {
    let app = TestApp::start("tok").await;

    let response = app
        .send(post_json(
            "/api/login",
            None,
            json!({"usuario": "intruso", "password": "secret"}),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(
        !set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("session="))
    );
}

#[tokio::test]
async fn test_login_requires_credentials() {
    let app = TestApp::start("tok").await;

    let response = app
        .send(post_json("/api/login", None, json!({"usuario": "ana"})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.backend.calls().is_empty());
}

#[tokio::test]
async fn test_sync_session() {
    let app = TestApp::start("tok").await;
    let user = json!({"user": {"id": 7, "username": "ana", "role": "empresa"}});

    let response = app.send(post_json("/api/sync-session", None, user.clone())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(post_json("/api/sync-session", Some("auth_token=tok"), user))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response)[0].starts_with("session="));
    assert_eq!(
        body_json(response).await,
        json!({"success": true, "redirect": "/empresa"})
    );

    let response = app
        .send(post_json(
            "/api/sync-session",
            Some("auth_token=tok"),
            json!({"user": {"id": 7, "username": "ana", "role": "admin"}}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sync_session_browser_session() {
    let app = TestApp::start("tok").await;

    let response = app
        .send(post_json(
            "/api/sync-session",
            Some("auth_token=tok"),
            json!({"user": {"id": 7, "username": "ana", "role": "empresa"}, "permanent": false}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!set_cookies(&response)[0].contains("Max-Age"));
}

#[tokio::test]
async fn test_logout_clears_everything() {
    let app = TestApp::start("tok").await;
    let cookie = format!("{}; auth_token=tok; refresh_token=r", app.session_cookie("empresa"));

    for request in [
        get("/logout", Some(&cookie)),
        post_json("/logout", Some(&cookie), json!({})),
    ] {
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/login");

        let cookies = set_cookies(&response);
        for name in ["session", "auth_token", "refresh_token"] {
            assert!(
                cookies
                    .iter()
                    .any(|c| c.starts_with(&format!("{name}=; ")) && c.contains("Max-Age=0")),
                "{name} not expired"
            );
        }
    }
    assert_eq!(
        app.backend
            .paths()
            .iter()
            .filter(|p| *p == "/auth/logout")
            .count(),
        2
    );
}

#[tokio::test]
async fn test_public_config() {
    let app = TestApp::start("tok").await;

    let response = app.send(get("/api/public-config", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["apiUrl"], "/proxy/api/contact/send");
    assert_eq!(body["companyPhone"], "");
}

#[tokio::test]
async fn test_session_info() {
    let app = TestApp::start("tok").await;

    let body = body_json(app.send(get("/api/session", None)).await).await;
    assert_eq!(body["authenticated"], false);

    let cookie = app.session_cookie("empresa");
    let body = body_json(app.send(get("/api/session", Some(&cookie))).await).await;
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["role"], "empresa");

    let cookie = app.session_cookie("gerente");
    let body = body_json(app.send(get("/api/session", Some(&cookie))).await).await;
    assert_eq!(body["authenticated"], false);
}
