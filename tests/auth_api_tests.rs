//! Session, sign-in and account endpoints.

mod test_utils;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use devfolio::{
    clients::GoogleOAuthClient, config::GoogleConfig, handlers::auth::OAUTH_STATE_COOKIE,
    repositories::UserRepository,
};
use serde_json::json;
use test_utils::{
    ADMIN_EMAIL, TestApp, authed, authed_json, body_json, create_profile, create_user, get,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path},
};

fn google_config(server: &MockServer) -> GoogleConfig {
    GoogleConfig {
        client_id: Some("client-id".to_string()),
        client_secret: Some("client-secret".to_string()),
        redirect_url: Some("http://localhost:8080/api/auth/google/callback".to_string()),
        auth_url: Some(format!("{}/auth", server.uri())),
        token_url: Some(format!("{}/token", server.uri())),
        userinfo_url: Some(format!("{}/userinfo", server.uri())),
    }
}

async fn app_with_google(server: &MockServer) -> TestApp {
    let mut app = TestApp::new().await.unwrap();
    let google = GoogleOAuthClient::from_config(reqwest::Client::new(), &google_config(server))
        .unwrap()
        .unwrap();
    app.state.google = Some(Arc::new(google));
    app
}

fn set_cookies(response: &axum::response::Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of `name` in the first `Set-Cookie` header that sets it.
fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    cookies.iter().find_map(|cookie| {
        let pair = cookie.split(';').next()?;
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

async fn start_sign_in(app: &TestApp, query: &str) -> String {
    let response = app.send(get(&format!("/api/auth/google{query}"))).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    let state = cookie_value(&set_cookies(&response), OAUTH_STATE_COOKIE).unwrap();
    assert!(location.contains(&format!("state={state}")));
    assert!(location.contains("code_challenge="));
    state
}

fn callback(state_param: &str, cookie_state: &str) -> Request<Body> {
    Request::builder()
        .uri(format!(
            "/api/auth/google/callback?code=auth-code&state={state_param}"
        ))
        .header(header::COOKIE, format!("{OAUTH_STATE_COOKIE}={cookie_state}"))
        .body(Body::empty())
        .unwrap()
}

async fn mock_google(server: &MockServer, email: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "google-access-token",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "google-123",
            "email": email,
            "email_verified": true,
            "name": "Ada Lovelace"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_google_sign_in_round_trip() {
    let server = MockServer::start().await;
    mock_google(&server, "Ada@Example.com").await;
    let app = app_with_google(&server).await;

    let state = start_sign_in(&app, "").await;
    let response = app.send(callback(&state, &state)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://localhost:3000/onboarding"
    );

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert_eq!(cookie_value(&cookies, OAUTH_STATE_COOKIE).as_deref(), Some(""));
    let session_name = app.state.sealer.cookie_name().to_string();
    let session = cookie_value(&cookies, &session_name).unwrap();

    let response = app
        .send(authed("GET", "/api/auth/me", &format!("{session_name}={session}")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["user"]["email"], "ada@example.com");
    assert_eq!(body["data"]["user"]["role"], "user");
    assert!(body["data"]["profile_id"].is_null());

    // The state was consumed by the first callback
    let response = app.send(callback(&state, &state)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_in_returns_to_requested_path() {
    let server = MockServer::start().await;
    mock_google(&server, "ada@example.com").await;
    let app = app_with_google(&server).await;

    // Signing in once creates the user, who then gets a profile
    let state = start_sign_in(&app, "").await;
    app.send(callback(&state, &state)).await;
    let user = UserRepository::new(app.db())
        .find_by_google_id("google-123")
        .await
        .unwrap()
        .unwrap();
    create_profile(app.db(), user.id, "ada").await.unwrap();

    let state = start_sign_in(&app, "?redirect_to=/profiles/ada").await;

    let response = app.send(callback(&state, &state)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://localhost:3000/profiles/ada"
    );
}

#[tokio::test]
async fn test_callback_rejects_state_mismatch() {
    let server = MockServer::start().await;
    let app = app_with_google(&server).await;

    let state = start_sign_in(&app, "").await;
    let response = app.send(callback(&state, "someone-elses-state")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Invalid or expired OAuth state"
    );

    let response = app
        .send(get("/api/auth/google/callback?error=access_denied"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(get("/api/auth/google?redirect_to=//evil.example")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_google_unconfigured_is_503() {
    let app = TestApp::new().await.unwrap();

    let response = app.send(get("/api/auth/google")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_me_requires_valid_session() {
    let app = TestApp::new().await.unwrap();
    let user = create_user(app.db(), "ada@example.com").await.unwrap();

    let response = app.send(get("/api/auth/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mut cookie = app.cookie_for(&user);
    let middle = cookie.len() - 20;
    let flipped = if &cookie[middle..=middle] == "A" { "B" } else { "A" };
    cookie.replace_range(middle..=middle, flipped);
    let response = app.send(authed("GET", "/api/auth/me", &cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(authed("GET", "/api/auth/me", &app.cookie_for(&user)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new().await.unwrap();

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].contains("Max-Age=0"));
}

#[tokio::test]
async fn test_user_admin_and_self_service() {
    let app = TestApp::new().await.unwrap();
    let admin = create_user(app.db(), ADMIN_EMAIL).await.unwrap();
    let ada = create_user(app.db(), "ada@example.com").await.unwrap();
    let grace = create_user(app.db(), "grace@example.com").await.unwrap();
    assert_eq!(admin.role, "admin");

    let response = app
        .send(authed("GET", "/api/users", &app.cookie_for(&ada)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(authed("GET", "/api/users?search=grace", &app.cookie_for(&admin)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["id"], grace.id.to_string());

    let response = app
        .send(authed(
            "GET",
            &format!("/api/users/{}", grace.id),
            &app.cookie_for(&ada),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(authed_json(
            "PUT",
            &format!("/api/users/{}", ada.id),
            &app.cookie_for(&ada),
            json!({ "name": "Countess Lovelace" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["name"], "Countess Lovelace");

    let response = app
        .send(authed(
            "DELETE",
            &format!("/api/users/{}", ada.id),
            &app.cookie_for(&ada),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(&response).len(), 1);

    let response = app
        .send(authed(
            "GET",
            &format!("/api/users/{}", ada.id),
            &app.cookie_for(&admin),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
