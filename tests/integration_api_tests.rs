//! GitHub sync, AI reviews, avatar uploads and onboarding against in-process fakes.

mod test_utils;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::json;
use test_utils::{
    TestApp, authed, authed_json, body_json, create_profile, create_user, get, github_repo,
    github_user,
};

async fn profile_with_github(app: &TestApp, email: &str, login: &str) -> (String, uuid::Uuid) {
    let user = create_user(app.db(), email).await.unwrap();
    let profile = create_profile(app.db(), user.id, login).await.unwrap();
    let cookie = app.cookie_for(&user);

    let response = app
        .send(authed_json(
            "PUT",
            &format!("/api/profiles/{}", profile.id),
            &cookie,
            json!({ "github_username": login }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    (cookie, profile.id)
}

fn image_upload(cookie: &str, content_type: &str, bytes: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/uploads/avatar")
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .unwrap()
}

#[tokio::test]
async fn test_sync_replaces_repos() {
    let app = TestApp::new().await.unwrap();
    app.github.add_user(github_user("octo"));
    app.github.set_repos(vec![
        github_repo("octo", 1, "alpha", 5, Some("Rust")),
        github_repo("octo", 2, "beta", 50, Some("Go")),
    ]);
    let (cookie, profile_id) = profile_with_github(&app, "octo@example.com", "octo").await;
    let sync_uri = format!("/api/profiles/{profile_id}/sync");

    let response = app.send(authed("POST", &sync_uri, &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["repo_count"], 2);
    assert_eq!(body["data"]["github_username"], "octo");

    app.github
        .set_repos(vec![github_repo("octo", 3, "gamma", 1, Some("Rust"))]);
    let response = app.send(authed("POST", &sync_uri, &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(get(&format!("/api/profiles/{profile_id}/repos")))
        .await;
    let body = body_json(response).await;
    let repos = body["data"].as_array().unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0]["full_name"], "octo/gamma");
    assert_eq!(repos[0]["languages"], json!({ "Rust": 1000 }));

    let response = app
        .send(get(&format!("/api/profiles/{profile_id}")))
        .await;
    assert!(body_json(response).await["data"]["last_synced_at"].is_string());
}

#[tokio::test]
async fn test_repo_directory_filters_by_language() {
    let app = TestApp::new().await.unwrap();
    app.github.add_user(github_user("octo"));
    app.github.set_repos(vec![
        github_repo("octo", 1, "alpha", 5, Some("Rust")),
        github_repo("octo", 2, "beta", 50, Some("Go")),
        github_repo("octo", 3, "gamma", 10, Some("rust")),
    ]);
    let (cookie, profile_id) = profile_with_github(&app, "octo@example.com", "octo").await;
    app.send(authed("POST", &format!("/api/profiles/{profile_id}/sync"), &cookie))
        .await;

    let response = app.send(get("/api/repos?language=RUST")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 2);
    assert_eq!(body["data"][0]["name"], "gamma");
    assert_eq!(body["data"][1]["name"], "alpha");
}

#[tokio::test]
async fn test_sync_errors() {
    let app = TestApp::new().await.unwrap();
    let owner = create_user(app.db(), "owner@example.com").await.unwrap();
    let stranger = create_user(app.db(), "stranger@example.com").await.unwrap();
    let profile = create_profile(app.db(), owner.id, "owner").await.unwrap();
    let sync_uri = format!("/api/profiles/{}/sync", profile.id);

    let response = app
        .send(authed("POST", &sync_uri, &app.cookie_for(&owner)))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(authed("POST", &sync_uri, &app.cookie_for(&stranger)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let (cookie, profile_id) = profile_with_github(&app, "octo@example.com", "octo").await;
    *app.github.fail_repos.lock().unwrap() = true;
    let response = app
        .send(authed(
            "POST",
            &format!("/api/profiles/{profile_id}/sync"),
            &cookie,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["error"], "PROVIDER_ERROR");
}

#[tokio::test]
async fn test_generate_and_read_review() {
    let app = TestApp::new().await.unwrap();
    let owner = create_user(app.db(), "owner@example.com").await.unwrap();
    let profile = create_profile(app.db(), owner.id, "owner").await.unwrap();
    let uri = format!("/api/profiles/{}/review", profile.id);

    let response = app.send(get(&uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(authed("POST", &uri, &app.cookie_for(&owner)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["model"], "fake-model");

    let prompts = app.reviewer.prompts.lock().unwrap().clone();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("@owner"));

    let response = app.send(get(&uri)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["data"]["content"].as_str().unwrap().contains("Rust"));
}

#[tokio::test]
async fn test_review_unavailable_without_generator() {
    let mut app = TestApp::new().await.unwrap();
    app.state.reviewer = None;
    let owner = create_user(app.db(), "owner@example.com").await.unwrap();
    let profile = create_profile(app.db(), owner.id, "owner").await.unwrap();

    let response = app
        .send(authed(
            "POST",
            &format!("/api/profiles/{}/review", profile.id),
            &app.cookie_for(&owner),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_avatar_upload_and_removal() {
    let app = TestApp::new().await.unwrap();
    let owner = create_user(app.db(), "owner@example.com").await.unwrap();
    let profile = create_profile(app.db(), owner.id, "owner").await.unwrap();
    let cookie = app.cookie_for(&owner);

    let response = app
        .send(image_upload(&cookie, "image/png", vec![0x89, b'P', b'N', b'G']))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let expected = format!("https://images.example.com/devfolio/avatars/{}.png", profile.id);
    assert_eq!(body["data"]["avatar_url"], expected);

    let response = app
        .send(authed("DELETE", "/api/uploads/avatar", &cookie))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["data"]["avatar_url"].is_null());
    assert_eq!(
        app.images.destroyed.lock().unwrap().as_slice(),
        [format!("devfolio/avatars/{}", profile.id)]
    );
}

#[tokio::test]
async fn test_avatar_upload_rejections() {
    let app = TestApp::new().await.unwrap();
    let owner = create_user(app.db(), "owner@example.com").await.unwrap();
    let cookie = app.cookie_for(&owner);

    // No profile yet
    let response = app
        .send(image_upload(&cookie, "image/png", vec![1, 2, 3]))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    create_profile(app.db(), owner.id, "owner").await.unwrap();

    let response = app
        .send(image_upload(&cookie, "text/plain", vec![1, 2, 3]))
        .await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let response = app.send(image_upload(&cookie, "image/png", Vec::new())).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The test configuration caps uploads at 1 KiB
    let response = app
        .send(image_upload(&cookie, "image/png", vec![0u8; 4096]))
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_json(response).await;
    assert_eq!(body["error"], "PAYLOAD_TOO_LARGE");
    assert_eq!(body["details"]["max_bytes"], 1024);

    assert!(app.images.uploaded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_onboarding_prefills_from_github_and_syncs() {
    let app = TestApp::new().await.unwrap();
    app.github.add_user(github_user("ada"));
    app.github
        .set_repos(vec![github_repo("ada", 1, "engine", 42, Some("Rust"))]);
    let user = create_user(app.db(), "ada@example.com").await.unwrap();
    let cookie = app.cookie_for(&user);

    let response = app.send(authed("GET", "/api/onboarding", &cookie)).await;
    let body = body_json(response).await;
    assert_eq!(body["data"]["next_step"], "profile");

    let response = app
        .send(authed_json(
            "POST",
            "/api/onboarding",
            &cookie,
            json!({ "username": "ada", "skills": ["Rust"], "github_username": "ada" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let data = &body["data"];
    assert_eq!(data["profile"]["display_name"], "Ada Lovelace");
    assert_eq!(data["profile"]["bio"], "First programmer");
    assert_eq!(data["profile"]["location"], "London");
    assert_eq!(data["sync"]["repo_count"], 1);
    assert!(data["sync_error"].is_null());
    assert_eq!(data["status"]["complete"], true);
    assert_eq!(data["status"]["next_step"], "done");

    // Running the wizard again updates the same profile
    let response = app
        .send(authed_json(
            "POST",
            "/api/onboarding",
            &cookie,
            json!({ "username": "ada", "display_name": "Countess" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["profile"]["display_name"], "Countess");
    assert_eq!(body["data"]["status"]["next_step"], "github");

    let response = app.send(get("/api/profiles?limit=100")).await;
    assert_eq!(body_json(response).await["pagination"]["total"], 1);
}

#[tokio::test]
async fn test_onboarding_unknown_github_user() {
    let app = TestApp::new().await.unwrap();
    let user = create_user(app.db(), "ada@example.com").await.unwrap();

    let response = app
        .send(authed_json(
            "POST",
            "/api/onboarding",
            &app.cookie_for(&user),
            json!({ "username": "ada", "github_username": "ghost" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(authed("GET", "/api/onboarding", &app.cookie_for(&user)))
        .await;
    assert_eq!(body_json(response).await["data"]["has_profile"], false);
}

#[tokio::test]
async fn test_onboarding_rerun_keeps_bio_when_nothing_to_prefill() {
    let app = TestApp::new().await.unwrap();
    let mut quiet = github_user("quiet");
    quiet.bio = None;
    app.github.add_user(quiet);
    let user = create_user(app.db(), "quiet@example.com").await.unwrap();
    let cookie = app.cookie_for(&user);

    let response = app
        .send(authed_json(
            "POST",
            "/api/onboarding",
            &cookie,
            json!({ "username": "quiet", "bio": "Writes compilers" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(authed_json(
            "POST",
            "/api/onboarding",
            &cookie,
            json!({ "username": "quiet", "bio": "  ", "github_username": "quiet" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["profile"]["bio"], "Writes compilers");
    assert_eq!(body["data"]["profile"]["display_name"], "Ada Lovelace");
    assert_eq!(body["data"]["profile"]["github_username"], "quiet");
}
