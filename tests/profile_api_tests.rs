//! Profile endpoints driven through the full router.

mod test_utils;

use axum::http::StatusCode;
use serde_json::json;
use test_utils::{TestApp, authed, authed_json, body_json, create_user, get, json_request};

#[tokio::test]
async fn test_create_profile_returns_envelope() {
    let app = TestApp::new().await.unwrap();
    let user = create_user(app.db(), "ada@example.com").await.unwrap();
    let cookie = app.cookie_for(&user);

    let response = app
        .send(authed_json(
            "POST",
            "/api/profiles",
            &cookie,
            json!({
                "username": "Ada-Lovelace",
                "display_name": "Ada Lovelace",
                "bio": "Analytical engines",
                "skills": ["Rust", "rust", " Math "],
                "github_username": "ada"
            }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Profile created");
    assert!(body["timestamp"].is_string());
    assert_eq!(body["data"]["username"], "ada-lovelace");
    assert_eq!(body["data"]["user_id"], user.id.to_string());
    assert_eq!(body["data"]["vouch_count"], 0);
    assert_eq!(body["data"]["skills"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_profile_requires_session() {
    let app = TestApp::new().await.unwrap();

    let response = app
        .send(json_request(
            "POST",
            "/api/profiles",
            json!({ "username": "ada", "display_name": "Ada" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_create_profile_validation_and_conflicts() {
    let app = TestApp::new().await.unwrap();
    let ada = create_user(app.db(), "ada@example.com").await.unwrap();
    let grace = create_user(app.db(), "grace@example.com").await.unwrap();
    let ada_cookie = app.cookie_for(&ada);
    let grace_cookie = app.cookie_for(&grace);

    let response = app
        .send(authed_json(
            "POST",
            "/api/profiles",
            &ada_cookie,
            json!({ "username": "a!", "display_name": "Ada" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "VALIDATION_FAILED");
    assert!(body["details"]["username"].is_string());

    let response = app
        .send(authed_json(
            "POST",
            "/api/profiles",
            &ada_cookie,
            json!({ "username": "ada", "display_name": "Ada" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // Same user again
    let response = app
        .send(authed_json(
            "POST",
            "/api/profiles",
            &ada_cookie,
            json!({ "username": "ada-two", "display_name": "Ada" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Username differs only by case
    let response = app
        .send(authed_json(
            "POST",
            "/api/profiles",
            &grace_cookie,
            json!({ "username": "ADA", "display_name": "Grace" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "CONFLICT");
    assert_eq!(body["message"], "Username is already taken");
}

#[tokio::test]
async fn test_get_missing_profile_is_404_envelope() {
    let app = TestApp::new().await.unwrap();

    let response = app
        .send(get(&format!("/api/profiles/{}", uuid::Uuid::new_v4())))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Profile not found");

    let response = app.send(get("/api/profiles/not-a-uuid")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(get("/api/profiles/by-username/nobody")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_profiles_paginates_and_filters() {
    let app = TestApp::new().await.unwrap();
    for (i, skill) in ["Rust", "Go", "Rust"].iter().enumerate() {
        let user = create_user(app.db(), &format!("dev{i}@example.com"))
            .await
            .unwrap();
        let response = app
            .send(authed_json(
                "POST",
                "/api/profiles",
                &app.cookie_for(&user),
                json!({
                    "username": format!("dev{i}"),
                    "display_name": format!("Dev {i}"),
                    "skills": [skill]
                }),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.send(get("/api/profiles?page=1&limit=2")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["pagination"],
        json!({
            "page": 1,
            "limit": 2,
            "total": 3,
            "total_pages": 2,
            "has_next": true,
            "has_prev": false
        })
    );

    let response = app.send(get("/api/profiles?skill=rust")).await;
    let body = body_json(response).await;
    assert_eq!(body["pagination"]["total"], 2);

    let response = app.send(get("/api/profiles?limit=0")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(get("/api/profiles/by-username/DEV1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["username"], "dev1");
}

#[tokio::test]
async fn test_update_and_delete_require_owner() {
    let app = TestApp::new().await.unwrap();
    let owner = create_user(app.db(), "owner@example.com").await.unwrap();
    let other = create_user(app.db(), "other@example.com").await.unwrap();
    let admin = create_user(app.db(), test_utils::ADMIN_EMAIL).await.unwrap();
    let profile = test_utils::create_profile(app.db(), owner.id, "owner")
        .await
        .unwrap();
    let uri = format!("/api/profiles/{}", profile.id);

    let response = app
        .send(authed_json(
            "PUT",
            &uri,
            &app.cookie_for(&other),
            json!({ "bio": "hijacked" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(authed_json(
            "PUT",
            &uri,
            &app.cookie_for(&owner),
            json!({ "bio": "Updated bio", "location": "Paris", "skills": ["SQL"] }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["bio"], "Updated bio");
    assert_eq!(body["data"]["location"], "Paris");
    assert_eq!(body["data"]["skills"], json!(["SQL"]));

    let response = app
        .send(authed_json(
            "PUT",
            &uri,
            &app.cookie_for(&owner),
            json!({ "location": null }),
        ))
        .await;
    let body = body_json(response).await;
    assert!(body["data"]["location"].is_null());
    assert_eq!(body["data"]["bio"], "Updated bio");

    let response = app
        .send(authed("DELETE", &uri, &app.cookie_for(&other)))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(authed("DELETE", &uri, &app.cookie_for(&admin)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.send(get(&uri)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_uses_envelope() {
    let app = TestApp::new().await.unwrap();

    let response = app.send(get("/api/nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "NOT_FOUND");
}
