//! Test utilities shared by the integration tests.
//!
//! Provides an in-memory SQLite database with migrations applied, an
//! `AppState` wired to in-process fakes for GitHub, OpenAI and Cloudinary, and
//! helpers for driving the router with `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use devfolio::{
    auth::SessionSealer,
    clients::{
        GitHubApi, GitHubRepo, GitHubUser, ImageStore, ReviewGenerator, UpstreamError,
        UploadedImage,
    },
    config::{AppConfig, SessionConfig},
    models::{profile, user},
    repositories::{GoogleIdentity, NewProfile, ProfileRepository, UserRepository},
    server::{AppState, create_app},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use tower::ServiceExt;
use uuid::Uuid;

pub const SESSION_KEY: [u8; 32] = [7u8; 32];
pub const ADMIN_EMAIL: &str = "admin@example.com";

/// Sets up an in-memory SQLite database with all migrations applied.
///
/// The pool holds a single connection so every query sees the same database.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = ON".to_string(),
    ))
    .await?;

    Migrator::up(&db, None).await?;
    Ok(db)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        app_url: "http://localhost:3000".to_string(),
        session: SessionConfig {
            key: Some(SESSION_KEY.to_vec()),
            ..Default::default()
        },
        star_salt: Some("test-star-salt".to_string()),
        admin_emails: vec![ADMIN_EMAIL.to_string()],
        upload_max_bytes: 1024,
        ..Default::default()
    }
}

/// In-process GitHub with a configurable user and repository list.
#[derive(Default)]
pub struct FakeGitHub {
    pub users: Mutex<BTreeMap<String, GitHubUser>>,
    pub repos: Mutex<Vec<GitHubRepo>>,
    pub fail_repos: Mutex<bool>,
}

impl FakeGitHub {
    pub fn with_user(login: &str) -> Self {
        let fake = Self::default();
        fake.add_user(github_user(login));
        fake
    }

    pub fn add_user(&self, user: GitHubUser) {
        self.users
            .lock()
            .unwrap()
            .insert(user.login.to_lowercase(), user);
    }

    pub fn set_repos(&self, repos: Vec<GitHubRepo>) {
        *self.repos.lock().unwrap() = repos;
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn get_user(&self, login: &str) -> Result<GitHubUser, UpstreamError> {
        self.users
            .lock()
            .unwrap()
            .get(&login.to_lowercase())
            .cloned()
            .ok_or_else(|| UpstreamError::NotFound {
                provider: "github",
                what: "GitHub user not found".to_string(),
            })
    }

    async fn list_repos(&self, login: &str, limit: u32) -> Result<Vec<GitHubRepo>, UpstreamError> {
        if *self.fail_repos.lock().unwrap() {
            return Err(UpstreamError::Status {
                provider: "github",
                status: 500,
                body: "boom".to_string(),
            });
        }
        self.get_user(login).await?;
        Ok(self
            .repos
            .lock()
            .unwrap()
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn repo_languages(&self, full_name: &str) -> Result<BTreeMap<String, u64>, UpstreamError> {
        let repos = self.repos.lock().unwrap();
        let repo = repos.iter().find(|r| r.full_name == full_name);
        Ok(repo
            .and_then(|r| r.language.clone())
            .map(|language| BTreeMap::from([(language, 1000)]))
            .unwrap_or_default())
    }
}

pub fn github_user(login: &str) -> GitHubUser {
    GitHubUser {
        login: login.to_string(),
        name: Some("Ada Lovelace".to_string()),
        bio: Some("First programmer".to_string()),
        avatar_url: Some(format!("https://avatars.example.com/{login}.png")),
        blog: None,
        location: Some("London".to_string()),
        html_url: format!("https://github.com/{login}"),
    }
}

pub fn github_repo(owner: &str, id: i64, name: &str, stars: i64, language: Option<&str>) -> GitHubRepo {
    GitHubRepo {
        id,
        name: name.to_string(),
        full_name: format!("{owner}/{name}"),
        description: Some(format!("{name} description")),
        html_url: format!("https://github.com/{owner}/{name}"),
        language: language.map(str::to_string),
        stargazers_count: stars,
        forks_count: 0,
        fork: false,
        archived: false,
        pushed_at: None,
    }
}

/// Review generator returning a fixed text and recording prompts.
#[derive(Default)]
pub struct FakeReviewer {
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ReviewGenerator for FakeReviewer {
    fn model(&self) -> &str {
        "fake-model"
    }

    async fn generate(&self, _system: &str, prompt: &str) -> Result<String, UpstreamError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok("A thoughtful engineer with a strong Rust portfolio.".to_string())
    }
}

/// Image store keeping uploads in memory.
#[derive(Default)]
pub struct FakeImages {
    pub uploaded: Mutex<Vec<(String, String)>>,
    pub destroyed: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageStore for FakeImages {
    async fn upload(
        &self,
        _bytes: &[u8],
        content_type: &str,
        folder: &str,
        public_id: &str,
    ) -> Result<UploadedImage, UpstreamError> {
        let full_id = format!("{folder}/{public_id}");
        self.uploaded
            .lock()
            .unwrap()
            .push((full_id.clone(), content_type.to_string()));
        Ok(UploadedImage {
            secure_url: format!("https://images.example.com/{full_id}.png"),
            public_id: full_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), UpstreamError> {
        self.destroyed.lock().unwrap().push(public_id.to_string());
        Ok(())
    }
}

/// Everything a router test needs.
pub struct TestApp {
    pub state: AppState,
    pub github: Arc<FakeGitHub>,
    pub reviewer: Arc<FakeReviewer>,
    pub images: Arc<FakeImages>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Result<Self> {
        let db = setup_test_db().await?;
        let github = Arc::new(FakeGitHub::default());
        let reviewer = Arc::new(FakeReviewer::default());
        let images = Arc::new(FakeImages::default());

        let state = AppState {
            sealer: Arc::new(SessionSealer::from_config(&config.session)?),
            star_salt: config.star_salt_bytes().into(),
            config: Arc::new(config),
            db,
            github: github.clone(),
            reviewer: Some(reviewer.clone()),
            images: Some(images.clone()),
            google: None,
        };

        Ok(Self {
            state,
            github,
            reviewer,
            images,
        })
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub fn router(&self) -> Router {
        create_app(self.state.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.unwrap()
    }

    /// `Cookie` header value carrying a valid session for `user`.
    pub fn cookie_for(&self, user: &user::Model) -> String {
        let claims = self.state.sealer.issue(user);
        let sealed = self.state.sealer.seal(&claims).unwrap();
        format!("{}={}", self.state.sealer.cookie_name(), sealed)
    }
}

pub async fn create_user(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    let identity = GoogleIdentity {
        subject: format!("google-{email}"),
        email: email.to_string(),
        name: email.split('@').next().unwrap_or(email).to_string(),
        picture: None,
    };
    Ok(UserRepository::new(db)
        .upsert_from_google(&identity, email == ADMIN_EMAIL)
        .await?)
}

pub async fn create_profile(
    db: &DatabaseConnection,
    user_id: Uuid,
    username: &str,
) -> Result<profile::Model> {
    let profiles = ProfileRepository::new(db);
    let created = profiles
        .create(NewProfile {
            user_id,
            username: username.to_string(),
            display_name: username.to_string(),
            bio: String::new(),
            github_username: None,
            avatar_url: None,
            location: None,
            website: None,
        })
        .await?;
    Ok(created)
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authed_json(
    method: &str,
    uri: &str,
    cookie: &str,
    body: serde_json::Value,
) -> Request<Body> {
    let mut request = json_request(method, uri, body);
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    request
}

pub fn authed(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
