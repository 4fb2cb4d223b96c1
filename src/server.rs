//! # Server Configuration
//!
//! Application state, the Axum router and the OpenAPI document for the
//! Devfolio API.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::SessionSealer;
use crate::clients::{
    CloudinaryClient, GitHubApi, GitHubClient, GoogleOAuthClient, ImageStore, OpenAiClient,
    ReviewGenerator, build_http_client,
};
use crate::config::AppConfig;
use crate::error::{ApiError, not_found};
use crate::handlers;
use crate::telemetry::trace_id_middleware;

const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(30);

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseConnection,
    pub github: Arc<dyn GitHubApi>,
    /// `None` when no OpenAI key is configured
    pub reviewer: Option<Arc<dyn ReviewGenerator>>,
    /// `None` when Cloudinary is not configured
    pub images: Option<Arc<dyn ImageStore>>,
    /// `None` when Google credentials are not configured
    pub google: Option<Arc<GoogleOAuthClient>>,
    pub sealer: Arc<SessionSealer>,
    /// Key for hashing star IPs
    pub star_salt: Arc<[u8]>,
}

impl AppState {
    /// Builds the outbound clients described by `config`.
    pub fn from_config(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<Self> {
        let http = build_http_client(OUTBOUND_TIMEOUT).context("Failed to build HTTP client")?;

        let sealer = SessionSealer::from_config(&config.session)
            .context("DEVFOLIO_SESSION_KEY must decode to 32 bytes")?;
        let google = GoogleOAuthClient::from_config(http.clone(), &config.google)
            .context("Invalid Google OAuth URL")?
            .map(Arc::new);
        let reviewer = OpenAiClient::from_config(http.clone(), &config.openai)
            .map(|client| Arc::new(client) as Arc<dyn ReviewGenerator>);
        let images = CloudinaryClient::from_config(http.clone(), &config.cloudinary)
            .map(|client| Arc::new(client) as Arc<dyn ImageStore>);
        let github: Arc<dyn GitHubApi> = Arc::new(GitHubClient::new(http, &config.github));

        if google.is_none() {
            warn!("Google OAuth is not configured; sign-in is disabled");
        }
        if reviewer.is_none() {
            info!("OpenAI is not configured; AI reviews are disabled");
        }
        if images.is_none() {
            info!("Cloudinary is not configured; avatar uploads are disabled");
        }

        Ok(Self {
            star_salt: config.star_salt_bytes().into(),
            config: Arc::new(config),
            db,
            github,
            reviewer,
            images,
            google,
            sealer: Arc::new(sealer),
        })
    }
}

async fn route_not_found() -> ApiError {
    not_found("Route not found")
}

fn cors_layer(app_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true);

    let origin = url::Url::parse(app_url)
        .ok()
        .map(|url| url.origin().ascii_serialization())
        .and_then(|origin| HeaderValue::from_str(&origin).ok());

    match origin {
        Some(origin) => layer.allow_origin(origin),
        None => layer,
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.upload_max_bytes);
    let cors = cors_layer(&state.config.app_url);

    let api = Router::new()
        .route("/auth/google", get(handlers::auth::google_login))
        .route("/auth/google/callback", get(handlers::auth::google_callback))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route("/users", get(handlers::users::list_users))
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/profiles",
            get(handlers::profiles::list_profiles).post(handlers::profiles::create_profile),
        )
        .route(
            "/profiles/by-username/{username}",
            get(handlers::profiles::get_profile_by_username),
        )
        .route(
            "/profiles/{id}",
            get(handlers::profiles::get_profile)
                .put(handlers::profiles::update_profile)
                .delete(handlers::profiles::delete_profile),
        )
        .route("/profiles/{id}/sync", post(handlers::repos::sync_profile))
        .route("/profiles/{id}/repos", get(handlers::repos::list_profile_repos))
        .route(
            "/profiles/{id}/vouches",
            get(handlers::vouches::list_vouches)
                .post(handlers::vouches::create_vouch)
                .delete(handlers::vouches::delete_vouch),
        )
        .route(
            "/profiles/{id}/stars",
            get(handlers::stars::star_status)
                .post(handlers::stars::star_profile)
                .delete(handlers::stars::unstar_profile),
        )
        .route(
            "/profiles/{id}/review",
            get(handlers::reviews::get_review).post(handlers::reviews::generate_review),
        )
        .route("/repos", get(handlers::repos::list_repos))
        .route("/vouches/quota", get(handlers::vouches::vouch_quota))
        .route(
            "/uploads/avatar",
            post(handlers::uploads::upload_avatar)
                .delete(handlers::uploads::remove_avatar)
                .layer(upload_limit),
        )
        .route(
            "/onboarding",
            get(handlers::onboarding::onboarding_status)
                .post(handlers::onboarding::complete_onboarding),
        );

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .nest("/api", api)
        .fallback(route_not_found)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(trace_id_middleware))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Starts the server with the given configuration
pub async fn run_server(config: AppConfig, db: DatabaseConnection) -> anyhow::Result<()> {
    let addr = config
        .bind_addr()
        .with_context(|| format!("Invalid server address: {}", config.api_bind_addr))?;
    let profile = config.profile.clone();

    let app = create_app(AppState::from_config(config, db)?);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, %profile, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::auth::google_login,
        crate::handlers::auth::google_callback,
        crate::handlers::auth::logout,
        crate::handlers::auth::me,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::profiles::list_profiles,
        crate::handlers::profiles::create_profile,
        crate::handlers::profiles::get_profile,
        crate::handlers::profiles::get_profile_by_username,
        crate::handlers::profiles::update_profile,
        crate::handlers::profiles::delete_profile,
        crate::handlers::repos::sync_profile,
        crate::handlers::repos::list_profile_repos,
        crate::handlers::repos::list_repos,
        crate::handlers::vouches::create_vouch,
        crate::handlers::vouches::delete_vouch,
        crate::handlers::vouches::list_vouches,
        crate::handlers::vouches::vouch_quota,
        crate::handlers::stars::star_status,
        crate::handlers::stars::star_profile,
        crate::handlers::stars::unstar_profile,
        crate::handlers::reviews::get_review,
        crate::handlers::reviews::generate_review,
        crate::handlers::uploads::upload_avatar,
        crate::handlers::uploads::remove_avatar,
        crate::handlers::onboarding::onboarding_status,
        crate::handlers::onboarding::complete_onboarding,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::handlers::HealthStatus,
            crate::error::ErrorEnvelope,
            crate::handlers::types::PaginationMeta,
            crate::handlers::auth::MeResponse,
            crate::handlers::users::UserResponse,
            crate::handlers::users::UpdateUserRequest,
            crate::services::CreateProfileRequest,
            crate::services::UpdateProfileRequest,
            crate::services::ProfileDetails,
            crate::services::SyncSummary,
            crate::handlers::repos::RepoResponse,
            crate::handlers::vouches::VouchRequest,
            crate::handlers::vouches::VouchResponse,
            crate::handlers::vouches::VoucherSummary,
            crate::services::VouchQuota,
            crate::services::StarStatus,
            crate::handlers::reviews::ReviewResponse,
            crate::handlers::uploads::AvatarResponse,
            crate::services::OnboardingRequest,
            crate::services::OnboardingStatus,
            crate::services::OnboardingOutcome,
        )
    ),
    tags(
        (name = "root", description = "Service information and health"),
        (name = "auth", description = "Google sign-in and sessions"),
        (name = "users", description = "Accounts"),
        (name = "profiles", description = "Developer profiles"),
        (name = "repos", description = "Synced GitHub repositories"),
        (name = "vouches", description = "Peer endorsements"),
        (name = "stars", description = "Anonymous stars"),
        (name = "reviews", description = "AI-generated portfolio reviews"),
        (name = "uploads", description = "Avatar uploads"),
        (name = "onboarding", description = "First-run wizard"),
    ),
    info(
        title = "Devfolio API",
        description = "Developer portfolios, peer vouches and GitHub sync",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
