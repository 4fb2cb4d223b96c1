//! # Data Models
//!
//! SeaORM entities backing the Devfolio API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod ai_review;
pub mod oauth_state;
pub mod profile;
pub mod profile_skill;
pub mod repo;
pub mod star;
pub mod user;
pub mod vouch;
pub mod vouch_action;

pub use ai_review::Entity as AiReview;
pub use oauth_state::Entity as OAuthState;
pub use profile::Entity as Profile;
pub use profile_skill::Entity as ProfileSkill;
pub use repo::Entity as Repo;
pub use star::Entity as Star;
pub use user::Entity as User;
pub use vouch::Entity as Vouch;
pub use vouch_action::Entity as VouchAction;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "devfolio".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
