//! # OAuth State Model
//!
//! Short-lived CSRF state for the Google sign-in round trip. Rows are consumed
//! exactly once by the callback.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "oauth_states")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Opaque state token echoed back by Google
    #[sea_orm(unique)]
    pub state: String,

    /// PKCE code verifier paired with the challenge sent to Google
    pub code_verifier: String,

    /// Relative path to return to after sign-in
    pub redirect_to: Option<String>,

    pub expires_at: DateTimeWithTimeZone,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_expired(&self, now: DateTimeWithTimeZone) -> bool {
        self.expires_at <= now
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
