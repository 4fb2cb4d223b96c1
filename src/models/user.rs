//! User entity model
//!
//! A user is the authenticated identity behind a Google account.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role granted to regular users.
pub const ROLE_USER: &str = "user";
/// Role granted to administrators.
pub const ROLE_ADMIN: &str = "admin";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// OAuth subject from Google (unique)
    #[sea_orm(unique)]
    pub google_id: String,

    #[sea_orm(unique)]
    pub email: String,

    pub name: String,

    pub avatar_url: Option<String>,

    /// `user` or `admin`
    pub role: String,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::profile::Entity")]
    Profile,
    #[sea_orm(has_many = "super::vouch::Entity")]
    Vouches,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::vouch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vouches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
