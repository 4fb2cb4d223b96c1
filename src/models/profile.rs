//! Profile entity model
//!
//! A profile is the public portfolio page owned by exactly one user. Skills
//! live in the `profile_skills` child table.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user (unique, one profile per user)
    #[sea_orm(unique)]
    pub user_id: Uuid,

    /// Lowercase public handle (unique)
    #[sea_orm(unique)]
    pub username: String,

    pub display_name: String,

    pub bio: String,

    pub github_username: Option<String>,

    pub avatar_url: Option<String>,

    pub location: Option<String>,

    pub website: Option<String>,

    /// Last successful GitHub sync
    pub last_synced_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::profile_skill::Entity")]
    Skills,
    #[sea_orm(has_many = "super::repo::Entity")]
    Repos,
    #[sea_orm(has_many = "super::vouch::Entity")]
    Vouches,
    #[sea_orm(has_many = "super::star::Entity")]
    Stars,
    #[sea_orm(has_one = "super::ai_review::Entity")]
    Review,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::profile_skill::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Skills.def()
    }
}

impl Related<super::repo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repos.def()
    }
}

impl Related<super::vouch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vouches.def()
    }
}

impl Related<super::star::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stars.def()
    }
}

impl Related<super::ai_review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Review.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
