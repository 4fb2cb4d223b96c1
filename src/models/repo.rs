//! Repo entity model
//!
//! Mirror of a public GitHub repository owned by a profile's GitHub account.
//! Rows are replaced wholesale on every sync.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repos")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub profile_id: Uuid,

    /// GitHub's numeric repository id
    pub github_id: i64,

    pub name: String,

    /// `owner/name`
    pub full_name: String,

    pub description: Option<String>,

    pub html_url: String,

    pub primary_language: Option<String>,

    /// Language name → bytes of code
    pub languages: Json,

    pub stars: i32,

    pub forks: i32,

    pub pushed_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::ProfileId",
        to = "super::profile::Column::Id",
        on_delete = "Cascade"
    )]
    Profile,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
