//! Database migrations for the Devfolio API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_01_01_000001_create_users;
mod m2026_01_01_000002_create_profiles;
mod m2026_01_01_000003_create_profile_skills;
mod m2026_01_01_000004_create_repos;
mod m2026_01_01_000005_create_vouches;
mod m2026_01_01_000006_create_vouch_actions;
mod m2026_01_01_000007_create_stars;
mod m2026_01_01_000008_create_ai_reviews;
mod m2026_01_01_000009_create_oauth_states;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_01_01_000001_create_users::Migration),
            Box::new(m2026_01_01_000002_create_profiles::Migration),
            Box::new(m2026_01_01_000003_create_profile_skills::Migration),
            Box::new(m2026_01_01_000004_create_repos::Migration),
            Box::new(m2026_01_01_000005_create_vouches::Migration),
            Box::new(m2026_01_01_000006_create_vouch_actions::Migration),
            Box::new(m2026_01_01_000007_create_stars::Migration),
            Box::new(m2026_01_01_000008_create_ai_reviews::Migration),
            Box::new(m2026_01_01_000009_create_oauth_states::Migration),
        ]
    }
}
