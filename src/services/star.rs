//! Anonymous profile stars, one per hashed client IP.

use metrics::counter;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::crypto::hash_ip;
use crate::error::ApiError;
use crate::repositories::{ProfileRepository, StarRepository};

/// Star count plus whether the caller's IP has starred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StarStatus {
    pub count: u64,
    pub starred: bool,
}

pub struct StarService<'a> {
    db: &'a DatabaseConnection,
    salt: &'a [u8],
}

impl<'a> StarService<'a> {
    pub fn new(db: &'a DatabaseConnection, salt: &'a [u8]) -> Self {
        Self { db, salt }
    }

    pub async fn status(&self, profile_id: Uuid, ip: &str) -> Result<StarStatus, ApiError> {
        ProfileRepository::new(self.db).get(profile_id).await?;
        self.current(profile_id, &hash_ip(self.salt, ip)).await
    }

    /// Stars the profile; repeating from the same IP is a no-op.
    pub async fn star(&self, profile_id: Uuid, ip: &str) -> Result<StarStatus, ApiError> {
        ProfileRepository::new(self.db).get(profile_id).await?;
        let ip_hash = hash_ip(self.salt, ip);

        if StarRepository::new(self.db).add(profile_id, &ip_hash).await? {
            counter!("stars_total", "action" => "add").increment(1);
            debug!(%profile_id, "Profile starred");
        }
        self.current(profile_id, &ip_hash).await
    }

    /// Removes the caller's star if present.
    pub async fn unstar(&self, profile_id: Uuid, ip: &str) -> Result<StarStatus, ApiError> {
        ProfileRepository::new(self.db).get(profile_id).await?;
        let ip_hash = hash_ip(self.salt, ip);

        if StarRepository::new(self.db).remove(profile_id, &ip_hash).await? {
            counter!("stars_total", "action" => "remove").increment(1);
            debug!(%profile_id, "Profile unstarred");
        }
        self.current(profile_id, &ip_hash).await
    }

    async fn current(&self, profile_id: Uuid, ip_hash: &str) -> Result<StarStatus, ApiError> {
        let stars = StarRepository::new(self.db);
        Ok(StarStatus {
            count: stars.count_for_profile(profile_id).await?,
            starred: stars.exists(profile_id, ip_hash).await?,
        })
    }
}
