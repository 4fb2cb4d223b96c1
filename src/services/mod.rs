//! # Services
//!
//! Business operations that span several repositories or call third-party
//! APIs. Services borrow the connection and clients from `AppState` for the
//! duration of one request.

pub mod onboarding;
pub mod profile;
pub mod review;
pub mod star;
pub mod sync;
pub mod upload;
pub mod vouch;

pub use onboarding::{OnboardingOutcome, OnboardingRequest, OnboardingService, OnboardingStatus};
pub use profile::{
    CreateProfileRequest, ProfileDetails, ProfileService, UpdateProfileRequest, ensure_can_edit,
};
pub use review::ReviewService;
pub use star::{StarService, StarStatus};
pub use sync::{SyncService, SyncSummary};
pub use upload::UploadService;
pub use vouch::{VouchError, VouchQuota, VouchService};
