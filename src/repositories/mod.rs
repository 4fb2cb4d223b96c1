//! # Repository Layer
//!
//! Repositories encapsulate SeaORM operations per entity. They are generic over
//! [`sea_orm::ConnectionTrait`] so the same methods run against the pool or
//! inside a transaction.

pub mod ai_review;
pub mod oauth_state;
pub mod profile;
pub mod repo;
pub mod star;
pub mod user;
pub mod vouch;

pub use ai_review::AiReviewRepository;
pub use oauth_state::OAuthStateRepository;
pub use profile::{NewProfile, ProfileChanges, ProfileFilter, ProfileRepository};
pub use repo::{RepoFilter, RepoRepository, RepoSnapshot};
pub use star::StarRepository;
pub use user::{GoogleIdentity, UserChanges, UserRepository};
pub use vouch::VouchRepository;

/// One-based page request, already validated by the handler layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: u64, limit: u64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    /// Zero-based page index as expected by SeaORM paginators.
    pub fn index(&self) -> u64 {
        self.page - 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

/// A page of rows plus the total row count across all pages.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `LIKE`.
pub(crate) fn like_pattern(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 2);
    escaped.push('%');
    for c in raw.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
