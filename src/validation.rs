//! Input validation for request payloads.
//!
//! Validators normalize where it makes sense (trimming, lowercasing) and return
//! the cleaned value, or a [`FieldError`] naming the offending field.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::error::{ApiError, validation_error};

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 39;
pub const DISPLAY_NAME_MAX_LEN: usize = 100;
pub const BIO_MAX_LEN: usize = 1000;
pub const MAX_SKILLS: usize = 30;
pub const SKILL_MAX_LEN: usize = 40;
pub const VOUCH_MESSAGE_MAX_LEN: usize = 280;
pub const LOCATION_MAX_LEN: usize = 100;
pub const URL_MAX_LEN: usize = 2048;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]*[a-z0-9])?$").expect("username pattern compiles")
});

static GITHUB_LOGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9]|-[A-Za-z0-9])*$").expect("login pattern compiles")
});

/// A single invalid field.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    /// Reports the same problem under another field name.
    pub fn renamed(self, field: &'static str) -> Self {
        Self { field, ..self }
    }
}

impl From<FieldError> for ApiError {
    fn from(error: FieldError) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert(error.field.to_string(), error.message.into());
        validation_error(
            &format!("Invalid {}", error.field),
            serde_json::Value::Object(fields),
        )
    }
}

/// Lowercases and checks a profile username.
pub fn normalize_username(raw: &str) -> Result<String, FieldError> {
    let username = raw.trim().to_lowercase();
    let len = username.chars().count();

    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(FieldError::new(
            "username",
            format!(
                "must be between {} and {} characters",
                USERNAME_MIN_LEN, USERNAME_MAX_LEN
            ),
        ));
    }

    if !USERNAME_RE.is_match(&username) {
        return Err(FieldError::new(
            "username",
            "may only contain letters, digits and inner hyphens",
        ));
    }

    Ok(username)
}

pub fn validate_display_name(raw: &str) -> Result<String, FieldError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(FieldError::new("display_name", "is required"));
    }
    if name.chars().count() > DISPLAY_NAME_MAX_LEN {
        return Err(FieldError::new(
            "display_name",
            format!("must be at most {} characters", DISPLAY_NAME_MAX_LEN),
        ));
    }
    Ok(name.to_string())
}

pub fn validate_bio(raw: &str) -> Result<String, FieldError> {
    let bio = raw.trim();
    if bio.chars().count() > BIO_MAX_LEN {
        return Err(FieldError::new(
            "bio",
            format!("must be at most {} characters", BIO_MAX_LEN),
        ));
    }
    Ok(bio.to_string())
}

/// Trims skills, drops blanks and case-insensitive duplicates, keeping first-seen order.
pub fn normalize_skills(raw: &[String]) -> Result<Vec<String>, FieldError> {
    let mut skills: Vec<String> = Vec::with_capacity(raw.len());

    for entry in raw {
        let skill = entry.trim();
        if skill.is_empty() {
            continue;
        }
        if skill.chars().count() > SKILL_MAX_LEN {
            return Err(FieldError::new(
                "skills",
                format!("each skill must be at most {} characters", SKILL_MAX_LEN),
            ));
        }
        let key = skill.to_lowercase();
        if skills.iter().any(|s| s.to_lowercase() == key) {
            continue;
        }
        skills.push(skill.to_string());
    }

    if skills.len() > MAX_SKILLS {
        return Err(FieldError::new(
            "skills",
            format!("must contain at most {} entries", MAX_SKILLS),
        ));
    }

    Ok(skills)
}

pub fn validate_github_username(raw: &str) -> Result<String, FieldError> {
    let login = raw.trim().trim_start_matches('@');
    if login.is_empty() || login.len() > USERNAME_MAX_LEN || !GITHUB_LOGIN_RE.is_match(login) {
        return Err(FieldError::new("github_username", "is not a valid GitHub login"));
    }
    Ok(login.to_string())
}

/// Accepts absolute http(s) URLs only.
pub fn validate_url(field: &'static str, raw: &str) -> Result<String, FieldError> {
    let value = raw.trim();
    if value.len() > URL_MAX_LEN {
        return Err(FieldError::new(
            field,
            format!("must be at most {} characters", URL_MAX_LEN),
        ));
    }

    let parsed =
        url::Url::parse(value).map_err(|_| FieldError::new(field, "must be a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(FieldError::new(field, "must be an http or https URL"));
    }

    Ok(parsed.to_string())
}

pub fn validate_location(raw: &str) -> Result<String, FieldError> {
    let location = raw.trim();
    if location.chars().count() > LOCATION_MAX_LEN {
        return Err(FieldError::new(
            "location",
            format!("must be at most {} characters", LOCATION_MAX_LEN),
        ));
    }
    Ok(location.to_string())
}

/// Blank messages collapse to `None`.
pub fn validate_vouch_message(raw: Option<&str>) -> Result<Option<String>, FieldError> {
    let Some(message) = raw.map(str::trim).filter(|m| !m.is_empty()) else {
        return Ok(None);
    };
    if message.chars().count() > VOUCH_MESSAGE_MAX_LEN {
        return Err(FieldError::new(
            "message",
            format!("must be at most {} characters", VOUCH_MESSAGE_MAX_LEN),
        ));
    }
    Ok(Some(message.to_string()))
}

/// Post-login redirects must stay on this site: a single leading slash, no scheme.
pub fn validate_redirect_path(raw: &str) -> Result<String, FieldError> {
    let path = raw.trim();
    if !path.starts_with('/') || path.starts_with("//") || path.contains('\\') {
        return Err(FieldError::new("redirect_to", "must be a relative path"));
    }
    Ok(path.to_string())
}
