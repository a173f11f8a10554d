//! Request context carrying the authenticated user and resolved preferences.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use assetdesk_core::AppError;
use assetdesk_core::types::UserId;
use assetdesk_entity::report::ReportDefinition;
use assetdesk_entity::user::UserRole;

/// Display theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme.
    #[default]
    Light,
    /// Dark theme.
    Dark,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for Theme {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(AppError::validation(format!("Unknown theme '{other}'"))),
        }
    }
}

/// Preferences resolved once per request and carried explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Display theme.
    pub theme: Theme,
}

impl Preferences {
    /// Resolve from an optional raw value. Unknown values fall back to the default.
    pub fn resolve(theme: Option<&str>) -> Self {
        Self {
            theme: theme.and_then(|t| t.parse().ok()).unwrap_or_default(),
        }
    }
}

/// Context for the current authenticated request.
///
/// Extracted by the API layer and passed into service methods so that
/// every operation knows *who* is acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The authenticated user's ID.
    pub user_id: UserId,
    /// The user's role at the time the token was issued.
    pub role: UserRole,
    /// The username (convenience field from token claims).
    pub username: String,
    /// Per-request preferences.
    pub preferences: Preferences,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context with default preferences.
    pub fn new(user_id: UserId, role: UserRole, username: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            username: username.into(),
            preferences: Preferences::default(),
            request_time: Utc::now(),
        }
    }

    /// Replace the resolved preferences.
    pub fn with_preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Returns whether the current user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Owner, admin, or anyone for a public report.
    pub fn can_view(&self, report: &ReportDefinition) -> bool {
        report.is_public || self.can_manage(report)
    }

    /// Owner or admin.
    pub fn can_manage(&self, report: &ReportDefinition) -> bool {
        self.is_admin() || report.is_owned_by(self.user_id)
    }

    /// Reject with `Authorization` unless [`Self::can_view`] holds.
    pub fn require_view(&self, report: &ReportDefinition) -> Result<(), AppError> {
        if self.can_view(report) {
            Ok(())
        } else {
            Err(AppError::authorization("You do not have access to this report"))
        }
    }

    /// Reject with `Authorization` unless [`Self::can_manage`] holds.
    pub fn require_manage(&self, report: &ReportDefinition) -> Result<(), AppError> {
        if self.can_manage(report) {
            Ok(())
        } else {
            Err(AppError::authorization(
                "Only the owner or an administrator may modify this report",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_fall_back_to_light() {
        assert_eq!(Preferences::resolve(Some("DARK")).theme, Theme::Dark);
        assert_eq!(Preferences::resolve(Some("sepia")).theme, Theme::Light);
        assert_eq!(Preferences::resolve(None).theme, Theme::Light);
    }
}
