//! JWT claims structure carried by bearer tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use assetdesk_core::types::UserId;
use assetdesk_entity::user::UserRole;

/// JWT claims payload embedded in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the user ID.
    pub sub: UserId,
    /// User role at the time of token issuance.
    #[serde(default)]
    pub role: UserRole,
    /// Username for display and logs.
    #[serde(default)]
    pub username: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Returns the user ID from the subject claim.
    pub fn user_id(&self) -> UserId {
        self.sub
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}
