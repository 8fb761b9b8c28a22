//! User role documents (`users/{uid}`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zona_gamer_core::{UserRole, UserUid};

use super::{lenient, opt_text};

/// A user and the role that gates admin and employee screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    pub uid: UserUid,
    pub email: String,
    pub role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Uid of the admin who assigned the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl AppUser {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    #[must_use]
    pub const fn is_employee(&self) -> bool {
        matches!(self.role, UserRole::Employee)
    }

    #[must_use]
    pub const fn is_client(&self) -> bool {
        matches!(self.role, UserRole::Client)
    }
}

/// A user document as stored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserDocument {
    #[serde(default, deserialize_with = "opt_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub role: Option<UserRole>,
    #[serde(default, deserialize_with = "opt_text")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_text")]
    pub created_by: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_flags() {
        let user = AppUser {
            uid: UserUid::new("u1"),
            email: "ana@zonagamer.ec".into(),
            role: UserRole::Employee,
            display_name: None,
            created_at: Utc::now(),
            created_by: None,
        };
        assert!(user.is_employee());
        assert!(!user.is_admin());
        assert!(!user.is_client());
    }

    #[test]
    fn test_document_with_unknown_role() {
        let doc: UserDocument =
            serde_json::from_value(serde_json::json!({"email": "a@b.com", "role": "owner"}))
                .unwrap();
        assert!(doc.role.is_none());
        assert_eq!(doc.email.as_deref(), Some("a@b.com"));
    }
}
