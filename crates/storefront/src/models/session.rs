//! Session-related types.
//!
//! The signed-in user and the id token shared between the auth provider and
//! the document store client.

use std::sync::{Arc, RwLock};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use zona_gamer_core::UserUid;

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub uid: UserUid,
    /// Email as reported by the auth provider; may be absent for phone or
    /// anonymous accounts.
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Result of a successful sign-in or sign-up.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: CurrentUser,
    pub id_token: SecretString,
}

/// Bearer token of the current session.
///
/// Cloning shares the slot: the auth client writes it, the document store
/// client reads it on every request.
#[derive(Debug, Clone, Default)]
pub struct SessionToken(Arc<RwLock<Option<SecretString>>>);

impl SessionToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: SecretString) {
        if let Ok(mut slot) = self.0.write() {
            *slot = Some(token);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.0.write() {
            *slot = None;
        }
    }

    /// Current token, `None` when signed out.
    #[must_use]
    pub fn get(&self) -> Option<SecretString> {
        self.0.read().ok().and_then(|slot| slot.clone())
    }
}

/// Local storage keys.
pub mod keys {
    /// Day (`YYYY-MM-DD`) of the last sign-in.
    pub const SESSION_DATE: &str = "zonagamer_session_date";

    /// Selected display currency code.
    pub const SELECTED_CURRENCY: &str = "selectedCurrency";

    /// Serialized cart lines.
    pub const CART: &str = "zona_gamer_cart";
}
