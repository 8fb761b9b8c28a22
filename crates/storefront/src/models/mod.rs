//! Domain models for the storefront data layer.
//!
//! Stored documents were written by several generations of clients, so the
//! raw `*Document` types read every field as optional and tolerate values of
//! the wrong shape. The read forms (`ItemSummary`, `EmailAccount`, `Report`,
//! `AppUser`) are what the services hand out.

pub mod cart;
pub mod email_account;
pub mod item;
pub mod report;
pub mod session;
pub mod user;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

pub use cart::CartItem;
pub use email_account::{
    AccountOwner, EmailAccount, EmailAccountDocument, EmailAccountPatch, NewEmailAccount,
};
pub use item::{ComboGame, ComboGameSource, ItemDocument, ItemPatch, ItemSummary, NewItem};
pub use report::{CodesUsed, CustomerInfo, NewReport, Report, ReportFilters, ReportStats};
pub use session::{AuthSession, CurrentUser, SessionToken};
pub use user::AppUser;

/// Deserialize an optional field, reading a malformed value as absent.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Deserialize a field, reading a malformed value as the type's default.
pub(crate) fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    lenient(deserializer).map(Option::unwrap_or_default)
}

/// Deserialize free text that older clients sometimes stored as a number.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(serde_json::Value::deserialize(deserializer)?).unwrap_or_default())
}

/// Like [`text`] for an optional field.
pub(crate) fn opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(value_to_text(serde_json::Value::deserialize(deserializer)?))
}

/// Deserialize a list of text values, skipping entries that are not text.
pub(crate) fn text_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(values) => {
            Ok(Some(values.into_iter().filter_map(value_to_text).collect()))
        }
        _ => Ok(None),
    }
}

fn value_to_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) const fn default_true() -> bool {
    true
}
