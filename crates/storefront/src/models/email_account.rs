//! Email accounts: the PlayStation accounts that hold a purchased item.
//!
//! One document per account under `{item}/correos/{email}`. The document id
//! is the account's email address.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use zona_gamer_core::{AccountTier, Platform, PriceQuad};

use super::{lenient, opt_text, text, text_list};

/// A customer occupying one slot of an email account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOwner {
    #[serde(default, deserialize_with = "text")]
    pub nombre: String,
    #[serde(default, deserialize_with = "text")]
    pub telefono: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub tipo: Option<AccountTier>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub saldo: Option<Decimal>,
    /// Whether this slot can still be sold.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub has_stock: Option<bool>,
    #[serde(default, deserialize_with = "opt_text", skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl AccountOwner {
    #[must_use]
    pub fn has_stock(&self) -> bool {
        self.has_stock == Some(true)
    }
}

/// An account document as stored, every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAccountDocument {
    #[serde(default, deserialize_with = "opt_text")]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub precio: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient")]
    pub precios: Option<PriceQuad>,
    #[serde(default, deserialize_with = "lenient")]
    pub costo: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<Platform>,
    #[serde(default, deserialize_with = "lenient")]
    pub platform: Option<Platform>,
    #[serde(default, deserialize_with = "opt_text")]
    pub codigo_master: Option<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub codigos_generados: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient")]
    pub fecha: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_text")]
    pub codigo: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub cuentas: Option<Vec<AccountOwner>>,
    #[serde(default, deserialize_with = "lenient")]
    pub saldo: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_text")]
    pub created_by: Option<String>,
}

/// An email account with legacy fields filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAccount {
    /// Document id.
    pub email: String,
    pub nombre: String,
    pub precio: Decimal,
    pub precios: PriceQuad,
    pub costo: Decimal,
    pub version: Platform,
    /// Account password shared with the customer.
    pub codigo_master: String,
    /// Unused verification codes, consumed two at a time.
    pub codigos_generados: Vec<String>,
    pub fecha: DateTime<Utc>,
    pub codigo: String,
    pub cuentas: Vec<AccountOwner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saldo: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
}

impl EmailAccount {
    /// Owners flagged as still sellable.
    #[must_use]
    pub fn stock_count(&self) -> usize {
        self.cuentas.iter().filter(|owner| owner.has_stock()).count()
    }
}

/// Input for creating an email account.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEmailAccount {
    pub nombre: Option<String>,
    pub precio: Option<Decimal>,
    pub precios: Option<PriceQuad>,
    /// Legacy minimum price; derived from `precios` when absent.
    pub costo: Option<Decimal>,
    /// Defaults to the platform the account is created under.
    pub version: Option<Platform>,
    pub codigo_master: Option<String>,
    pub codigos_generados: Option<Vec<String>>,
    /// Purchase date; defaults to now.
    pub fecha: Option<DateTime<Utc>>,
    pub codigo: Option<String>,
    pub cuentas: Option<Vec<AccountOwner>>,
    pub saldo: Option<Decimal>,
    pub created_by: Option<String>,
}

/// Partial update of an email account. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmailAccountPatch {
    pub nombre: Option<String>,
    pub precio: Option<Decimal>,
    pub precios: Option<PriceQuad>,
    pub costo: Option<Decimal>,
    pub version: Option<Platform>,
    pub codigo_master: Option<String>,
    pub codigos_generados: Option<Vec<String>>,
    pub fecha: Option<DateTime<Utc>>,
    pub codigo: Option<String>,
    pub cuentas: Option<Vec<AccountOwner>>,
    pub saldo: Option<Decimal>,
}

impl EmailAccountPatch {
    /// Whether the patch changes the account's price.
    #[must_use]
    pub const fn touches_price(&self) -> bool {
        self.precios.is_some() || self.costo.is_some()
    }
}
