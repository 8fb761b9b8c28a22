//! Price quad and currency formatting.
//!
//! Every item and email account carries eight prices: one per account tier
//! (`Principal PS4`, `Secundaria PS4`, `Principal PS5`, `Secundaria PS5`) in
//! US dollars (Ecuador) and in Colombian pesos. Amounts use decimal
//! arithmetic and are stored as plain JSON numbers.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::status::AccountTier;

/// Currencies the storefront sells in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    /// US dollars, sold in Ecuador.
    #[default]
    USD,
    /// Colombian pesos, sold in Colombia.
    COP,
}

impl Currency {
    /// ISO 4217 code, also the value persisted as the selected currency.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::COP => "COP",
        }
    }

    /// Parse a persisted currency code. Only `USD` and `COP` are accepted.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "USD" => Some(Self::USD),
            "COP" => Some(Self::COP),
            _ => None,
        }
    }

    /// Country the currency is sold in.
    #[must_use]
    pub const fn country(self) -> &'static str {
        match self {
            Self::USD => "Ecuador",
            Self::COP => "Colombia",
        }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        "$"
    }

    /// BCP 47 locale used for display.
    #[must_use]
    pub const fn locale(self) -> &'static str {
        match self {
            Self::USD => "es-EC",
            Self::COP => "es-CO",
        }
    }

    /// Number of fraction digits shown (pesos are displayed whole).
    #[must_use]
    pub const fn fraction_digits(self) -> u32 {
        match self {
            Self::USD => 2,
            Self::COP => 0,
        }
    }

    /// Format an amount for display using Spanish grouping.
    ///
    /// ```rust
    /// # use rust_decimal::Decimal;
    /// # use zona_gamer_core::Currency;
    /// assert_eq!(Currency::USD.format(Decimal::new(123_456, 2)), "$1.234,56");
    /// assert_eq!(Currency::COP.format(Decimal::new(45_000, 0)), "$45.000");
    /// ```
    #[must_use]
    pub fn format(self, amount: Decimal) -> String {
        let digits = self.fraction_digits();
        let rounded = amount.round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let text = format!("{:.*}", digits as usize, rounded.abs());

        let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }

        let sign = if negative { "-" } else { "" };
        if fraction.is_empty() {
            format!("{sign}{}{grouped}", self.symbol())
        } else {
            format!("{sign}{}{grouped},{fraction}", self.symbol())
        }
    }
}

/// Eight-way price structure: four account tiers in two currencies.
///
/// Field names match the stored `precios` map exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PriceQuad {
    #[serde(rename = "ps4Principal", default)]
    pub ps4_principal: Decimal,
    #[serde(rename = "ps4Secundaria", default)]
    pub ps4_secundaria: Decimal,
    #[serde(rename = "ps5Principal", default)]
    pub ps5_principal: Decimal,
    #[serde(rename = "ps5Secundaria", default)]
    pub ps5_secundaria: Decimal,
    #[serde(rename = "ps4PrincipalCOP", default)]
    pub ps4_principal_cop: Decimal,
    #[serde(rename = "ps4SecundariaCOP", default)]
    pub ps4_secundaria_cop: Decimal,
    #[serde(rename = "ps5PrincipalCOP", default)]
    pub ps5_principal_cop: Decimal,
    #[serde(rename = "ps5SecundariaCOP", default)]
    pub ps5_secundaria_cop: Decimal,
}

impl PriceQuad {
    /// Quad migrated from a legacy single price: every dollar tier gets
    /// `price`, peso tiers stay at zero.
    #[must_use]
    pub fn uniform(price: Decimal) -> Self {
        Self {
            ps4_principal: price,
            ps4_secundaria: price,
            ps5_principal: price,
            ps5_secundaria: price,
            ..Self::default()
        }
    }

    /// Price of one tier in the given currency.
    #[must_use]
    pub const fn price_for(&self, tier: AccountTier, currency: Currency) -> Decimal {
        match (tier, currency) {
            (AccountTier::PrincipalPs4, Currency::USD) => self.ps4_principal,
            (AccountTier::SecundariaPs4, Currency::USD) => self.ps4_secundaria,
            (AccountTier::PrincipalPs5, Currency::USD) => self.ps5_principal,
            (AccountTier::SecundariaPs5, Currency::USD) => self.ps5_secundaria,
            (AccountTier::PrincipalPs4, Currency::COP) => self.ps4_principal_cop,
            (AccountTier::SecundariaPs4, Currency::COP) => self.ps4_secundaria_cop,
            (AccountTier::PrincipalPs5, Currency::COP) => self.ps5_principal_cop,
            (AccountTier::SecundariaPs5, Currency::COP) => self.ps5_secundaria_cop,
        }
    }

    /// Lowest strictly positive tier price in `currency`, or zero when no
    /// tier has a price.
    #[must_use]
    pub fn lowest(&self, currency: Currency) -> Decimal {
        AccountTier::ALL
            .iter()
            .map(|tier| self.price_for(*tier, currency))
            .filter(|price| *price > Decimal::ZERO)
            .min()
            .unwrap_or(Decimal::ZERO)
    }

    /// Minimum of the four dollar tiers, zeros included.
    ///
    /// This is the value written to the legacy `costo` field.
    #[must_use]
    pub fn min_usd(&self) -> Decimal {
        self.ps4_principal
            .min(self.ps4_secundaria)
            .min(self.ps5_principal)
            .min(self.ps5_secundaria)
    }
}
