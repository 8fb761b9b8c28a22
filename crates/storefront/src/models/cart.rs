//! Cart lines.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use zona_gamer_core::{AccountTier, Currency};

use super::ItemSummary;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// One cart line: an item, the tier being bought and how many.
///
/// Lines are unique by `(item.id, selected_tier)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(flatten)]
    pub item: ItemSummary,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_tier: Option<AccountTier>,
}

impl CartItem {
    /// Whether this line is for `id` at `tier`.
    #[must_use]
    pub fn matches(&self, id: &str, tier: Option<AccountTier>) -> bool {
        self.item.id.as_str() == id && self.selected_tier == tier
    }

    /// Price of one unit before discount.
    ///
    /// The tier price comes from the quad; lines without a quad or without a
    /// tier fall back to the legacy `costo`.
    #[must_use]
    pub fn base_price(&self, currency: Currency) -> Decimal {
        match (&self.item.precios, self.selected_tier) {
            (Some(quad), Some(tier)) => quad.price_for(tier, currency),
            _ => self.item.costo,
        }
    }

    /// Price of one unit with the item's percentage discount applied.
    #[must_use]
    pub fn unit_price(&self, currency: Currency) -> Decimal {
        let base = self.base_price(currency);
        match self.item.descuento {
            Some(descuento) if descuento > Decimal::ZERO => {
                base * (Decimal::ONE - descuento / HUNDRED)
            }
            _ => base,
        }
    }

    #[must_use]
    pub fn line_total(&self, currency: Currency) -> Decimal {
        self.unit_price(currency) * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use zona_gamer_core::{ItemId, Platform, PriceQuad};

    use super::*;

    fn line(descuento: Option<Decimal>) -> CartItem {
        let mut item = ItemSummary::new(
            ItemId::new("fifa_25"),
            "Fifa 25",
            Decimal::new(10, 0),
            Platform::Ps5,
        );
        item.descuento = descuento;
        CartItem {
            item,
            quantity: 3,
            selected_tier: Some(AccountTier::PrincipalPs5),
        }
    }

    #[test]
    fn test_discounted_line_total() {
        let line = line(Some(Decimal::new(20, 0)));
        assert_eq!(line.line_total(Currency::USD), Decimal::new(24, 0));
    }

    #[test]
    fn test_legacy_line_without_quad_uses_costo() {
        let mut line = line(None);
        line.item.precios = None;
        line.item.costo = Decimal::new(7, 0);
        assert_eq!(line.unit_price(Currency::USD), Decimal::new(7, 0));
    }

    #[test]
    fn test_cop_price_from_quad() {
        let mut line = line(None);
        line.item.precios = Some(PriceQuad {
            ps5_principal_cop: Decimal::new(60_000, 0),
            ..PriceQuad::uniform(Decimal::new(15, 0))
        });
        assert_eq!(line.unit_price(Currency::COP), Decimal::new(60_000, 0));
        assert_eq!(line.unit_price(Currency::USD), Decimal::new(15, 0));
    }

    #[test]
    fn test_serialized_line_is_flat() {
        let json = serde_json::to_value(line(None)).unwrap();
        assert_eq!(json["id"], "fifa_25");
        assert_eq!(json["quantity"], 3);
        assert_eq!(json["selectedTier"], "Principal PS5");

        let back: CartItem = serde_json::from_value(json).unwrap();
        assert_eq!(back.item.id.as_str(), "fifa_25");
    }
}
