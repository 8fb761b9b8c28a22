//! Display currency preference.

use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use tracing::{info, warn};

use zona_gamer_core::{AccountTier, Currency, PriceQuad};

use crate::models::session::keys;
use crate::storage::LocalStorage;

/// The currency prices are shown in, persisted as `selectedCurrency`.
pub struct CurrencyService {
    storage: Arc<dyn LocalStorage>,
    selected: RwLock<Currency>,
}

impl std::fmt::Debug for CurrencyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrencyService")
            .field("selected", &self.selected())
            .finish_non_exhaustive()
    }
}

impl CurrencyService {
    /// Restore the saved currency. Anything other than `USD` or `COP` is
    /// ignored and USD is used.
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        let selected = match storage.get_item(keys::SELECTED_CURRENCY) {
            Ok(saved) => saved.as_deref().and_then(Currency::from_code),
            Err(e) => {
                warn!(error = %e, "Failed to read selected currency");
                None
            }
        }
        .unwrap_or_default();

        Self {
            storage,
            selected: RwLock::new(selected),
        }
    }

    #[must_use]
    pub fn selected(&self) -> Currency {
        self.selected.read().map_or_else(|_| Currency::default(), |c| *c)
    }

    /// Switch currency and persist the choice.
    pub fn change(&self, currency: Currency) {
        if let Ok(mut selected) = self.selected.write() {
            *selected = currency;
        }
        if let Err(e) = self.storage.set_item(keys::SELECTED_CURRENCY, currency.code()) {
            warn!(error = %e, "Failed to save selected currency");
        }
        info!(currency = currency.code(), "Currency changed");
    }

    #[must_use]
    pub fn country(&self) -> &'static str {
        self.selected().country()
    }

    #[must_use]
    pub fn symbol(&self) -> &'static str {
        self.selected().symbol()
    }

    #[must_use]
    pub fn format_price(&self, amount: Decimal) -> String {
        self.selected().format(amount)
    }

    /// Price of the tier named by `tier_label` in the selected currency.
    ///
    /// The label is matched loosely (`"principal ps5"` works). Zero when the
    /// quad is absent or the label names no tier.
    #[must_use]
    pub fn get_price(&self, precios: Option<&PriceQuad>, tier_label: &str) -> Decimal {
        match (precios, AccountTier::from_label_loose(tier_label)) {
            (Some(quad), Some(tier)) => quad.price_for(tier, self.selected()),
            _ => Decimal::ZERO,
        }
    }

    /// Lowest positive price in the selected currency, zero when there is none.
    #[must_use]
    pub fn lowest_price(&self, precios: Option<&PriceQuad>) -> Decimal {
        precios.map_or(Decimal::ZERO, |quad| quad.lowest(self.selected()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn quad() -> PriceQuad {
        PriceQuad {
            ps4_principal_cop: Decimal::new(40_000, 0),
            ps5_principal_cop: Decimal::new(60_000, 0),
            ..PriceQuad::uniform(Decimal::new(15, 0))
        }
    }

    #[test]
    fn test_defaults_to_usd() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(keys::SELECTED_CURRENCY, "EUR").unwrap();

        let currency = CurrencyService::new(storage);
        assert_eq!(currency.selected(), Currency::USD);
        assert_eq!(currency.country(), "Ecuador");
    }

    #[test]
    fn test_change_is_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        CurrencyService::new(storage.clone()).change(Currency::COP);

        let restored = CurrencyService::new(storage);
        assert_eq!(restored.selected(), Currency::COP);
        assert_eq!(restored.country(), "Colombia");
        assert_eq!(restored.format_price(Decimal::new(45_000, 0)), "$45.000");
    }

    #[test]
    fn test_get_price_by_label() {
        let currency = CurrencyService::new(Arc::new(MemoryStorage::new()));
        let quad = quad();

        assert_eq!(
            currency.get_price(Some(&quad), "principal ps5"),
            Decimal::new(15, 0)
        );
        assert_eq!(currency.get_price(Some(&quad), "Terciaria"), Decimal::ZERO);
        assert_eq!(currency.get_price(None, "Principal PS5"), Decimal::ZERO);

        currency.change(Currency::COP);
        assert_eq!(
            currency.get_price(Some(&quad), "Principal PS5"),
            Decimal::new(60_000, 0)
        );
    }

    #[test]
    fn test_lowest_price() {
        let currency = CurrencyService::new(Arc::new(MemoryStorage::new()));
        assert_eq!(currency.lowest_price(Some(&quad())), Decimal::new(15, 0));
        assert_eq!(currency.lowest_price(None), Decimal::ZERO);
    }
}
