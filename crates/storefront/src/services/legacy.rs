//! Compatibility with documents written before the price quad and the
//! promotion type existed.
//!
//! Reads go through pure functions that fill the new fields from the old
//! ones. Writes add the old fields next to the new ones while
//! [`StoreSettings::write_legacy_fields`](crate::config::StoreSettings) is on,
//! so older clients keep showing correct prices and offers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use zona_gamer_core::{Platform, PriceQuad, PromotionType};

use crate::db::{Fields, RepositoryError, Value};
use crate::models::{EmailAccount, EmailAccountDocument, ItemDocument};

// =============================================================================
// Read adapter
// =============================================================================

/// Single price of an item: `precio`, then `costo`, then the first account's
/// `costo`, then zero.
#[must_use]
pub fn item_single_price(item: &ItemDocument, first: Option<&EmailAccountDocument>) -> Decimal {
    item.precio
        .or(item.costo)
        .or_else(|| first.and_then(|account| account.costo))
        .unwrap_or(Decimal::ZERO)
}

/// Price quad of an item: its own `precios`, then the first account's, then a
/// uniform quad built from the single price.
#[must_use]
pub fn item_quad(
    item: &ItemDocument,
    first: Option<&EmailAccountDocument>,
    single_price: Decimal,
) -> PriceQuad {
    item.precios
        .or_else(|| first.and_then(|account| account.precios))
        .unwrap_or_else(|| PriceQuad::uniform(single_price))
}

/// Promotion of an item, honouring the legacy `isOffert` flag.
#[must_use]
pub fn item_promotion(item: &ItemDocument) -> PromotionType {
    PromotionType::resolve(item.tipo_promocion, item.is_offert)
}

/// Read form of an account document.
///
/// `precio` falls back to `costo`, `precios` to a uniform quad, `costo` (when
/// missing or zero) to `precio`, `version` to the old `platform` field and
/// then to the platform the account was read from. Missing dates read as
/// `now`.
#[must_use]
pub fn account_from_document(
    email: String,
    doc: EmailAccountDocument,
    platform: Platform,
    now: DateTime<Utc>,
) -> EmailAccount {
    let precio = doc.precio.or(doc.costo).unwrap_or(Decimal::ZERO);
    let precios = doc.precios.unwrap_or_else(|| PriceQuad::uniform(precio));
    let costo = doc.costo.filter(|c| !c.is_zero()).unwrap_or(precio);

    EmailAccount {
        email,
        nombre: doc.nombre.unwrap_or_default(),
        precio,
        precios,
        costo,
        version: doc.version.or(doc.platform).unwrap_or(platform),
        codigo_master: doc.codigo_master.unwrap_or_default(),
        codigos_generados: doc.codigos_generados.unwrap_or_default(),
        fecha: doc.fecha.unwrap_or(now),
        codigo: doc.codigo.unwrap_or_default(),
        cuentas: doc.cuentas.unwrap_or_default(),
        saldo: doc.saldo,
        created_at: doc.created_at.unwrap_or(now),
        updated_at: doc.updated_at.unwrap_or(now),
        created_by: doc.created_by,
    }
}

// =============================================================================
// Write adapter
// =============================================================================

/// Field writer that adds legacy fields when enabled.
#[derive(Debug, Clone, Copy)]
pub struct LegacyWriter {
    enabled: bool,
}

impl LegacyWriter {
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    #[must_use]
    pub const fn enabled(self) -> bool {
        self.enabled
    }

    /// `precio`, plus `costo` mirroring it.
    pub fn put_price(self, fields: &mut Fields, precio: Decimal) {
        fields.insert("precio".into(), Value::from(precio));
        if self.enabled {
            fields.insert("costo".into(), Value::from(precio));
        }
    }

    /// `tipoPromocion`, plus `isOffert` derived from it.
    pub fn put_promotion(self, fields: &mut Fields, tipo: PromotionType) {
        fields.insert("tipoPromocion".into(), Value::from(tipo.as_str()));
        if self.enabled {
            fields.insert("isOffert".into(), Value::Bool(tipo.legacy_is_offert()));
        }
    }

    /// Fields merged into an item when one of its accounts changes price.
    ///
    /// With a quad: `precios` plus `costo` = cheapest dollar tier. With only a
    /// legacy `costo`: that `costo`. `ultimaActualizacionPrecio` is always
    /// stamped, even when neither is given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Decode` if the quad fails to serialize.
    pub fn parent_price_fields(
        self,
        precios: Option<&PriceQuad>,
        costo: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<Fields, RepositoryError> {
        let mut fields = Fields::new();
        match (precios, costo) {
            (Some(quad), _) => {
                fields.insert("precios".into(), Value::from_serializable(quad)?);
                if self.enabled {
                    fields.insert("costo".into(), Value::from(quad.min_usd()));
                }
            }
            (None, Some(costo)) => {
                fields.insert("costo".into(), Value::from(costo));
            }
            (None, None) => {}
        }
        fields.insert("ultimaActualizacionPrecio".into(), Value::Timestamp(now));
        Ok(fields)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_account_backfill_from_costo() {
        let doc = EmailAccountDocument {
            costo: Some(Decimal::new(12, 0)),
            platform: Some(Platform::Ps5),
            ..EmailAccountDocument::default()
        };

        let account = account_from_document("a@b.com".into(), doc, Platform::Ps4, now());

        assert_eq!(account.precio, Decimal::new(12, 0));
        assert_eq!(account.precios, PriceQuad::uniform(Decimal::new(12, 0)));
        assert_eq!(account.costo, Decimal::new(12, 0));
        assert_eq!(account.version, Platform::Ps5);
        assert_eq!(account.fecha, now());
        assert!(account.codigos_generados.is_empty());
    }

    #[test]
    fn test_zero_costo_falls_back_to_precio() {
        let doc = EmailAccountDocument {
            precio: Some(Decimal::new(9, 0)),
            costo: Some(Decimal::ZERO),
            ..EmailAccountDocument::default()
        };
        let account = account_from_document("a@b.com".into(), doc, Platform::Ps4, now());
        assert_eq!(account.costo, Decimal::new(9, 0));
        assert_eq!(account.version, Platform::Ps4);
    }

    #[test]
    fn test_item_price_chain() {
        let item = ItemDocument::default();
        let first = EmailAccountDocument {
            costo: Some(Decimal::new(15, 0)),
            ..EmailAccountDocument::default()
        };
        assert_eq!(item_single_price(&item, Some(&first)), Decimal::new(15, 0));
        assert_eq!(item_single_price(&item, None), Decimal::ZERO);

        let item = ItemDocument {
            costo: Some(Decimal::new(20, 0)),
            ..ItemDocument::default()
        };
        assert_eq!(item_single_price(&item, Some(&first)), Decimal::new(20, 0));
        assert_eq!(
            item_quad(&item, None, Decimal::new(20, 0)),
            PriceQuad::uniform(Decimal::new(20, 0))
        );
    }

    #[test]
    fn test_writer_adds_legacy_fields_only_when_enabled() {
        let mut fields = Fields::new();
        LegacyWriter::new(true).put_promotion(&mut fields, PromotionType::Oferta);
        assert_eq!(fields["isOffert"], Value::Bool(true));

        let mut fields = Fields::new();
        LegacyWriter::new(false).put_price(&mut fields, Decimal::new(5, 0));
        assert!(!fields.contains_key("costo"));
        assert_eq!(fields["precio"], Value::Integer(5));
    }

    #[test]
    fn test_parent_price_fields_use_cheapest_dollar_tier() {
        let quad = PriceQuad {
            ps4_secundaria: Decimal::new(8, 0),
            ..PriceQuad::uniform(Decimal::new(12, 0))
        };
        let fields = LegacyWriter::new(true)
            .parent_price_fields(Some(&quad), None, now())
            .unwrap();
        assert_eq!(fields["costo"], Value::Integer(8));
        assert_eq!(fields["ultimaActualizacionPrecio"], Value::Timestamp(now()));

        let stamp_only = LegacyWriter::new(true)
            .parent_price_fields(None, None, now())
            .unwrap();
        assert_eq!(stamp_only.len(), 1);
        assert_eq!(stamp_only["ultimaActualizacionPrecio"], Value::Timestamp(now()));
    }
}
