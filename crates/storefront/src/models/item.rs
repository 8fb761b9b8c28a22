//! Catalog items: games and combos.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use zona_gamer_core::{ItemId, Platform, PriceQuad, PromotionType};

use super::{default_true, lenient, opt_text};

/// Where a game listed inside a combo comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComboGameSource {
    /// A game that exists in the games catalog.
    #[default]
    Catalogo,
    /// Free text entered by an admin.
    Manual,
}

/// One game included in a combo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboGame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub nombre: String,
    #[serde(default)]
    pub tipo: ComboGameSource,
}

/// An item document as stored, every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDocument {
    #[serde(default, deserialize_with = "opt_text")]
    pub nombre: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub precio: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient")]
    pub costo: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient")]
    pub precios: Option<PriceQuad>,
    #[serde(default, deserialize_with = "lenient")]
    pub version: Option<Platform>,
    #[serde(default, deserialize_with = "opt_text")]
    pub foto: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub activo: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub is_offert: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub tipo_promocion: Option<PromotionType>,
    #[serde(default, deserialize_with = "lenient")]
    pub descuento: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient")]
    pub destacado: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub juegos: Option<Vec<ComboGame>>,
    #[serde(default, deserialize_with = "opt_text")]
    pub juego_referenciado: Option<String>,
}

/// A catalog entry as shown in listings, the cache and the cart.
///
/// Serialized with the same field names the web client caches, so cache
/// entries and cart lines written by either client stay readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: ItemId,
    pub nombre: String,
    /// Single price, the pre-quad representation.
    #[serde(default)]
    pub precio: Decimal,
    /// Absent on cart lines saved before the price quad existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precios: Option<PriceQuad>,
    /// Legacy minimum price, used for price filtering.
    #[serde(default)]
    pub costo: Decimal,
    #[serde(default)]
    pub version: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foto: Option<String>,
    #[serde(default = "default_true")]
    pub activo: bool,
    #[serde(default)]
    pub is_offert: bool,
    #[serde(default)]
    pub tipo_promocion: PromotionType,
    #[serde(default)]
    pub total_correos: usize,
    /// Ids (emails) of the accounts that hold this item.
    #[serde(default)]
    pub correos: Vec<String>,
    /// Owners flagged `hasStock` across all accounts.
    #[serde(default)]
    pub stock_accounts: usize,
    /// Percentage discount applied in the cart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descuento: Option<Decimal>,
    #[serde(default)]
    pub destacado: bool,
    #[serde(default)]
    pub juegos: Vec<ComboGame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub juego_referenciado: Option<String>,
}

impl ItemSummary {
    /// Minimal summary for an item known only by id and price.
    #[must_use]
    pub fn new(id: ItemId, nombre: impl Into<String>, precio: Decimal, version: Platform) -> Self {
        Self {
            id,
            nombre: nombre.into(),
            precio,
            precios: Some(PriceQuad::uniform(precio)),
            costo: precio,
            version,
            foto: None,
            activo: true,
            is_offert: false,
            tipo_promocion: PromotionType::Ninguna,
            total_correos: 0,
            correos: Vec::new(),
            stock_accounts: 0,
            descuento: None,
            destacado: false,
            juegos: Vec::new(),
            juego_referenciado: None,
        }
    }
}

/// Input for creating a game or combo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewItem {
    pub nombre: String,
    /// Defaults to the platform the item is created under.
    pub version: Option<Platform>,
    pub precio: Option<Decimal>,
    pub precios: Option<PriceQuad>,
    pub foto: Option<String>,
    pub tipo_promocion: Option<PromotionType>,
    pub is_offert: Option<bool>,
    pub juegos: Vec<ComboGame>,
    pub juego_referenciado: Option<String>,
}

/// Partial update of an item. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub nombre: Option<String>,
    pub foto: Option<String>,
    pub version: Option<Platform>,
    pub activo: Option<bool>,
    pub tipo_promocion: Option<PromotionType>,
    pub is_offert: Option<bool>,
    pub precio: Option<Decimal>,
    pub juegos: Option<Vec<ComboGame>>,
    pub juego_referenciado: Option<String>,
    pub precios: Option<PriceQuad>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_defaults_when_reading_old_cache() {
        let summary: ItemSummary = serde_json::from_value(serde_json::json!({
            "id": "fifa_25",
            "nombre": "Fifa 25",
            "precio": 20,
        }))
        .unwrap();

        assert!(summary.activo);
        assert!(summary.precios.is_none());
        assert_eq!(summary.version, Platform::Ps4AndPs5);
        assert_eq!(summary.tipo_promocion, PromotionType::Ninguna);
    }

    #[test]
    fn test_summary_field_names() {
        let summary = ItemSummary::new(
            ItemId::new("gta_v"),
            "Gta V",
            Decimal::new(10, 0),
            Platform::Ps5,
        );
        let json = serde_json::to_value(&summary).unwrap();

        assert_eq!(json["version"], "PS5");
        assert_eq!(json["isOffert"], false);
        assert_eq!(json["tipoPromocion"], "ninguna");
        assert_eq!(json["totalCorreos"], 0);
        assert!(json.get("foto").is_none());
    }

    #[test]
    fn test_item_document_ignores_bad_fields() {
        let doc: ItemDocument = serde_json::from_value(serde_json::json!({
            "nombre": "Gta V",
            "version": "Xbox",
            "tipoPromocion": "rebajas",
            "isOffert": true,
            "juegos": [{"nombre": "Gta V", "tipo": "manual"}],
        }))
        .unwrap();

        assert!(doc.version.is_none());
        assert!(doc.tipo_promocion.is_none());
        assert_eq!(doc.is_offert, Some(true));
        assert_eq!(doc.juegos.unwrap().first().unwrap().tipo, ComboGameSource::Manual);
    }
}
