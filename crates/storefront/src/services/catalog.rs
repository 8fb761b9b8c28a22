//! Catalog loading: item documents joined with their email accounts.
//!
//! One [`CatalogService`] exists per [`ItemKind`]. A load consults the TTL
//! cache first and only reaches the document store on a miss or when forced.
//! The remote pipeline lists the platform's items, lists each item's
//! `correos` sub-collection, derives an [`ItemSummary`] per item, sorts by
//! name and publishes the result both in memory and to the cache.
//!
//! Anonymous callers are not allowed to read `correos`; those sub-fetch
//! failures count as zero accounts instead of failing the load.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use futures::future::join_all;
use rust_decimal::Decimal;
use tracing::{debug, error, info, instrument, warn};

use zona_gamer_core::{ItemId, ItemKind, Platform, fold_for_compare};

use crate::cache::CatalogCache;
use crate::db::{DocumentStore, EmailAccountRepository, ItemRepository};
use crate::error::Result;
use crate::models::{EmailAccountDocument, ItemDocument, ItemSummary};
use crate::services::legacy;

/// Loaded catalog of one item kind.
pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
    cache: CatalogCache,
    kind: ItemKind,
    items: RwLock<Vec<ItemSummary>>,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("kind", &self.kind)
            .field("items", &self.items().len())
            .finish_non_exhaustive()
    }
}

impl CatalogService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, cache: CatalogCache, kind: ItemKind) -> Self {
        Self {
            store,
            cache,
            kind,
            items: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        self.kind
    }

    /// Load the catalog of `platform`.
    ///
    /// Without `force_refresh` a non-empty cache entry is returned as is.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the item documents cannot be listed.
    /// Account listing failures never fail the load.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn load(&self, platform: Platform, force_refresh: bool) -> Result<Vec<ItemSummary>> {
        if !force_refresh {
            if let Some(cached) = self.cache.get(platform).filter(|items| !items.is_empty()) {
                debug!(count = cached.len(), "Serving catalog from cache");
                self.publish(cached.clone());
                return Ok(cached);
            }
        }

        let items = ItemRepository::new(self.store.as_ref(), self.kind);
        let documents = items
            .list(platform)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to list catalog items"))?;

        let accounts = EmailAccountRepository::new(self.store.as_ref(), self.kind);
        let listings = join_all(
            documents
                .iter()
                .map(|(id, _)| accounts.list(platform, id)),
        )
        .await;

        let mut by_id = BTreeMap::new();
        for ((id, document), listing) in documents.into_iter().zip(listings) {
            let item_accounts = listing.unwrap_or_else(|e| {
                if e.is_permission_denied() {
                    debug!(item = %id, "Accounts not readable, counting none");
                } else {
                    warn!(item = %id, error = %e, "Failed to list accounts, counting none");
                }
                Vec::new()
            });
            let summary = summarize(self.kind, platform, id.clone(), document, &item_accounts);
            by_id.insert(id, summary);
        }

        let mut loaded: Vec<ItemSummary> = by_id.into_values().collect();
        sort_by_name(&mut loaded);

        info!(count = loaded.len(), "Catalog loaded from store");
        self.publish(loaded.clone());
        self.cache.set(platform, &loaded);
        Ok(loaded)
    }

    /// Drop the cached entry of `platform` and reload it from the store.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load).
    pub async fn sync(&self, platform: Platform) -> Result<Vec<ItemSummary>> {
        self.cache.clear(Some(platform));
        self.load(platform, true).await
    }

    /// Snapshot of the last loaded list.
    #[must_use]
    pub fn items(&self) -> Vec<ItemSummary> {
        self.items.read().map(|items| items.clone()).unwrap_or_default()
    }

    /// Loaded items whose name or id contains `term`, ignoring accents and case.
    #[must_use]
    pub fn search_by_name(&self, term: &str) -> Vec<ItemSummary> {
        let wanted = fold_for_compare(term.trim());
        self.items()
            .into_iter()
            .filter(|item| {
                fold_for_compare(&item.nombre).contains(&wanted)
                    || item.id.as_str().to_lowercase().contains(&wanted)
            })
            .collect()
    }

    /// Loaded items whose `costo` lies in `[min, max]`.
    #[must_use]
    pub fn filter_by_price(&self, min: Decimal, max: Decimal) -> Vec<ItemSummary> {
        self.items()
            .into_iter()
            .filter(|item| item.costo >= min && item.costo <= max)
            .collect()
    }

    /// Clear the cache of one platform, or of all platforms when `None`.
    pub fn clear_cache(&self, platform: Option<Platform>) {
        self.cache.clear(platform);
    }

    /// Forget the loaded list. Cached entries are kept.
    pub fn reset(&self) {
        self.publish(Vec::new());
    }

    fn publish(&self, items: Vec<ItemSummary>) {
        if let Ok(mut current) = self.items.write() {
            *current = items;
        }
    }
}

/// Build the listing entry of one item from its document and accounts.
#[must_use]
pub fn summarize(
    kind: ItemKind,
    platform: Platform,
    id: ItemId,
    document: ItemDocument,
    accounts: &[(String, EmailAccountDocument)],
) -> ItemSummary {
    let first = accounts.first().map(|(_, account)| account);

    let precio = legacy::item_single_price(&document, first);
    let precios = legacy::item_quad(&document, first, precio);
    let tipo_promocion = legacy::item_promotion(&document);

    let nombre = document
        .nombre
        .clone()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| first.and_then(|a| a.nombre.clone()).filter(|n| !n.trim().is_empty()))
        .unwrap_or_else(|| id.display_name(kind));

    let version = document
        .version
        .or_else(|| first.and_then(|a| a.version))
        .unwrap_or(platform);

    let stock_accounts = accounts
        .iter()
        .filter_map(|(_, account)| account.cuentas.as_ref())
        .flatten()
        .filter(|owner| owner.has_stock())
        .count();

    ItemSummary {
        id,
        nombre,
        precio,
        precios: Some(precios),
        costo: precio,
        version,
        foto: document.foto,
        activo: document.activo != Some(false),
        is_offert: document
            .is_offert
            .unwrap_or_else(|| tipo_promocion.legacy_is_offert()),
        tipo_promocion,
        total_correos: accounts.len(),
        correos: accounts.iter().map(|(email, _)| email.clone()).collect(),
        stock_accounts,
        descuento: document.descuento,
        destacado: document.destacado.unwrap_or(false),
        juegos: document.juegos.unwrap_or_default(),
        juego_referenciado: document.juego_referenciado,
    }
}

fn sort_by_name(items: &mut [ItemSummary]) {
    items.sort_by_cached_key(|item| (fold_for_compare(&item.nombre), item.id.clone()));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use zona_gamer_core::{PriceQuad, PromotionType};

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::{CollectionPath, Fields, InMemoryStore, Value};
    use crate::models::AccountOwner;
    use crate::storage::MemoryStorage;

    fn service(store: Arc<InMemoryStore>, kind: ItemKind) -> CatalogService {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        ));
        let cache = CatalogCache::new(
            Arc::new(MemoryStorage::new()),
            clock,
            kind,
            Duration::from_secs(1800),
        );
        CatalogService::new(store, cache, kind)
    }

    fn item_path(kind: ItemKind, platform: Platform, id: &str) -> crate::db::DocumentPath {
        CollectionPath::root(kind.root_collection())
            .unwrap()
            .doc(platform.as_str())
            .unwrap()
            .collection(kind.item_collection())
            .unwrap()
            .doc(id)
            .unwrap()
    }

    fn seed_item(store: &InMemoryStore, kind: ItemKind, id: &str, fields: &[(&str, Value)]) {
        let fields: Fields = fields
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect();
        store.insert(item_path(kind, Platform::Ps4, id), fields);
    }

    #[tokio::test]
    async fn test_second_load_is_served_from_cache() {
        let store = Arc::new(InMemoryStore::new());
        seed_item(&store, ItemKind::Game, "fifa_25", &[("nombre", Value::from("Fifa 25"))]);
        let catalog = service(store.clone(), ItemKind::Game);

        let first = catalog.load(Platform::Ps4, false).await.unwrap();
        let calls = store.list_calls();
        let second = catalog.load(Platform::Ps4, false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.list_calls(), calls);
    }

    #[tokio::test]
    async fn test_forced_load_hits_the_store() {
        let store = Arc::new(InMemoryStore::new());
        seed_item(&store, ItemKind::Game, "fifa_25", &[]);
        let catalog = service(store.clone(), ItemKind::Game);

        catalog.load(Platform::Ps4, false).await.unwrap();
        let calls = store.list_calls();
        catalog.load(Platform::Ps4, true).await.unwrap();

        assert!(store.list_calls() > calls);
    }

    #[tokio::test]
    async fn test_denied_accounts_count_as_zero() {
        let store = Arc::new(InMemoryStore::new());
        seed_item(&store, ItemKind::Combo, "god_of_war_combo", &[]);
        store.deny_reads("correos");
        let catalog = service(store, ItemKind::Combo);

        let items = catalog.load(Platform::Ps4, false).await.unwrap();

        let item = items.first().unwrap();
        assert_eq!(item.nombre, "God Of War");
        assert_eq!(item.total_correos, 0);
        assert_eq!(item.precio, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_sorted_by_folded_name() {
        let store = Arc::new(InMemoryStore::new());
        seed_item(&store, ItemKind::Game, "b", &[("nombre", Value::from("arena"))]);
        seed_item(&store, ItemKind::Game, "a", &[("nombre", Value::from("Árbol"))]);
        seed_item(&store, ItemKind::Game, "c", &[("nombre", Value::from("Zelda"))]);
        let catalog = service(store, ItemKind::Game);

        let names: Vec<String> = catalog
            .load(Platform::Ps4, false)
            .await
            .unwrap()
            .into_iter()
            .map(|item| item.nombre)
            .collect();

        assert_eq!(names, ["Árbol", "arena", "Zelda"]);
    }

    #[tokio::test]
    async fn test_search_and_price_filter_use_loaded_list() {
        let store = Arc::new(InMemoryStore::new());
        seed_item(
            &store,
            ItemKind::Game,
            "pokemon_oro",
            &[("nombre", Value::from("Pokémon Oro")), ("precio", Value::Integer(15))],
        );
        seed_item(
            &store,
            ItemKind::Game,
            "gta_v",
            &[("nombre", Value::from("GTA V")), ("precio", Value::Integer(40))],
        );
        let catalog = service(store, ItemKind::Game);
        catalog.load(Platform::Ps4, false).await.unwrap();

        assert_eq!(catalog.search_by_name("pokemon").len(), 1);
        assert_eq!(catalog.search_by_name("gta_").len(), 1);

        let cheap = catalog.filter_by_price(Decimal::ZERO, Decimal::new(20, 0));
        assert_eq!(cheap.len(), 1);
        assert_eq!(cheap.first().unwrap().id.as_str(), "pokemon_oro");
    }

    #[test]
    fn test_summary_falls_back_to_first_account() {
        let quad = PriceQuad::uniform(Decimal::new(25, 0));
        let account = EmailAccountDocument {
            nombre: Some("Spider-Man 2".into()),
            costo: Some(Decimal::new(25, 0)),
            precios: Some(quad),
            version: Some(Platform::Ps5),
            cuentas: Some(vec![
                AccountOwner {
                    has_stock: Some(true),
                    ..AccountOwner::default()
                },
                AccountOwner::default(),
            ]),
            ..EmailAccountDocument::default()
        };
        let document = ItemDocument {
            is_offert: Some(true),
            activo: Some(false),
            ..ItemDocument::default()
        };

        let summary = summarize(
            ItemKind::Game,
            Platform::Ps4,
            ItemId::new("spider_man_2"),
            document,
            &[("a@b.com".into(), account)],
        );

        assert_eq!(summary.nombre, "Spider-Man 2");
        assert_eq!(summary.precio, Decimal::new(25, 0));
        assert_eq!(summary.precios, Some(quad));
        assert_eq!(summary.version, Platform::Ps5);
        assert_eq!(summary.tipo_promocion, PromotionType::Oferta);
        assert_eq!(summary.stock_accounts, 1);
        assert_eq!(summary.correos, ["a@b.com"]);
        assert!(!summary.activo);
    }
}
