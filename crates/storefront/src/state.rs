//! Application state shared across callers.

use std::sync::Arc;

use tracing::info;

use zona_gamer_core::ItemKind;

use crate::cache::CatalogCache;
use crate::clock::{Clock, SystemClock};
use crate::config::{StoreSettings, StorefrontConfig};
use crate::db::{DocumentStore, FirestoreClient};
use crate::error::Result;
use crate::models::SessionToken;
use crate::services::auth::{AuthProvider, AuthService, IdentityToolkitClient};
use crate::services::cart::CartService;
use crate::services::catalog::CatalogService;
use crate::services::currency::CurrencyService;
use crate::services::inventory::InventoryService;
use crate::services::legacy::LegacyWriter;
use crate::services::reports::ReportService;
use crate::services::roles::RoleService;
use crate::services::search::SearchService;
use crate::services::whatsapp::MessageComposer;
use crate::storage::{FileStorage, LocalStorage};
use crate::tasks::BackgroundTasks;

/// Application state shared across all callers.
///
/// This struct is cheaply cloneable via `Arc` and owns every service of the
/// data layer. Collaborators are injected so tests can run against the
/// in-memory store, map storage and a manual clock.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    settings: StoreSettings,
    games: CatalogService,
    combos: CatalogService,
    games_inventory: Arc<InventoryService>,
    combos_inventory: Arc<InventoryService>,
    search: SearchService,
    reports: Arc<ReportService>,
    roles: RoleService,
    auth: AuthService,
    cart: CartService,
    currency: CurrencyService,
    composer: MessageComposer,
    tasks: BackgroundTasks,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Wire every service over the given collaborators.
    #[must_use]
    pub fn new(
        settings: StoreSettings,
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn LocalStorage>,
        auth_provider: Arc<dyn AuthProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = |kind| {
            CatalogCache::new(
                Arc::clone(&storage),
                Arc::clone(&clock),
                kind,
                settings.cache_ttl(kind),
            )
        };
        let legacy = LegacyWriter::new(settings.write_legacy_fields);
        let inventory = |kind| {
            Arc::new(InventoryService::new(
                Arc::clone(&store),
                cache(kind),
                Arc::clone(&clock),
                kind,
                legacy,
            ))
        };

        let games_inventory = inventory(ItemKind::Game);
        let combos_inventory = inventory(ItemKind::Combo);
        let reports = Arc::new(ReportService::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            settings.reports_limit,
        ));
        let tasks = BackgroundTasks::new();
        let composer = MessageComposer::new(
            Arc::clone(&games_inventory),
            Arc::clone(&combos_inventory),
            Arc::clone(&reports),
            tasks.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                games: CatalogService::new(Arc::clone(&store), cache(ItemKind::Game), ItemKind::Game),
                combos: CatalogService::new(
                    Arc::clone(&store),
                    cache(ItemKind::Combo),
                    ItemKind::Combo,
                ),
                games_inventory,
                combos_inventory,
                search: SearchService::new(Arc::clone(&store), Arc::clone(&clock)),
                reports,
                roles: RoleService::new(Arc::clone(&store), Arc::clone(&clock)),
                auth: AuthService::new(auth_provider, Arc::clone(&storage), Arc::clone(&clock)),
                cart: CartService::new(Arc::clone(&storage)),
                currency: CurrencyService::new(storage),
                composer,
                tasks,
                settings,
            }),
        }
    }

    /// Build the production state: Firestore, Identity Toolkit and a JSON
    /// file for local storage, sharing one session token.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Storage` if the storage file exists but cannot be
    /// read.
    pub fn from_config(config: &StorefrontConfig) -> Result<Self> {
        let token = SessionToken::new();
        let store = Arc::new(FirestoreClient::new(&config.firebase, token.clone()));
        let auth = Arc::new(IdentityToolkitClient::new(&config.firebase, token));
        let storage = Arc::new(FileStorage::open(&config.storage_path)?);

        info!(
            project = %config.firebase.project_id,
            storage = %config.storage_path.display(),
            "Storefront data layer ready"
        );
        Ok(Self::new(
            config.settings.clone(),
            store,
            storage,
            auth,
            Arc::new(SystemClock),
        ))
    }

    #[must_use]
    pub fn settings(&self) -> &StoreSettings {
        &self.inner.settings
    }

    /// Catalog of games or combos.
    #[must_use]
    pub fn catalog(&self, kind: ItemKind) -> &CatalogService {
        match kind {
            ItemKind::Game => &self.inner.games,
            ItemKind::Combo => &self.inner.combos,
        }
    }

    /// Item and account administration for games or combos.
    #[must_use]
    pub fn inventory(&self, kind: ItemKind) -> &InventoryService {
        match kind {
            ItemKind::Game => &self.inner.games_inventory,
            ItemKind::Combo => &self.inner.combos_inventory,
        }
    }

    #[must_use]
    pub fn search(&self) -> &SearchService {
        &self.inner.search
    }

    #[must_use]
    pub fn reports(&self) -> &ReportService {
        &self.inner.reports
    }

    #[must_use]
    pub fn roles(&self) -> &RoleService {
        &self.inner.roles
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn currency(&self) -> &CurrencyService {
        &self.inner.currency
    }

    #[must_use]
    pub fn composer(&self) -> &MessageComposer {
        &self.inner.composer
    }

    #[must_use]
    pub fn tasks(&self) -> &BackgroundTasks {
        &self.inner.tasks
    }

    /// Drop everything held in memory: catalog lists, the current user and
    /// the loaded reports. Local storage (cart, currency, cache) is kept.
    pub fn reset(&self) {
        self.inner.games.reset();
        self.inner.combos.reset();
        self.inner.reports.reset();
        self.inner.roles.reset();
        self.inner.auth.reset();
        self.inner.composer.reset();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use zona_gamer_core::Platform;

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::InMemoryStore;
    use crate::models::NewItem;
    use crate::services::auth::InMemoryAuthProvider;
    use crate::storage::MemoryStorage;

    fn state() -> AppState {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 10, 0, 0).unwrap(),
        ));
        AppState::new(
            StoreSettings::default(),
            Arc::new(InMemoryStore::with_clock(clock.clone())),
            Arc::new(MemoryStorage::new()),
            Arc::new(InMemoryAuthProvider::new()),
            clock,
        )
    }

    #[tokio::test]
    async fn test_clones_share_services() {
        let state = state();
        let other = state.clone();

        state
            .inventory(ItemKind::Game)
            .create_item(
                Platform::Ps5,
                NewItem {
                    nombre: "Fifa 25".into(),
                    ..NewItem::default()
                },
            )
            .await
            .unwrap();
        other.catalog(ItemKind::Game).load(Platform::Ps5, false).await.unwrap();

        assert_eq!(state.catalog(ItemKind::Game).items().len(), 1);
        assert!(state.catalog(ItemKind::Combo).items().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_memory_only() {
        let state = state();
        state
            .inventory(ItemKind::Game)
            .create_item(
                Platform::Ps4,
                NewItem {
                    nombre: "Gta V".into(),
                    ..NewItem::default()
                },
            )
            .await
            .unwrap();
        let items = state.catalog(ItemKind::Game).load(Platform::Ps4, false).await.unwrap();
        state
            .cart()
            .add_to_cart(items.first().unwrap().clone(), 1, None);

        state.reset();

        assert!(state.catalog(ItemKind::Game).items().is_empty());
        assert_eq!(state.cart().total_items(), 1);
    }
}
