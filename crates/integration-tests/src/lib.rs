//! Integration tests for the Zona Gamer data layer.
//!
//! Every test drives a full [`AppState`] over the in-memory document store,
//! map-backed local storage and a manual clock, so the whole suite runs
//! offline.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p zona-gamer-integration-tests
//! RUST_LOG=zona_gamer_storefront=debug cargo test -p zona-gamer-integration-tests
//! ```

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use zona_gamer_core::{ItemId, ItemKind, Platform};
use zona_gamer_storefront::clock::ManualClock;
use zona_gamer_storefront::config::StoreSettings;
use zona_gamer_storefront::db::InMemoryStore;
use zona_gamer_storefront::error::Result;
use zona_gamer_storefront::models::{AccountOwner, NewEmailAccount, NewItem};
use zona_gamer_storefront::services::auth::InMemoryAuthProvider;
use zona_gamer_storefront::state::AppState;
use zona_gamer_storefront::storage::MemoryStorage;

/// Install a log subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_test_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "zona_gamer_storefront=warn".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Start time of every test clock.
#[must_use]
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}

/// An [`AppState`] plus handles on its fakes.
pub struct TestContext {
    pub state: AppState,
    pub store: Arc<InMemoryStore>,
    pub storage: Arc<MemoryStorage>,
    pub clock: Arc<ManualClock>,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self::with_storage(Arc::new(MemoryStorage::new()))
    }

    /// Context over existing local storage, as after an application restart.
    #[must_use]
    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        init_test_tracing();
        let clock = Arc::new(ManualClock::new(start_time()));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let auth = Arc::new(InMemoryAuthProvider::new().with_account(
            "admin-uid",
            "admin@zonagamer.com",
            "secreto123",
        ));
        let state = AppState::new(
            StoreSettings::default(),
            store.clone(),
            storage.clone(),
            auth,
            clock.clone(),
        );
        Self {
            state,
            store,
            storage,
            clock,
        }
    }

    /// Create an item priced at `precio` and return its id.
    ///
    /// # Errors
    ///
    /// Returns the inventory error if the item cannot be written.
    pub async fn seed_item(
        &self,
        kind: ItemKind,
        platform: Platform,
        nombre: &str,
        precio: i64,
    ) -> Result<ItemId> {
        self.state
            .inventory(kind)
            .create_item(
                platform,
                NewItem {
                    nombre: nombre.to_owned(),
                    precio: Some(Decimal::new(precio, 0)),
                    ..NewItem::default()
                },
            )
            .await
    }

    /// Create an account under `item` with the given codes and owners.
    ///
    /// # Errors
    ///
    /// Returns the inventory error if the account cannot be written.
    pub async fn seed_account(
        &self,
        kind: ItemKind,
        platform: Platform,
        item: &ItemId,
        email: &str,
        codes: &[&str],
        owners: Vec<AccountOwner>,
    ) -> Result<()> {
        self.state
            .inventory(kind)
            .create_account(
                platform,
                item,
                email,
                NewEmailAccount {
                    precio: Some(Decimal::new(20, 0)),
                    codigo_master: Some("clave-master".to_owned()),
                    codigos_generados: Some(codes.iter().map(ToString::to_string).collect()),
                    cuentas: Some(owners),
                    ..NewEmailAccount::default()
                },
            )
            .await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
