//! Admin CRUD for catalog items and their email accounts.
//!
//! Every mutating call clears the platform's catalog cache before it writes,
//! so the next load reflects the change. Payloads are sparse: optional fields
//! that are absent or blank are never sent, because a null would overwrite a
//! value another client set.

use std::sync::Arc;

use futures::future::try_join_all;
use rust_decimal::Decimal;
use tracing::{error, info, instrument};

use zona_gamer_core::{Email, ItemId, ItemKind, Platform, PriceQuad, PromotionType};

use crate::cache::CatalogCache;
use crate::clock::Clock;
use crate::db::{DocumentStore, EmailAccountRepository, Fields, ItemRepository, Value, sparse};
use crate::error::{AppError, Result};
use crate::models::{EmailAccount, EmailAccountPatch, ItemPatch, NewEmailAccount, NewItem};
use crate::services::legacy::{self, LegacyWriter};

/// Item and email-account management for one item kind.
pub struct InventoryService {
    store: Arc<dyn DocumentStore>,
    cache: CatalogCache,
    clock: Arc<dyn Clock>,
    kind: ItemKind,
    legacy: LegacyWriter,
}

impl std::fmt::Debug for InventoryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryService")
            .field("kind", &self.kind)
            .field("legacy", &self.legacy)
            .finish_non_exhaustive()
    }
}

impl InventoryService {
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: CatalogCache,
        clock: Arc<dyn Clock>,
        kind: ItemKind,
        legacy: LegacyWriter,
    ) -> Self {
        Self {
            store,
            cache,
            clock,
            kind,
            legacy,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        self.kind
    }

    fn items(&self) -> ItemRepository<'_> {
        ItemRepository::new(self.store.as_ref(), self.kind)
    }

    fn accounts(&self) -> EmailAccountRepository<'_> {
        EmailAccountRepository::new(self.store.as_ref(), self.kind)
    }

    fn already_exists(&self, nombre: &str) -> AppError {
        let noun = match self.kind {
            ItemKind::Game => "El juego",
            ItemKind::Combo => "El combo",
        };
        AppError::AlreadyExists(format!("{noun} \"{nombre}\" ya existe en esta plataforma"))
    }

    // =========================================================================
    // Items
    // =========================================================================

    /// Create an item under the id derived from its name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the name is blank,
    /// `AppError::AlreadyExists` if an item with the same id exists, or
    /// `AppError::Database` if the write fails.
    #[instrument(skip(self, item), fields(kind = %self.kind, nombre = %item.nombre))]
    pub async fn create_item(&self, platform: Platform, item: NewItem) -> Result<ItemId> {
        let nombre = item.nombre.trim();
        if ItemId::slug(nombre).is_empty() {
            return Err(AppError::Validation("El nombre es obligatorio".to_string()));
        }
        let id = ItemId::from_name(nombre, self.kind);

        self.cache.clear(Some(platform));

        if self.items().exists(platform, &id).await? {
            return Err(self.already_exists(nombre));
        }

        let mut fields = Fields::new();
        fields.insert("createdAt".into(), Value::Timestamp(self.clock.now()));
        fields.insert("nombre".into(), Value::from(nombre));
        fields.insert(
            "version".into(),
            Value::from(item.version.unwrap_or(platform).as_str()),
        );
        self.legacy
            .put_price(&mut fields, item.precio.unwrap_or(Decimal::ZERO));
        fields.insert("juegos".into(), Value::from_serializable(&item.juegos)?);
        fields.insert("activo".into(), Value::Bool(true));

        if let Some(foto) = &item.foto {
            fields.insert("foto".into(), Value::from(foto.trim()));
        }
        if item.tipo_promocion.is_some() || item.is_offert.is_some() {
            let tipo = PromotionType::resolve(item.tipo_promocion, item.is_offert);
            self.legacy.put_promotion(&mut fields, tipo);
        }
        if let Some(referenced) = item.juego_referenciado {
            fields.insert("juegoReferenciado".into(), Value::from(referenced));
        }
        if let Some(precios) = &item.precios {
            fields.insert("precios".into(), Value::from_serializable(precios)?);
        }

        self.items()
            .create(platform, &id, sparse(fields))
            .await
            .inspect_err(|e| error!(error = %e, "Failed to create item"))?;

        info!(item = %id, "Item created");
        Ok(id)
    }

    /// Merge the present fields of `patch` into an item.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the write fails.
    #[instrument(skip(self, patch), fields(kind = %self.kind))]
    pub async fn update_item(&self, platform: Platform, id: &ItemId, patch: ItemPatch) -> Result<()> {
        self.cache.clear(Some(platform));

        let mut fields = Fields::new();
        if let Some(nombre) = patch.nombre {
            fields.insert("nombre".into(), Value::from(nombre.trim()));
        }
        if let Some(foto) = patch.foto {
            fields.insert("foto".into(), Value::from(foto.trim()));
        }
        if let Some(version) = patch.version {
            fields.insert("version".into(), Value::from(version.as_str()));
        }
        if let Some(activo) = patch.activo {
            fields.insert("activo".into(), Value::Bool(activo));
        }
        match (patch.tipo_promocion, patch.is_offert) {
            (Some(tipo), _) => self.legacy.put_promotion(&mut fields, tipo),
            (None, Some(is_offert)) => {
                fields.insert("isOffert".into(), Value::Bool(is_offert));
            }
            (None, None) => {}
        }
        if let Some(precio) = patch.precio {
            self.legacy.put_price(&mut fields, precio);
        }
        if let Some(juegos) = &patch.juegos {
            fields.insert("juegos".into(), Value::from_serializable(juegos)?);
        }
        if let Some(referenced) = patch.juego_referenciado {
            fields.insert("juegoReferenciado".into(), Value::from(referenced));
        }
        if let Some(precios) = &patch.precios {
            fields.insert("precios".into(), Value::from_serializable(precios)?);
        }

        let fields = sparse(fields);
        if fields.is_empty() {
            return Ok(());
        }

        self.items()
            .merge(platform, id, fields)
            .await
            .inspect_err(|e| error!(item = %id, error = %e, "Failed to update item"))?;
        Ok(())
    }

    /// Delete an item together with every account nested under it.
    ///
    /// The account deletes run concurrently and are awaited jointly before
    /// the item document itself is deleted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if listing or any delete fails. Accounts
    /// deleted before the failure stay deleted.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn delete_item(&self, platform: Platform, id: &ItemId) -> Result<()> {
        self.cache.clear(Some(platform));

        let paths = self.accounts().list_paths(platform, id).await?;
        let count = paths.len();
        try_join_all(paths.iter().map(|path| self.store.delete(path)))
            .await
            .inspect_err(|e| error!(item = %id, error = %e, "Failed to delete nested accounts"))?;

        self.items()
            .delete(platform, id)
            .await
            .inspect_err(|e| error!(item = %id, error = %e, "Failed to delete item"))?;

        info!(item = %id, accounts = count, "Item deleted");
        Ok(())
    }

    // =========================================================================
    // Email accounts
    // =========================================================================

    /// Every account of an item, with legacy fields filled in.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the listing fails.
    pub async fn list_accounts(&self, platform: Platform, item: &ItemId) -> Result<Vec<EmailAccount>> {
        let now = self.clock.now();
        let documents = self
            .accounts()
            .list(platform, item)
            .await
            .inspect_err(|e| error!(item = %item, error = %e, "Failed to list accounts"))?;

        Ok(documents
            .into_iter()
            .map(|(email, doc)| legacy::account_from_document(email, doc, platform, now))
            .collect())
    }

    /// One account, with legacy fields filled in.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the read fails.
    pub async fn get_account(
        &self,
        platform: Platform,
        item: &ItemId,
        email: &str,
    ) -> Result<Option<EmailAccount>> {
        let document = self.accounts().get(platform, item, email).await?;
        Ok(document.map(|doc| {
            legacy::account_from_document(email.to_owned(), doc, platform, self.clock.now())
        }))
    }

    /// Create an account, then propagate its prices to the parent item.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if `email` is not a usable address, or
    /// `AppError::Database` if either write fails.
    #[instrument(skip(self, account), fields(kind = %self.kind))]
    pub async fn create_account(
        &self,
        platform: Platform,
        item: &ItemId,
        email: &str,
        account: NewEmailAccount,
    ) -> Result<()> {
        let email = Email::parse(email).map_err(|e| AppError::Validation(e.to_string()))?;
        self.cache.clear(Some(platform));

        let now = self.clock.now();
        let precio = account.precio.unwrap_or(Decimal::ZERO);

        let mut fields = Fields::new();
        fields.insert("nombre".into(), Value::from(account.nombre.unwrap_or_default()));
        fields.insert("precio".into(), Value::from(precio));
        fields.insert(
            "version".into(),
            Value::from(account.version.unwrap_or(platform).as_str()),
        );
        fields.insert("fecha".into(), Value::Timestamp(account.fecha.unwrap_or(now)));
        fields.insert("createdAt".into(), Value::Timestamp(now));
        fields.insert("updatedAt".into(), Value::Timestamp(now));

        if let Some(precios) = &account.precios {
            fields.insert("precios".into(), Value::from_serializable(precios)?);
        }
        if let Some(costo) = account.costo {
            fields.insert("costo".into(), Value::from(costo));
        } else if self.legacy.enabled() {
            fields.insert("costo".into(), Value::from(precio));
        }
        if let Some(master) = account.codigo_master {
            fields.insert("codigoMaster".into(), Value::from(master));
        }
        if let Some(codigo) = account.codigo {
            fields.insert("codigo".into(), Value::from(codigo));
        }
        if let Some(created_by) = account.created_by {
            fields.insert("createdBy".into(), Value::from(created_by));
        }
        if let Some(codes) = &account.codigos_generados {
            fields.insert("codigosGenerados".into(), Value::from_serializable(codes)?);
        }
        if let Some(cuentas) = &account.cuentas {
            fields.insert("cuentas".into(), Value::from_serializable(cuentas)?);
        }
        if let Some(saldo) = account.saldo {
            fields.insert("saldo".into(), Value::from(saldo));
        }

        self.accounts()
            .create(platform, item, email.as_str(), sparse(fields))
            .await
            .inspect_err(|e| error!(item = %item, error = %e, "Failed to create account"))?;

        self.merge_parent_prices(platform, item, account.precios.as_ref(), account.costo)
            .await?;

        info!(item = %item, email = %email, "Account created");
        Ok(())
    }

    /// Replace the present fields of an account.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` (`NotFound` inside) if the account does
    /// not exist or the write fails.
    #[instrument(skip(self, patch), fields(kind = %self.kind))]
    pub async fn update_account(
        &self,
        platform: Platform,
        item: &ItemId,
        email: &str,
        patch: EmailAccountPatch,
    ) -> Result<()> {
        self.cache.clear(Some(platform));
        let touches_price = patch.touches_price();

        let mut fields = Fields::new();
        fields.insert("updatedAt".into(), Value::Timestamp(self.clock.now()));
        if let Some(nombre) = patch.nombre {
            fields.insert("nombre".into(), Value::from(nombre));
        }
        if let Some(precio) = patch.precio {
            self.legacy.put_price(&mut fields, precio);
        }
        if let Some(precios) = &patch.precios {
            fields.insert("precios".into(), Value::from_serializable(precios)?);
        }
        if let Some(costo) = patch.costo {
            fields.insert("costo".into(), Value::from(costo));
        }
        if let Some(version) = patch.version {
            fields.insert("version".into(), Value::from(version.as_str()));
        }
        if let Some(master) = patch.codigo_master {
            fields.insert("codigoMaster".into(), Value::from(master));
        }
        if let Some(codes) = &patch.codigos_generados {
            fields.insert("codigosGenerados".into(), Value::from_serializable(codes)?);
        }
        if let Some(fecha) = patch.fecha {
            fields.insert("fecha".into(), Value::Timestamp(fecha));
        }
        if let Some(codigo) = patch.codigo {
            fields.insert("codigo".into(), Value::from(codigo));
        }
        if let Some(cuentas) = &patch.cuentas {
            fields.insert("cuentas".into(), Value::from_serializable(cuentas)?);
        }
        if let Some(saldo) = patch.saldo {
            fields.insert("saldo".into(), Value::from(saldo));
        }

        self.accounts()
            .update(platform, item, email, sparse(fields))
            .await
            .inspect_err(|e| error!(item = %item, error = %e, "Failed to update account"))?;

        if touches_price {
            self.merge_parent_prices(platform, item, patch.precios.as_ref(), patch.costo)
                .await?;
        }
        Ok(())
    }

    /// Delete one account.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the delete fails.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub async fn delete_account(&self, platform: Platform, item: &ItemId, email: &str) -> Result<()> {
        self.cache.clear(Some(platform));
        self.accounts()
            .delete(platform, item, email)
            .await
            .inspect_err(|e| error!(item = %item, error = %e, "Failed to delete account"))?;
        Ok(())
    }

    /// Remove consumed verification codes from an account.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the account does not exist or the
    /// write fails.
    pub async fn remove_codes(
        &self,
        platform: Platform,
        item: &ItemId,
        email: &str,
        codes: &[String],
    ) -> Result<()> {
        self.cache.clear(Some(platform));
        self.accounts()
            .remove_codes(platform, item, email, codes)
            .await
            .inspect_err(|e| error!(item = %item, error = %e, "Failed to remove codes"))?;
        Ok(())
    }

    async fn merge_parent_prices(
        &self,
        platform: Platform,
        item: &ItemId,
        precios: Option<&PriceQuad>,
        costo: Option<Decimal>,
    ) -> Result<()> {
        let fields = self
            .legacy
            .parent_price_fields(precios, costo, self.clock.now())?;
        self.items()
            .merge(platform, item, fields)
            .await
            .inspect_err(|e| error!(item = %item, error = %e, "Failed to update item prices"))?;
        Ok(())
    }
}
