//! Admin search over every email account of a platform.
//!
//! Both searches walk the whole hierarchy (items, then each item's
//! `correos`), so they need a caller the security rules allow to read
//! accounts. A failing sub-fetch fails the search.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{error, info, instrument};

use zona_gamer_core::{ItemId, ItemKind, Platform, PriceQuad};

use crate::clock::Clock;
use crate::db::{DocumentStore, EmailAccountRepository, ItemRepository};
use crate::error::Result;
use crate::models::{AccountOwner, EmailAccount, EmailAccountDocument, ItemDocument, ItemSummary};
use crate::services::legacy;

/// Shortest trimmed query that triggers a search.
pub const MIN_QUERY_LEN: usize = 3;

/// Phone digit runs at least this long may match inside longer numbers.
const MIN_PHONE_DIGITS: usize = 6;

/// One matching account.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub item: ItemSummary,
    pub account: EmailAccount,
    /// The owner whose phone matched. `None` for email searches.
    pub owner: Option<AccountOwner>,
}

/// Search by customer phone or account email.
pub struct SearchService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchService").finish_non_exhaustive()
    }
}

impl SearchService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Accounts with an owner whose phone matches `query`.
    ///
    /// One hit per matching owner.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if any listing fails.
    #[instrument(skip(self))]
    pub async fn by_phone(
        &self,
        kind: ItemKind,
        platform: Platform,
        query: &str,
    ) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }
        let wanted = PhoneKey::new(query);

        let mut hits = Vec::new();
        for (id, item, accounts) in self.walk(kind, platform).await? {
            for (email, account) in accounts {
                let owners: Vec<AccountOwner> = account
                    .cuentas
                    .iter()
                    .flatten()
                    .filter(|owner| !owner.telefono.is_empty())
                    .filter(|owner| wanted.matches(&PhoneKey::new(&owner.telefono)))
                    .cloned()
                    .collect();
                for owner in owners {
                    let mut hit = self.hit(kind, platform, &id, &item, &email, account.clone());
                    hit.owner = Some(owner);
                    hits.push(hit);
                }
            }
        }

        info!(results = hits.len(), "Phone search finished");
        Ok(hits)
    }

    /// Accounts whose email contains `query` or is contained in it,
    /// ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if any listing fails.
    #[instrument(skip(self))]
    pub async fn by_email(
        &self,
        kind: ItemKind,
        platform: Platform,
        query: &str,
    ) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Ok(Vec::new());
        }
        let wanted = query.to_lowercase();

        let mut hits = Vec::new();
        for (id, item, accounts) in self.walk(kind, platform).await? {
            for (email, account) in accounts {
                let candidate = email.to_lowercase();
                if candidate.contains(&wanted) || wanted.contains(&candidate) {
                    hits.push(self.hit(kind, platform, &id, &item, &email, account));
                }
            }
        }

        info!(results = hits.len(), "Email search finished");
        Ok(hits)
    }

    async fn walk(
        &self,
        kind: ItemKind,
        platform: Platform,
    ) -> Result<Vec<(ItemId, ItemDocument, Vec<(String, EmailAccountDocument)>)>> {
        let items = ItemRepository::new(self.store.as_ref(), kind)
            .list(platform)
            .await
            .inspect_err(|e| error!(error = %e, "Search failed to list items"))?;

        let repo = EmailAccountRepository::new(self.store.as_ref(), kind);
        let accounts = try_join_all(items.iter().map(|(id, _)| repo.list(platform, id)))
            .await
            .inspect_err(|e| error!(error = %e, "Search failed to list accounts"))?;

        Ok(items
            .into_iter()
            .zip(accounts)
            .map(|((id, item), accounts)| (id, item, accounts))
            .collect())
    }

    /// Hit entry with a flat price: every dollar tier carries the item's
    /// single price, peso tiers are zero and the account counts are empty.
    fn hit(
        &self,
        kind: ItemKind,
        platform: Platform,
        id: &ItemId,
        item: &ItemDocument,
        email: &str,
        account: EmailAccountDocument,
    ) -> SearchHit {
        let precio = legacy::item_single_price(item, Some(&account));
        let nombre = item
            .nombre
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| account.nombre.clone().filter(|n| !n.is_empty()))
            .unwrap_or_else(|| id.display_name(kind));
        let version = item.version.or(account.version).unwrap_or(platform);

        let mut summary = ItemSummary::new(id.clone(), nombre, precio, version);
        summary.foto = item.foto.clone();
        summary.is_offert = item.is_offert.unwrap_or(false);
        summary.tipo_promocion = legacy::item_promotion(item);
        summary.juegos = item.juegos.clone().unwrap_or_default();
        summary.juego_referenciado = item.juego_referenciado.clone();

        let mut account =
            legacy::account_from_document(email.to_owned(), account, platform, self.clock.now());
        account.precio = precio;
        account.precios = PriceQuad::uniform(precio);
        account.costo = precio;

        SearchHit {
            item: summary,
            account,
            owner: None,
        }
    }
}

/// Phone number in the two forms the matcher compares.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PhoneKey {
    /// Lower-cased with all whitespace removed.
    compact: String,
    /// Only the ASCII digits.
    digits: String,
}

impl PhoneKey {
    fn new(raw: &str) -> Self {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        let digits = compact.chars().filter(char::is_ascii_digit).collect();
        Self { compact, digits }
    }

    /// Loose phone match.
    ///
    /// Equal or mutually contained compact forms match. Digit forms are only
    /// compared when both are non-empty, so punctuation-only input never
    /// matches everything.
    fn matches(&self, stored: &Self) -> bool {
        if self.compact == stored.compact
            || stored.compact.contains(&self.compact)
            || self.compact.contains(&stored.compact)
        {
            return true;
        }

        if self.digits.is_empty() || stored.digits.is_empty() {
            return false;
        }

        stored.digits.contains(&self.digits)
            || self.digits.contains(&stored.digits)
            || (self.digits.len() >= MIN_PHONE_DIGITS && stored.digits.contains(&self.digits))
            || (stored.digits.len() >= MIN_PHONE_DIGITS && self.digits.contains(&stored.digits))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::{Fields, InMemoryStore, Value};

    fn matches(query: &str, stored: &str) -> bool {
        PhoneKey::new(query).matches(&PhoneKey::new(stored))
    }

    #[test]
    fn test_phone_with_spaces_matches() {
        assert!(matches("0991234567", "099 123 4567"));
        assert!(matches("099 123 4567", "0991234567"));
        assert!(matches("+593 99 123 4567", "991234567"));
    }

    #[test]
    fn test_unrelated_fragment_does_not_match() {
        assert!(!matches("5555", "099 123 4567"));
        assert!(!matches("abc", "099 123 4567"));
    }

    #[test]
    fn test_empty_digit_forms_are_ignored() {
        assert!(!matches("---", "0991234567"));
        assert!(!matches("0991234567", "n/a"));
    }

    fn owner(telefono: &str) -> Value {
        let mut owner = Fields::new();
        owner.insert("nombre".into(), Value::from("Ana"));
        owner.insert("telefono".into(), Value::from(telefono));
        owner.insert("hasStock".into(), Value::Bool(true));
        Value::Map(owner)
    }

    async fn seeded() -> (Arc<InMemoryStore>, SearchService) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));

        let items = ItemRepository::new(store.as_ref(), ItemKind::Combo);
        let id = ItemId::new("god_of_war_combo");
        let mut item = Fields::new();
        item.insert("precio".into(), Value::Integer(30));
        item.insert("isOffert".into(), Value::Bool(true));
        items.create(Platform::Ps4, &id, item).await.unwrap();

        let accounts = EmailAccountRepository::new(store.as_ref(), ItemKind::Combo);
        let mut account = Fields::new();
        account.insert(
            "cuentas".into(),
            Value::Array(vec![owner("099 123 4567"), owner("0987654321")]),
        );
        account.insert("codigoMaster".into(), Value::from("secret"));
        accounts
            .create(Platform::Ps4, &id, "Cliente@ZonaGamer.com", account)
            .await
            .unwrap();

        let search = SearchService::new(store.clone(), clock);
        (store, search)
    }

    #[tokio::test]
    async fn test_by_phone_returns_matching_owner() {
        let (_, search) = seeded().await;

        let hits = search
            .by_phone(ItemKind::Combo, Platform::Ps4, "0991234567")
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        let hit = hits.first().unwrap();
        assert_eq!(hit.owner.as_ref().unwrap().telefono, "099 123 4567");
        assert_eq!(hit.item.nombre, "God Of War");
        assert_eq!(hit.item.precios, Some(PriceQuad::uniform(Decimal::new(30, 0))));
        assert_eq!(hit.item.total_correos, 0);
        assert_eq!(hit.account.precios.ps4_principal_cop, Decimal::ZERO);
        assert_eq!(hit.account.codigo_master, "secret");
    }

    #[tokio::test]
    async fn test_short_query_returns_nothing() {
        let (store, search) = seeded().await;
        let calls = store.list_calls();

        let hits = search
            .by_email(ItemKind::Combo, Platform::Ps4, "  ab ")
            .await
            .unwrap();

        assert!(hits.is_empty());
        assert_eq!(store.list_calls(), calls);
    }

    #[tokio::test]
    async fn test_by_email_ignores_case() {
        let (_, search) = seeded().await;

        let hits = search
            .by_email(ItemKind::Combo, Platform::Ps4, "cliente@zona")
            .await
            .unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits.first().unwrap().account.email, "Cliente@ZonaGamer.com");
    }

    #[tokio::test]
    async fn test_denied_accounts_fail_the_search() {
        let (store, search) = seeded().await;
        store.deny_reads("correos");

        let err = search
            .by_email(ItemKind::Combo, Platform::Ps4, "cliente")
            .await
            .unwrap_err();

        assert!(err.is_permission_denied());
    }
}
