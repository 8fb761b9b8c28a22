//! Newtype IDs for type-safe document references.
//!
//! Every entity in the document store is addressed by a string document id.
//! Use the `define_id!` macro to create wrappers that prevent accidentally
//! passing a report id where a user uid is expected.

use crate::types::status::ItemKind;
use crate::types::text::strip_accents;

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`, `Default`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `Display`, `AsRef<str>` and `From<String>`/`From<&str>`
///
/// # Example
///
/// ```rust
/// # use zona_gamer_core::define_id;
/// define_id!(InvoiceId);
/// define_id!(ShipmentId);
///
/// let invoice = InvoiceId::new("inv_1");
/// let shipment = ShipmentId::new("inv_1");
///
/// // These are different types, so this won't compile:
/// // let _: InvoiceId = shipment;
/// # let _ = (invoice, shipment);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Default,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an existing document id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the document id.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the document id.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

define_id!(ItemId);
define_id!(ReportId);
define_id!(UserUid);

impl ItemId {
    /// Generate the slug an item is stored under.
    ///
    /// The name is lower-cased, accents are stripped, apostrophes are dropped,
    /// every other non-alphanumeric run collapses to a single `_`, leading and
    /// trailing underscores are trimmed, and the kind's suffix is appended.
    ///
    /// ```rust
    /// # use zona_gamer_core::{ItemId, ItemKind};
    /// let id = ItemId::from_name("Assassin's Creed!", ItemKind::Combo);
    /// assert_eq!(id.as_str(), "assassins_creed_combo");
    /// ```
    #[must_use]
    pub fn from_name(name: &str, kind: ItemKind) -> Self {
        Self(format!("{}{}", Self::slug(name), kind.id_suffix()))
    }

    /// The name part of an id, without the kind suffix.
    ///
    /// Empty when `name` has no letters or digits.
    #[must_use]
    pub fn slug(name: &str) -> String {
        let folded = strip_accents(&name.to_lowercase());

        let mut slug = String::with_capacity(folded.len());
        for c in folded.chars() {
            if matches!(c, '\'' | '\u{2019}' | '`') {
                continue;
            }
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                slug.push(c);
            } else if !slug.ends_with('_') {
                slug.push('_');
            }
        }

        slug.trim_matches('_').to_string()
    }

    /// Human-readable name derived from the slug.
    ///
    /// Used when neither the item document nor its accounts carry a `nombre`:
    /// `a_way_out` becomes `A Way Out`, and for combos the first `" Combo"`
    /// word is removed (`god_of_war_combo` becomes `God Of War`).
    #[must_use]
    pub fn display_name(&self, kind: ItemKind) -> String {
        let titled = self
            .0
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars).collect::<String>()
                })
            })
            .collect::<Vec<_>>()
            .join(" ");

        match kind {
            ItemKind::Combo => titled.replacen(" Combo", "", 1),
            ItemKind::Game => titled,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_combo_slug_drops_apostrophes_and_punctuation() {
        let id = ItemId::from_name("Assassin's Creed!", ItemKind::Combo);
        assert_eq!(id.as_str(), "assassins_creed_combo");
    }

    #[test]
    fn test_game_slug_strips_accents_and_collapses_separators() {
        let id = ItemId::from_name("  Pokémon -- Édición  Oro ", ItemKind::Game);
        assert_eq!(id.as_str(), "pokemon_edicion_oro");
    }

    #[test]
    fn test_slug_keeps_digits() {
        let id = ItemId::from_name("FIFA 25", ItemKind::Game);
        assert_eq!(id.as_str(), "fifa_25");
    }

    #[test]
    fn test_punctuation_only_name_has_empty_slug() {
        assert!(ItemId::slug("!!!").is_empty());
        assert_eq!(ItemId::from_name("!!!", ItemKind::Combo).as_str(), "_combo");
    }

    #[test]
    fn test_display_name_title_cases_words() {
        let id = ItemId::new("a_way_out");
        assert_eq!(id.display_name(ItemKind::Game), "A Way Out");
    }

    #[test]
    fn test_display_name_removes_combo_word() {
        let id = ItemId::new("god_of_war_combo");
        assert_eq!(id.display_name(ItemKind::Combo), "God Of War");
        assert_eq!(id.display_name(ItemKind::Game), "God Of War Combo");
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let uid = UserUid::new("abc123");
        assert_eq!(serde_json::to_string(&uid).unwrap(), "\"abc123\"");
        let parsed: ReportId = serde_json::from_str("\"r1\"").unwrap();
        assert_eq!(parsed.as_str(), "r1");
    }
}
