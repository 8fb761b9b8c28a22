//! Enumerations shared between the catalog, the cart and the report log.
//!
//! Every enum here is stored verbatim in the document store and in local
//! storage, so the serde names are the exact strings the existing data uses
//! (`"PS4 & PS5"`, `"Principal PS4"`, `"oferta"`, ...).

use serde::{Deserialize, Serialize};

/// Error returned when a label does not match any variant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseLabelError {
    /// Name of the enum being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Defines an enum whose variants map one-to-one onto stored string labels.
///
/// Generates `as_str()`, `ALL`, `Display`, `FromStr` and serde renames.
macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored label for this variant.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ParseLabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(ParseLabelError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

labeled_enum! {
    /// Console family an item or email account is sold for.
    ///
    /// Also the second path segment of every catalog collection
    /// (`games/{platform}/juegos`).
    Platform ("platform") {
        /// Works on both consoles.
        Ps4AndPs5 => "PS4 & PS5",
        Ps4 => "PS4",
        Ps5 => "PS5",
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::Ps4AndPs5
    }
}

labeled_enum! {
    /// Slot an account owner occupies on a shared email account.
    AccountTier ("account tier") {
        PrincipalPs4 => "Principal PS4",
        SecundariaPs4 => "Secundaria PS4",
        PrincipalPs5 => "Principal PS5",
        SecundariaPs5 => "Secundaria PS5",
    }
}

impl AccountTier {
    /// Resolve a tier from a loosely written label.
    ///
    /// Case and whitespace are ignored, so `"principal ps5"` and
    /// `"PrincipalPS5"` both resolve to [`AccountTier::PrincipalPs5`].
    #[must_use]
    pub fn from_label_loose(label: &str) -> Option<Self> {
        let wanted: String = label
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        Self::ALL.iter().copied().find(|tier| {
            let candidate: String = tier.as_str().chars().filter(|c| !c.is_whitespace()).collect();
            candidate.to_lowercase() == wanted
        })
    }
}

labeled_enum! {
    /// How an item is highlighted in the storefront.
    ///
    /// Replaces the legacy `isOffert` boolean.
    PromotionType ("promotion type") {
        Ninguna => "ninguna",
        Oferta => "oferta",
        Promocion => "promocion",
    }
}

impl Default for PromotionType {
    fn default() -> Self {
        Self::Ninguna
    }
}

impl PromotionType {
    /// Resolve the promotion from the current field, falling back to the
    /// legacy `isOffert` flag.
    #[must_use]
    pub fn resolve(current: Option<Self>, legacy_is_offert: Option<bool>) -> Self {
        match (current, legacy_is_offert) {
            (Some(tipo), _) => tipo,
            (None, Some(true)) => Self::Oferta,
            (None, _) => Self::Ninguna,
        }
    }

    /// Value of the legacy `isOffert` flag kept in sync with this promotion.
    #[must_use]
    pub const fn legacy_is_offert(self) -> bool {
        matches!(self, Self::Oferta)
    }
}

labeled_enum! {
    /// Role stored in `users/{uid}`.
    UserRole ("user role") {
        /// Full access, including role management.
        Admin => "admin",
        /// Can fulfil orders and generate messages.
        Employee => "employee",
        /// Storefront customer.
        Client => "client",
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Client
    }
}

labeled_enum! {
    /// Console whose instructions a generated WhatsApp message carries.
    MessagePlatform ("message platform") {
        Ps4 => "PS4",
        Ps5 => "PS5",
    }
}

impl MessagePlatform {
    /// Template family for an account's platform.
    ///
    /// Accounts valid on both consoles get the PS4 instructions.
    #[must_use]
    pub const fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Ps5 => Self::Ps5,
            Platform::Ps4 | Platform::Ps4AndPs5 => Self::Ps4,
        }
    }
}

labeled_enum! {
    /// The two catalog hierarchies.
    ItemKind ("item kind") {
        /// `games/{platform}/juegos/{itemId}`
        Game => "juego",
        /// `combos/{platform}/combos/{itemId}`
        Combo => "combo",
    }
}

impl ItemKind {
    /// Top-level collection name.
    #[must_use]
    pub const fn root_collection(self) -> &'static str {
        match self {
            Self::Game => "games",
            Self::Combo => "combos",
        }
    }

    /// Item collection below the platform document.
    #[must_use]
    pub const fn item_collection(self) -> &'static str {
        match self {
            Self::Game => "juegos",
            Self::Combo => "combos",
        }
    }

    /// Local storage key prefix for the catalog cache.
    #[must_use]
    pub const fn cache_prefix(self) -> &'static str {
        match self {
            Self::Game => "games_cache_",
            Self::Combo => "combos_cache_",
        }
    }

    /// Suffix appended to generated slugs.
    #[must_use]
    pub const fn id_suffix(self) -> &'static str {
        match self {
            Self::Game => "",
            Self::Combo => "_combo",
        }
    }
}
