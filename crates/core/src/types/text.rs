//! Text normalization helpers shared by slug generation and sorting.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Decompose `s` (NFD) and drop every combining mark.
///
/// `"Fútbol Ñandú"` becomes `"Futbol Nandu"`.
#[must_use]
pub fn strip_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Build a comparison key that ignores accents and letter case.
///
/// Catalog listings sort on this key so that `"Árbol"` and `"arbol"` compare
/// equal and sit next to `"Arena"`.
#[must_use]
pub fn fold_for_compare(s: &str) -> String {
    strip_accents(s).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_accents() {
        assert_eq!(strip_accents("Fútbol Ñandú"), "Futbol Nandu");
        assert_eq!(strip_accents("plain"), "plain");
    }

    #[test]
    fn test_fold_for_compare() {
        assert_eq!(fold_for_compare("Árbol"), fold_for_compare("arbol"));
        assert!(fold_for_compare("Árbol") < fold_for_compare("Arena"));
    }
}
