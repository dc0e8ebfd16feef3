//! Specification identifiers
//!
//! Grammar: `~? [A-Za-z_] [A-Za-z0-9_]*`. A leading `~` marks a verbatim
//! identifier: its bare name is used as its own translation key instead of
//! the hierarchical `owner-id` key. The `~` never becomes part of the id.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    pub name: String,
    pub verbatim: bool,
}

impl Ident {
    /// Parse a raw identifier, returning `None` if it is not legal
    pub fn parse(raw: &str) -> Option<Ident> {
        let (name, verbatim) = match raw.strip_prefix('~') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        if !is_valid_name(name) {
            return None;
        }
        Some(Ident {
            name: name.to_string(),
            verbatim,
        })
    }

    /// Identifier used as its own translation key
    pub fn verbatim(name: impl Into<String>) -> Ident {
        Ident {
            name: name.into(),
            verbatim: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    let Some((&first, rest)) = bytes.split_first() else {
        return false;
    };
    let head = |b: u8| b.is_ascii_alphabetic() || b == b'_';
    head(first) && rest.iter().all(|&b| head(b) || b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identifier() {
        let id = Ident::parse("field_1").unwrap();
        assert_eq!(id.name, "field_1");
        assert!(!id.verbatim);
    }

    #[test]
    fn test_verbatim_identifier() {
        let id = Ident::parse("~name").unwrap();
        assert_eq!(id.name, "name");
        assert!(id.verbatim);
        assert_eq!(id, Ident::verbatim("name"));
    }

    #[test]
    fn test_rejected_identifiers() {
        for raw in ["", "~", "1abc", "a-b", "a b", "~~a", "ä", "a.b"] {
            assert!(Ident::parse(raw).is_none(), "{:?} should be rejected", raw);
        }
    }

    #[test]
    fn test_underscore_start() {
        assert!(is_valid_name("_x9"));
        assert!(!is_valid_name("9x"));
    }
}
