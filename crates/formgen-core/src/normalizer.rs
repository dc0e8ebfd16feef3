//! Attribute normalizer — splits a raw attributes argument into four mappings
//!
//! # Slots
//!
//! A single mapping becomes the primary attributes. A slot list is read
//! positionally: `[primary, wrapper, label, extra]`; missing or `null`
//! slots yield empty mappings.
//!
//! # Guarantees
//!
//! - **Hygiene**: no resulting mapping contains an `id` key
//! - **Order**: keys keep the author's order
//! - **Copying**: the input is never aliased by the output

use crate::parser::ast::AttrSpec;
use crate::skeleton::{Attrs, Skeleton};
use crate::translation::TranslationRef;

/// Attributes after normalization, one mapping per slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedAttrs {
    pub attrs: Attrs<TranslationRef>,
    pub wrapper: Attrs<TranslationRef>,
    pub label: Attrs<TranslationRef>,
    pub extra: Attrs<TranslationRef>,
}

impl NormalizedAttrs {
    /// Install the four mappings on `element`, replacing what it had
    pub fn apply(self, element: &mut Skeleton) {
        element.attrs = self.attrs;
        element.wrapper_attrs = self.wrapper;
        element.label_attrs = self.label;
        element.extra_attrs = self.extra;
    }

    /// Every translation key referenced from any slot
    pub fn translation_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for map in [&self.attrs, &self.wrapper, &self.label, &self.extra] {
            for value in map.values() {
                value.visit_text(&mut |t: &TranslationRef| keys.push(t.key.clone()));
            }
        }
        keys
    }
}

/// Normalize a decoded attributes argument
pub fn normalize(spec: &AttrSpec) -> NormalizedAttrs {
    let mut out = match spec {
        AttrSpec::None => NormalizedAttrs::default(),
        AttrSpec::Single(attrs) => NormalizedAttrs {
            attrs: attrs.clone(),
            ..NormalizedAttrs::default()
        },
        AttrSpec::Slots(slots) => {
            let slot = |i: usize| {
                slots
                    .get(i)
                    .and_then(Option::as_ref)
                    .cloned()
                    .unwrap_or_default()
            };
            NormalizedAttrs {
                attrs: slot(0),
                wrapper: slot(1),
                label: slot(2),
                extra: slot(3),
            }
        }
    };
    for map in [&mut out.attrs, &mut out.wrapper, &mut out.label, &mut out.extra] {
        map.shift_remove("id");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::AttrValue;
    use crate::translation::tr;

    fn attrs(pairs: &[(&str, &str)]) -> Attrs<TranslationRef> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AttrValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_single_mapping_is_primary() {
        let out = normalize(&AttrSpec::Single(attrs(&[("class", "x"), ("id", "evil")])));
        assert_eq!(out.attrs, attrs(&[("class", "x")]));
        assert!(out.wrapper.is_empty());
        assert!(out.label.is_empty());
        assert!(out.extra.is_empty());
    }

    #[test]
    fn test_slots_positional() {
        let out = normalize(&AttrSpec::Slots(vec![
            None,
            Some(attrs(&[("class", "wrap"), ("id", "w")])),
            Some(attrs(&[("id", "l")])),
        ]));
        assert!(out.attrs.is_empty());
        assert_eq!(out.wrapper, attrs(&[("class", "wrap")]));
        assert!(out.label.is_empty());
        assert!(out.extra.is_empty());
    }

    #[test]
    fn test_id_never_survives() {
        let all = Some(attrs(&[("id", "x"), ("title", "t")]));
        let out = normalize(&AttrSpec::Slots(vec![all.clone(), all.clone(), all.clone(), all]));
        for map in [&out.attrs, &out.wrapper, &out.label, &out.extra] {
            assert!(!map.contains_key("id"));
            assert!(map.contains_key("title"));
        }
    }

    #[test]
    fn test_order_kept_after_removal() {
        let out = normalize(&AttrSpec::Single(attrs(&[("a", "1"), ("id", "x"), ("b", "2")])));
        let keys: Vec<&String> = out.attrs.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_translation_keys() {
        let mut primary = attrs(&[("class", "x")]);
        primary.insert("placeholder".into(), AttrValue::Text(tr("hint")));
        let mut extra = Attrs::new();
        extra.insert(
            "data".into(),
            AttrValue::List(vec![AttrValue::Text(tr("a")), AttrValue::from(1i64)]),
        );
        let out = normalize(&AttrSpec::Slots(vec![Some(primary), None, None, Some(extra)]));
        assert_eq!(out.translation_keys(), vec!["hint", "a"]);
    }
}
