//! Expansion engine — materializes a skeleton for one locale
//!
//! Expansion walks the skeleton depth-first: literals pass through,
//! translation references are resolved against the provider, lists and
//! mappings are rebuilt element-wise keeping order and keys.
//!
//! # Caching
//!
//! Results are memoized per locale (`Translator::current_locale`, or the
//! empty string without one). A cached expansion is handed out as the same
//! `Arc` until a forced refresh replaces it. The lock is not held while
//! expanding; two concurrent forced refreshes of one locale both compute
//! and the last to finish wins.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::skeleton::{Expanded, Skeleton};
use crate::translation::{TranslationRef, Translator};

/// Cache key for `translator`
pub fn locale_of(translator: Option<&dyn Translator>) -> String {
    translator
        .and_then(|t| t.current_locale())
        .unwrap_or_default()
}

/// Expand without caching
pub fn materialize(skeleton: &Skeleton, translator: Option<&dyn Translator>) -> Expanded {
    skeleton.map_text(&mut |t: &TranslationRef| t.resolve(translator))
}

/// Per-locale expansion memo owned by a form or menu
#[derive(Debug, Default)]
pub struct ExpansionCache {
    slots: Mutex<HashMap<String, Arc<Expanded>>>,
}

impl ExpansionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Arc<Expanded>>> {
        // A poisoned map holds only complete expansions
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached expansion for the translator's locale, computing it if needed
    pub fn expand(
        &self,
        skeleton: &Skeleton,
        translator: Option<&dyn Translator>,
        force: bool,
    ) -> Arc<Expanded> {
        let locale = locale_of(translator);
        if !force {
            if let Some(hit) = self.slots().get(&locale) {
                tracing::trace!(locale = %locale, "expansion cache hit");
                return Arc::clone(hit);
            }
        }

        tracing::debug!(locale = %locale, force, "expanding skeleton");
        let expanded = Arc::new(materialize(skeleton, translator));
        self.slots().insert(locale, Arc::clone(&expanded));
        expanded
    }

    /// Cached expansion for `locale`, if any
    pub fn cached(&self, locale: &str) -> Option<Arc<Expanded>> {
        self.slots().get(locale).cloned()
    }

    /// Drop every cached expansion
    pub fn invalidate(&self) {
        self.slots().clear();
    }

    pub fn locales(&self) -> Vec<String> {
        let mut locales: Vec<String> = self.slots().keys().cloned().collect();
        locales.sort();
        locales
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::{AttrValue, Element, ElementKind};
    use crate::translation::tr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Locale {
        name: &'static str,
        calls: AtomicUsize,
    }

    impl Locale {
        fn new(name: &'static str) -> Self {
            Locale {
                name,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Translator for Locale {
        fn translate(&self, key: &str, _args: &[String]) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("{}:{}", self.name, key)
        }

        fn current_locale(&self) -> Option<String> {
            Some(self.name.to_string())
        }
    }

    fn skeleton() -> Skeleton {
        let mut root = Element::new(Some("F".into()), ElementKind::Form);
        let mut field = Element::new(Some("F-x".into()), ElementKind::Text);
        field.label = Some(tr("F-x"));
        field.attrs.insert("name".into(), AttrValue::from("x"));
        field.attrs.insert(
            "data-list".into(),
            AttrValue::List(vec![AttrValue::Text(tr("a")), AttrValue::from(true)]),
        );
        root.entries.push(field);
        root
    }

    #[test]
    fn test_without_provider_yields_keys() {
        let cache = ExpansionCache::new();
        let out = cache.expand(&skeleton(), None, false);
        assert_eq!(out.entries[0].label.as_deref(), Some("F-x"));
        assert_eq!(cache.locales(), vec![String::new()]);
    }

    #[test]
    fn test_cached_is_same_arc() {
        let cache = ExpansionCache::new();
        let en = Locale::new("en");
        let skel = skeleton();
        let first = cache.expand(&skel, Some(&en), false);
        let second = cache.expand(&skel, Some(&en), false);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(en.calls.load(Ordering::SeqCst), 2);
        assert_eq!(first.entries[0].label.as_deref(), Some("en:F-x"));
        assert_eq!(first.entries[0].attrs["name"].as_str(), Some("x"));
    }

    #[test]
    fn test_forced_refresh_replaces_slot() {
        let cache = ExpansionCache::new();
        let en = Locale::new("en");
        let skel = skeleton();
        let first = cache.expand(&skel, Some(&en), false);
        let forced = cache.expand(&skel, Some(&en), true);
        assert!(!Arc::ptr_eq(&first, &forced));
        assert_eq!(*first, *forced);
        assert!(Arc::ptr_eq(&forced, &cache.cached("en").unwrap()));
    }

    #[test]
    fn test_locales_are_independent() {
        let cache = ExpansionCache::new();
        let skel = skeleton();
        let en = cache.expand(&skel, Some(&Locale::new("en")), false);
        let ru = cache.expand(&skel, Some(&Locale::new("ru")), false);
        assert_eq!(en.entries[0].label.as_deref(), Some("en:F-x"));
        assert_eq!(ru.entries[0].label.as_deref(), Some("ru:F-x"));
        assert_eq!(cache.locales(), vec!["en".to_string(), "ru".to_string()]);
        cache.invalidate();
        assert!(cache.cached("en").is_none());
    }
}
