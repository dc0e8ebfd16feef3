//! Deferred translations and the translation provider seam
//!
//! Human-readable strings never live in a skeleton as text. They are kept
//! as [`TranslationRef`] values (a key plus arguments) and resolved against
//! a [`Translator`] only when a skeleton is expanded for a locale.
//!
//! Resolution never fails: without a provider, or with a provider that
//! lacks the needed capability, the raw key is returned.

use serde::{Deserialize, Serialize};

/// Translation provider consumed by expansion and by validators
pub trait Translator: Send + Sync {
    /// Translate `key`, substituting `args`
    fn translate(&self, key: &str, args: &[String]) -> String;

    /// Plural-aware translation; `None` means the capability is missing
    fn translate_plural(&self, _key: &str, _args: &[String]) -> Option<String> {
        None
    }

    /// Locale the provider currently translates into
    fn current_locale(&self) -> Option<String> {
        None
    }
}

/// Receives every translation key created while compiling a specification
///
/// Used to pre-populate locale resource files with the keys a form needs.
pub trait LocaleSink {
    fn register(&self, locale: &str, key: &str);
}

/// Locale generation settings for one compile
pub struct LocaleGeneration<'a> {
    pub locales: Vec<String>,
    pub sink: &'a dyn LocaleSink,
}

impl<'a> LocaleGeneration<'a> {
    pub fn new<S: Into<String>>(sink: &'a dyn LocaleSink, locales: impl IntoIterator<Item = S>) -> Self {
        LocaleGeneration {
            locales: locales.into_iter().map(Into::into).collect(),
            sink,
        }
    }

    /// Register `key` once per configured locale
    pub fn announce(&self, key: &str) {
        for locale in &self.locales {
            tracing::trace!(locale = %locale, key, "registering translation key");
            self.sink.register(locale, key);
        }
    }
}

/// A deferred, locale-independent string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TranslationRef {
    #[serde(rename = "__")]
    pub key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub plural: bool,
}

impl TranslationRef {
    pub fn new(key: impl Into<String>) -> Self {
        TranslationRef {
            key: key.into(),
            args: Vec::new(),
            plural: false,
        }
    }

    pub fn with_args<S: Into<String>>(key: impl Into<String>, args: impl IntoIterator<Item = S>) -> Self {
        TranslationRef {
            key: key.into(),
            args: args.into_iter().map(Into::into).collect(),
            plural: false,
        }
    }

    /// Plural form; by convention `args` are `[plural, count]`
    pub fn plural<S: Into<String>>(key: impl Into<String>, args: impl IntoIterator<Item = S>) -> Self {
        TranslationRef {
            plural: true,
            ..TranslationRef::with_args(key, args)
        }
    }

    /// Resolve against `translator`, degrading to the raw key
    pub fn resolve(&self, translator: Option<&dyn Translator>) -> String {
        match translator {
            None => self.key.clone(),
            Some(t) if self.plural => t
                .translate_plural(&self.key, &self.args)
                .unwrap_or_else(|| self.key.clone()),
            Some(t) => t.translate(&self.key, &self.args),
        }
    }
}

/// Replace each `%s` in `template` with the next argument; extra marks stay
pub fn substitute(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(pos) = rest.find("%s") {
        out.push_str(&rest[..pos]);
        match args.next() {
            Some(arg) => out.push_str(arg),
            None => out.push_str("%s"),
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

/// Shorthand for a plain translation reference
pub fn tr(key: impl Into<String>) -> TranslationRef {
    TranslationRef::new(key)
}
