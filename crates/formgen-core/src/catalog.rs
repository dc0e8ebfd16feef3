//! JSON locale catalogs
//!
//! One file per locale, `<dir>/<locale>.json`, mapping translation keys to
//! either a string or a plural pair `{"one": .., "other": ..}`. `%s` marks
//! are replaced by the arguments in order.
//!
//! [`Catalog`] is a read-only [`Translator`]. [`CatalogSet`] is the
//! [`LocaleSink`] used for locale generation: it adds every announced key
//! missing from a locale (with the key itself as the text) and writes the
//! files back.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::Error;
use crate::translation::{substitute, LocaleSink, Translator};
use crate::Result;

type Entries = IndexMap<String, Value>;

/// Locale names are limited to `[A-Za-z0-9_-]+`
pub fn is_locale_name(locale: &str) -> bool {
    !locale.is_empty()
        && locale
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Path of the catalog file for `locale` under `dir`
///
/// Fails for locale names that could leave `dir`.
pub fn catalog_path(dir: &Path, locale: &str) -> Result<PathBuf> {
    if !is_locale_name(locale) {
        return Err(catalog_error(dir, format!("invalid locale name \"{}\"", locale)));
    }
    Ok(dir.join(format!("{}.json", locale)))
}

fn catalog_error(path: &Path, message: impl ToString) -> Error {
    Error::Catalog {
        path: path.display().to_string(),
        message: message.to_string(),
    }
}

fn read_entries(path: &Path) -> Result<Entries> {
    let text = fs::read_to_string(path).map_err(|e| catalog_error(path, e))?;
    serde_json::from_str(&text).map_err(|e| catalog_error(path, e))
}

/// Translations for one locale
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    locale: String,
    entries: Entries,
}

impl Catalog {
    pub fn new(locale: impl Into<String>, entries: Entries) -> Self {
        Catalog {
            locale: locale.into(),
            entries,
        }
    }

    /// Load `<dir>/<locale>.json`
    pub fn load(dir: &Path, locale: &str) -> Result<Self> {
        let path = catalog_path(dir, locale)?;
        let entries = read_entries(&path)?;
        tracing::debug!(locale, keys = entries.len(), "catalog loaded");
        Ok(Catalog::new(locale, entries))
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    fn text(&self, key: &str, form: &str) -> Option<&str> {
        match self.entries.get(key)? {
            Value::String(s) => Some(s),
            Value::Object(forms) => forms.get(form).and_then(Value::as_str),
            _ => None,
        }
    }
}

impl Translator for Catalog {
    fn translate(&self, key: &str, args: &[String]) -> String {
        substitute(self.text(key, "one").unwrap_or(key), args)
    }

    /// `args` are `[plural, count, ...]`
    fn translate_plural(&self, key: &str, args: &[String]) -> Option<String> {
        let plural = args.first().map(String::as_str).unwrap_or(key);
        let count = args.get(1).cloned().unwrap_or_default();
        let form = if count.trim() == "1" { "one" } else { "other" };
        let fallback = if form == "one" { key } else { plural };
        let template = self.text(key, form).unwrap_or(fallback);
        Some(substitute(template, std::slice::from_ref(&count)))
    }

    fn current_locale(&self) -> Option<String> {
        Some(self.locale.clone())
    }
}

/// Writable catalogs for several locales, fed by locale generation
#[derive(Debug)]
pub struct CatalogSet {
    dir: PathBuf,
    locales: Mutex<BTreeMap<String, Entries>>,
}

impl CatalogSet {
    /// Open catalogs for `locales` under `dir`; missing files start empty
    pub fn open<S: AsRef<str>>(dir: impl Into<PathBuf>, locales: &[S]) -> Result<Self> {
        let dir = dir.into();
        let mut map = BTreeMap::new();
        for locale in locales {
            let locale = locale.as_ref();
            let path = catalog_path(&dir, locale)?;
            let entries = if path.exists() {
                read_entries(&path)?
            } else {
                Entries::new()
            };
            map.insert(locale.to_string(), entries);
        }
        Ok(CatalogSet {
            dir,
            locales: Mutex::new(map),
        })
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Entries>> {
        self.locales.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Locales this set manages
    pub fn locales(&self) -> Vec<String> {
        self.guard().keys().cloned().collect()
    }

    /// Read-only translator for `locale`
    pub fn catalog(&self, locale: &str) -> Option<Catalog> {
        self.guard()
            .get(locale)
            .map(|entries| Catalog::new(locale, entries.clone()))
    }

    /// Write every catalog back to disk, creating the directory if needed
    ///
    /// Each file is written to a temporary file in the same directory and
    /// renamed over the old one, so readers never see a partial catalog.
    pub fn save(&self) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir).map_err(|e| catalog_error(&self.dir, e))?;
        let mut written = Vec::new();
        for (locale, entries) in self.guard().iter() {
            let path = catalog_path(&self.dir, locale)?;
            let text = serde_json::to_string_pretty(entries).map_err(|e| catalog_error(&path, e))?;
            let mut file = tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| catalog_error(&path, e))?;
            file.write_all(text.as_bytes())
                .and_then(|()| file.write_all(b"\n"))
                .map_err(|e| catalog_error(&path, e))?;
            file.persist(&path).map_err(|e| catalog_error(&path, e.error))?;
            tracing::debug!(locale = %locale, keys = entries.len(), "catalog saved");
            written.push(path);
        }
        Ok(written)
    }
}

impl LocaleSink for CatalogSet {
    fn register(&self, locale: &str, key: &str) {
        if !is_locale_name(locale) {
            tracing::warn!(locale, "ignoring invalid locale name");
            return;
        }
        let mut locales = self.guard();
        let entries = locales.entry(locale.to_string()).or_default();
        if !entries.contains_key(key) {
            entries.insert(key.to_string(), Value::String(key.to_string()));
        }
    }
}
