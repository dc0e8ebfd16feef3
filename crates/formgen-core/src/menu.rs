//! Menus — a compiled navigation tree with its expansion cache

use std::sync::Arc;

use serde_json::Value;

use crate::compiler::compile_menu;
use crate::error::Error;
use crate::expand::ExpansionCache;
use crate::interfaces::{Insertions, TemplateEngine};
use crate::parser::ast::{MenuSpec, SpecDocument};
use crate::parser::{parse_document, parse_menu};
use crate::skeleton::{Expanded, Skeleton};
use crate::translation::{LocaleGeneration, Translator};
use crate::Result;

#[derive(Debug)]
pub struct Menu {
    skeleton: Skeleton,
    cache: ExpansionCache,
}

impl Menu {
    pub fn compile(spec: &MenuSpec, locales: Option<&LocaleGeneration>) -> Result<Menu> {
        Ok(Menu {
            skeleton: compile_menu(spec, locales)?,
            cache: ExpansionCache::new(),
        })
    }

    /// Decode and compile `Menu(id, options, attrs, ...entries)`
    pub fn from_json(
        id: &Value,
        options: &Value,
        attrs: &Value,
        entries: &[Value],
        locales: Option<&LocaleGeneration>,
    ) -> Result<Menu> {
        Menu::compile(&parse_menu(id, options, attrs, entries)?, locales)
    }

    pub fn from_document(doc: &Value, locales: Option<&LocaleGeneration>) -> Result<Menu> {
        match parse_document(doc)? {
            SpecDocument::Menu(spec) => Menu::compile(&spec, locales),
            SpecDocument::Form(_) => Err(Error::Document("expected a menu, found a form".into())),
        }
    }

    pub fn id(&self) -> &str {
        self.skeleton.id().unwrap_or_default()
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn content(&self, translator: Option<&dyn Translator>) -> Arc<Expanded> {
        self.expand(translator, false)
    }

    pub fn expand(&self, translator: Option<&dyn Translator>, force: bool) -> Arc<Expanded> {
        self.cache.expand(&self.skeleton, translator, force)
    }

    pub fn render<E: TemplateEngine>(
        &self,
        engine: &E,
        translator: Option<&dyn Translator>,
        insertions: &Insertions,
    ) -> std::result::Result<E::Output, E::Error> {
        engine.render(&self.content(translator), insertions)
    }

    pub fn fingerprint(&self) -> String {
        self.skeleton.fingerprint()
    }
}
