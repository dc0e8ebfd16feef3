//! Spec compiler — turns a decoded specification into a skeleton
//!
//! # Pipeline
//!
//! `JSON → parser → FormSpec → compile_form → (Skeleton, ValidatorRegistry, ExpectedValues)`
//!
//! # Guarantees
//!
//! - **All or nothing**: the first violation aborts compilation
//! - **Unique ids**: every element id is claimed in one namespace per pass
//! - **Deterministic**: same specification always yields the same skeleton
//! - **Hygienic**: no attribute mapping carries an `id` key
//!
//! # Ids and translation keys
//!
//! Fields and fieldsets at any depth are named `<root>-<id>`, entries
//! `<root>-<field>-<entry>`. Translation keys follow the same scheme unless
//! the [`FormOptions`] say otherwise or the id was written `~id`.

mod entries;
mod fields;
mod menu;

pub use menu::compile_menu;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::SpecPath;
use crate::namespace::IdNamespace;
use crate::normalizer::{normalize, NormalizedAttrs};
use crate::parser::ast::{AttrSpec, FormOptions, FormSpec};
use crate::parser::ident::Ident;
use crate::rules;
use crate::skeleton::{AttrValue, Attrs, Element, ElementKind, Skeleton};
use crate::translation::{LocaleGeneration, TranslationRef};
use crate::validation::ValidatorRegistry;
use crate::Result;

/// Data name → values the rendered form can submit for it
pub type ExpectedValues = IndexMap<String, Vec<String>>;

/// Everything one form compile produces
#[derive(Debug, Clone)]
pub struct Compiled {
    pub skeleton: Skeleton,
    pub registry: ValidatorRegistry,
    pub expected: ExpectedValues,
}

/// Compile a form specification
pub fn compile_form(spec: &FormSpec, locales: Option<&LocaleGeneration>) -> Result<Compiled> {
    let id = spec.id.name.as_str();
    tracing::debug!(form = id, fields = spec.fields.len(), "compiling form");

    let mut compiler = Compiler::new(id, &spec.options, locales);
    let path = SpecPath::form(id);

    let mut root = Element::new(Some(id.to_string()), ElementKind::Form);
    compiler.attributes(&spec.attrs).apply(&mut root);
    apply_form_defaults(&mut root, id);
    root.entries = compiler.fields(&path, &spec.fields)?;

    let Compiler {
        namespace,
        registry,
        expected,
        ..
    } = compiler;
    tracing::debug!(form = id, elements = namespace.len(), "form compiled");

    Ok(Compiled {
        skeleton: root,
        registry,
        expected,
    })
}

/// State of one compile pass
pub(crate) struct Compiler<'a> {
    root: &'a str,
    options: &'a FormOptions,
    locales: Option<&'a LocaleGeneration<'a>>,
    namespace: IdNamespace,
    registry: ValidatorRegistry,
    expected: ExpectedValues,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        root: &'a str,
        options: &'a FormOptions,
        locales: Option<&'a LocaleGeneration<'a>>,
    ) -> Self {
        Compiler {
            root,
            options,
            locales,
            namespace: IdNamespace::new(),
            registry: ValidatorRegistry::new(),
            expected: ExpectedValues::new(),
        }
    }

    /// `<root>-<id>`, or `<root>-<sub>-<id>` below a field
    fn element_id(&self, id: &Ident, sub: Option<&str>) -> String {
        match sub {
            Some(sub) => rules::entry_id(self.root, sub, id),
            None => rules::field_id(self.root, id),
        }
    }

    /// Translation reference for an element, announced to locale generation
    fn translation(&self, id: &Ident, sub: Option<&str>) -> TranslationRef {
        let key = if id.verbatim || self.options.no_prefix {
            id.name.clone()
        } else {
            let prefix = self.options.translation_id.as_deref().unwrap_or(self.root);
            match sub {
                Some(sub) if !self.options.no_entry_prefix => format!("{}-{}-{}", prefix, sub, id),
                _ => format!("{}-{}", prefix, id),
            }
        };
        self.announce(&key);
        TranslationRef::new(key)
    }

    fn announce(&self, key: &str) {
        if let Some(locales) = self.locales {
            locales.announce(key);
        }
    }

    /// Normalize attributes, announcing any translation they reference
    fn attributes(&self, spec: &AttrSpec) -> NormalizedAttrs {
        let attrs = normalize(spec);
        for key in attrs.translation_keys() {
            self.announce(&key);
        }
        attrs
    }

    fn claim(&mut self, path: &SpecPath, full_id: &str, id: &Ident) -> Result<()> {
        self.namespace
            .claim(path, full_id, &Value::String(id.name.clone()))
    }
}

/// Raw value reported for trees that were never JSON
pub(crate) const EMPTY: Value = Value::Array(Vec::new());

/// Null, empty strings and missing keys count as unset, like an absent attribute
fn is_unset<T>(value: Option<&AttrValue<T>>) -> bool {
    match value {
        None | Some(AttrValue::Literal(Value::Null)) => true,
        Some(v) => v.as_literal_str() == Some(""),
    }
}

fn default_attr(attrs: &mut Attrs<TranslationRef>, key: &str, value: AttrValue<TranslationRef>) {
    if is_unset(attrs.get(key)) {
        attrs.insert(key.to_string(), value);
    }
}

/// Submission plumbing defaults on the form element and its hidden iframe
fn apply_form_defaults(root: &mut Skeleton, id: &str) {
    default_attr(&mut root.attrs, "target", format!("{}Iframe", id).into());
    default_attr(&mut root.attrs, "action", format!("{}Send", id).into());
    default_attr(&mut root.attrs, "enctype", "multipart/form-data".into());
    default_attr(&mut root.attrs, "method", "post".into());
    default_attr(&mut root.attrs, "name", id.into());

    default_attr(&mut root.extra_attrs, "onload", format!("{}Onload()", id).into());
    if let Some(target) = root.attrs.get("target").cloned() {
        default_attr(&mut root.extra_attrs, "name", target);
    }
    root.extra_attrs.insert("width".into(), 0i64.into());
    root.extra_attrs.insert("height".into(), 0i64.into());
    root.extra_attrs.insert("tabindex".into(), (-1i64).into());
    root.extra_attrs.insert("hidden".into(), true.into());
}
