//! Specification AST
//!
//! The decoded, closed form of a form or menu specification. A decoded
//! tree already satisfies every structural rule (see [`super`]); trees
//! built by hand are checked again by the compiler.

use serde::Deserialize;

use super::ident::Ident;
use crate::skeleton::{Attrs, ElementKind};
use crate::translation::TranslationRef;

/// Per-form compile options
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    /// Translation keys are bare ids
    #[serde(rename = "i18nNoPrefix", alias = "noPrefix")]
    pub no_prefix: bool,
    /// Prefix translation keys with this id instead of the owner id
    #[serde(rename = "i18nFormID")]
    pub translation_id: Option<String>,
    /// Entry translation keys omit the field segment
    #[serde(rename = "i18nNoEntryPrefix")]
    pub no_entry_prefix: bool,
}

/// Raw attributes argument: one mapping, or `primary/wrapper/label/extra` slots
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttrSpec {
    #[default]
    None,
    Single(Attrs<TranslationRef>),
    Slots(Vec<Option<Attrs<TranslationRef>>>),
}

impl AttrSpec {
    pub fn single(attrs: Attrs<TranslationRef>) -> Self {
        AttrSpec::Single(attrs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    Field {
        id: Ident,
        kind: ElementKind,
        attrs: AttrSpec,
        entries: Vec<EntrySpec>,
    },
    /// `fieldset` or `div`; only a `div` may be anonymous
    Set {
        id: Option<Ident>,
        kind: ElementKind,
        attrs: AttrSpec,
        members: Vec<FieldSpec>,
    },
}

impl FieldSpec {
    pub fn field(id: Ident, kind: ElementKind) -> Self {
        FieldSpec::Field {
            id,
            kind,
            attrs: AttrSpec::None,
            entries: Vec::new(),
        }
    }

    pub fn fieldset(id: Ident, members: Vec<FieldSpec>) -> Self {
        FieldSpec::Set {
            id: Some(id),
            kind: ElementKind::Fieldset,
            attrs: AttrSpec::None,
            members,
        }
    }

    pub fn with_attrs(mut self, spec: AttrSpec) -> Self {
        match self {
            FieldSpec::Field { ref mut attrs, .. } | FieldSpec::Set { ref mut attrs, .. } => {
                *attrs = spec
            }
        }
        self
    }

    pub fn with_entries(mut self, list: Vec<EntrySpec>) -> Self {
        if let FieldSpec::Field { ref mut entries, .. } = self {
            *entries = list;
        }
        self
    }
}

/// Member of a select/radio/checkbox/datalist field
#[derive(Debug, Clone, PartialEq)]
pub enum EntrySpec {
    Entry {
        id: Ident,
        attrs: AttrSpec,
    },
    /// `{group: [id, attrs, ...members]}`
    Group {
        id: Ident,
        attrs: AttrSpec,
        members: Vec<EntrySpec>,
    },
}

impl EntrySpec {
    pub fn entry(id: Ident) -> Self {
        EntrySpec::Entry {
            id,
            attrs: AttrSpec::None,
        }
    }

    pub fn id(&self) -> &Ident {
        match self {
            EntrySpec::Entry { id, .. } | EntrySpec::Group { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormSpec {
    pub id: Ident,
    pub options: FormOptions,
    pub attrs: AttrSpec,
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuEntrySpec {
    pub id: Ident,
    pub url: Option<String>,
    pub attrs: AttrSpec,
    pub entries: Vec<MenuEntrySpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuSpec {
    pub id: Ident,
    pub options: FormOptions,
    pub attrs: AttrSpec,
    pub entries: Vec<MenuEntrySpec>,
}

/// A whole JSON specification document
#[derive(Debug, Clone, PartialEq)]
pub enum SpecDocument {
    Form(FormSpec),
    Menu(MenuSpec),
}
