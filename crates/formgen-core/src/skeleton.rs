//! Compiled skeleton tree
//!
//! An [`Element`] is generic over its text type: a compiled [`Skeleton`]
//! carries [`TranslationRef`]s, an [`Expanded`] tree carries the resolved
//! strings for one locale. Both serialize to the same JSON shape, which is
//! what a templating engine consumes.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::translation::TranslationRef;

/// Locale-independent compiled tree
pub type Skeleton = Element<TranslationRef>;

/// Skeleton materialized for one locale
pub type Expanded = Element<String>;

/// Attribute mapping, kept in author order
pub type Attrs<T> = IndexMap<String, AttrValue<T>>;

/// Attribute or content value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttrValue<T> {
    /// Translatable text
    Text(T),
    List(Vec<AttrValue<T>>),
    Map(IndexMap<String, AttrValue<T>>),
    /// Scalar passed through verbatim (string, number, bool, null)
    Literal(serde_json::Value),
}

impl<T> AttrValue<T> {
    /// Transform every text leaf, keeping list order and map keys
    pub fn map_text<U, F: FnMut(&T) -> U>(&self, f: &mut F) -> AttrValue<U> {
        match self {
            AttrValue::Text(t) => AttrValue::Text(f(t)),
            AttrValue::List(items) => AttrValue::List(items.iter().map(|v| v.map_text(f)).collect()),
            AttrValue::Map(map) => AttrValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.map_text(f)))
                    .collect(),
            ),
            AttrValue::Literal(v) => AttrValue::Literal(v.clone()),
        }
    }

    /// Visit every text leaf
    pub fn visit_text<F: FnMut(&T)>(&self, f: &mut F) {
        match self {
            AttrValue::Text(t) => f(t),
            AttrValue::List(items) => items.iter().for_each(|v| v.visit_text(f)),
            AttrValue::Map(map) => map.values().for_each(|v| v.visit_text(f)),
            AttrValue::Literal(_) => {}
        }
    }

    /// The literal string, if this is one
    pub fn as_literal_str(&self) -> Option<&str> {
        match self {
            AttrValue::Literal(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl AttrValue<String> {
    /// String content of a materialized value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => self.as_literal_str(),
        }
    }
}

impl<T> From<&str> for AttrValue<T> {
    fn from(s: &str) -> Self {
        AttrValue::Literal(serde_json::Value::String(s.to_string()))
    }
}

impl<T> From<String> for AttrValue<T> {
    fn from(s: String) -> Self {
        AttrValue::Literal(serde_json::Value::String(s))
    }
}

impl<T> From<bool> for AttrValue<T> {
    fn from(b: bool) -> Self {
        AttrValue::Literal(serde_json::Value::Bool(b))
    }
}

impl<T> From<i64> for AttrValue<T> {
    fn from(n: i64) -> Self {
        AttrValue::Literal(serde_json::Value::from(n))
    }
}

impl From<TranslationRef> for AttrValue<TranslationRef> {
    fn from(t: TranslationRef) -> Self {
        AttrValue::Text(t)
    }
}

/// Element kinds; the string forms are the ones used in specifications
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ElementKind {
    // roots
    Form,
    Menu,
    MenuItem,
    Submenu,

    // containers
    Div,
    Fieldset,

    // non-input fields
    Textarea,
    Select,
    Button,
    Datalist,
    Keygen,
    Output,

    // general inputs
    Text,
    Password,
    Radio,
    Checkbox,
    #[serde(rename = "checkboxSingle")]
    #[strum(serialize = "checkboxSingle")]
    CheckboxSingle,
    File,
    Hidden,
    Image,
    Reset,
    Submit,

    // semantic inputs
    Color,
    Date,
    Datetime,
    DatetimeLocal,
    Email,
    Month,
    Number,
    Range,
    Search,
    Tel,
    Time,
    Url,
    Week,

    // multi-entry members
    Entry,
    Group,
}

impl ElementKind {
    /// Kind named in a field specification, if it may be declared there
    pub fn declared(name: &str) -> Option<ElementKind> {
        let kind = ElementKind::from_str(name).ok()?;
        kind.is_declarable().then_some(kind)
    }

    /// Kinds an author may write; the rest are produced by the compiler
    pub fn is_declarable(self) -> bool {
        !matches!(
            self,
            ElementKind::Form
                | ElementKind::Menu
                | ElementKind::MenuItem
                | ElementKind::Submenu
                | ElementKind::CheckboxSingle
                | ElementKind::Entry
                | ElementKind::Group
        )
    }

    pub fn is_container(self) -> bool {
        matches!(self, ElementKind::Div | ElementKind::Fieldset)
    }

    pub fn is_multi_entry(self) -> bool {
        matches!(
            self,
            ElementKind::Select | ElementKind::Radio | ElementKind::Checkbox | ElementKind::Datalist
        )
    }

    /// Rendered as `<input type=kind>`
    pub fn is_input(self) -> bool {
        self.is_declarable()
            && !matches!(
                self,
                ElementKind::Div
                    | ElementKind::Fieldset
                    | ElementKind::Textarea
                    | ElementKind::Select
                    | ElementKind::Button
                    | ElementKind::Datalist
                    | ElementKind::Keygen
                    | ElementKind::Output
            )
    }

    /// Entry groups a kind may nest; a group inside a group is never allowed
    pub fn max_group_level(self) -> usize {
        match self {
            ElementKind::Select => 1,
            _ => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// One compiled node: field, fieldset, entry, menu item or a root
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Element<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub attrs: Attrs<T>,
    pub wrapper_attrs: Attrs<T>,
    pub label_attrs: Attrs<T>,
    #[serde(rename = "additionalAttrs")]
    pub extra_attrs: Attrs<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<T>,
    /// Button caption rendered inside the control
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_label: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<AttrValue<T>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<Element<T>>,
}

impl<T> Element<T> {
    pub fn new(id: Option<String>, kind: ElementKind) -> Self {
        Element {
            id,
            kind,
            attrs: Attrs::new(),
            wrapper_attrs: Attrs::new(),
            label_attrs: Attrs::new(),
            extra_attrs: Attrs::new(),
            label: None,
            inline_label: None,
            content: None,
            url: None,
            entries: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Primary attribute by name
    pub fn attr(&self, name: &str) -> Option<&AttrValue<T>> {
        self.attrs.get(name)
    }

    /// Rebuild the tree with every text value transformed
    pub fn map_text<U, F: FnMut(&T) -> U>(&self, f: &mut F) -> Element<U> {
        let map_attrs = |attrs: &Attrs<T>, f: &mut F| -> Attrs<U> {
            attrs
                .iter()
                .map(|(k, v)| (k.clone(), v.map_text(f)))
                .collect()
        };
        Element {
            id: self.id.clone(),
            kind: self.kind,
            attrs: map_attrs(&self.attrs, f),
            wrapper_attrs: map_attrs(&self.wrapper_attrs, f),
            label_attrs: map_attrs(&self.label_attrs, f),
            extra_attrs: map_attrs(&self.extra_attrs, f),
            label: self.label.as_ref().map(&mut *f),
            inline_label: self.inline_label.as_ref().map(&mut *f),
            content: self.content.as_ref().map(|c| c.map_text(f)),
            url: self.url.clone(),
            entries: self.entries.iter().map(|e| e.map_text(f)).collect(),
        }
    }

    /// Depth-first pre-order walk including `self`
    pub fn walk(&self) -> Vec<&Element<T>> {
        let mut out = vec![self];
        for entry in &self.entries {
            out.extend(entry.walk());
        }
        out
    }

    /// Every id in the tree, in document order
    pub fn ids(&self) -> Vec<&str> {
        self.walk().into_iter().filter_map(|e| e.id()).collect()
    }

    /// Find an element by its full id
    pub fn find(&self, id: &str) -> Option<&Element<T>> {
        self.walk().into_iter().find(|e| e.id() == Some(id))
    }
}

impl<T: Serialize> Element<T> {
    /// SHA-256 over the JSON form of the tree, hex encoded
    ///
    /// Equal trees always share a fingerprint; attribute order counts.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translation::tr;

    #[test]
    fn test_kind_names() {
        assert_eq!(ElementKind::declared("datetime-local"), Some(ElementKind::DatetimeLocal));
        assert_eq!(ElementKind::declared("text"), Some(ElementKind::Text));
        assert_eq!(ElementKind::declared("checkboxSingle"), None);
        assert_eq!(ElementKind::declared("menu-item"), None);
        assert_eq!(ElementKind::declared("test"), None);
        assert_eq!(ElementKind::CheckboxSingle.as_str(), "checkboxSingle");
        assert_eq!(ElementKind::MenuItem.to_string(), "menu-item");
    }

    #[test]
    fn test_kind_classes() {
        assert!(ElementKind::Email.is_input());
        assert!(!ElementKind::Textarea.is_input());
        assert!(!ElementKind::Fieldset.is_input());
        assert!(ElementKind::Select.is_multi_entry());
        assert_eq!(ElementKind::Select.max_group_level(), 1);
        assert_eq!(ElementKind::Radio.max_group_level(), 0);
    }

    #[test]
    fn test_map_text_preserves_structure() {
        let mut el: Skeleton = Element::new(Some("F-x".into()), ElementKind::Text);
        el.label = Some(tr("F-x"));
        el.attrs.insert("placeholder".into(), AttrValue::Text(tr("name")));
        el.attrs.insert("size".into(), AttrValue::from(10i64));
        el.attrs.insert(
            "data".into(),
            AttrValue::List(vec![AttrValue::Text(tr("a")), AttrValue::from("b")]),
        );

        let out: Expanded = el.map_text(&mut |r: &TranslationRef| r.key.to_uppercase());
        assert_eq!(out.label.as_deref(), Some("F-X"));
        assert_eq!(out.attrs["placeholder"].as_str(), Some("NAME"));
        assert_eq!(out.attrs["size"], AttrValue::from(10i64));
        let keys: Vec<&String> = out.attrs.keys().collect();
        assert_eq!(keys, vec!["placeholder", "size", "data"]);
        assert_eq!(
            serde_json::to_value(&out.attrs["data"]).unwrap(),
            serde_json::json!(["A", "b"])
        );
    }

    #[test]
    fn test_find_and_ids() {
        let mut root: Skeleton = Element::new(Some("F".into()), ElementKind::Form);
        let mut set = Element::new(Some("F-set".into()), ElementKind::Fieldset);
        set.entries.push(Element::new(Some("F-a".into()), ElementKind::Text));
        root.entries.push(set);
        root.entries.push(Element::new(None, ElementKind::Div));
        assert_eq!(root.ids(), vec!["F", "F-set", "F-a"]);
        assert_eq!(root.find("F-a").map(|e| e.kind), Some(ElementKind::Text));
        assert!(root.find("F-b").is_none());
    }

    #[test]
    fn test_fingerprint() {
        let a: Skeleton = Element::new(Some("F".into()), ElementKind::Form);
        let mut b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        b.label = Some(tr("F"));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_serialized_shape() {
        let mut el: Skeleton = Element::new(Some("F-x".into()), ElementKind::CheckboxSingle);
        el.extra_attrs.insert("hidden".into(), AttrValue::from(true));
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["type"], "checkboxSingle");
        assert_eq!(json["additionalAttrs"]["hidden"], true);
        assert!(json.get("label").is_none());
        assert!(json.get("entries").is_none());
    }
}
