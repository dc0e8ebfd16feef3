//! Specification parser — decodes loosely typed JSON into the spec AST
//!
//! Specifications are nested JSON arrays:
//!
//! ```text
//! field    := [id, kind, attrs?, ...entries]
//! fieldset := [id, "fieldset" | "div", attrs?, ...fields]
//! entry    := id | [id, ...attrSlots] | {"group": [id, attrs?, ...entries]}
//! menu     := [id, url, attrs?, ...menuEntries]
//! attrs    := null | {..} | [primary?, wrapper?, label?, extra?]
//! ```
//!
//! Attribute values of the form `{"__": key}`, `{"__": [key, args...]}` and
//! `{"__n": [singular, plural, count]}` decode to translation references.
//!
//! Decoding is a single pass in input order. Each node is checked for
//! shape, then its id is claimed, then its nesting depth and required
//! members are checked before its children are visited, so the error
//! reported is always the first violation in the document.

pub mod ast;
pub mod ident;

use serde_json::{Map, Value};

use crate::error::{Error, Problem, SpecPath};
use crate::namespace::IdNamespace;
use crate::rules;
use crate::skeleton::{AttrValue, Attrs, ElementKind};
use crate::translation::TranslationRef;
use crate::Result;

use ast::*;
use ident::Ident;

/// Maximum number of attribute slots: primary, wrapper, label, extra
pub const ATTR_SLOTS: usize = 4;

// ── Public API ─────────────────────────────────────────────

/// Decode a form: `Form(id, options, attrs, ...fields)`
pub fn parse_form(id: &Value, options: &Value, attrs: &Value, fields: &[Value]) -> Result<FormSpec> {
    let (id, path) = parse_root_id(id, SpecPath::form)?;
    let options = parse_options(&path, options)?;
    let attrs = parse_attrs(&path, Some(attrs))?;
    let mut decoder = Decoder::new(&id.name);
    let fields = decoder.fields(&path, fields)?;
    Ok(FormSpec {
        id,
        options,
        attrs,
        fields,
    })
}

/// Decode a menu: `Menu(id, options, attrs, ...entries)`
pub fn parse_menu(id: &Value, options: &Value, attrs: &Value, entries: &[Value]) -> Result<MenuSpec> {
    let (id, path) = parse_root_id(id, SpecPath::menu)?;
    let options = parse_options(&path, options)?;
    let attrs = parse_attrs(&path, Some(attrs))?;
    rules::menu_entries(&path, entries.len(), &Value::Array(Vec::new()))?;
    let mut decoder = Decoder::new(&id.name);
    let entries = decoder.menu_entries(&path, entries)?;
    Ok(MenuSpec {
        id,
        options,
        attrs,
        entries,
    })
}

/// Decode a JSON document holding either a form or a menu
///
/// ```text
/// {"form": id, "options": {..}, "attrs": .., "fields": [..]}
/// {"menu": id, "options": {..}, "attrs": .., "entries": [..]}
/// ```
pub fn parse_document(doc: &Value) -> Result<SpecDocument> {
    let obj = doc
        .as_object()
        .ok_or_else(|| Error::Document(format!("expected a JSON object, found {}", doc)))?;
    let options = obj.get("options").unwrap_or(&Value::Null);
    let attrs = obj.get("attrs").unwrap_or(&Value::Null);

    if let Some(id) = obj.get("form") {
        let fields = document_list(obj, "fields")?;
        return parse_form(id, options, attrs, fields).map(SpecDocument::Form);
    }
    if let Some(id) = obj.get("menu") {
        let entries = document_list(obj, "entries")?;
        return parse_menu(id, options, attrs, entries).map(SpecDocument::Menu);
    }
    Err(Error::Document(
        "document has neither a \"form\" nor a \"menu\" key".into(),
    ))
}

/// Decode a raw attributes argument
pub fn parse_attrs(path: &SpecPath, value: Option<&Value>) -> Result<AttrSpec> {
    match value {
        None | Some(Value::Null) => Ok(AttrSpec::None),
        Some(Value::Object(map)) => Ok(AttrSpec::Single(decode_attrs(map))),
        Some(raw @ Value::Array(slots)) => parse_attr_slots(path, slots, raw),
        Some(other) => Err(Error::structural(path, Problem::Attributes, other)),
    }
}

/// Decode one attribute value, recognising translation markers
pub fn decode_value(value: &Value) -> AttrValue<TranslationRef> {
    match value {
        Value::Object(map) => match translation_marker(map) {
            Some(t) => AttrValue::Text(t),
            None => AttrValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), decode_value(v)))
                    .collect(),
            ),
        },
        Value::Array(items) => AttrValue::List(items.iter().map(decode_value).collect()),
        scalar => AttrValue::Literal(scalar.clone()),
    }
}

// ── Roots ──────────────────────────────────────────────────

fn parse_root_id(id: &Value, root: fn(String) -> SpecPath) -> Result<(Ident, SpecPath)> {
    match id.as_str().and_then(Ident::parse) {
        Some(ident) => {
            let path = root(ident.name.clone());
            Ok((ident, path))
        }
        None => Err(Error::structural(
            &root(id.to_string()),
            Problem::IllegalId,
            id,
        )),
    }
}

fn parse_options(path: &SpecPath, value: &Value) -> Result<FormOptions> {
    match value {
        Value::Null => Ok(FormOptions::default()),
        Value::Object(_) => serde_json::from_value(value.clone())
            .map_err(|_| Error::structural(path, Problem::Options, value)),
        other => Err(Error::structural(path, Problem::Options, other)),
    }
}

fn document_list<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a [Value]> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(Error::Document(format!(
            "\"{}\" must be an array, found {}",
            key, other
        ))),
    }
}

/// Everything after the attributes slot, or nothing if that slot is empty
fn nested(tuple: &[Value]) -> &[Value] {
    match tuple.get(3) {
        Some(v) if !v.is_null() => &tuple[3..],
        _ => &[],
    }
}

/// One decoding pass over a form or menu, claiming ids as it goes
struct Decoder {
    root: String,
    namespace: IdNamespace,
}

impl Decoder {
    fn new(root: &str) -> Self {
        Decoder {
            root: root.to_string(),
            namespace: IdNamespace::new(),
        }
    }

    // ── Fields ─────────────────────────────────────────────

    fn fields(&mut self, path: &SpecPath, values: &[Value]) -> Result<Vec<FieldSpec>> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| self.field(path, i, value))
            .collect()
    }

    fn field(&mut self, path: &SpecPath, index: usize, value: &Value) -> Result<FieldSpec> {
        let here = path.at("Field", index);
        let tuple = match value.as_array() {
            Some(items) if items.len() >= 2 => items,
            _ => return Err(Error::structural(&here, Problem::Shape, value)),
        };
        let kind_name = tuple[1].as_str();

        if matches!(kind_name, Some("fieldset") | Some("div")) {
            return self.set(path, index, tuple, value);
        }

        let id = tuple[0]
            .as_str()
            .and_then(Ident::parse)
            .ok_or_else(|| Error::structural(&here, Problem::IllegalId, value))?;
        self.namespace
            .claim(&here, &rules::field_id(&self.root, &id), value)?;
        let owner = path.owner("Field", id.name.clone());

        let kind = kind_name
            .and_then(ElementKind::declared)
            .filter(|k| !k.is_container())
            .ok_or_else(|| Error::structural(&owner, Problem::UnknownKind, &tuple[1]))?;
        let attrs = parse_attrs(&owner, tuple.get(2))?;

        let rest = nested(tuple);
        let entries = if kind.is_multi_entry() {
            rules::field_entries(&owner, kind, rest.len(), value)?;
            self.entries(&owner, kind, &id.name, rest, 0)?
        } else {
            if !rest.is_empty() {
                tracing::warn!(field = %id, kind = %kind, "ignoring entries on a single-value field");
            }
            Vec::new()
        };

        Ok(FieldSpec::Field {
            id,
            kind,
            attrs,
            entries,
        })
    }

    fn set(&mut self, path: &SpecPath, index: usize, tuple: &[Value], value: &Value) -> Result<FieldSpec> {
        let here = path.at("Field", index);
        let kind = match tuple[1].as_str() {
            Some("div") => ElementKind::Div,
            _ => ElementKind::Fieldset,
        };
        let id = match &tuple[0] {
            Value::Null if kind == ElementKind::Div => None,
            raw => Some(
                raw.as_str()
                    .and_then(Ident::parse)
                    .ok_or_else(|| Error::structural(&here, Problem::IllegalId, value))?,
            ),
        };
        if let Some(ref id) = id {
            self.namespace
                .claim(&here, &rules::field_id(&self.root, id), value)?;
        }
        let owner = path.owner(
            "Fieldset",
            id.as_ref().map(|i| i.name.clone()).unwrap_or_default(),
        );
        let attrs = parse_attrs(&owner, tuple.get(2))?;
        let rest = nested(tuple);
        rules::set_members(&owner, kind, rest.len(), value)?;
        let members = self.fields(&owner, rest)?;

        Ok(FieldSpec::Set {
            id,
            kind,
            attrs,
            members,
        })
    }

    // ── Entries ────────────────────────────────────────────

    /// Entries of `field`; `level` counts enclosing groups
    fn entries(
        &mut self,
        path: &SpecPath,
        kind: ElementKind,
        field: &str,
        values: &[Value],
        level: usize,
    ) -> Result<Vec<EntrySpec>> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| self.entry(path, i, kind, field, value, level))
            .collect()
    }

    fn entry(
        &mut self,
        path: &SpecPath,
        index: usize,
        kind: ElementKind,
        field: &str,
        value: &Value,
        level: usize,
    ) -> Result<EntrySpec> {
        let here = path.at("Entry", index);
        let ident = |raw: Option<&Value>| {
            raw.and_then(Value::as_str)
                .and_then(Ident::parse)
                .ok_or_else(|| Error::structural(&here, Problem::IllegalId, value))
        };

        match value {
            Value::String(_) => {
                let id = ident(Some(value))?;
                self.namespace
                    .claim(&here, &rules::entry_id(&self.root, field, &id), value)?;
                Ok(EntrySpec::Entry {
                    id,
                    attrs: AttrSpec::None,
                })
            }
            Value::Array(items) => {
                let id = ident(items.first())?;
                let attrs = parse_attr_slots(&here, items.get(1..).unwrap_or(&[]), value)?;
                self.namespace
                    .claim(&here, &rules::entry_id(&self.root, field, &id), value)?;
                Ok(EntrySpec::Entry { id, attrs })
            }
            Value::Object(map) => {
                rules::group_level(&here, kind, level, value)?;
                let group = match map.get("group") {
                    Some(Value::Array(items)) if !items.is_empty() => items,
                    _ => return Err(Error::structural(&here, Problem::Group, value)),
                };
                let id = ident(group.first())?;
                let attrs = parse_attrs(&here, group.get(1))?;
                self.namespace
                    .claim(&here, &rules::entry_id(&self.root, field, &id), value)?;
                let owner = path.owner("Group", id.name.clone());
                let rest: &[Value] = match group.get(2) {
                    Some(v) if !v.is_null() => &group[2..],
                    _ => &[],
                };
                rules::group_members(&owner, kind, rest.len(), value)?;
                let members = self.entries(&owner, kind, field, rest, level + 1)?;
                Ok(EntrySpec::Group { id, attrs, members })
            }
            other => Err(Error::structural(&here, Problem::Shape, other)),
        }
    }

    // ── Menus ──────────────────────────────────────────────

    fn menu_entries(&mut self, path: &SpecPath, values: &[Value]) -> Result<Vec<MenuEntrySpec>> {
        values
            .iter()
            .enumerate()
            .map(|(i, value)| self.menu_entry(path, i, value))
            .collect()
    }

    fn menu_entry(&mut self, path: &SpecPath, index: usize, value: &Value) -> Result<MenuEntrySpec> {
        let here = path.at("Entry", index);
        let tuple = match value.as_array() {
            Some(items) if items.len() >= 2 => items,
            _ => return Err(Error::structural(&here, Problem::Shape, value)),
        };
        let id = tuple[0]
            .as_str()
            .and_then(Ident::parse)
            .ok_or_else(|| Error::structural(&here, Problem::IllegalId, value))?;
        self.namespace
            .claim(&here, &rules::field_id(&self.root, &id), value)?;
        let owner = path.owner("Entry", id.name.clone());
        let url = match &tuple[1] {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => return Err(Error::structural(&owner, Problem::Url, other)),
        };
        let attrs = parse_attrs(&owner, tuple.get(2))?;
        let entries = self.menu_entries(&owner, nested(tuple))?;

        Ok(MenuEntrySpec {
            id,
            url,
            attrs,
            entries,
        })
    }
}

// ── Attributes ─────────────────────────────────────────────

fn parse_attr_slots(path: &SpecPath, slots: &[Value], raw: &Value) -> Result<AttrSpec> {
    if slots.len() > ATTR_SLOTS {
        return Err(Error::structural(path, Problem::Attributes, raw));
    }
    let mut decoded = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Value::Null => decoded.push(None),
            Value::Object(map) => decoded.push(Some(decode_attrs(map))),
            _ => return Err(Error::structural(path, Problem::Attributes, raw)),
        }
    }
    if decoded.iter().all(Option::is_none) {
        return Ok(AttrSpec::None);
    }
    Ok(AttrSpec::Slots(decoded))
}

fn decode_attrs(map: &Map<String, Value>) -> Attrs<TranslationRef> {
    map.iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect()
}

fn translation_marker(map: &Map<String, Value>) -> Option<TranslationRef> {
    if map.len() != 1 {
        return None;
    }
    let (marker, body) = map.iter().next()?;
    let plural = match marker.as_str() {
        "__" => false,
        "__n" => true,
        _ => return None,
    };
    let (key, args) = match body {
        Value::String(key) => (key.clone(), Vec::new()),
        Value::Array(items) => {
            let key = items.first()?.as_str()?.to_string();
            let args = items[1..].iter().map(arg_text).collect();
            (key, args)
        }
        _ => return None,
    };
    Some(TranslationRef { key, args, plural })
}

fn arg_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
