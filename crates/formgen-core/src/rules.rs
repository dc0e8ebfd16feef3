//! Structural rules shared by decoding and compiling
//!
//! Decoding applies them node by node in input order, so the first
//! violation in a document is the one reported. The compiler applies them
//! again for specifications built directly as values.

use serde_json::Value;

use crate::error::{Error, Problem, SpecPath};
use crate::parser::ident::Ident;
use crate::skeleton::ElementKind;
use crate::Result;

/// `<root>-<id>`: fields, fieldsets and menu entries at any depth
pub fn field_id(root: &str, id: &Ident) -> String {
    format!("{}-{}", root, id.name)
}

/// `<root>-<field>-<id>`: entries and groups of a multi-entry field
pub fn entry_id(root: &str, field: &str, id: &Ident) -> String {
    format!("{}-{}-{}", root, field, id.name)
}

/// A group at `level` (enclosing groups) must fit the field kind
pub fn group_level(path: &SpecPath, kind: ElementKind, level: usize, raw: &Value) -> Result<()> {
    if kind.max_group_level() <= level {
        return Err(Error::structural(path, Problem::NestingLevel(level), raw));
    }
    Ok(())
}

/// Selects and radio groups need at least one entry
pub fn field_entries(path: &SpecPath, kind: ElementKind, count: usize, raw: &Value) -> Result<()> {
    if count == 0 && matches!(kind, ElementKind::Select | ElementKind::Radio) {
        return Err(Error::structural(path, Problem::Entries, raw));
    }
    Ok(())
}

/// Groups need members, except in a datalist
pub fn group_members(path: &SpecPath, kind: ElementKind, count: usize, raw: &Value) -> Result<()> {
    if count == 0 && kind != ElementKind::Datalist {
        return Err(Error::structural(path, Problem::Entries, raw));
    }
    Ok(())
}

/// A fieldset needs members; a div may be empty
pub fn set_members(path: &SpecPath, kind: ElementKind, count: usize, raw: &Value) -> Result<()> {
    if count == 0 && kind == ElementKind::Fieldset {
        return Err(Error::structural(path, Problem::Fields, raw));
    }
    Ok(())
}

pub fn menu_entries(path: &SpecPath, count: usize, raw: &Value) -> Result<()> {
    if count == 0 {
        return Err(Error::structural(path, Problem::Entries, raw));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ident(s: &str) -> Ident {
        Ident::parse(s).unwrap()
    }

    #[test]
    fn test_id_scheme() {
        assert_eq!(field_id("F", &ident("name")), "F-name");
        assert_eq!(field_id("F", &ident("~name")), "F-name");
        assert_eq!(entry_id("F", "topic", &ident("a")), "F-topic-a");
    }

    #[test]
    fn test_group_level_limits() {
        let path = SpecPath::form("F");
        let raw = json!({"group": ["g"]});
        assert!(group_level(&path, ElementKind::Select, 0, &raw).is_ok());
        let err = group_level(&path, ElementKind::Select, 1, &raw).unwrap_err();
        assert_eq!(err.problem(), Some(&Problem::NestingLevel(1)));
        assert!(err.to_string().ends_with(&format!("Value: {}", raw)));
        assert!(group_level(&path, ElementKind::Radio, 0, &raw).is_err());
    }

    #[test]
    fn test_required_members() {
        let path = SpecPath::form("F");
        let raw = json!([]);
        assert!(field_entries(&path, ElementKind::Select, 0, &raw).is_err());
        assert!(field_entries(&path, ElementKind::Checkbox, 0, &raw).is_ok());
        assert!(field_entries(&path, ElementKind::Datalist, 0, &raw).is_ok());
        assert!(group_members(&path, ElementKind::Datalist, 0, &raw).is_ok());
        assert!(group_members(&path, ElementKind::Radio, 0, &raw).is_err());
        assert!(set_members(&path, ElementKind::Div, 0, &raw).is_ok());
        assert!(set_members(&path, ElementKind::Fieldset, 0, &raw).is_err());
        assert!(menu_entries(&path, 0, &raw).is_err());
    }
}
