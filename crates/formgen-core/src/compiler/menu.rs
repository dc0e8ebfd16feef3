//! Navigation menus
//!
//! A menu compiles like a form without data: entries at every depth are
//! named `<menu>-<entry>`, carry their url, and are labelled with their
//! own translation. Entries with subentries become submenus.

use super::{Compiler, EMPTY};
use crate::error::SpecPath;
use crate::rules;
use crate::parser::ast::{MenuEntrySpec, MenuSpec};
use crate::skeleton::{Element, ElementKind, Skeleton};
use crate::translation::LocaleGeneration;
use crate::Result;

/// Compile a menu specification
pub fn compile_menu(spec: &MenuSpec, locales: Option<&LocaleGeneration>) -> Result<Skeleton> {
    let id = spec.id.name.as_str();
    let path = SpecPath::menu(id);
    rules::menu_entries(&path, spec.entries.len(), &EMPTY)?;
    tracing::debug!(menu = id, entries = spec.entries.len(), "compiling menu");

    let mut compiler = Compiler::new(id, &spec.options, locales);
    let mut root = Element::new(Some(id.to_string()), ElementKind::Menu);
    compiler.attributes(&spec.attrs).apply(&mut root);
    root.entries = compiler.menu_entries(&path, &spec.entries)?;

    tracing::debug!(menu = id, elements = compiler.namespace.len(), "menu compiled");
    Ok(root)
}

impl Compiler<'_> {
    fn menu_entries(&mut self, path: &SpecPath, specs: &[MenuEntrySpec]) -> Result<Vec<Skeleton>> {
        let mut out = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            let full = self.element_id(&spec.id, None);
            self.claim(&path.at("Entry", index), &full, &spec.id)?;

            let kind = if spec.entries.is_empty() {
                ElementKind::MenuItem
            } else {
                ElementKind::Submenu
            };
            let mut entry = Element::new(Some(full), kind);
            self.attributes(&spec.attrs).apply(&mut entry);
            entry.label = Some(self.translation(&spec.id, None));
            entry.url = spec.url.clone();
            entry.entries = self.menu_entries(&path.owner("Entry", spec.id.name.clone()), &spec.entries)?;
            out.push(entry);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Problem;
    use crate::parser::parse_menu;
    use serde_json::{json, Value};

    fn menu(options: Value, entries: Value) -> Result<Skeleton> {
        let entries = entries.as_array().cloned().unwrap_or_default();
        let spec = parse_menu(&json!("TMenu"), &options, &json!({"class": "nav"}), &entries)?;
        compile_menu(&spec, None)
    }

    fn label(el: &Skeleton) -> &str {
        el.label.as_ref().map(|t| t.key.as_str()).unwrap_or_default()
    }

    #[test]
    fn test_simple_menu() {
        let skel = menu(
            Value::Null,
            json!([["menu1", "/url1", {"class": "main"}, ["submenu1", "/url2", {"class": "sub"}]]]),
        )
        .unwrap();
        assert_eq!(skel.id(), Some("TMenu"));
        assert_eq!(skel.kind, ElementKind::Menu);
        assert!(skel.url.is_none());
        assert_eq!(skel.attrs["class"].as_literal_str(), Some("nav"));
        assert_eq!(skel.entries.len(), 1);

        let entry = &skel.entries[0];
        assert_eq!(entry.id(), Some("TMenu-menu1"));
        assert_eq!(entry.kind, ElementKind::Submenu);
        assert_eq!(entry.url.as_deref(), Some("/url1"));
        assert_eq!(label(entry), "TMenu-menu1");
        assert_eq!(entry.attrs["class"].as_literal_str(), Some("main"));

        let sub = &entry.entries[0];
        assert_eq!(sub.id(), Some("TMenu-submenu1"));
        assert_eq!(sub.kind, ElementKind::MenuItem);
        assert_eq!(sub.url.as_deref(), Some("/url2"));
        assert_eq!(label(sub), "TMenu-submenu1");
    }

    #[test]
    fn test_global_translation_ids() {
        let skel = menu(
            json!({"noPrefix": true}),
            json!([["menu1", "/url1", null, ["submenu1", "/url2"]]]),
        )
        .unwrap();
        assert_eq!(label(&skel.entries[0]), "menu1");
        assert_eq!(label(&skel.entries[0].entries[0]), "submenu1");
    }

    #[test]
    fn test_verbatim_ids() {
        let skel = menu(
            Value::Null,
            json!([
                ["menu1", "/url1"],
                ["~menu2", "/url2", null, ["submenu1", "/url2a"], ["~submenu2", "/url2b"]],
                ["menu3", "/url3"]
            ]),
        )
        .unwrap();
        assert_eq!(skel.entries.len(), 3);
        assert_eq!(skel.entries[1].entries.len(), 2);
        assert_eq!(skel.entries[1].id(), Some("TMenu-menu2"));
        assert_eq!(skel.entries[1].entries[1].id(), Some("TMenu-submenu2"));
        assert_eq!(label(&skel.entries[0]), "TMenu-menu1");
        assert_eq!(label(&skel.entries[1]), "menu2");
        assert_eq!(label(&skel.entries[1].entries[0]), "TMenu-submenu1");
        assert_eq!(label(&skel.entries[1].entries[1]), "submenu2");
    }

    #[test]
    fn test_menu_errors() {
        let dup = menu(Value::Null, json!([["menu1", "/url1"], ["menu1", "/url1"]])).unwrap_err();
        assert_eq!(dup.problem(), Some(&Problem::DuplicateId("TMenu-menu1".into())));
        let nested = menu(Value::Null, json!([["menu1", "/url1", null, ["menu1", "/url1"]]])).unwrap_err();
        assert_eq!(nested.problem(), Some(&Problem::DuplicateId("TMenu-menu1".into())));
        let none = menu(Value::Null, json!([])).unwrap_err();
        assert_eq!(none.problem(), Some(&Problem::Entries));
    }
}
