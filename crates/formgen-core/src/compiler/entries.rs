//! Multi-entry fields: select, radio, checkbox, datalist

use serde_json::{json, Value};

use super::{Compiler, EMPTY};
use crate::error::SpecPath;
use crate::parser::ast::EntrySpec;
use crate::rules;
use crate::skeleton::{AttrValue, Element, ElementKind, Skeleton};
use crate::Result;

impl Compiler<'_> {
    /// Compile the entries of `field`; `level` counts enclosing groups
    ///
    /// Submittable entry values are appended to `expected`.
    pub(super) fn entries(
        &mut self,
        path: &SpecPath,
        kind: ElementKind,
        field: &str,
        specs: &[EntrySpec],
        level: usize,
        expected: &mut Vec<String>,
    ) -> Result<Vec<Skeleton>> {
        let mut out = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            let here = path.at("Entry", index);
            let element = match spec {
                EntrySpec::Group { id, attrs, members } => {
                    rules::group_level(&here, kind, level, &json!({ "group": [id.name] }))?;
                    let full = self.element_id(id, Some(field));
                    self.claim(&here, &full, id)?;

                    let mut group = Element::new(Some(full), ElementKind::Group);
                    self.attributes(attrs).apply(&mut group);
                    if kind == ElementKind::Select {
                        group
                            .attrs
                            .insert("label".into(), AttrValue::Text(self.translation(id, Some(field))));
                    }

                    let owner = path.owner("Group", id.name.clone());
                    rules::group_members(&owner, kind, members.len(), &EMPTY)?;
                    group.entries = self.entries(&owner, kind, field, members, level + 1, expected)?;
                    group
                }
                EntrySpec::Entry { id, attrs } => {
                    let full = self.element_id(id, Some(field));
                    self.claim(&here, &full, id)?;

                    let mut entry = Element::new(Some(full), ElementKind::Entry);
                    self.attributes(attrs).apply(&mut entry);
                    if matches!(kind, ElementKind::Radio | ElementKind::Checkbox) {
                        entry.attrs.insert("name".into(), field.into());
                        entry.attrs.insert("type".into(), kind.as_str().into());
                    }

                    let text = AttrValue::Text(self.translation(id, Some(field)));
                    if kind == ElementKind::Datalist {
                        entry.attrs.insert("value".into(), text);
                    } else {
                        entry.content = Some(text);
                        entry
                            .attrs
                            .insert("value".into(), AttrValue::Literal(Value::String(id.name.clone())));
                        expected.push(id.name.clone());
                    }
                    entry
                }
            };
            out.push(element);
        }
        Ok(out)
    }
}
