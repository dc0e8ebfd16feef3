//! Fields and fieldsets

use super::{Compiler, EMPTY};
use crate::error::SpecPath;
use crate::parser::ast::{AttrSpec, EntrySpec, FieldSpec};
use crate::parser::ident::Ident;
use crate::rules;
use crate::skeleton::{AttrValue, Element, ElementKind, Skeleton};
use crate::Result;

impl Compiler<'_> {
    pub(super) fn fields(&mut self, path: &SpecPath, specs: &[FieldSpec]) -> Result<Vec<Skeleton>> {
        specs
            .iter()
            .enumerate()
            .map(|(index, spec)| match spec {
                FieldSpec::Set {
                    id,
                    kind,
                    attrs,
                    members,
                } => self.fieldset(path, index, id.as_ref(), *kind, attrs, members),
                FieldSpec::Field {
                    id,
                    kind,
                    attrs,
                    entries,
                } => self.field(path, index, id, *kind, attrs, entries),
            })
            .collect()
    }

    fn fieldset(
        &mut self,
        path: &SpecPath,
        index: usize,
        id: Option<&Ident>,
        kind: ElementKind,
        attrs: &AttrSpec,
        members: &[FieldSpec],
    ) -> Result<Skeleton> {
        let full = match id {
            Some(id) => {
                let full = self.element_id(id, None);
                self.claim(&path.at("Field", index), &full, id)?;
                Some(full)
            }
            None => None,
        };
        let owner = path.owner("Fieldset", id.map(|i| i.name.clone()).unwrap_or_default());
        rules::set_members(&owner, kind, members.len(), &EMPTY)?;

        let mut set = Element::new(full, kind);
        self.attributes(attrs).apply(&mut set);
        if let (ElementKind::Fieldset, Some(id)) = (kind, id) {
            set.label = Some(self.translation(id, None));
        }
        set.entries = self.fields(&owner, members)?;
        Ok(set)
    }

    fn field(
        &mut self,
        path: &SpecPath,
        index: usize,
        id: &Ident,
        kind: ElementKind,
        attrs: &AttrSpec,
        entries: &[EntrySpec],
    ) -> Result<Skeleton> {
        let full = self.element_id(id, None);
        self.claim(&path.at("Field", index), &full, id)?;
        let owner = path.owner("Field", id.name.clone());
        let name = id.name.clone();

        let mut field = Element::new(Some(full.clone()), kind);
        self.attributes(attrs).apply(&mut field);
        if kind.is_input() {
            field.attrs.insert("type".into(), kind.as_str().into());
        }
        field.attrs.insert("name".into(), name.as_str().into());

        let mut expected = Vec::new();
        match kind {
            ElementKind::Checkbox if entries.is_empty() => {
                field.kind = ElementKind::CheckboxSingle;
                field.attrs.insert("value".into(), name.as_str().into());
                expected.push(name.clone());
            }
            ElementKind::Select | ElementKind::Radio | ElementKind::Checkbox => {
                rules::field_entries(&owner, kind, entries.len(), &EMPTY)?;
                field.entries = self.entries(&owner, kind, &name, entries, 0, &mut expected)?;
            }
            ElementKind::Datalist => {
                field.entries = self.entries(&owner, kind, &name, entries, 0, &mut expected)?;
                field
                    .attrs
                    .insert("list".into(), format!("{}--datalist", full).into());
            }
            _ => {}
        }

        if kind == ElementKind::Textarea {
            field.content = field.attrs.shift_remove("value");
        }

        match kind {
            ElementKind::Reset | ElementKind::Submit => {
                field
                    .attrs
                    .insert("value".into(), AttrValue::Text(self.translation(id, None)));
            }
            ElementKind::Button => {
                field.attrs.insert("value".into(), name.as_str().into());
                expected = vec![name.clone()];
                field.inline_label = Some(self.translation(id, None));
            }
            ElementKind::Image => {
                field.attrs.shift_remove("value");
            }
            ElementKind::Hidden => {
                field.attrs.insert("hidden".into(), true.into());
                field.wrapper_attrs.insert("hidden".into(), true.into());
            }
            _ => {
                field.label = Some(self.translation(id, None));
                if field.kind != ElementKind::CheckboxSingle {
                    field.label_attrs.insert("for".into(), full.as_str().into());
                }
            }
        }

        if kind == ElementKind::Image {
            self.expected.insert(format!("{}.x", name), Vec::new());
            self.expected.insert(format!("{}.y", name), Vec::new());
        } else {
            self.expected.insert(name.clone(), expected);
        }
        if kind == ElementKind::File {
            self.registry.declare_file(name);
        } else {
            self.registry.declare_field(name);
        }

        tracing::trace!(id = %full, kind = %field.kind, "field compiled");
        Ok(field)
    }
}
