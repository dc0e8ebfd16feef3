//! Identifier namespace for one compile pass

use std::collections::BTreeSet;

use crate::error::{Error, Problem, SpecPath};
use crate::Result;

/// Flat set of fully-qualified element ids seen so far
#[derive(Debug, Default)]
pub struct IdNamespace {
    ids: BTreeSet<String>,
}

impl IdNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `id`, failing if any element already holds it
    pub fn claim(&mut self, path: &SpecPath, id: &str, raw: &serde_json::Value) -> Result<()> {
        if !self.ids.insert(id.to_string()) {
            return Err(Error::structural(path, Problem::DuplicateId(id.to_string()), raw));
        }
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
