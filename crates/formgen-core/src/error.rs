//! Error types for formgen
//!
//! All fallible operations return `Result<T, Error>`.
//! Structural errors carry the owner chain, the offending position and the
//! raw offending value, so a broken specification can be reproduced from
//! the message alone.

use std::fmt;

use thiserror::Error;

/// Where in a specification a problem was found
///
/// Renders like `Form "TForm", Field "choice": Entry #2`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecPath {
    owners: Vec<Owner>,
    position: Option<Position>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Owner {
    kind: &'static str,
    id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Position {
    item: &'static str,
    index: usize,
}

impl SpecPath {
    pub fn form(id: impl Into<String>) -> Self {
        SpecPath::default().owner("Form", id)
    }

    pub fn menu(id: impl Into<String>) -> Self {
        SpecPath::default().owner("Menu", id)
    }

    /// Extend the owner chain (e.g. `Fieldset`, `Field`, `Group`)
    pub fn owner(&self, kind: &'static str, id: impl Into<String>) -> Self {
        let mut path = SpecPath {
            owners: self.owners.clone(),
            position: None,
        };
        path.owners.push(Owner {
            kind,
            id: id.into(),
        });
        path
    }

    /// Point at the `index`-th item (`Field #3`, `Entry #0`) below the chain
    pub fn at(&self, item: &'static str, index: usize) -> Self {
        SpecPath {
            owners: self.owners.clone(),
            position: Some(Position { item, index }),
        }
    }

    /// Id of the outermost owner (the form or menu id)
    pub fn root_id(&self) -> Option<&str> {
        self.owners.first().map(|o| o.id.as_str())
    }
}

impl fmt::Display for SpecPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.owners.is_empty() {
            write!(f, "Specification")?;
        }
        for (i, owner) in self.owners.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} \"{}\"", owner.kind, owner.id)?;
        }
        if let Some(ref pos) = self.position {
            write!(f, ": {} #{}", pos.item, pos.index)?;
        }
        Ok(())
    }
}

/// What exactly is wrong with a specification node
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Problem {
    #[error("specification error")]
    Shape,

    #[error("id value is not allowed")]
    IllegalId,

    #[error("duplicate id value \"{0}\"")]
    DuplicateId(String),

    #[error("unknown input type")]
    UnknownKind,

    #[error("attributes type error")]
    Attributes,

    #[error("options type error")]
    Options,

    #[error("url type error")]
    Url,

    #[error("fields specification error")]
    Fields,

    #[error("entries specification error")]
    Entries,

    #[error("subgroup specification error")]
    Group,

    #[error("nested subgroups level {0} is not allowed")]
    NestingLevel(usize),
}

/// formgen error types
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Malformed specification; compilation is aborted
    #[error("{path}: {problem}.\nValue: {value}")]
    Structural {
        path: SpecPath,
        problem: Problem,
        value: String,
    },

    /// Validator attached to a name the specification never declared
    #[error("Form \"{form}\": No such field.\nValue: \"{field}\"")]
    UnknownField { form: String, field: String },

    /// Top-level JSON document is neither a form nor a menu
    #[error("Document error: {0}")]
    Document(String),

    /// Locale catalog could not be read or written
    #[error("Catalog error at {path}: {message}")]
    Catalog { path: String, message: String },
}

impl Error {
    pub fn structural(path: &SpecPath, problem: Problem, value: &serde_json::Value) -> Self {
        Error::Structural {
            path: path.clone(),
            problem,
            value: value.to_string(),
        }
    }

    /// The structural problem, if this is a structural error
    pub fn problem(&self) -> Option<&Problem> {
        match self {
            Error::Structural { problem, .. } => Some(problem),
            _ => None,
        }
    }
}

/// Result type alias for formgen operations
pub type Result<T> = std::result::Result<T, Error>;
