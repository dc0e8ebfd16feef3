//! Collaborator seams: routing, body parsing, templating
//!
//! formgen never parses requests, renders markup or owns a router. These
//! traits are what a host application implements to plug those in.

use futures::future::BoxFuture;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::skeleton::{Attrs, Expanded};
use crate::validation::{FieldData, ValidationFailure};

/// Where a form submits to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitRoute {
    /// Lower-case HTTP method, `post` unless the form overrides it
    pub method: String,
    /// `/` followed by the form action
    pub path: String,
}

/// Routing layer able to register one handler per route
pub trait RouteRegistrar<H> {
    type Output;

    fn register(&mut self, method: &str, path: &str, handler: H) -> Self::Output;
}

/// Raw values extracted from a request body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBody {
    pub fields: FieldData,
    pub files: Option<FieldData>,
}

/// Request body parser (multipart or otherwise)
pub trait BodyParser<R> {
    type Error;

    fn parse<'a>(&'a self, request: R) -> BoxFuture<'a, Result<ParsedBody, Self::Error>>;
}

/// Markup fragments and attribute merges keyed by element id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Insertions {
    pub before: IndexMap<String, String>,
    pub after: IndexMap<String, String>,
    pub attrs: IndexMap<String, Attrs<String>>,
}

impl Insertions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(mut self, id: impl Into<String>, markup: impl Into<String>) -> Self {
        self.before.insert(id.into(), markup.into());
        self
    }

    pub fn after(mut self, id: impl Into<String>, markup: impl Into<String>) -> Self {
        self.after.insert(id.into(), markup.into());
        self
    }

    pub fn attrs(mut self, id: impl Into<String>, attrs: Attrs<String>) -> Self {
        self.attrs.insert(id.into(), attrs);
        self
    }
}

/// Templating engine fed with an expanded tree
pub trait TemplateEngine {
    type Output;
    type Error;

    fn render(&self, tree: &Expanded, insertions: &Insertions) -> Result<Self::Output, Self::Error>;
}

/// Outcome of receiving a submission that did not validate
#[derive(Debug, Error)]
pub enum SubmitError<E> {
    /// The body parser failed; its error is passed through untouched
    #[error("transport error")]
    Transport(E),

    #[error(transparent)]
    Invalid(#[from] ValidationFailure),
}
