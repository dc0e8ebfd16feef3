//! formgen core - form and menu specification compiler
//!
//! A compact nested specification is compiled once into a locale-independent
//! skeleton. The skeleton is expanded per locale on demand, and submissions
//! are checked by an asynchronous validation pipeline built from the same
//! specification.
//!
//! # Architecture
//!
//! ```text
//! JSON spec → Parser → FormSpec/MenuSpec → Compiler → Skeleton + ValidatorRegistry
//!                                                        ↓
//!                                          Expansion (per locale, cached)
//!                                                        ↓
//!                                          TemplateEngine (host supplied)
//!
//! Submission → BodyParser (host supplied) → Validation Pipeline → Submission | ValidationFailure
//! ```
//!
//! # Guarantees
//!
//! - **Deterministic**: same specification always produces the same skeleton
//! - **Unique ids**: duplicate element ids are rejected at compile time
//! - **Hygienic**: no attribute mapping ever carries an `id` key
//! - **Exclusive outcomes**: validation reports field errors or a form error, never both

pub mod catalog;
pub mod compiler;
pub mod error;
pub mod expand;
pub mod form;
pub mod interfaces;
pub mod menu;
pub mod namespace;
pub mod normalizer;
pub mod parser;
pub mod rules;
pub mod skeleton;
pub mod translation;
pub mod validation;
pub mod validators;

pub use catalog::{Catalog, CatalogSet};
pub use compiler::{compile_form, compile_menu, Compiled, ExpectedValues};
pub use error::{Error, Problem, Result, SpecPath};
pub use expand::{materialize, ExpansionCache};
pub use form::Form;
pub use interfaces::{
    BodyParser, Insertions, ParsedBody, RouteRegistrar, SubmitError, SubmitRoute, TemplateEngine,
};
pub use menu::Menu;
pub use parser::ast::{AttrSpec, EntrySpec, FieldSpec, FormOptions, FormSpec, MenuEntrySpec, MenuSpec, SpecDocument};
pub use parser::ident::Ident;
pub use parser::{parse_document, parse_form, parse_menu};
pub use skeleton::{AttrValue, Attrs, Element, ElementKind, Expanded, Skeleton};
pub use translation::{tr, LocaleGeneration, LocaleSink, TranslationRef, Translator};
pub use validation::{
    FieldData, FieldValidator, FormValidator, FormValidatorFn, Submission, ValidationFailure, ValidatorFn,
    ValidatorRegistry, MAX_CONCURRENT_VALIDATORS,
};
