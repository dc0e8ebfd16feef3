//! Validation pipeline — per-field validators, then the whole-form validator
//!
//! # Phases
//!
//! 1. Every registered field validator runs with the submitted value, at
//!    most [`MAX_CONCURRENT_VALIDATORS`] in flight. File validators take
//!    part only when file data was supplied.
//! 2. Only if phase 1 produced no failure, the form validator (if any)
//!    runs once over all submitted data.
//!
//! A validator signals failure by returning a non-empty message. The
//! outcome is either the submission itself, a mapping of failing field
//! names to messages, or one form-level message. Never both kinds.
//!
//! # Concurrency
//!
//! Futures are polled cooperatively by the calling task through a bounded
//! `buffer_unordered` stream. There are no timeouts: a validator that never
//! completes stalls the pipeline.

use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::translation::Translator;

/// Upper bound on field validators running at once
pub const MAX_CONCURRENT_VALIDATORS: usize = 10;

/// Submitted values keyed by data name
pub type FieldData = IndexMap<String, Value>;

/// Checks one submitted value; `Some(message)` is a failure
pub trait FieldValidator: Send + Sync {
    fn validate<'a>(
        &'a self,
        value: Option<&'a Value>,
        translator: Option<&'a dyn Translator>,
    ) -> BoxFuture<'a, Option<String>>;
}

/// Checks the submission as a whole; `Some(message)` is a failure
pub trait FormValidator: Send + Sync {
    fn validate<'a>(
        &'a self,
        fields: &'a FieldData,
        files: Option<&'a FieldData>,
        translator: Option<&'a dyn Translator>,
    ) -> BoxFuture<'a, Option<String>>;
}

/// Adapter for synchronous field validation closures
pub struct ValidatorFn<F>(pub F);

impl<F> FieldValidator for ValidatorFn<F>
where
    F: Fn(Option<&Value>, Option<&dyn Translator>) -> Option<String> + Send + Sync,
{
    fn validate<'a>(
        &'a self,
        value: Option<&'a Value>,
        translator: Option<&'a dyn Translator>,
    ) -> BoxFuture<'a, Option<String>> {
        futures::future::ready((self.0)(value, translator)).boxed()
    }
}

/// Adapter for synchronous form validation closures
pub struct FormValidatorFn<F>(pub F);

impl<F> FormValidator for FormValidatorFn<F>
where
    F: Fn(&FieldData, Option<&FieldData>, Option<&dyn Translator>) -> Option<String> + Send + Sync,
{
    fn validate<'a>(
        &'a self,
        fields: &'a FieldData,
        files: Option<&'a FieldData>,
        translator: Option<&'a dyn Translator>,
    ) -> BoxFuture<'a, Option<String>> {
        futures::future::ready((self.0)(fields, files, translator)).boxed()
    }
}

type Slot = Option<Arc<dyn FieldValidator>>;

/// Validator slots created by compilation, one per data-carrying field
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    fields: IndexMap<String, Slot>,
    files: IndexMap<String, Slot>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an empty slot for a regular field
    pub fn declare_field(&mut self, name: impl Into<String>) {
        self.fields.entry(name.into()).or_insert(None);
    }

    /// Open an empty slot for a file field
    pub fn declare_file(&mut self, name: impl Into<String>) {
        self.files.entry(name.into()).or_insert(None);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.files.contains_key(name)
    }

    pub fn is_file(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Fill or clear a declared slot; `false` if `name` has no slot
    pub fn set(&mut self, name: &str, validator: Slot) -> bool {
        match self.fields.get_mut(name).or_else(|| self.files.get_mut(name)) {
            Some(slot) => {
                *slot = validator;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn FieldValidator>> {
        self.fields
            .get(name)
            .or_else(|| self.files.get(name))
            .and_then(Option::as_ref)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Filled slots in declaration order; file slots only if `with_files`
    fn active(&self, with_files: bool) -> impl Iterator<Item = (&str, &Arc<dyn FieldValidator>)> {
        let files = self.files.iter().filter(move |_| with_files);
        self.fields
            .iter()
            .chain(files)
            .filter_map(|(name, slot)| slot.as_ref().map(|v| (name.as_str(), v)))
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |map: &IndexMap<String, Slot>| {
            map.iter()
                .map(|(k, v)| (k.clone(), v.is_some()))
                .collect::<Vec<_>>()
        };
        f.debug_struct("ValidatorRegistry")
            .field("fields", &show(&self.fields))
            .field("files", &show(&self.files))
            .finish()
    }
}

/// A submission that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub fields: FieldData,
    pub files: Option<FieldData>,
}

/// Why a submission was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    /// Failing field names mapped to their messages, in declaration order
    #[error("{} field(s) failed validation", .0.len())]
    Fields(IndexMap<String, String>),

    /// The whole-form validator rejected an otherwise valid submission
    #[error("form validation failed: {0}")]
    Form(String),
}

impl Serialize for ValidationFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ValidationFailure::Fields(errors) => errors.serialize(serializer),
            ValidationFailure::Form(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("form-error", message)?;
                map.end()
            }
        }
    }
}

fn failed(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.is_empty())
}

// ── Pipeline ───────────────────────────────────────────────

/// Run both phases over a submission
pub async fn validate(
    registry: &ValidatorRegistry,
    form_validator: Option<&dyn FormValidator>,
    fields: FieldData,
    files: Option<FieldData>,
    translator: Option<&dyn Translator>,
) -> std::result::Result<Submission, ValidationFailure> {
    let errors = run_field_validators(registry, &fields, files.as_ref(), translator).await;
    if !errors.is_empty() {
        tracing::debug!(failed = errors.len(), "field validation failed");
        return Err(ValidationFailure::Fields(errors));
    }

    if let Some(message) = run_form_validator(form_validator, &fields, files.as_ref(), translator).await {
        tracing::debug!("form validation failed");
        return Err(ValidationFailure::Form(message));
    }

    tracing::debug!("submission accepted");
    Ok(Submission { fields, files })
}

async fn run_field_validators(
    registry: &ValidatorRegistry,
    fields: &FieldData,
    files: Option<&FieldData>,
    translator: Option<&dyn Translator>,
) -> IndexMap<String, String> {
    let jobs: Vec<_> = registry.active(files.is_some()).enumerate().collect();
    tracing::debug!(validators = jobs.len(), "running field validators");

    let mut outcomes: Vec<(usize, &str, Option<String>)> = stream::iter(jobs)
        .map(|(order, (name, validator))| {
            let value = submitted(registry, name, fields, files);
            async move { (order, name, failed(validator.validate(value, translator).await)) }
        })
        .buffer_unordered(MAX_CONCURRENT_VALIDATORS)
        .collect()
        .await;

    outcomes.sort_by_key(|(order, _, _)| *order);
    outcomes
        .into_iter()
        .filter_map(|(_, name, message)| message.map(|m| (name.to_string(), m)))
        .collect()
}

fn submitted<'a>(
    registry: &ValidatorRegistry,
    name: &str,
    fields: &'a FieldData,
    files: Option<&'a FieldData>,
) -> Option<&'a Value> {
    if registry.is_file(name) {
        files.and_then(|f| f.get(name))
    } else {
        fields.get(name)
    }
}

/// Run the validator registered under `name` on its own
///
/// Names without a filled slot always pass.
pub async fn run_validator(
    registry: &ValidatorRegistry,
    name: &str,
    value: Option<&Value>,
    translator: Option<&dyn Translator>,
) -> Option<String> {
    match registry.get(name) {
        Some(validator) => failed(validator.validate(value, translator).await),
        None => None,
    }
}

/// Run the whole-form validator on its own
pub async fn run_form_validator(
    form_validator: Option<&dyn FormValidator>,
    fields: &FieldData,
    files: Option<&FieldData>,
    translator: Option<&dyn Translator>,
) -> Option<String> {
    match form_validator {
        Some(validator) => failed(validator.validate(fields, files, translator).await),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Sleepy {
        delay_ms: u64,
        message: Option<&'static str>,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl FieldValidator for Sleepy {
        fn validate<'a>(
            &'a self,
            _value: Option<&'a Value>,
            _translator: Option<&'a dyn Translator>,
        ) -> BoxFuture<'a, Option<String>> {
            async move {
                let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
                self.running.fetch_sub(1, Ordering::SeqCst);
                self.message.map(str::to_string)
            }
            .boxed()
        }
    }

    fn reject_if(expected: &'static str) -> Arc<dyn FieldValidator> {
        Arc::new(ValidatorFn(move |value: Option<&Value>, _: Option<&dyn Translator>| {
            (value == Some(&json!(expected))).then(|| format!("bad {}", expected))
        }))
    }

    fn data(pairs: &[(&str, Value)]) -> FieldData {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[tokio::test]
    async fn test_field_failures_skip_form_validator() {
        let mut registry = ValidatorRegistry::new();
        for name in ["a", "b", "c"] {
            registry.declare_field(name);
        }
        registry.set("a", Some(reject_if("x")));
        registry.set("c", Some(reject_if("z")));

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let form = FormValidatorFn(move |_: &FieldData, _: Option<&FieldData>, _: Option<&dyn Translator>| {
            seen.fetch_add(1, Ordering::SeqCst);
            Some("never".to_string())
        });

        let fields = data(&[("a", json!("x")), ("b", json!("y")), ("c", json!("z"))]);
        let result = validate(&registry, Some(&form), fields, None, None).await;
        let expected: IndexMap<String, String> = [("a", "bad x"), ("c", "bad z")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(result, Err(ValidationFailure::Fields(expected)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_form_validator_runs_after_clean_phase() {
        let mut registry = ValidatorRegistry::new();
        registry.declare_field("a");
        registry.set("a", Some(reject_if("x")));
        let form = FormValidatorFn(|fields: &FieldData, _: Option<&FieldData>, _: Option<&dyn Translator>| {
            (fields.get("a") == Some(&json!("w"))).then(|| "whole form".to_string())
        });

        let result = validate(&registry, Some(&form), data(&[("a", json!("w"))]), None, None).await;
        assert_eq!(result, Err(ValidationFailure::Form("whole form".into())));

        let result = validate(&registry, Some(&form), data(&[("a", json!("ok"))]), None, None).await;
        assert_eq!(result.unwrap().fields["a"], json!("ok"));
    }

    #[tokio::test]
    async fn test_empty_message_is_success() {
        let mut registry = ValidatorRegistry::new();
        registry.declare_field("a");
        registry.set(
            "a",
            Some(Arc::new(ValidatorFn(|_: Option<&Value>, _: Option<&dyn Translator>| {
                Some(String::new())
            }))),
        );
        assert!(validate(&registry, None, FieldData::new(), None, None).await.is_ok());
        assert_eq!(run_validator(&registry, "a", None, None).await, None);
    }

    #[tokio::test]
    async fn test_file_validators_need_file_data() {
        let mut registry = ValidatorRegistry::new();
        registry.declare_file("upload");
        registry.set("upload", Some(reject_if("virus")));
        let fields = FieldData::new();

        assert!(validate(&registry, None, fields.clone(), None, None).await.is_ok());
        let files = data(&[("upload", json!("virus"))]);
        let result = validate(&registry, None, fields, Some(files), None).await;
        assert!(matches!(result, Err(ValidationFailure::Fields(ref e)) if e.contains_key("upload")));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut registry = ValidatorRegistry::new();
        for i in 0..25 {
            let name = format!("f{}", i);
            registry.declare_field(name.clone());
            registry.set(
                &name,
                Some(Arc::new(Sleepy {
                    delay_ms: 5,
                    message: (i % 5 == 0).then_some("slow failure"),
                    running: running.clone(),
                    peak: peak.clone(),
                })),
            );
        }

        let result = validate(&registry, None, FieldData::new(), None, None).await;
        let Err(ValidationFailure::Fields(errors)) = result else {
            panic!("expected field failures");
        };
        let names: Vec<&str> = errors.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["f0", "f5", "f10", "f15", "f20"]);
        assert!(peak.load(Ordering::SeqCst) <= MAX_CONCURRENT_VALIDATORS);
        assert!(peak.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn test_failure_serialization() {
        let form = ValidationFailure::Form("nope".into());
        assert_eq!(serde_json::to_value(&form).unwrap(), json!({"form-error": "nope"}));
        let mut map = IndexMap::new();
        map.insert("a".to_string(), "bad".to_string());
        let fields = ValidationFailure::Fields(map);
        assert_eq!(serde_json::to_value(&fields).unwrap(), json!({"a": "bad"}));
    }

    #[test]
    fn test_registry_slots() {
        let mut registry = ValidatorRegistry::new();
        registry.declare_field("a");
        registry.declare_file("f");
        assert!(registry.contains("a") && registry.contains("f"));
        assert!(registry.is_file("f"));
        assert!(!registry.set("zzz", None));
        assert!(registry.set("f", Some(reject_if("x"))));
        assert!(registry.get("f").is_some());
        assert!(registry.get("a").is_none());
        assert_eq!(
            format!("{:?}", registry),
            "ValidatorRegistry { fields: [(\"a\", false)], files: [(\"f\", true)] }"
        );
    }
}
