//! Built-in field validators

use serde_json::Value;

use crate::translation::{substitute, TranslationRef, Translator};
use crate::validation::ValidatorFn;

/// Message key used by [`one_of`]
pub const NOT_ALLOWED: &str = "Value \"%s\" is not allowed";

/// Message key used by [`required`] when none is given
pub const REQUIRED: &str = "This field is required";

/// Messages always carry their arguments, even untranslated
fn message(key: &str, args: Vec<String>, translator: Option<&dyn Translator>) -> String {
    let text = TranslationRef::with_args(key, args.clone()).resolve(translator);
    if text == key {
        substitute(key, &args)
    } else {
        text
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

/// Reject submitted values outside `allowed`
///
/// A missing value passes. An array value passes only if every element
/// is allowed, which is how multi-valued checkboxes and selects submit.
pub fn one_of<S: Into<String>>(
    allowed: impl IntoIterator<Item = S>,
) -> ValidatorFn<impl Fn(Option<&Value>, Option<&dyn Translator>) -> Option<String> + Send + Sync> {
    let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
    ValidatorFn(move |value: Option<&Value>, translator: Option<&dyn Translator>| {
        let values: Vec<&Value> = match value {
            None | Some(Value::Null) => return None,
            Some(Value::Array(items)) => items.iter().collect(),
            Some(single) => vec![single],
        };
        values.into_iter().find_map(|v| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (!allowed.contains(&text)).then(|| message(NOT_ALLOWED, vec![text], translator))
        })
    })
}

/// Reject missing or blank values, translating `key` as the message
pub fn required(
    key: Option<&str>,
) -> ValidatorFn<impl Fn(Option<&Value>, Option<&dyn Translator>) -> Option<String> + Send + Sync> {
    let key = key.unwrap_or(REQUIRED).to_string();
    ValidatorFn(move |value: Option<&Value>, translator: Option<&dyn Translator>| {
        is_blank(value).then(|| message(&key, Vec::new(), translator))
    })
}
