//! Forms — compiled skeleton, validators and expansion cache in one owner
//!
//! A [`Form`] is built once from its specification and is read-only
//! afterwards except for validator registration, which needs `&mut self`
//! and therefore happens before the form is shared.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::compiler::{compile_form, Compiled, ExpectedValues};
use crate::error::Error;
use crate::expand::ExpansionCache;
use crate::interfaces::{BodyParser, Insertions, RouteRegistrar, SubmitError, SubmitRoute, TemplateEngine};
use crate::parser::ast::{FormSpec, SpecDocument};
use crate::parser::{parse_document, parse_form};
use crate::skeleton::{Expanded, Skeleton};
use crate::translation::{LocaleGeneration, Translator};
use crate::validation::{
    self, FieldData, FieldValidator, FormValidator, FormValidatorFn, Submission, ValidationFailure,
    ValidatorFn, ValidatorRegistry,
};
use crate::Result;

pub struct Form {
    skeleton: Skeleton,
    registry: ValidatorRegistry,
    expected: ExpectedValues,
    form_validator: Option<Arc<dyn FormValidator>>,
    cache: ExpansionCache,
}

impl Form {
    /// Compile a decoded specification
    pub fn compile(spec: &FormSpec, locales: Option<&LocaleGeneration>) -> Result<Form> {
        let Compiled {
            skeleton,
            registry,
            expected,
        } = compile_form(spec, locales)?;
        Ok(Form {
            skeleton,
            registry,
            expected,
            form_validator: None,
            cache: ExpansionCache::new(),
        })
    }

    /// Decode and compile `Form(id, options, attrs, ...fields)`
    pub fn from_json(
        id: &Value,
        options: &Value,
        attrs: &Value,
        fields: &[Value],
        locales: Option<&LocaleGeneration>,
    ) -> Result<Form> {
        Form::compile(&parse_form(id, options, attrs, fields)?, locales)
    }

    /// Decode and compile a `{"form": ..}` document
    pub fn from_document(doc: &Value, locales: Option<&LocaleGeneration>) -> Result<Form> {
        match parse_document(doc)? {
            SpecDocument::Form(spec) => Form::compile(&spec, locales),
            SpecDocument::Menu(_) => Err(Error::Document("expected a form, found a menu".into())),
        }
    }

    pub fn id(&self) -> &str {
        self.skeleton.id().unwrap_or_default()
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Whether the form declares a data name
    pub fn has_field(&self, name: &str) -> bool {
        self.expected.contains_key(name)
    }

    /// Values the rendered form can submit under `name`
    pub fn expected_values(&self, name: &str) -> Option<&[String]> {
        self.expected.get(name).map(Vec::as_slice)
    }

    pub fn expected(&self) -> &ExpectedValues {
        &self.expected
    }

    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    /// Fill or clear the validator slot of a declared field
    pub fn set_validator(&mut self, name: &str, validator: Option<Arc<dyn FieldValidator>>) -> Result<()> {
        if self.registry.set(name, validator) {
            Ok(())
        } else {
            Err(Error::UnknownField {
                form: self.id().to_string(),
                field: name.to_string(),
            })
        }
    }

    /// [`set_validator`](Self::set_validator) for a synchronous closure
    pub fn set_validator_fn<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: Fn(Option<&Value>, Option<&dyn Translator>) -> Option<String> + Send + Sync + 'static,
    {
        self.set_validator(name, Some(Arc::new(ValidatorFn(f))))
    }

    pub fn set_form_validator(&mut self, validator: Option<Arc<dyn FormValidator>>) {
        self.form_validator = validator;
    }

    pub fn set_form_validator_fn<F>(&mut self, f: F)
    where
        F: Fn(&FieldData, Option<&FieldData>, Option<&dyn Translator>) -> Option<String>
            + Send
            + Sync
            + 'static,
    {
        self.form_validator = Some(Arc::new(FormValidatorFn(f)));
    }

    // ── Validation ─────────────────────────────────────────

    /// Run the validation pipeline over a submission
    pub async fn validate(
        &self,
        fields: FieldData,
        files: Option<FieldData>,
        translator: Option<&dyn Translator>,
    ) -> std::result::Result<Submission, ValidationFailure> {
        tracing::debug!(form = self.id(), "validating submission");
        validation::validate(
            &self.registry,
            self.form_validator.as_deref(),
            fields,
            files,
            translator,
        )
        .await
    }

    pub async fn run_validator(
        &self,
        name: &str,
        value: Option<&Value>,
        translator: Option<&dyn Translator>,
    ) -> Option<String> {
        validation::run_validator(&self.registry, name, value, translator).await
    }

    pub async fn run_form_validator(
        &self,
        fields: &FieldData,
        files: Option<&FieldData>,
        translator: Option<&dyn Translator>,
    ) -> Option<String> {
        validation::run_form_validator(self.form_validator.as_deref(), fields, files, translator).await
    }

    // ── Expansion and rendering ────────────────────────────

    /// Expanded tree for the translator's locale, cached
    pub fn content(&self, translator: Option<&dyn Translator>) -> Arc<Expanded> {
        self.expand(translator, false)
    }

    pub fn expand(&self, translator: Option<&dyn Translator>, force: bool) -> Arc<Expanded> {
        self.cache.expand(&self.skeleton, translator, force)
    }

    pub fn cache(&self) -> &ExpansionCache {
        &self.cache
    }

    pub fn render<E: TemplateEngine>(
        &self,
        engine: &E,
        translator: Option<&dyn Translator>,
        insertions: &Insertions,
    ) -> std::result::Result<E::Output, E::Error> {
        engine.render(&self.content(translator), insertions)
    }

    // ── Submission ─────────────────────────────────────────

    /// `method /action` taken from the form attributes
    pub fn submit_route(&self) -> SubmitRoute {
        let attr = |name: &str, default: String| {
            self.skeleton
                .attr(name)
                .and_then(|v| v.as_literal_str())
                .map(str::to_string)
                .unwrap_or(default)
        };
        SubmitRoute {
            method: attr("method", "post".into()).to_lowercase(),
            path: format!("/{}", attr("action", format!("{}Send", self.id()))),
        }
    }

    /// Register `handler` at the submit route
    pub fn set_form_route<H, R: RouteRegistrar<H>>(&self, router: &mut R, handler: H) -> R::Output {
        let route = self.submit_route();
        tracing::debug!(form = self.id(), method = %route.method, path = %route.path, "registering submit route");
        router.register(&route.method, &route.path, handler)
    }

    /// Parse a request with `parser`, then validate what it produced
    pub async fn receive<Req, P: BodyParser<Req>>(
        &self,
        parser: &P,
        request: Req,
        translator: Option<&dyn Translator>,
    ) -> std::result::Result<Submission, SubmitError<P::Error>> {
        let body = parser.parse(request).await.map_err(SubmitError::Transport)?;
        Ok(self.validate(body.fields, body.files, translator).await?)
    }

    /// Hex SHA-256 of the compiled skeleton
    pub fn fingerprint(&self) -> String {
        self.skeleton.fingerprint()
    }
}

impl fmt::Debug for Form {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Form")
            .field("id", &self.id())
            .field("registry", &self.registry)
            .field("expected", &self.expected)
            .field("form_validator", &self.form_validator.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::ParsedBody;
    use crate::skeleton::ElementKind;
    use crate::validators::one_of;
    use futures::future::{BoxFuture, FutureExt};
    use serde_json::json;
    use std::collections::HashMap;

    fn sample() -> Form {
        Form::from_document(
            &json!({
                "form": "TForm",
                "fields": [
                    ["name", "text"],
                    ["color", "select", null, "red", "green"],
                    ["photo", "file"],
                    ["send", "submit"]
                ]
            }),
            None,
        )
        .unwrap()
    }

    fn data(pairs: &[(&str, Value)]) -> FieldData {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_compiled_form() {
        let form = sample();
        assert_eq!(form.id(), "TForm");
        assert_eq!(form.skeleton().kind, ElementKind::Form);
        assert!(form.has_field("name"));
        assert!(!form.has_field("nope"));
        assert_eq!(form.expected_values("color"), Some(&["red".to_string(), "green".to_string()][..]));
        assert!(form.registry().is_file("photo"));
        assert_eq!(form.fingerprint(), sample().fingerprint());
    }

    #[test]
    fn test_unknown_validator_target() {
        let mut form = sample();
        let err = form
            .set_validator_fn("ghost", |_: Option<&Value>, _: Option<&dyn Translator>| None)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "ghost"));
        assert_eq!(err.to_string(), "Form \"TForm\": No such field.\nValue: \"ghost\"");
        assert!(form.set_validator("photo", None).is_ok());
    }

    #[test]
    fn test_menu_document_is_not_a_form() {
        let err = Form::from_document(&json!({"menu": "M", "entries": [["a", "/"]]}), None).unwrap_err();
        assert!(matches!(err, Error::Document(_)));
    }

    #[tokio::test]
    async fn test_validate_through_form() {
        let mut form = sample();
        let allowed = form.expected_values("color").unwrap().to_vec();
        form.set_validator("color", Some(Arc::new(one_of(allowed)))).unwrap();
        form.set_form_validator_fn(|fields: &FieldData, _: Option<&FieldData>, _: Option<&dyn Translator>| {
            (fields.get("name") == Some(&json!("root"))).then(|| "reserved".to_string())
        });

        let bad = form.validate(data(&[("color", json!("blue"))]), None, None).await;
        assert!(matches!(bad, Err(ValidationFailure::Fields(ref e)) if e.contains_key("color")));

        let reserved = form
            .validate(data(&[("color", json!("red")), ("name", json!("root"))]), None, None)
            .await;
        assert_eq!(reserved, Err(ValidationFailure::Form("reserved".into())));

        let ok = form
            .validate(data(&[("color", json!("green")), ("name", json!("ann"))]), None, None)
            .await
            .unwrap();
        assert_eq!(ok.fields["name"], json!("ann"));

        assert!(form.run_validator("color", Some(&json!("blue")), None).await.is_some());
        assert!(form.run_validator("name", Some(&json!("x")), None).await.is_none());
        let fields = data(&[("name", json!("root"))]);
        assert_eq!(form.run_form_validator(&fields, None, None).await.as_deref(), Some("reserved"));
    }

    #[test]
    fn test_submit_route() {
        let form = sample();
        assert_eq!(
            form.submit_route(),
            SubmitRoute {
                method: "post".into(),
                path: "/TFormSend".into()
            }
        );
        let custom = Form::from_json(&json!("F"), &Value::Null, &json!({"method": "PUT", "action": "save"}), &[], None)
            .unwrap();
        assert_eq!(custom.submit_route().method, "put");
        assert_eq!(custom.submit_route().path, "/save");
    }

    #[derive(Default)]
    struct Router(HashMap<String, &'static str>);

    impl RouteRegistrar<&'static str> for Router {
        type Output = usize;

        fn register(&mut self, method: &str, path: &str, handler: &'static str) -> usize {
            self.0.insert(format!("{} {}", method, path), handler);
            self.0.len()
        }
    }

    #[test]
    fn test_set_form_route() {
        let mut router = Router::default();
        assert_eq!(sample().set_form_route(&mut router, "handler"), 1);
        assert_eq!(router.0.get("post /TFormSend"), Some(&"handler"));
    }

    struct Echo;

    impl BodyParser<std::result::Result<FieldData, String>> for Echo {
        type Error = String;

        fn parse<'a>(
            &'a self,
            request: std::result::Result<FieldData, String>,
        ) -> BoxFuture<'a, std::result::Result<ParsedBody, String>> {
            async move {
                request.map(|fields| ParsedBody {
                    fields,
                    files: None,
                })
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_receive() {
        let mut form = sample();
        form.set_validator_fn("name", |v: Option<&Value>, _: Option<&dyn Translator>| {
            v.is_none().then(|| "missing".to_string())
        })
        .unwrap();

        let transport = form.receive(&Echo, Err("socket closed".to_string()), None).await;
        assert!(matches!(transport, Err(SubmitError::Transport(ref e)) if e == "socket closed"));

        let invalid = form.receive(&Echo, Ok(FieldData::new()), None).await;
        assert!(matches!(invalid, Err(SubmitError::Invalid(ValidationFailure::Fields(_)))));

        let ok = form.receive(&Echo, Ok(data(&[("name", json!("x"))])), None).await;
        assert!(ok.is_ok());
    }

    struct Json;

    impl TemplateEngine for Json {
        type Output = Value;
        type Error = serde_json::Error;

        fn render(&self, tree: &Expanded, insertions: &Insertions) -> std::result::Result<Value, serde_json::Error> {
            Ok(json!({
                "tree": serde_json::to_value(tree)?,
                "insertions": serde_json::to_value(insertions)?,
            }))
        }
    }

    #[test]
    fn test_render_uses_cached_content() {
        let form = sample();
        let insertions = Insertions::new().before("TForm-name", "<hr>");
        let out = form.render(&Json, None, &insertions).unwrap();
        assert_eq!(out["tree"]["entries"][0]["label"], "TForm-name");
        assert_eq!(out["insertions"]["before"]["TForm-name"], "<hr>");
        assert!(Arc::ptr_eq(&form.content(None), &form.content(None)));
        assert_eq!(form.cache().locales(), vec![String::new()]);
    }
}
