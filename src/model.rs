//! Public façade.
//!
//! A `Model` binds one parsed definition to the typespace it was compiled
//! against. Parsing happens once in `define`; every `validate`, `generate`
//! and `references` call afterwards walks the cached node with a fresh
//! traversal context.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::{ErrorsByPath, GenerateError, ParseError, ValidationErrors, ValidationFailed, stringify};
use crate::generate::{GenerateOptions, generate};
use crate::node::Node;
use crate::parse::Parser;
use crate::references::{References, ReferencesOptions, references};
use crate::typespace::Typespace;
use crate::validate::{ReturnAs, ValidateOptions, validate};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelOptions {
    /// Overrides the space's typespace when defining through `define_with`.
    pub typespace: Option<Value>,
    /// Defaults for `Model::validate`.
    pub validate: ValidateOptions,
    /// Defaults for `Model::generate`.
    pub generate: GenerateOptions,
}

/// Outcome of `validate_with` when it does not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Message(String),
    Map(ErrorsByPath),
}

#[derive(Debug, Clone)]
pub struct Model {
    definition: Value,
    node: Node,
    typespace: Arc<Typespace>,
    validate: ValidateOptions,
    generate: GenerateOptions,
}

/// Predefined typespace that models are defined against.
#[derive(Debug, Clone, Default)]
pub struct Space {
    typespace: Arc<Typespace>,
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTION
// ————————————————————————————————————————————————————————————————————————————

/// Define a model with no named types available.
pub fn define(definition: impl Into<Value>) -> Result<Model, ParseError> {
    Space::default().define(definition)
}

/// Define a model with options, including an ad-hoc typespace.
pub fn define_with(definition: impl Into<Value>, options: ModelOptions) -> Result<Model, ParseError> {
    Space::default().define_with(definition, options)
}

impl Space {
    pub fn new(typespace: &Value) -> Result<Self, ParseError> {
        Ok(Self { typespace: Arc::new(Typespace::from_value(typespace)?) })
    }

    pub fn from_typespace(typespace: Arc<Typespace>) -> Self {
        Self { typespace }
    }

    pub fn typespace(&self) -> &Arc<Typespace> {
        &self.typespace
    }

    pub fn define(&self, definition: impl Into<Value>) -> Result<Model, ParseError> {
        self.define_with(definition, ModelOptions::default())
    }

    pub fn define_with(&self, definition: impl Into<Value>, options: ModelOptions) -> Result<Model, ParseError> {
        let typespace = match &options.typespace {
            Some(raw) => Arc::new(Typespace::from_value(raw)?),
            None => Arc::clone(&self.typespace),
        };
        let raw = definition.into();
        let node = Parser::new(typespace.as_ref()).parse(&raw)?;
        debug!(definition = %node, types = typespace.len(), "defined model");
        Ok(Model {
            definition: node.to_definition(),
            node,
            typespace,
            validate: options.validate,
            generate: options.generate,
        })
    }

    /// Model of a declared type.
    pub fn model(&self, name: &str) -> Result<Model, ParseError> {
        if !self.typespace.contains(name) {
            return Err(ParseError::UnknownType(name.to_string()));
        }
        self.define(name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// OPERATIONS
// ————————————————————————————————————————————————————————————————————————————

impl Model {
    /// The normalized definition.
    pub fn definition(&self) -> &Value {
        &self.definition
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn typespace(&self) -> &Typespace {
        &self.typespace
    }

    /// Every mismatch, without deciding how to report it.
    pub fn errors(&self, value: &Value, options: &ValidateOptions) -> ValidationErrors {
        validate(value, &self.node, &self.typespace, options)
    }

    /// Validate with the model's default options; any mismatch is an `Err`.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationFailed> {
        let errors = self.errors(value, &self.validate);
        if errors.is_empty() { Ok(()) } else { Err(errors.into()) }
    }

    /// `return_as` decides whether mismatches come back as data or as an `Err`.
    pub fn validate_with(&self, value: &Value, options: &ValidateOptions) -> Result<Validation, ValidationFailed> {
        let errors = self.errors(value, options);
        match options.return_as {
            Some(ReturnAs::Map) => Ok(Validation::Map(errors.by_path())),
            Some(ReturnAs::Message) => Ok(Validation::Message(stringify(&errors))),
            None if errors.is_empty() => Ok(Validation::Valid),
            None => Err(errors.into()),
        }
    }

    pub fn generate(&self) -> Result<Value, GenerateError> {
        generate(&self.node, &self.typespace, &self.generate)
    }

    pub fn generate_with(&self, options: &GenerateOptions) -> Result<Value, GenerateError> {
        generate(&self.node, &self.typespace, options)
    }

    /// Names referenced anywhere in the definition, deduplicated.
    pub fn references(&self) -> Vec<String> {
        let options = ReferencesOptions { as_unordered_list: true, ..Default::default() };
        references(&self.node, &self.typespace, &options).flatten()
    }

    pub fn references_with(&self, options: &ReferencesOptions) -> References {
        references(&self.node, &self.typespace, options)
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definition_is_normalized() {
        let model = define(json!({"a?": " string | number "})).unwrap();
        assert_eq!(model.definition(), &json!({"a?": "string|number"}));
    }

    #[test]
    fn return_modes() {
        let model = define("number[]").unwrap();
        let bad = json!([1, "2"]);
        let message = ValidateOptions { return_as: Some(ReturnAs::Message), ..Default::default() };
        let map = ValidateOptions { return_as: Some(ReturnAs::Map), ..Default::default() };

        assert_eq!(
            model.validate_with(&bad, &message).unwrap(),
            Validation::Message("At index 1, '2' is not assignable to number.".into())
        );
        assert_eq!(model.validate_with(&json!([]), &message).unwrap(), Validation::Message(String::new()));
        let Validation::Map(errors) = model.validate_with(&bad, &map).unwrap() else { panic!("expected map") };
        assert_eq!(errors["1"], "'2' is not assignable to number.");
        assert_eq!(model.validate_with(&json!([3]), &ValidateOptions::default()).unwrap(), Validation::Valid);
        let failed = model.validate(&bad).unwrap_err();
        assert_eq!(failed.to_string(), "At index 1, '2' is not assignable to number.");
        assert_eq!(failed.errors.len(), 1);
    }

    #[test]
    fn model_defaults_apply_to_plain_calls() {
        let options = || ModelOptions {
            typespace: Some(json!({"node": {"next": "node|null"}, "loop": {"again": "loop"}})),
            validate: ValidateOptions { ignore_extraneous_keys: true, ..Default::default() },
            generate: GenerateOptions { on_required_cycle: Some(json!("...")) },
        };
        let looped = define_with("loop", options()).unwrap();
        assert_eq!(looped.generate().unwrap(), json!({"again": "..."}));
        assert!(looped.generate_with(&GenerateOptions::default()).unwrap_err().is_required_cycle());

        let node = define_with("node", options()).unwrap();
        assert!(node.validate(&json!({"next": {"next": null, "x": 1}})).is_ok());
        assert!(node.validate_with(&json!({"next": null, "x": 1}), &ValidateOptions::default()).is_err());
    }

    #[test]
    fn spaces_share_one_typespace() {
        let space = Space::new(&json!({"id": "string|number", "pair": ["id", "id"]})).unwrap();
        let pair = space.model("pair").unwrap();
        let ids = space.define("id[]").unwrap();
        assert!(Arc::ptr_eq(space.typespace(), &pair.typespace));
        assert!(Arc::ptr_eq(&pair.typespace, &ids.typespace));
        assert_eq!(pair.generate().unwrap(), json!(["", ""]));
        assert_eq!(ids.references(), vec!["id".to_string()]);
        assert_eq!(space.model("nope").unwrap_err(), ParseError::UnknownType("nope".into()));
    }
}
