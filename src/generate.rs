//! Value synthesis.
//!
//! Produces the smallest representative value: empty lists, required struct
//! members only, the first union member that has a value, canonical
//! primitive defaults.
//!
//! Cycle policy, in the order it is applied when a name is re-entered:
//! 1. Avoidable (some enclosing union still has an untried member): unwind to
//!    the innermost such union, which moves on to its next member.
//! 2. Required, with `onRequiredCycle` set: substitute that value here.
//! 3. Required otherwise: fail with `GenerateError::RequiredCycle`.
//!
//! Optional struct members and optional tuple slots are never generated, so
//! a cycle behind them cannot arise in the first place.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::trace;

use crate::errors::GenerateError;
use crate::node::{Keyword, Node};
use crate::traverse::{Context, Cycle, CycleKind, Step};
use crate::typespace::Typespace;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateOptions {
    /// Value to place wherever a required cycle would otherwise fail
    /// generation. `Some(Value::Null)` is a valid choice.
    #[serde(deserialize_with = "present")]
    pub on_required_cycle: Option<Value>,
}

// `"onRequiredCycle": null` means "substitute null", not "unset".
fn present<'de, D: serde::Deserializer<'de>>(de: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(de).map(Some)
}

enum Halt {
    /// Avoidable cycle, unwinding to the nearest union with an alternative.
    Cycle(Cycle),
    Failed(GenerateError),
}

impl From<GenerateError> for Halt {
    fn from(error: GenerateError) -> Self {
        Halt::Failed(error)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY
// ————————————————————————————————————————————————————————————————————————————

pub fn generate(node: &Node, space: &Typespace, options: &GenerateOptions) -> Result<Value, GenerateError> {
    let mut ctx = Context::new(space, options);
    match synthesize(node, &mut ctx) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(unrepresentable(node)),
        Err(Halt::Failed(error)) => Err(error),
        // no union left to catch it, so it was required after all
        Err(Halt::Cycle(cycle)) => Err(GenerateError::RequiredCycle { def: cycle.name, seen: cycle.seen }),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// `None` is absence (`undefined`): it omits a struct member and is an error
/// anywhere a value must be present.
fn synthesize(node: &Node, ctx: &mut Context<'_, &GenerateOptions>) -> Result<Option<Value>, Halt> {
    match node {
        Node::Primitive(keyword) => primitive(*keyword),
        Node::Literal(literal) => Ok(Some(literal.to_value())),
        Node::Reference(name) => ctx.reference(name, |ctx, step| match step {
            Step::Node(resolved) => synthesize(resolved, ctx),
            Step::Cycle { cycle, .. } => on_cycle(cycle, ctx.state),
            Step::Unresolved(name) => {
                Err(GenerateError::ungeneratable(name.clone(), format!("'{name}' is not declared in the typespace.")).into())
            }
        }),
        Node::List(_) => Ok(Some(Value::Array(Vec::new()))),
        Node::Tuple(slots) => {
            let mut items = Vec::with_capacity(slots.len());
            for slot in slots.iter().take_while(|s| !s.is_optional()) {
                match synthesize(slot, ctx)? {
                    Some(value) => items.push(value),
                    None => return Err(unrepresentable(slot).into()),
                }
            }
            Ok(Some(Value::Array(items)))
        }
        Node::Union(members) => {
            let mut absent = false;
            let mut failure = None;
            for (i, member) in members.iter().enumerate() {
                let has_more = i + 1 < members.len();
                match ctx.alternative(has_more, |ctx| synthesize(member, ctx)) {
                    Ok(Some(value)) => return Ok(Some(value)),
                    Ok(None) => absent = true,
                    Err(Halt::Cycle(cycle)) if has_more || absent => {
                        trace!(member = %member, cycle = %cycle.name, "union member cycles, trying next");
                    }
                    Err(Halt::Failed(error @ GenerateError::Ungeneratable { .. })) => {
                        trace!(member = %member, %error, "union member has no value, trying next");
                        failure.get_or_insert(error);
                    }
                    Err(halt) => return Err(halt),
                }
            }
            if absent {
                return Ok(None);
            }
            let error = failure
                .unwrap_or_else(|| GenerateError::ungeneratable(node.to_string(), "An empty union has no values."));
            Err(error.into())
        }
        Node::Optional(inner) => synthesize(inner, ctx),
        Node::Struct(members) => {
            let mut map = Map::new();
            for (key, member) in members {
                if member.is_optional() {
                    continue;
                }
                if let Some(value) = synthesize(member, ctx)? {
                    map.insert(key.clone(), value);
                }
            }
            Ok(Some(Value::Object(map)))
        }
    }
}

fn on_cycle(cycle: Cycle, options: &GenerateOptions) -> Result<Option<Value>, Halt> {
    match (cycle.kind, &options.on_required_cycle) {
        (CycleKind::Avoidable, _) => Err(Halt::Cycle(cycle)),
        (CycleKind::Required, Some(substitute)) => {
            trace!(name = %cycle.name, "substituting onRequiredCycle value");
            Ok(Some(substitute.clone()))
        }
        (CycleKind::Required, None) => Err(GenerateError::RequiredCycle { def: cycle.name, seen: cycle.seen }.into()),
    }
}

fn primitive(keyword: Keyword) -> Result<Option<Value>, Halt> {
    let value = match keyword {
        Keyword::String => Value::String(String::new()),
        Keyword::Number | Keyword::Bigint => Value::from(0),
        Keyword::Boolean => Value::Bool(false),
        Keyword::Null | Keyword::Any | Keyword::Unknown => Value::Null,
        Keyword::Object => Value::Object(Map::new()),
        Keyword::Undefined | Keyword::Void => return Ok(None),
        Keyword::Never => {
            return Err(GenerateError::ungeneratable("never", "'never' has no values.").into());
        }
        Keyword::Symbol | Keyword::Function => {
            return Err(GenerateError::ungeneratable(
                keyword.name(),
                format!("'{keyword}' values have no JSON representation."),
            )
            .into());
        }
    };
    Ok(Some(value))
}

fn unrepresentable(node: &Node) -> GenerateError {
    GenerateError::ungeneratable(
        node.to_string(),
        "An undefined value can only be omitted from an object, not placed here.",
    )
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Parser;
    use serde_json::json;

    fn run(def: Value, space: Value, options: &GenerateOptions) -> Result<Value, GenerateError> {
        let space = Typespace::from_value(&space).unwrap();
        let node = Parser::new(&space).parse(&def).unwrap();
        generate(&node, &space, options)
    }

    fn plain(def: Value, space: Value) -> Result<Value, GenerateError> {
        run(def, space, &GenerateOptions::default())
    }

    fn substituting(def: Value, space: Value, with: Value) -> Result<Value, GenerateError> {
        run(def, space, &GenerateOptions { on_required_cycle: Some(with) })
    }

    #[test]
    fn minimal_values() {
        assert_eq!(plain(json!("number[]"), json!({})).unwrap(), json!([]));
        assert_eq!(
            plain(json!({"s": "string", "n": "number", "b": "boolean", "o?": "string", "u": "undefined"}), json!({}))
                .unwrap(),
            json!({"s": "", "n": 0, "b": false})
        );
        assert_eq!(plain(json!(["'x'", 4, "number?"]), json!({})).unwrap(), json!(["x", 4]));
        assert_eq!(plain(json!("null|string"), json!({})).unwrap(), json!(null));
    }

    #[test]
    fn member_order_is_declaration_order() {
        let value = plain(json!({"z": "number", "a": "string"}), json!({})).unwrap();
        assert_eq!(value.as_object().unwrap().keys().collect::<Vec<_>>(), ["z", "a"]);
    }

    #[test]
    fn required_self_cycle() {
        let space = json!({"a": {"x": "a"}});
        let error = plain(json!("a"), space.clone()).unwrap_err();
        assert!(error.is_required_cycle());
        assert_eq!(error.cycle().as_deref(), Some("a=>a"));
        assert_eq!(substituting(json!("a"), space, json!(null)).unwrap(), json!({"x": null}));
    }

    #[test]
    fn mutual_required_cycle_reports_full_path() {
        let space = json!({"a": {"b": "b"}, "b": {"a": "a"}});
        let error = plain(json!("a"), space).unwrap_err();
        assert_eq!(error.cycle().as_deref(), Some("a=>b=>a"));
    }

    #[test]
    fn avoidable_cycles_take_the_escape() {
        assert_eq!(plain(json!("a"), json!({"a": {"x": "a|null"}})).unwrap(), json!({"x": null}));
        assert_eq!(plain(json!("a"), json!({"a": {"x?": "a"}})).unwrap(), json!({}));
        assert_eq!(plain(json!("a"), json!({"a": ["string", "a?"]})).unwrap(), json!([""]));
        assert_eq!(plain(json!("a"), json!({"a": {"kids": "a[]"}})).unwrap(), json!({"kids": []}));
    }

    #[test]
    fn union_above_the_cycle_escapes_it() {
        let space = json!({"a": {"x": "a"}});
        assert_eq!(plain(json!("a|null"), space).unwrap(), json!(null));
    }

    #[test]
    fn every_union_member_cycling_is_required() {
        let space = json!({"a": {"x": "a|a"}});
        assert!(plain(json!("a"), space.clone()).unwrap_err().is_required_cycle());
        assert_eq!(substituting(json!("a"), space, json!(0)).unwrap(), json!({"x": 0}));
    }

    #[test]
    fn nested_unions_fall_through_to_outer_alternatives() {
        let space = json!({
            "a": {"x": "b|string"},
            "b": {"y": "a|a"},
        });
        assert_eq!(plain(json!("a"), space).unwrap(), json!({"x": ""}));
    }

    #[test]
    fn unrepresentable_values_fail() {
        let error = plain(json!("undefined"), json!({})).unwrap_err();
        assert!(matches!(error, GenerateError::Ungeneratable { ref def, .. } if def == "undefined"));
        assert!(plain(json!({"f": "function"}), json!({})).is_err());
        assert!(plain(json!(["never", "string"]), json!({})).is_err());
    }

    #[test]
    fn unions_skip_members_without_a_value() {
        assert_eq!(plain(json!(["undefined|string", "number"]), json!({})).unwrap(), json!(["", 0]));
        assert_eq!(plain(json!("function|string"), json!({})).unwrap(), json!(""));
        assert_eq!(plain(json!({"a": "undefined|string"}), json!({})).unwrap(), json!({"a": ""}));
        assert_eq!(plain(json!({"a": "void|never", "b": 1}), json!({})).unwrap(), json!({"b": 1}));

        let error = plain(json!("never|symbol"), json!({})).unwrap_err();
        assert!(matches!(error, GenerateError::Ungeneratable { ref def, .. } if def == "never"));
        assert!(plain(json!(["void|undefined", 1]), json!({})).is_err());
    }

    #[test]
    fn options_deserialize_null_as_present() {
        let options: GenerateOptions = serde_json::from_value(json!({"onRequiredCycle": null})).unwrap();
        assert_eq!(options.on_required_cycle, Some(Value::Null));
        let unset: GenerateOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(unset.on_required_cycle, None);
    }
}
