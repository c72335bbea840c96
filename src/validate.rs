//! Structural validation.
//!
//! Walks a node and a value in lockstep and returns every mismatch in one
//! pass: struct members in declaration order, list items and tuple slots by
//! index. Nothing here fails on bad input; the façade decides whether a
//! non-empty result becomes an `Err`.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::{ParseError, Path, ValidationError, ValidationErrors};
use crate::format::format_value;
use crate::node::Node;
use crate::traverse::{Context, Step};
use crate::typespace::Typespace;

// ————————————————————————————————————————————————————————————————————————————
// OPTIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateOptions {
    /// Accept object keys the definition does not declare.
    pub ignore_extraneous_keys: bool,
    /// Return the outcome instead of failing. `None` fails on any error.
    pub return_as: Option<ReturnAs>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnAs {
    /// The stringified message (empty when valid).
    Message,
    /// Messages keyed by path (empty when valid).
    Map,
}

struct Checks {
    ignore_extraneous_keys: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY
// ————————————————————————————————————————————————————————————————————————————

pub fn validate(value: &Value, node: &Node, space: &Typespace, options: &ValidateOptions) -> ValidationErrors {
    let mut ctx = Context::new(space, Checks { ignore_extraneous_keys: options.ignore_extraneous_keys });
    check(value, node, None, &Path::root(), &mut ctx).into()
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// `label` names the reference a node was reached through, so a top-level
/// mismatch reads `… is not assignable to user.` rather than the expanded shape.
fn check(
    value: &Value,
    node: &Node,
    label: Option<&str>,
    path: &Path,
    ctx: &mut Context<'_, Checks>,
) -> Vec<ValidationError> {
    let mismatch = || vec![not_assignable(value, node, label, path)];
    match node {
        Node::Primitive(keyword) => {
            if keyword.admits(value) { vec![] } else { mismatch() }
        }
        Node::Literal(literal) => {
            if literal.matches(value) { vec![] } else { mismatch() }
        }
        Node::Reference(name) => ctx.reference(name, |ctx, step| match step {
            // a cycle is fine here: the value itself is finite
            Step::Node(resolved) | Step::Cycle { node: resolved, .. } => {
                check(value, resolved, Some(label.unwrap_or(name.as_str())), path, ctx)
            }
            Step::Unresolved(name) => {
                vec![ValidationError::new(path.clone(), ParseError::UnknownType(name).to_string())]
            }
        }),
        Node::List(item) => match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .flat_map(|(i, v)| check(v, item, None, &path.index(i), ctx))
                .collect(),
            _ => mismatch(),
        },
        Node::Tuple(slots) => match value {
            Value::Array(items) => check_tuple(items, slots, path, ctx),
            _ => mismatch(),
        },
        Node::Union(members) => check_union(value, node, members, label, path, ctx),
        Node::Optional(inner) => check(value, inner, label, path, ctx),
        Node::Struct(members) => match value {
            Value::Object(map) => check_struct(map, members, path, ctx),
            _ => mismatch(),
        },
    }
}

fn check_tuple(items: &[Value], slots: &[Node], path: &Path, ctx: &mut Context<'_, Checks>) -> Vec<ValidationError> {
    let required = slots.iter().filter(|s| !s.is_optional()).count();
    if items.len() < required || items.len() > slots.len() {
        let expected = if required == slots.len() {
            slots.len().to_string()
        } else {
            format!("{required} to {}", slots.len())
        };
        return vec![ValidationError::new(
            path.clone(),
            format!("Tuple of length {} is not assignable to tuple of length {expected}.", items.len()),
        )];
    }
    items
        .iter()
        .zip(slots)
        .enumerate()
        .flat_map(|(i, (v, slot))| check(v, slot.required(), None, &path.index(i), ctx))
        .collect()
}

/// Valid if any member accepts the value; otherwise a single error listing
/// why each member rejected it.
fn check_union(
    value: &Value,
    node: &Node,
    members: &[Node],
    label: Option<&str>,
    path: &Path,
    ctx: &mut Context<'_, Checks>,
) -> Vec<ValidationError> {
    let mut reasons = Vec::with_capacity(members.len());
    for member in members {
        let errors = check(value, member, None, &Path::root(), ctx);
        if errors.is_empty() {
            return vec![];
        }
        let joined = errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        reasons.push(format!("{member}: {joined}"));
    }
    let target = label.map(str::to_string).unwrap_or_else(|| node.to_string());
    vec![ValidationError::new(
        path.clone(),
        format!("{} is not assignable to any of {target}:\n{}", format_value(value), reasons.join("\n")),
    )]
}

fn check_struct(
    map: &Map<String, Value>,
    members: &IndexMap<String, Node>,
    path: &Path,
    ctx: &mut Context<'_, Checks>,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for (key, member) in members {
        match map.get(key) {
            Some(v) => errors.extend(check(v, member.required(), None, &path.key(key), ctx)),
            None if accepts_absence(member, ctx) => {}
            None => errors.push(ValidationError::new(
                path.key(key),
                format!("Required value of type {member} was missing."),
            )),
        }
    }
    if !ctx.state.ignore_extraneous_keys {
        let extraneous: Vec<String> =
            map.keys().filter(|k| !members.contains_key(*k)).map(|k| format!("'{k}'")).collect();
        match extraneous.len() {
            0 => {}
            1 => errors.push(ValidationError::new(path.clone(), format!("Key {} was unexpected.", extraneous[0]))),
            _ => errors.push(ValidationError::new(
                path.clone(),
                format!("Keys {} were unexpected.", extraneous.join(", ")),
            )),
        }
    }
    errors
}

fn accepts_absence(node: &Node, ctx: &mut Context<'_, Checks>) -> bool {
    match node {
        Node::Optional(_) => true,
        Node::Primitive(keyword) => keyword.admits_absence(),
        Node::Union(members) => members.iter().any(|m| accepts_absence(m, ctx)),
        Node::Reference(name) => ctx.reference(name, |ctx, step| match step {
            Step::Node(resolved) => accepts_absence(resolved, ctx),
            _ => false,
        }),
        _ => false,
    }
}

fn not_assignable(value: &Value, node: &Node, label: Option<&str>, path: &Path) -> ValidationError {
    let target = label.map(str::to_string).unwrap_or_else(|| node.to_string());
    ValidationError::new(path.clone(), format!("{} is not assignable to {target}.", format_value(value)))
}

// ------------------------------- Tests ------------------------------------ //
