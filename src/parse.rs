//! Raw definition → `Node`.
//!
//! Objects mirror into `Struct`, arrays into `List` (one element) or `Tuple`
//! (any other length), strings go through the expression grammar in
//! [`expr`], and JSON scalars become literals. Names are only checked for
//! existence here; resolution happens during traversal.
pub mod expr;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde_json::Value;

use crate::errors::ParseError;
use crate::node::{Keyword, Literal, Node};

/// Set of names a definition may reference.
pub trait Declared {
    fn is_declared(&self, name: &str) -> bool;
}

impl Declared for IndexMap<String, Value> {
    fn is_declared(&self, name: &str) -> bool {
        self.contains_key(name)
    }
}

pub struct Parser<'a, D: Declared + ?Sized> {
    declared: &'a D,
}

impl<'a, D: Declared + ?Sized> Parser<'a, D> {
    pub fn new(declared: &'a D) -> Self {
        Self { declared }
    }

    pub fn parse(&self, def: &Value) -> Result<Node, ParseError> {
        match def {
            Value::String(src) => expr::parse_definition(src, self.declared),
            Value::Object(map) => {
                let mut members = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    let member = self.parse(value)?;
                    let (name, member) = match key.strip_suffix('?') {
                        Some(name) => (name, optional(member)),
                        None => (key.as_str(), member),
                    };
                    if members.insert(name.to_string(), member).is_some() {
                        return Err(ParseError::DuplicateMember(name.to_string()));
                    }
                }
                Ok(Node::Struct(members))
            }
            Value::Array(items) if items.len() == 1 => match self.parse(&items[0])? {
                Node::Optional(_) => Err(ParseError::UnknownType(def.to_string())),
                item => Ok(Node::List(Box::new(item))),
            },
            Value::Array(items) => {
                let slots = items.iter().map(|item| self.parse(item)).collect::<Result<Vec<_>, _>>()?;
                let first_optional = slots.iter().position(Node::is_optional).unwrap_or(slots.len());
                if slots[first_optional..].iter().any(|slot| !slot.is_optional()) {
                    return Err(ParseError::OptionalTupleSlot(def.to_string()));
                }
                Ok(Node::Tuple(slots))
            }
            Value::Number(n) => match n.as_f64() {
                Some(f) => Ok(Node::Literal(Literal::Number(OrderedFloat(f)))),
                None => Err(ParseError::UnknownType(n.to_string())),
            },
            Value::Bool(b) => Ok(Node::Literal(Literal::Bool(*b))),
            Value::Null => Ok(Node::Primitive(Keyword::Null)),
        }
    }
}

fn optional(node: Node) -> Node {
    match node {
        Node::Optional(_) => node,
        other => Node::Optional(Box::new(other)),
    }
}

// ------------------------------- Tests ------------------------------------ //
