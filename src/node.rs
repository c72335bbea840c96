//! Normalized definition IR.
//!
//! Every raw definition (string expression, object shape, array literal)
//! parses into a `Node` tree. The tree is built once per model and then only
//! read by validate/generate/references. Named types stay as `Reference`
//! nodes and resolve lazily against the typespace, so cyclic typespaces never
//! produce infinite trees.

use std::fmt;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde_json::{Map, Value};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Primitive(Keyword),
    Literal(Literal),
    /// Name of a typespace entry, resolved at traversal time.
    Reference(String),
    List(Box<Node>),
    Tuple(Vec<Node>),
    /// Members in insertion order; the first one is the generation default.
    Union(Vec<Node>),
    /// Elidable struct member or trailing tuple slot.
    Optional(Box<Node>),
    /// Members in declaration order.
    Struct(IndexMap<String, Node>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    String,
    Number,
    Boolean,
    Bigint,
    Symbol,
    Undefined,
    Null,
    Any,
    Unknown,
    Void,
    Never,
    Object,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Str(String),
    Number(OrderedFloat<f64>),
    Bool(bool),
}

// ————————————————————————————————————————————————————————————————————————————
// KEYWORDS
// ————————————————————————————————————————————————————————————————————————————

impl Keyword {
    pub const ALL: [Keyword; 13] = [
        Keyword::String,
        Keyword::Number,
        Keyword::Boolean,
        Keyword::Bigint,
        Keyword::Symbol,
        Keyword::Undefined,
        Keyword::Null,
        Keyword::Any,
        Keyword::Unknown,
        Keyword::Void,
        Keyword::Never,
        Keyword::Object,
        Keyword::Function,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Keyword::String => "string",
            Keyword::Number => "number",
            Keyword::Boolean => "boolean",
            Keyword::Bigint => "bigint",
            Keyword::Symbol => "symbol",
            Keyword::Undefined => "undefined",
            Keyword::Null => "null",
            Keyword::Any => "any",
            Keyword::Unknown => "unknown",
            Keyword::Void => "void",
            Keyword::Never => "never",
            Keyword::Object => "object",
            Keyword::Function => "function",
        }
    }

    /// Does a present JSON value belong to this keyword?
    pub fn admits(self, value: &Value) -> bool {
        match self {
            Keyword::String => value.is_string(),
            Keyword::Number => value.is_number(),
            Keyword::Boolean => value.is_boolean(),
            Keyword::Bigint => value.is_i64() || value.is_u64(),
            Keyword::Null => value.is_null(),
            Keyword::Object => value.is_object() || value.is_array(),
            Keyword::Any | Keyword::Unknown => true,
            // no JSON value inhabits these
            Keyword::Symbol
            | Keyword::Undefined
            | Keyword::Void
            | Keyword::Never
            | Keyword::Function => false,
        }
    }

    /// Is a missing value (an absent struct member) acceptable?
    pub fn admits_absence(self) -> bool {
        matches!(
            self,
            Keyword::Undefined | Keyword::Void | Keyword::Any | Keyword::Unknown
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// LITERALS
// ————————————————————————————————————————————————————————————————————————————

impl Literal {
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Literal::Str(s), Value::String(v)) => s == v,
            (Literal::Number(n), Value::Number(v)) => v.as_f64() == Some(n.0),
            (Literal::Bool(b), Value::Bool(v)) => b == v,
            _ => false,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Str(s) => Value::String(s.clone()),
            Literal::Number(n) => number_value(n.0),
            Literal::Bool(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) if s.contains('\'') => write!(f, "\"{s}\""),
            Literal::Str(s) => write!(f, "'{s}'"),
            Literal::Number(n) => write!(f, "{}", number_value(n.0)),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

// Prefer integers when exact, so `5` stays `5` and not `5.0`.
fn number_value(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// NODE
// ————————————————————————————————————————————————————————————————————————————

impl Node {
    pub fn is_optional(&self) -> bool {
        matches!(self, Node::Optional(_))
    }

    /// Strip an `Optional` wrapper, if any.
    pub fn required(&self) -> &Node {
        match self {
            Node::Optional(inner) => inner,
            other => other,
        }
    }

    /// Render back into a raw definition. Parsing the result against the same
    /// typespace yields a node equal to `self`.
    pub fn to_definition(&self) -> Value {
        match self {
            Node::Struct(members) => {
                let mut map = Map::new();
                for (key, member) in members {
                    match member {
                        Node::Optional(inner) => {
                            map.insert(format!("{key}?"), inner.to_definition());
                        }
                        other => {
                            map.insert(key.clone(), other.to_definition());
                        }
                    }
                }
                Value::Object(map)
            }
            Node::Tuple(slots) => Value::Array(slots.iter().map(Node::to_definition).collect()),
            Node::List(item) if !item.has_expression_form() => {
                Value::Array(vec![item.to_definition()])
            }
            Node::Optional(inner) if !inner.has_expression_form() => inner.to_definition(),
            other => Value::String(other.to_string()),
        }
    }

    /// Can this node be written as a string expression?
    fn has_expression_form(&self) -> bool {
        match self {
            Node::Struct(_) | Node::Tuple(_) => false,
            Node::List(item) | Node::Optional(item) => item.has_expression_form(),
            Node::Union(members) => members.iter().all(Node::has_expression_form),
            Node::Primitive(_) | Node::Literal(_) | Node::Reference(_) => true,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Primitive(k) => write!(f, "{k}"),
            Node::Literal(l) => write!(f, "{l}"),
            Node::Reference(name) => f.write_str(name),
            Node::List(item) => match item.as_ref() {
                Node::Union(_) | Node::Optional(_) => write!(f, "({item})[]"),
                _ => write!(f, "{item}[]"),
            },
            Node::Tuple(slots) => {
                f.write_str("[")?;
                for (i, slot) in slots.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{slot}")?;
                }
                f.write_str("]")
            }
            Node::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str("|")?;
                    }
                    match member {
                        Node::Union(_) | Node::Optional(_) => write!(f, "({member})")?,
                        _ => write!(f, "{member}")?,
                    }
                }
                Ok(())
            }
            Node::Optional(inner) => write!(f, "{inner}?"),
            Node::Struct(members) => {
                if members.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{")?;
                for (i, (key, member)) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    match member {
                        Node::Optional(inner) => write!(f, " {key}?: {inner}")?,
                        other => write!(f, " {key}: {other}")?,
                    }
                }
                f.write_str(" }")
            }
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
