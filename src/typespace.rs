//! Named definitions.
//!
//! Built once and read-only afterwards, so one `Arc<Typespace>` can back any
//! number of models and concurrent calls. Entries are compiled eagerly but
//! refer to each other by name only, which keeps self- and mutually
//! recursive types finite.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::errors::ParseError;
use crate::format::format_value;
use crate::node::{Keyword, Node};
use crate::parse::{Declared, Parser};
use crate::traverse::{Context, Step};

static TYPE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap());

#[derive(Debug, Clone, Default)]
pub struct Typespace {
    raw: IndexMap<String, Value>,
    nodes: IndexMap<String, Node>,
}

impl Typespace {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile from a JSON object of `name → definition`.
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        match value {
            Value::Object(map) => {
                Self::compile(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            Value::Null => Ok(Self::empty()),
            other => Err(ParseError::InvalidTypespace(format_value(other))),
        }
    }

    pub fn compile(raw: IndexMap<String, Value>) -> Result<Self, ParseError> {
        for name in raw.keys() {
            if Keyword::from_name(name).is_some() || name == "true" || name == "false" {
                return Err(ParseError::ReservedName(name.clone()));
            }
            if !TYPE_NAME.is_match(name) {
                return Err(ParseError::InvalidName(name.clone()));
            }
        }
        let parser = Parser::new(&raw);
        let mut nodes = IndexMap::with_capacity(raw.len());
        for (name, def) in &raw {
            nodes.insert(name.clone(), parser.parse(def)?);
        }
        let space = Self { raw, nodes };
        space.reject_alias_cycles()?;
        debug!(types = space.nodes.len(), "compiled typespace");
        Ok(space)
    }

    pub fn resolve(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The definitions as supplied.
    pub fn raw(&self) -> &IndexMap<String, Value> {
        &self.raw
    }

    /// A name must not reach itself through references, unions and optionals
    /// alone; validation would never consume any input on such a loop.
    fn reject_alias_cycles(&self) -> Result<(), ParseError> {
        let mut ctx = Context::new(self, ());
        for name in self.names() {
            aliases(&Node::Reference(name.to_string()), &mut ctx)?;
        }
        Ok(())
    }
}

impl Declared for Typespace {
    fn is_declared(&self, name: &str) -> bool {
        self.contains(name)
    }
}

fn aliases(node: &Node, ctx: &mut Context<'_, ()>) -> Result<(), ParseError> {
    match node {
        Node::Reference(name) => ctx.reference(name, |ctx, step| match step {
            Step::Node(node) => aliases(node, ctx),
            Step::Cycle { cycle, .. } => {
                let mut path = cycle.seen[cycle.seen.iter().position(|s| *s == cycle.name).unwrap_or(0)..].to_vec();
                path.push(cycle.name.clone());
                Err(ParseError::AliasCycle { name: cycle.name, path: path.join("=>") })
            }
            Step::Unresolved(_) => Ok(()),
        }),
        Node::Union(members) => members.iter().try_for_each(|m| aliases(m, ctx)),
        Node::Optional(inner) => aliases(inner, ctx),
        // anything else consumes input before recursing
        _ => Ok(()),
    }
}

// ------------------------------- Tests ------------------------------------ //
