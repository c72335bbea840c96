//! Named-type references of a definition.
//!
//! By default the result mirrors the definition: a struct yields a map of
//! member → references, a tuple one entry per slot, anything else the list of
//! names it mentions. `as_list` flattens in encounter order, and
//! `as_unordered_list` flattens and drops duplicates. With `transitive` the
//! walk continues into each referenced type; cycles just stop the descent.

use std::fmt;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use serde::Deserialize;

use crate::node::Node;
use crate::traverse::{Context, Step};
use crate::typespace::Typespace;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferencesOptions {
    pub as_unordered_list: bool,
    pub as_list: bool,
    /// Only names containing this substring.
    #[serde(deserialize_with = "contains")]
    pub filter: Option<Filter>,
    /// Also collect the references of referenced types.
    pub transitive: bool,
}

#[derive(Clone)]
pub enum Filter {
    Contains(String),
    Pattern(Regex),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum References {
    Names(Vec<String>),
    Shape(IndexMap<String, References>),
    Slots(Vec<References>),
}

struct Collect<'o> {
    options: &'o ReferencesOptions,
    /// Names already recorded or entered; only consulted when deduplicating.
    visited: IndexSet<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Filter {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Filter::Contains(needle) => name.contains(needle.as_str()),
            Filter::Pattern(pattern) => pattern.is_match(name),
            Filter::Predicate(predicate) => predicate(name),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Contains(needle) => f.debug_tuple("Contains").field(needle).finish(),
            Filter::Pattern(pattern) => f.debug_tuple("Pattern").field(&pattern.as_str()).finish(),
            Filter::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

fn contains<'de, D: serde::Deserializer<'de>>(de: D) -> Result<Option<Filter>, D::Error> {
    Ok(Option::<String>::deserialize(de)?.map(Filter::Contains))
}

impl References {
    /// Every name in encounter order, duplicates included.
    pub fn flatten(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<String>) {
        match self {
            References::Names(names) => out.extend(names.iter().cloned()),
            References::Shape(members) => members.values().for_each(|r| r.flatten_into(out)),
            References::Slots(slots) => slots.iter().for_each(|r| r.flatten_into(out)),
        }
    }

    /// The flat list, if this result is flat.
    pub fn names(&self) -> Option<&[String]> {
        match self {
            References::Names(names) => Some(names),
            _ => None,
        }
    }
}

pub fn references(node: &Node, space: &Typespace, options: &ReferencesOptions) -> References {
    let mut ctx = Context::new(space, Collect { options, visited: IndexSet::new() });
    if options.as_unordered_list || options.as_list {
        let mut names = Vec::new();
        collect(node, &mut ctx, &mut names);
        return References::Names(names);
    }
    shape(node, &mut ctx)
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn shape(node: &Node, ctx: &mut Context<'_, Collect<'_>>) -> References {
    match node {
        Node::Struct(members) => {
            References::Shape(members.iter().map(|(key, member)| (key.clone(), shape(member, ctx))).collect())
        }
        Node::Tuple(slots) => References::Slots(slots.iter().map(|slot| shape(slot, ctx)).collect()),
        Node::Optional(inner) => shape(inner, ctx),
        other => {
            let mut names = Vec::new();
            collect(other, ctx, &mut names);
            References::Names(names)
        }
    }
}

fn collect(node: &Node, ctx: &mut Context<'_, Collect<'_>>, out: &mut Vec<String>) {
    match node {
        Node::Primitive(_) | Node::Literal(_) => {}
        Node::Reference(name) => {
            let dedupe = ctx.state.options.as_unordered_list;
            if dedupe && !ctx.state.visited.insert(name.clone()) {
                return;
            }
            if ctx.state.options.filter.as_ref().is_none_or(|f| f.matches(name)) {
                out.push(name.clone());
            }
            if ctx.state.options.transitive {
                ctx.reference(name, |ctx, step| {
                    // a cycle is where the walk naturally ends
                    if let Step::Node(resolved) = step {
                        collect(resolved, ctx, out);
                    }
                });
            }
        }
        Node::List(item) | Node::Optional(item) => collect(item, ctx, out),
        Node::Tuple(nodes) | Node::Union(nodes) => nodes.iter().for_each(|n| collect(n, ctx, out)),
        Node::Struct(members) => members.values().for_each(|n| collect(n, ctx, out)),
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Parser;
    use serde_json::{Value, json};

    fn space() -> Typespace {
        Typespace::from_value(&json!({
            "user": {"name": "string", "groups": "group[]", "best?": "user"},
            "group": {"owner": "user", "members": "user[]"},
            "tag": "'a'|'b'",
        }))
        .unwrap()
    }

    fn refs(def: Value, options: ReferencesOptions) -> References {
        let space = space();
        let node = Parser::new(&space).parse(&def).unwrap();
        references(&node, &space, &options)
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn default_result_mirrors_the_definition() {
        let found = refs(json!({"a": "user|group", "b": ["tag", "string"], "c?": "number"}), Default::default());
        let expected = References::Shape(IndexMap::from([
            ("a".to_string(), References::Names(names(&["user", "group"]))),
            (
                "b".to_string(),
                References::Slots(vec![References::Names(names(&["tag"])), References::Names(vec![])]),
            ),
            ("c".to_string(), References::Names(vec![])),
        ]));
        assert_eq!(found, expected);
        assert_eq!(found.flatten(), names(&["user", "group", "tag"]));
    }

    #[test]
    fn list_keeps_duplicates_and_set_drops_them() {
        let def = json!({"a": "user", "b": "user[]", "c": "group|user"});
        let list = ReferencesOptions { as_list: true, ..Default::default() };
        assert_eq!(refs(def.clone(), list).names().unwrap(), names(&["user", "user", "group", "user"]));
        let set = ReferencesOptions { as_unordered_list: true, ..Default::default() };
        assert_eq!(refs(def, set).names().unwrap(), names(&["user", "group"]));
    }

    #[test]
    fn transitive_walk_terminates_on_cycles() {
        let set = ReferencesOptions { as_unordered_list: true, transitive: true, ..Default::default() };
        assert_eq!(refs(json!("user"), set).names().unwrap(), names(&["user", "group"]));

        let list = ReferencesOptions { as_list: true, transitive: true, ..Default::default() };
        let found = refs(json!("group"), list).flatten();
        assert_eq!(found.first().map(String::as_str), Some("group"));
        assert!(found.iter().all(|n| n == "user" || n == "group"));
    }

    #[test]
    fn filters() {
        let def = json!("user|group|tag");
        let contains = ReferencesOptions { as_list: true, filter: Some(Filter::Contains("u".into())), ..Default::default() };
        assert_eq!(refs(def.clone(), contains).flatten(), names(&["user", "group"]));

        let pattern = ReferencesOptions {
            as_list: true,
            filter: Some(Filter::Pattern(Regex::new("^t").unwrap())),
            ..Default::default()
        };
        assert_eq!(refs(def.clone(), pattern).flatten(), names(&["tag"]));

        let predicate = ReferencesOptions {
            as_list: true,
            filter: Some(Filter::Predicate(Arc::new(|n: &str| n.len() == 5))),
            ..Default::default()
        };
        assert_eq!(refs(def, predicate).flatten(), names(&["group"]));
    }

    #[test]
    fn options_deserialize_filter_as_substring() {
        let options: ReferencesOptions =
            serde_json::from_value(json!({"asUnorderedList": true, "filter": "gr"})).unwrap();
        assert!(options.as_unordered_list);
        assert!(matches!(options.filter, Some(Filter::Contains(ref s)) if s == "gr"));
    }
}
