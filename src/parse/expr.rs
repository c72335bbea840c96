//! String expression grammar.
//!
//! ```text
//! definition := union '?'?
//! union      := member ('|' member)*
//! member     := member '[]' | '(' union ')' | keyword | literal | name
//! ```
//!
//! Unions are split at the top level first (outside parentheses and quotes),
//! then each member is parsed on its own. A member that matches nothing is
//! reported verbatim, which is why `"boolean["` fails as `'boolean['` while
//! `"nonexistent[]"` fails as `'nonexistent'`.

use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;
use regex::Regex;

use super::Declared;
use crate::errors::ParseError;
use crate::node::{Keyword, Literal, Node};

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?$").unwrap());

pub fn parse_definition<D: Declared + ?Sized>(src: &str, declared: &D) -> Result<Node, ParseError> {
    let text = src.trim();
    match text.strip_suffix('?') {
        Some(inner) => Ok(Node::Optional(Box::new(parse_union(inner, declared)?))),
        None => parse_union(text, declared),
    }
}

fn parse_union<D: Declared + ?Sized>(text: &str, declared: &D) -> Result<Node, ParseError> {
    let text = text.trim();
    let Some(parts) = split_top_level(text) else {
        return Err(ParseError::UnknownType(text.to_string()));
    };
    if parts.len() == 1 {
        return parse_member(text, declared);
    }
    let mut members = Vec::with_capacity(parts.len());
    for part in parts {
        match parse_member(part.trim(), declared)? {
            // `(a|b)|c` flattens to `a|b|c`
            Node::Union(nested) => members.extend(nested),
            member => members.push(member),
        }
    }
    Ok(Node::Union(members))
}

fn parse_member<D: Declared + ?Sized>(text: &str, declared: &D) -> Result<Node, ParseError> {
    let unknown = || ParseError::UnknownType(text.to_string());
    if text.is_empty() {
        return Err(unknown());
    }
    if let Some(item) = text.strip_suffix("[]") {
        return Ok(Node::List(Box::new(parse_member(item.trim_end(), declared)?)));
    }
    if let Some(inner) = group_body(text) {
        return parse_union(inner, declared);
    }
    if let Some(keyword) = Keyword::from_name(text) {
        return Ok(Node::Primitive(keyword));
    }
    if let Some(literal) = parse_literal(text) {
        return Ok(Node::Literal(literal));
    }
    if declared.is_declared(text) {
        return Ok(Node::Reference(text.to_string()));
    }
    Err(unknown())
}

fn parse_literal(text: &str) -> Option<Literal> {
    match text {
        "true" => return Some(Literal::Bool(true)),
        "false" => return Some(Literal::Bool(false)),
        _ => {}
    }
    for quote in ['\'', '"'] {
        if let Some(body) = text.strip_prefix(quote).and_then(|rest| rest.strip_suffix(quote)) {
            if !body.contains(quote) {
                return Some(Literal::Str(body.to_string()));
            }
        }
    }
    if NUMBER.is_match(text) {
        return text.parse::<f64>().ok().map(|n| Literal::Number(OrderedFloat(n)));
    }
    None
}

/// `(…)` wrapping the whole text, returning what's inside.
fn group_body(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    // the opening paren must close at the very end, so `(a)[](b)` is not a group
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in inner.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') if depth == 0 => return None,
            (None, ')') => depth -= 1,
            _ => {}
        }
    }
    (depth == 0 && quote.is_none()).then_some(inner)
}

/// Split on `|` outside parentheses and quotes. `None` when brackets or
/// quotes are unbalanced.
fn split_top_level(text: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.checked_sub(1)?,
            (None, '|') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 || quote.is_some() {
        return None;
    }
    parts.push(&text[start..]);
    Some(parts)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use serde_json::{Value, json};

    fn parse(src: &str) -> Result<Node, ParseError> {
        let declared: IndexMap<String, Value> =
            IndexMap::from([("user".to_string(), json!("string")), ("group".to_string(), json!({}))]);
        parse_definition(src, &declared)
    }

    fn prim(k: Keyword) -> Node {
        Node::Primitive(k)
    }

    #[test]
    fn lists_nest() {
        assert_eq!(parse("string[]").unwrap(), Node::List(Box::new(prim(Keyword::String))));
        assert_eq!(
            parse("number[][]").unwrap(),
            Node::List(Box::new(Node::List(Box::new(prim(Keyword::Number)))))
        );
    }

    #[test]
    fn list_suffix_binds_tighter_than_union() {
        assert_eq!(
            parse("string|number[]").unwrap(),
            Node::Union(vec![prim(Keyword::String), Node::List(Box::new(prim(Keyword::Number)))])
        );
        assert_eq!(
            parse("(string|number)[]").unwrap(),
            Node::List(Box::new(Node::Union(vec![prim(Keyword::String), prim(Keyword::Number)])))
        );
    }

    #[test]
    fn unions_keep_order_and_flatten() {
        assert_eq!(
            parse(" user | (null|boolean) ").unwrap(),
            Node::Union(vec![Node::Reference("user".into()), prim(Keyword::Null), prim(Keyword::Boolean)])
        );
    }

    #[test]
    fn literals() {
        assert_eq!(parse("'a|b'").unwrap(), Node::Literal(Literal::Str("a|b".into())));
        assert_eq!(parse("\"x\"").unwrap(), Node::Literal(Literal::Str("x".into())));
        assert_eq!(parse("-1.5").unwrap(), Node::Literal(Literal::Number(OrderedFloat(-1.5))));
        assert_eq!(parse("true").unwrap(), Node::Literal(Literal::Bool(true)));
        assert!(parse("01").is_err());
    }

    #[test]
    fn trailing_question_mark_is_optional() {
        assert_eq!(
            parse("group[]?").unwrap(),
            Node::Optional(Box::new(Node::List(Box::new(Node::Reference("group".into())))))
        );
        assert_eq!(parse("string?|number"), Err(ParseError::UnknownType("string?".into())));
    }

    #[test]
    fn unknown_expressions_name_the_failing_fragment() {
        let unknown = |s: &str| Err(ParseError::UnknownType(s.into()));
        assert_eq!(parse("nonexistent[]"), unknown("nonexistent"));
        assert_eq!(parse("boolean["), unknown("boolean["));
        assert_eq!(parse("[any]"), unknown("[any]"));
        assert_eq!(parse("string|boolean["), unknown("boolean["));
        assert_eq!(parse("(string"), unknown("(string"));
        assert_eq!(parse("string|"), unknown(""));
        assert_eq!(parse("(a)(b)"), unknown("(a)(b)"));
    }

    #[test]
    fn quoted_parens_do_not_close_groups() {
        let closing = Node::Union(vec![Node::Literal(Literal::Str("a)".into())), prim(Keyword::String)]);
        assert_eq!(parse("('a)'|string)[]").unwrap(), Node::List(Box::new(closing.clone())));
        assert_eq!(parse("('a)'|string)").unwrap(), closing);

        let opening = Node::Union(vec![Node::Literal(Literal::Str("a(".into())), prim(Keyword::String)]);
        assert_eq!(parse("('a('|string)").unwrap(), opening);
        assert_eq!(parse("(\"(\"|'[]?')[]").unwrap(), Node::List(Box::new(Node::Union(vec![
            Node::Literal(Literal::Str("(".into())),
            Node::Literal(Literal::Str("[]?".into())),
        ]))));
    }
}
