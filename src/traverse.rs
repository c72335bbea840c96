//! Shared traversal state for validate / generate / references.
//!
//! A `Context` lives for exactly one top-level call. It records which named
//! types are currently being resolved (`seen`) and how many enclosing union
//! members still have an untried alternative (`escapes`). From those two it
//! classifies a re-entered name as a required or an avoidable cycle. What to
//! *do* about a cycle is up to the caller.

use tracing::trace;

use crate::node::Node;
use crate::typespace::Typespace;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    /// Some union on the path can still pick another member.
    Avoidable,
    /// Nothing on the path can steer around the cycle.
    Required,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    /// The re-entered name.
    pub name: String,
    /// Names being resolved when the cycle was found, outermost first.
    pub seen: Vec<String>,
    pub kind: CycleKind,
}

impl Cycle {
    pub fn is_required(&self) -> bool {
        self.kind == CycleKind::Required
    }
}

/// Outcome of stepping into a `Reference`.
#[derive(Debug)]
pub enum Step<'s> {
    /// First visit on this path; the name is on `seen` while the callback runs.
    Node(&'s Node),
    /// The name is already on the path. Nothing was pushed.
    Cycle { node: &'s Node, cycle: Cycle },
    /// No such name in the typespace.
    Unresolved(String),
}

pub struct Context<'s, S> {
    space: &'s Typespace,
    seen: Vec<String>,
    escapes: usize,
    pub state: S,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl<'s, S> Context<'s, S> {
    pub fn new(space: &'s Typespace, state: S) -> Self {
        Self { space, seen: Vec::new(), escapes: 0, state }
    }

    pub fn seen(&self) -> &[String] {
        &self.seen
    }

    /// Step into the named type and hand the outcome to `visit`.
    pub fn reference<R>(&mut self, name: &str, visit: impl FnOnce(&mut Self, Step<'s>) -> R) -> R {
        let space = self.space;
        let Some(node) = space.resolve(name) else {
            return visit(self, Step::Unresolved(name.to_string()));
        };
        if self.seen.iter().any(|s| s == name) {
            let cycle = Cycle {
                name: name.to_string(),
                seen: self.seen.clone(),
                kind: if self.escapes > 0 { CycleKind::Avoidable } else { CycleKind::Required },
            };
            trace!(name, kind = ?cycle.kind, path = ?cycle.seen, "cycle");
            return visit(self, Step::Cycle { node, cycle });
        }
        self.seen.push(name.to_string());
        let out = visit(self, Step::Node(node));
        self.seen.pop();
        out
    }

    /// Run `f` as one member of a union; `has_more` says whether later
    /// members remain to be tried if this one hits an avoidable cycle.
    pub fn alternative<R>(&mut self, has_more: bool, f: impl FnOnce(&mut Self) -> R) -> R {
        if has_more {
            self.escapes += 1;
        }
        let out = f(self);
        if has_more {
            self.escapes -= 1;
        }
        out
    }
}

// ------------------------------- Tests ------------------------------------ //
