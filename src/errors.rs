//! Error taxonomy.
//!
//! - `ParseError` is fatal and raised while a model or typespace is built.
//! - `ValidationError`s are data. The validator only ever returns them; the
//!   façade's default mode wraps them into `ValidationFailed`.
//! - `GenerateError` is raised by the generator unless `onRequiredCycle`
//!   defuses a required cycle.

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

// ————————————————————————————————————————————————————————————————————————————
// PARSE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unrecognised expression or undeclared name.
    #[error("Unable to determine the type of '{0}'.")]
    UnknownType(String),

    #[error("'{0}' is a reserved keyword and cannot be declared as a type name.")]
    ReservedName(String),

    #[error("'{0}' is not a valid type name.")]
    InvalidName(String),

    /// A name reaches itself without passing through an object or array.
    #[error("'{name}' references itself without an intervening object or array: {path}.")]
    AliasCycle { name: String, path: String },

    #[error("Member '{0}' is declared more than once; use either '{0}' or '{0}?'.")]
    DuplicateMember(String),

    #[error("Optional tuple elements must come after all required elements in '{0}'.")]
    OptionalTupleSlot(String),

    #[error("A typespace must be an object mapping type names to definitions, got {0}.")]
    InvalidTypespace(String),
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Location of a value relative to the validated root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn key(&self, key: &str) -> Self {
        let mut out = self.clone();
        out.0.push(Segment::Key(key.to_string()));
        out
    }

    pub fn index(&self, i: usize) -> Self {
        let mut out = self.clone();
        out.0.push(Segment::Index(i));
        out
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            match segment {
                Segment::Key(k) => f.write_str(k)?,
                Segment::Index(n) => write!(f, "{n}")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub path: Path,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: Path, message: impl Into<String>) -> Self {
        Self { path, message: message.into() }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&prefixed(&self.path, &self.message))
    }
}

/// Messages keyed by rendered path (`""` is the root).
pub type ErrorsByPath = IndexMap<String, String>;

/// Every mismatch found in one validation pass, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }

    pub fn by_path(&self) -> ErrorsByPath {
        let mut out = ErrorsByPath::new();
        for error in &self.0 {
            out.entry(error.path.to_string())
                .and_modify(|existing: &mut String| {
                    existing.push('\n');
                    existing.push_str(&error.message);
                })
                .or_insert_with(|| error.message.clone());
        }
        out
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Render errors the way the façade reports them.
pub fn stringify(errors: &ValidationErrors) -> String {
    match errors.0.as_slice() {
        [] => String::new(),
        [single] => single.to_string(),
        many => {
            let mut out = String::from("Encountered errors at the following paths:");
            for error in many {
                let path = if error.path.is_root() { "/".to_string() } else { error.path.to_string() };
                out.push_str(&format!("\n  {path}: {}", error.message));
            }
            out
        }
    }
}

fn prefixed(path: &Path, message: &str) -> String {
    match path.segments() {
        [] => message.to_string(),
        [Segment::Index(i)] => format!("At index {i}, {message}"),
        _ => format!("At path {path}, {message}"),
    }
}

/// The façade's default ("throwing") validation outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationFailed {
    pub message: String,
    pub errors: ValidationErrors,
}

impl From<ValidationErrors> for ValidationFailed {
    fn from(errors: ValidationErrors) -> Self {
        Self { message: stringify(&errors), errors }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// GENERATE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("Unable to generate a value for '{def}': {reason}")]
    Ungeneratable { def: String, reason: String },

    #[error(
        "Unable to generate a value for '{def}': Definition includes a required cycle:\n{}\n\
         If you'd like to avoid throwing when this occurs, pass a value to return \
         when this occurs to the 'onRequiredCycle' option.",
        cycle_path(.seen, .def)
    )]
    RequiredCycle { def: String, seen: Vec<String> },
}

impl GenerateError {
    pub fn ungeneratable(def: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Ungeneratable { def: def.into(), reason: reason.into() }
    }

    pub fn is_required_cycle(&self) -> bool {
        matches!(self, Self::RequiredCycle { .. })
    }

    /// `A=>B=>A` for a required cycle.
    pub fn cycle(&self) -> Option<String> {
        match self {
            Self::RequiredCycle { def, seen } => Some(cycle_path(seen, def)),
            Self::Ungeneratable { .. } => None,
        }
    }
}

fn cycle_path(seen: &[String], def: &str) -> String {
    let mut names: Vec<&str> = seen.iter().map(String::as_str).collect();
    names.push(def);
    names.join("=>")
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_index_error_reads_as_index() {
        let errors = ValidationErrors::from(vec![ValidationError::new(
            Path::root().index(2),
            "'3' is not assignable to number.",
        )]);
        assert_eq!(stringify(&errors), "At index 2, '3' is not assignable to number.");
    }

    #[test]
    fn nested_paths_and_many_errors() {
        let errors = ValidationErrors::from(vec![
            ValidationError::new(Path::root().key("a").index(0), "x"),
            ValidationError::new(Path::root(), "y"),
        ]);
        assert_eq!(
            stringify(&errors),
            "Encountered errors at the following paths:\n  a/0: x\n  /: y"
        );
        let map = errors.by_path();
        assert_eq!(map.get("a/0").map(String::as_str), Some("x"));
        assert_eq!(map.get("").map(String::as_str), Some("y"));
    }

    #[test]
    fn same_path_messages_are_joined() {
        let errors = ValidationErrors::from(vec![
            ValidationError::new(Path::root().key("k"), "one"),
            ValidationError::new(Path::root().key("k"), "two"),
        ]);
        assert_eq!(errors.by_path()["k"], "one\ntwo");
    }

    #[test]
    fn required_cycle_message() {
        let error = GenerateError::RequiredCycle { def: "A".into(), seen: vec!["A".into()] };
        let message = error.to_string();
        assert!(message.starts_with(
            "Unable to generate a value for 'A': Definition includes a required cycle:\nA=>A\n"
        ));
        assert!(message.contains("'onRequiredCycle'"));
        assert_eq!(error.cycle().as_deref(), Some("A=>A"));
        assert!(error.is_required_cycle());
    }
}
