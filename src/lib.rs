//! Runtime type definitions for JSON values.
//!
//! Definitions are JSON themselves: strings such as `"string|number"` or
//! `"user[]"`, arrays for lists and tuples, objects for structs (a trailing
//! `?` on a key makes the member optional). A `Model` validates values,
//! generates minimal ones and lists the named types a definition refers to,
//! all against a typespace of named, possibly recursive, definitions.
//!
//! ```
//! use serde_json::json;
//!
//! let space = json_model::Space::new(&json!({
//!     "user": {"name": "string", "friends": "user[]", "email?": "string"},
//! }))
//! .unwrap();
//! let user = space.model("user").unwrap();
//! assert_eq!(user.generate().unwrap(), json!({"name": "", "friends": []}));
//! assert!(user.validate(&json!({"name": "a", "friends": []})).is_ok());
//! ```

pub mod cli;
pub mod errors;
pub mod format;
pub mod generate;
pub mod model;
pub mod node;
pub mod parse;
pub mod path_de;
pub mod references;
pub mod traverse;
pub mod typespace;
pub mod validate;

pub use errors::{ErrorsByPath, GenerateError, ParseError, ValidationError, ValidationErrors, ValidationFailed, stringify};
pub use generate::GenerateOptions;
pub use model::{Model, ModelOptions, Space, Validation, define, define_with};
pub use node::{Keyword, Literal, Node};
pub use references::{Filter, References, ReferencesOptions};
pub use typespace::Typespace;
pub use validate::{ReturnAs, ValidateOptions};
