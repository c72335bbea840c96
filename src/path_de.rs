//! Loading definitions, typespaces and option files from JSON text.
//!
//! Deserialization goes through `serde_path_to_error`, so a bad option file
//! reports where in the document it went wrong.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("at JSON path {path} → {message}")]
    Json { path: String, message: String },

    #[error("line {line}: {source}")]
    Ndjson {
        line: usize,
        #[source]
        source: Box<LoadError>,
    },
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, LoadError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| LoadError::Json {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

pub fn from_file_with_path<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let src = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Read { path: path.to_path_buf(), source })?;
    from_str_with_path(&src)
}

/// Definition from a command-line argument: `@file` reads the file, JSON
/// text is parsed, and anything else is taken as a string definition
/// (`number[]`, `user|null`).
pub fn definition_arg(arg: &str) -> Result<Value, LoadError> {
    if let Some(file) = arg.strip_prefix('@') {
        return from_file_with_path(Path::new(file));
    }
    match serde_json::from_str::<Value>(arg) {
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::String(arg.to_string())),
    }
}

/// One document per non-blank line.
pub fn ndjson_documents(src: &str) -> Result<Vec<Value>, LoadError> {
    src.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            from_str_with_path(line).map_err(|error| LoadError::Ndjson { line: i + 1, source: Box::new(error) })
        })
        .collect()
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidateOptions;
    use serde_json::json;

    #[test]
    fn option_errors_carry_their_path() {
        let error = from_str_with_path::<ValidateOptions>(r#"{"returnAs": "text"}"#).unwrap_err();
        let message = error.to_string();
        assert!(message.starts_with("at JSON path returnAs → "), "{message}");
    }

    #[test]
    fn definition_arguments() {
        assert_eq!(definition_arg("number[]").unwrap(), json!("number[]"));
        assert_eq!(definition_arg(r#"{"a": "string"}"#).unwrap(), json!({"a": "string"}));
        assert_eq!(definition_arg(r#""x|y""#).unwrap(), json!("x|y"));
        assert_eq!(definition_arg("4").unwrap(), json!(4));
        assert!(matches!(definition_arg("@/definitely/not/here.json"), Err(LoadError::Read { .. })));
    }

    #[test]
    fn ndjson_skips_blank_lines_and_numbers_failures() {
        let docs = ndjson_documents("{\"a\": 1}\n\n[2]\n").unwrap();
        assert_eq!(docs, vec![json!({"a": 1}), json!([2])]);
        let error = ndjson_documents("1\n{oops\n").unwrap_err();
        assert!(error.to_string().starts_with("line 2: "), "{error}");
    }
}
