//! # Error Handling
//!
//! This module defines the centralized error type for `entity-patch`. It uses
//! the `thiserror` library to derive a single `Error` enum covering every
//! failure the serializer, the schema compiler, the model loader and the patch
//! applier can report.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant carries the context needed to
//!   locate the offending node, slot or path.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Every error raised while walking a tree is fatal for that call: the
//! serializers never return partial output. The variants fall in three groups:
//!
//! - Tree invariant violations: unresolved resources, duplicate or missing
//!   index values, cardinality violations, cycles and runaway depth.
//! - Input errors: schema definitions, model documents, patch paths.
//! - Wrapped I/O, YAML and JSON errors.

use thiserror::Error;

/// Main error type for entity-patch operations
#[derive(Error, Debug)]
pub enum Error {
    /// A node has no resource binding and no ancestor to inherit one from.
    #[error("Unresolved resource: node of kind '{node}' has no resource binding and nothing to inherit from")]
    UnresolvedResource { node: String },

    /// Two siblings of a `many` slot share the same index value, which makes
    /// their paths ambiguous.
    #[error("Duplicate index in slot '{slot}': more than one child has {index_field}={value}")]
    DuplicateIndex {
        slot: String,
        index_field: String,
        value: String,
    },

    /// A child of a `many` slot lacks the slot's index field.
    #[error("Missing index field in slot '{slot}': child has no '{index_field}' field")]
    MissingIndexField { slot: String, index_field: String },

    /// A single-valued slot holds the wrong number of children.
    #[error("Cardinality violation in slot '{slot}': expected {expected}, found {found} children")]
    Cardinality {
        slot: String,
        expected: String,
        found: usize,
    },

    /// A node was reached again while it was still being walked.
    #[error("Infinite recursion detected: {path}")]
    InfiniteRecursion { path: String },

    /// The walk went deeper than the configured limit.
    #[error("Maximum traversal depth of {limit} exceeded")]
    DepthExceeded { limit: usize },

    /// The node-kind schema is inconsistent.
    #[error("Schema error: {message}")]
    Schema { message: String },

    /// An error occurred while parsing a model document.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Model parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the model document
        hint: Option<String>,
    },

    /// A patch operation could not be applied to a document.
    #[error("Patch error at '{path}': {message}")]
    Patch { path: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unresolved_resource() {
        let error = Error::UnresolvedResource {
            node: "Test".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Unresolved resource"));
        assert!(display.contains("'Test'"));
    }

    #[test]
    fn test_error_display_duplicate_index() {
        let error = Error::DuplicateIndex {
            slot: "many".to_string(),
            index_field: "name".to_string(),
            value: "a".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Duplicate index"));
        assert!(display.contains("'many'"));
        assert!(display.contains("name=a"));
    }

    #[test]
    fn test_error_display_cardinality() {
        let error = Error::Cardinality {
            slot: "required".to_string(),
            expected: "exactly one".to_string(),
            found: 0,
        };
        let display = format!("{}", error);
        assert!(display.contains("Cardinality violation"));
        assert!(display.contains("expected exactly one, found 0"));
    }

    #[test]
    fn test_error_display_infinite_recursion() {
        let error = Error::InfiniteRecursion {
            path: "Item -> Item -> Item".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Infinite recursion"));
        assert!(display.contains("Item -> Item -> Item"));
    }

    #[test]
    fn test_error_display_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "Unknown relation 'childs'".to_string(),
            hint: Some("Declare the relation on the kind".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Model parsing error"));
        assert!(display.contains("hint:"));
        assert!(display.contains("Declare the relation"));
    }

    #[test]
    fn test_error_display_config_parse_without_hint() {
        let error = Error::ConfigParse {
            message: "Unknown kind".to_string(),
            hint: None,
        };
        assert!(!format!("{}", error).contains("hint:"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_str = "invalid: [unclosed";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: Error = yaml_error.into();
        assert!(format!("{}", error).contains("YAML parsing error"));
    }

    #[test]
    fn test_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(format!("{}", error).contains("JSON error"));
    }
}
