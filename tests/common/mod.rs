//! Shared test utilities for integration and E2E tests.
//!
//! This module provides common fixtures and helper functions to reduce
//! duplication across test files.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_schema().with_model(models::MERGE);
//!     // ... test code
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

use entity_patch::model::Entity;
use entity_patch::schema::Schema;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::models;
    #[allow(unused_imports)]
    pub use super::{load, schema, TestFixture};
}

/// Node kinds shared by every test.
pub const SCHEMA: &str = include_str!("../testdata/schema.yaml");

/// Model documents built against [`SCHEMA`].
#[allow(dead_code)]
pub mod models {
    /// Root on `res_b`; `required` and `many[name=a]` on `res_a`.
    pub const MERGE: &str = include_str!("../testdata/merge.yaml");

    /// A single-resource tree with `operation: replace` at the root.
    pub const REPLACE: &str = include_str!("../testdata/replace.yaml");

    /// The root has no resource and nothing to inherit from.
    pub const UNBOUND_ROOT: &str = r#"
kind: Test
fields: { name: test }
relations:
  required: { kind: RequiredEmbeddedTest, fields: { name: required } }
"#;

    /// Two list elements share the index value `a`.
    pub const DUPLICATE_INDEX: &str = r#"
kind: Test
resource: res
fields: { name: test }
relations:
  required: { kind: RequiredEmbeddedTest, fields: { name: required } }
  many:
    - { kind: ManyEmbeddedTest, fields: { name: a } }
    - { kind: ManyEmbeddedTest, fields: { name: a } }
"#;

    /// The required slot is empty.
    pub const MISSING_REQUIRED: &str = r#"
kind: Test
resource: res
fields: { name: test }
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "kind: [unclosed";
}

/// Compile [`SCHEMA`].
#[allow(dead_code)]
pub fn schema() -> Schema {
    Schema::parse(SCHEMA).expect("test schema compiles")
}

/// Build the entity tree of a model document against [`SCHEMA`].
#[allow(dead_code)]
pub fn load(model: &str) -> Entity {
    entity_patch::config::parse(&schema(), model).expect("test model loads")
}

/// A test fixture that provides a temporary directory holding a schema and
/// a model file.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::new().with_schema().with_model(models::MERGE);
///
/// fixture
///     .command()
///     .args(["serialize", "--resource", "res_a"])
///     .assert()
///     .success();
/// ```
#[allow(dead_code)]
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Write [`SCHEMA`] to `schema.yaml`.
    pub fn with_schema(self) -> Self {
        self.with_file("schema.yaml", SCHEMA)
    }

    /// Write a model document to `model.yaml`.
    pub fn with_model(self, content: &str) -> Self {
        self.with_file("model.yaml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn schema_path(&self) -> PathBuf {
        self.temp_dir.path().join("schema.yaml")
    }

    pub fn model_path(&self) -> PathBuf {
        self.temp_dir.path().join("model.yaml")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("entity-patch");
        cmd.current_dir(self.path());
        cmd
    }

    /// Create a command for `subcommand` with the schema and model arguments.
    pub fn command_with_model(&self, subcommand: &str) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg(subcommand)
            .arg("--schema")
            .arg(self.schema_path())
            .arg("--model")
            .arg(self.model_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_writes_files() {
        let fixture = TestFixture::new().with_schema().with_model(models::MERGE);
        assert!(fixture.schema_path().exists());
        assert!(fixture.model_path().exists());
    }

    #[test]
    fn test_models_load() {
        load(models::MERGE);
        load(models::REPLACE);
        load(models::DUPLICATE_INDEX);
        load(models::MISSING_REQUIRED);
    }
}
