//! Shared helpers for library integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use fnbuild_lib::context::{BuildContextConfig, ContextAssembler};
use tempfile::TempDir;

/// Path to a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
    .join(name)
}

pub fn fixture_content(name: &str) -> String {
  fs::read_to_string(fixture_path(name)).unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
}

/// A scratch project with a `python3` template and a `hello` function handler.
pub struct TestProject {
  pub temp: TempDir,
}

impl TestProject {
  pub fn new() -> Self {
    let project = Self {
      temp: TempDir::new().unwrap(),
    };
    project.write_file("template/python3/Dockerfile", "FROM python:3.12-alpine\nCOPY . .\n");
    project.write_file("template/python3/index.py", "from function import handler\n");
    project.write_file("template/python3/requirements.txt", "flask\n");
    project.write_file("template/python3/function/handler.py", "# replaced by the function\n");
    project.write_file("hello/handler.py", "def handle(req):\n    return req\n");
    project.write_file("hello/requirements.txt", "requests\n");
    project
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn handler(&self) -> PathBuf {
    self.root().join("hello")
  }

  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.root().join(relative_path);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
  }

  /// Assembler writing into `<root>/build` and resolving extra paths against the root.
  pub fn assembler(&self) -> ContextAssembler {
    let config = BuildContextConfig::default()
      .with_build_dir(self.root().join("build"))
      .with_template_dir(self.root().join("template"));
    ContextAssembler::new(config)
      .with_project_root(self.root())
      .with_ci_detector(|| false)
  }
}
