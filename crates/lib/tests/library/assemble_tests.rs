//! Context assembly and archiving end to end on a real filesystem.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use fnbuild_lib::consts::BUILDER_CONFIG_FILE_NAME;
use fnbuild_lib::context::{BuildConfig, ContextError, ScopeError, make_tar};
use fnbuild_lib::util::hash::hash_context;

use super::common::TestProject;

fn archive_names(path: &Path) -> Vec<PathBuf> {
  let mut archive = tar::Archive::new(File::open(path).unwrap());
  archive
    .entries()
    .unwrap()
    .map(|e| e.unwrap().path().unwrap().into_owned())
    .collect()
}

#[test]
fn assembling_twice_gives_identical_trees() {
  let project = TestProject::new();
  project.write_file("shared/models.py", "class User: pass\n");
  let extras = vec![PathBuf::from("shared")];
  let assembler = project.assembler();

  let first = assembler.assemble("hello", &project.handler(), "python3", &extras).unwrap();
  let first_hash = hash_context(&first).unwrap();
  let second = assembler.assemble("hello", &project.handler(), "python3", &extras).unwrap();
  let second_hash = hash_context(&second).unwrap();

  assert_eq!(first, second);
  assert_eq!(first_hash, second_hash);
}

#[test]
fn changing_the_handler_changes_the_digest() {
  let project = TestProject::new();
  let assembler = project.assembler();

  let context = assembler.assemble("hello", &project.handler(), "python3", &[]).unwrap();
  let before = hash_context(&context).unwrap();
  project.write_file("hello/handler.py", "def handle(req):\n    return 'changed'\n");
  assembler.assemble("hello", &project.handler(), "python3", &[]).unwrap();

  assert_ne!(before, hash_context(&context).unwrap());
}

#[test]
fn handler_build_output_never_reaches_the_context_or_archive() {
  let project = TestProject::new();
  project.write_file("hello/build/hello/Dockerfile", "FROM stale\n");
  project.write_file("hello/template/python3/Dockerfile", "FROM cached\n");
  project.write_file("hello/lib/build/keep.txt", "nested build dirs are fine\n");

  let context = project
    .assembler()
    .assemble("hello", &project.handler(), "python3", &[])
    .unwrap();
  let tar_path = project.root().join("req.tar");
  make_tar(&tar_path, &context, &BuildConfig::new("ttl.sh/hello:1h")).unwrap();

  assert!(!context.join("function/build").exists());
  assert!(!context.join("function/template").exists());
  assert!(context.join("function/lib/build/keep.txt").is_file());

  let names = archive_names(&tar_path);
  assert!(!names.iter().any(|n| n.starts_with("context/function/build")));
  assert!(!names.iter().any(|n| n.starts_with("context/function/template")));
  assert!(names.contains(&PathBuf::from("context/function/lib/build/keep.txt")));
}

#[test]
fn traversal_extra_path_is_rejected_before_any_change() {
  let project = TestProject::new();

  let err = project
    .assembler()
    .assemble("hello", &project.handler(), "python3", &[PathBuf::from("../../etc")])
    .unwrap_err();

  assert!(
    matches!(err, ContextError::ScopeViolation(ScopeError::OutsideScope { .. })),
    "got {err:?}"
  );
  assert!(!project.root().join("build").exists());
}

#[test]
fn one_bad_extra_path_fails_the_whole_request() {
  let project = TestProject::new();
  project.write_file("shared/ok.py", "");

  let err = project
    .assembler()
    .assemble(
      "hello",
      &project.handler(),
      "python3",
      &[PathBuf::from("shared"), PathBuf::from("/etc/passwd")],
    )
    .unwrap_err();

  assert!(matches!(err, ContextError::ScopeViolation(_)));
  assert!(!project.root().join("build/hello").exists());
}

#[test]
fn archive_lists_context_then_manifest() {
  let project = TestProject::new();
  let context = project
    .assembler()
    .assemble("hello", &project.handler(), "python3", &[])
    .unwrap();
  let tar_path = project.root().join("req.tar");

  make_tar(&tar_path, &context, &BuildConfig::new("ttl.sh/hello:1h")).unwrap();

  let names = archive_names(&tar_path);
  let (manifest, rest) = names.split_last().unwrap();
  assert_eq!(manifest, &PathBuf::from(BUILDER_CONFIG_FILE_NAME));
  assert!(rest.iter().all(|n| n.starts_with("context")));
  for expected in [
    "context/Dockerfile",
    "context/index.py",
    "context/requirements.txt",
    "context/function/handler.py",
    "context/function/requirements.txt",
  ] {
    assert!(names.contains(&PathBuf::from(expected)), "missing {expected}");
  }
}

#[test]
fn archive_bytes_match_the_context_on_disk() {
  let project = TestProject::new();
  let context = project
    .assembler()
    .assemble("hello", &project.handler(), "python3", &[])
    .unwrap();
  let tar_path = project.root().join("req.tar");
  make_tar(&tar_path, &context, &BuildConfig::new("x")).unwrap();

  let mut archive = tar::Archive::new(File::open(&tar_path).unwrap());
  for entry in archive.entries().unwrap() {
    let mut entry = entry.unwrap();
    let name = entry.path().unwrap().into_owned();
    let Ok(rel) = name.strip_prefix("context") else {
      continue;
    };
    if entry.header().entry_type().is_file() {
      let mut contents = Vec::new();
      std::io::Read::read_to_end(&mut entry, &mut contents).unwrap();
      assert_eq!(contents, fs::read(context.join(rel)).unwrap(), "{}", name.display());
    }
  }
}
