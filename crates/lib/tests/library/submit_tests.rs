//! Assemble, archive and submit against a mock Builder.

use std::fs;

use fnbuild_lib::builder::sign::signature_header_value;
use fnbuild_lib::builder::{BuildResult, BuilderError, FunctionBuilder};
use fnbuild_lib::config::BuilderSettings;
use fnbuild_lib::context::{BuildConfig, make_tar};
use mockito::{Matcher, Server};
use reqwest::Url;

use super::common::{TestProject, fixture_content};

const SECRET: &str = "integration-secret";

fn settings(url: &str) -> BuilderSettings {
  BuilderSettings {
    url: Url::parse(url).unwrap(),
    hmac_secret: SECRET.as_bytes().to_vec(),
    timeout: None,
  }
}

fn prepared_archive(project: &TestProject) -> std::path::PathBuf {
  let context = project
    .assembler()
    .assemble("hello", &project.handler(), "python3", &[])
    .unwrap();
  let tar_path = project.root().join("req.tar");
  let config = BuildConfig::new("ttl.sh/openfaas/test-image-hello:10m").platform("linux/amd64");
  make_tar(&tar_path, &context, &config).unwrap();
  tar_path
}

#[test]
fn signed_archive_round_trip() {
  let project = TestProject::new();
  let tar_path = prepared_archive(&project);
  let payload = fs::read(&tar_path).unwrap();
  let signature = signature_header_value(SECRET.as_bytes(), &payload).unwrap();

  let mut server = Server::new();
  let mock = server
    .mock("POST", "/build")
    .match_header("x-build-signature", signature.as_str())
    .match_header("content-type", "application/octet-stream")
    .with_status(202)
    .with_body(r#"{"image":"ttl.sh/openfaas/test-image-hello:10m","status":"success"}"#)
    .create();

  let builder = FunctionBuilder::from_settings(&settings(&server.url())).unwrap();
  let result = builder.build(&tar_path).unwrap();

  mock.assert();
  assert_eq!(
    result,
    BuildResult {
      log: Vec::new(),
      image: "ttl.sh/openfaas/test-image-hello:10m".to_string(),
      status: "success".to_string(),
    }
  );
}

#[test]
fn accepted_stream_yields_every_line() {
  let project = TestProject::new();
  let tar_path = prepared_archive(&project);
  let body: String = fixture_content("buildlogs.ndjson").lines().take(6).map(|l| format!("{l}\n")).collect();

  let mut server = Server::new();
  let mock = server
    .mock("POST", "/build")
    .match_header("accept", "application/x-ndjson")
    .match_header("x-build-signature", Matcher::Regex("^sha256=[0-9a-f]{64}$".to_string()))
    .with_status(202)
    .with_body(body)
    .create();

  let builder = FunctionBuilder::from_settings(&settings(&server.url())).unwrap();
  let results: Vec<BuildResult> = builder.build_with_stream(&tar_path).unwrap().map(Result::unwrap).collect();

  mock.assert();
  assert_eq!(results.len(), 6);
  assert!(results.iter().all(|r| r.status == "in_progress" && r.log.len() == 1));
}

#[test]
fn rejected_signature_surfaces_status() {
  let project = TestProject::new();
  let tar_path = prepared_archive(&project);

  let mut server = Server::new();
  server
    .mock("POST", "/build")
    .with_status(401)
    .with_body("unauthorized")
    .create();

  let builder = FunctionBuilder::from_settings(&settings(&server.url())).unwrap();
  let err = builder.build(&tar_path).unwrap_err();

  assert!(matches!(err, BuilderError::UnexpectedStatus { status: 401, .. }));
  assert!(err.to_string().contains("status code 401"));
}
