//! Build result streams over a recorded Builder log.

use std::io::{self, Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fnbuild_lib::builder::{BuildResult, BuildResultStream};

use super::common::fixture_content;

/// Reader that records how many times it was released.
struct CloseCounter {
  inner: Cursor<Vec<u8>>,
  closes: Arc<AtomicUsize>,
}

impl CloseCounter {
  fn over_fixture() -> (Self, Arc<AtomicUsize>) {
    let closes = Arc::new(AtomicUsize::new(0));
    let reader = Self {
      inner: Cursor::new(fixture_content("buildlogs.ndjson").into_bytes()),
      closes: closes.clone(),
    };
    (reader, closes)
  }
}

impl Read for CloseCounter {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    self.inner.read(buf)
  }
}

impl Drop for CloseCounter {
  fn drop(&mut self) {
    self.closes.fetch_add(1, Ordering::SeqCst);
  }
}

#[test]
fn recorded_log_decodes_in_order() {
  let (reader, closes) = CloseCounter::over_fixture();

  let results: Vec<BuildResult> = BuildResultStream::new(reader).map(Result::unwrap).collect();

  assert_eq!(results.len(), 40);
  assert_eq!(
    results[0].log,
    vec!["v: 2025-06-13T20:16:16Z [internal] load build definition from Dockerfile"]
  );
  assert!(results[..39].iter().all(|r| r.status == "in_progress"));
  let last = results.last().unwrap();
  assert_eq!(last.image, "ttl.sh/openfaas/test-image-hello:10m");
  assert_eq!(last.status, "success");
  assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn stopping_after_five_results_closes_the_reader() {
  let (reader, closes) = CloseCounter::over_fixture();

  let mut count = 0;
  for result in BuildResultStream::new(reader) {
    result.unwrap();
    count += 1;
    if count == 5 {
      break;
    }
  }

  assert_eq!(count, 5);
  assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn follow_reports_every_event_and_returns_the_outcome() {
  let (reader, closes) = CloseCounter::over_fixture();

  let mut logs = Vec::new();
  let last = BuildResultStream::new(reader)
    .follow(|event| logs.extend(event.log.iter().cloned()))
    .unwrap();

  assert_eq!(logs.len(), 39);
  assert!(logs.iter().any(|l| l.contains("pushing layers")));
  assert!(last.is_success());
  assert_eq!(closes.load(Ordering::SeqCst), 1);
}
