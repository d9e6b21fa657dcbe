//! Newline-delimited build result stream.
//!
//! The stream owns the response body. It is closed exactly once, on whichever
//! comes first:
//! - the body reaches end of file
//! - a line fails to decode or the read fails
//! - [`BuildResultStream::close`] is called
//! - the stream is dropped, which covers a caller breaking out of a `for` loop

use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::iter::FusedIterator;

use tracing::{debug, trace};

use super::{BuildResult, BuilderError};

/// Single-pass iterator over the build events in a response body.
pub struct BuildResultStream<R: Read> {
  reader: Option<BufReader<R>>,
  line: usize,
  buf: Vec<u8>,
}

impl<R: Read> fmt::Debug for BuildResultStream<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("BuildResultStream")
      .field("line", &self.line)
      .field("closed", &self.is_closed())
      .finish_non_exhaustive()
  }
}

impl<R: Read> BuildResultStream<R> {
  pub fn new(reader: R) -> Self {
    Self {
      reader: Some(BufReader::new(reader)),
      line: 0,
      buf: Vec::new(),
    }
  }

  pub fn is_closed(&self) -> bool {
    self.reader.is_none()
  }

  /// Release the underlying reader. Further calls and iteration are no-ops.
  pub fn close(&mut self) {
    if let Some(reader) = self.reader.take() {
      drop(reader);
      debug!(lines = self.line, "build result stream closed");
    }
  }

  /// Consume events until a terminal status or the end of the stream, calling
  /// `on_event` for each, and return the last event.
  pub fn follow<F>(mut self, mut on_event: F) -> Result<BuildResult, BuilderError>
  where
    F: FnMut(&BuildResult),
  {
    let mut last = None;
    for result in &mut self {
      let result = result?;
      on_event(&result);
      let terminal = result.is_terminal();
      last = Some(result);
      if terminal {
        break;
      }
    }
    self.close();
    last.ok_or(BuilderError::EmptyStream)
  }
}

impl<R: Read> Iterator for BuildResultStream<R> {
  type Item = Result<BuildResult, BuilderError>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let reader = self.reader.as_mut()?;
      self.buf.clear();

      match reader.read_until(b'\n', &mut self.buf) {
        Ok(0) => {
          self.close();
          return None;
        }
        Ok(_) => {
          self.line += 1;
          let text = self.buf.trim_ascii();
          if text.is_empty() {
            continue;
          }
          match serde_json::from_slice::<BuildResult>(text) {
            Ok(result) => {
              trace!(line = self.line, status = %result.status, "build event");
              return Some(Ok(result));
            }
            Err(e) => {
              let line = self.line;
              self.close();
              return Some(Err(BuilderError::StreamDecode { line, source: e }));
            }
          }
        }
        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
        Err(e) => {
          self.close();
          return Some(Err(BuilderError::StreamRead(e)));
        }
      }
    }
  }
}

impl<R: Read> FusedIterator for BuildResultStream<R> {}

impl<R: Read> Drop for BuildResultStream<R> {
  fn drop(&mut self) {
    self.close();
  }
}
