//! fnbuild-lib: build-context assembly and signed submission to a function Builder service.
//!
//! The pipeline runs leaf-first:
//! - [`context::scope`]: rejects extra paths that escape the project root
//! - [`context::assemble`]: lays out template, handler overlay and extra paths on disk
//! - [`context::archive`]: serializes the context plus the `BuildConfig` manifest as tar
//! - [`builder::client`]: signs the archive with HMAC-SHA256 and POSTs it to the Builder
//! - [`builder::stream`]: decodes newline-delimited build events from the response

pub mod builder;
pub mod config;
pub mod consts;
pub mod context;
pub mod platform;
pub mod util;
