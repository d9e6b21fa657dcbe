//! Builder service client.
//!
//! A build request is the tar archive produced by [`crate::context::make_tar`],
//! signed with an HMAC-SHA256 over its bytes and POSTed to `<builder>/build`. The
//! Builder answers either with one JSON [`BuildResult`] or, when asked for
//! `application/x-ndjson`, with a stream of them, one per line.
//!
//! # Submodules
//!
//! - [`sign`] - Payload signatures
//! - [`client`] - [`FunctionBuilder`], the HTTP client
//! - [`stream`] - [`BuildResultStream`], the line-by-line event decoder

pub mod client;
pub mod sign;
pub mod stream;
mod types;

pub use client::FunctionBuilder;
pub use stream::BuildResultStream;
pub use types::*;
