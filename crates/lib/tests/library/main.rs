//! Integration tests for fnbuild-lib, driven through the public API.

mod common;

mod assemble_tests;
mod stream_tests;
mod submit_tests;
