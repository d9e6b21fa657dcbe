mod build;
mod context;

pub use build::{BuildArgs, cmd_build};
pub use context::{ContextArgs, cmd_context};
