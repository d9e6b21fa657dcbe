//! Fixed names shared across the crate.

/// Name of the tar entry that carries the serialized `BuildConfig`.
pub const BUILDER_CONFIG_FILE_NAME: &str = "com.openfaas.docker.config";

/// Prefix under which every filesystem entry of a build context is archived.
pub const CONTEXT_PREFIX: &str = "context";

/// Mode of the manifest entry inside the archive.
pub const BUILDER_CONFIG_FILE_MODE: u32 = 0o664;

pub const DEFAULT_BUILD_DIR: &str = "./build";
pub const DEFAULT_TEMPLATE_DIR: &str = "./template";
pub const DEFAULT_TEMPLATE_HANDLER: &str = "function";

/// Language name that selects a raw Dockerfile build with no template.
pub const DOCKERFILE_LANGUAGE: &str = "dockerfile";

/// Top-level handler entries that are never copied into a build context.
pub const HANDLER_SKIP_LIST: &[&str] = &["build", "template"];

pub const DEFAULT_DIR_MODE: u32 = 0o700;
pub const CI_DIR_MODE: u32 = 0o777;

pub const SIGNATURE_HEADER: &str = "X-Build-Signature";
pub const SIGNATURE_ALGORITHM: &str = "sha256";
pub const ARCHIVE_CONTENT_TYPE: &str = "application/octet-stream";
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";
pub const USER_AGENT: &str = concat!("fnbuild/", env!("CARGO_PKG_VERSION"));

pub const CI_ENV: &str = "CI";
pub const BUILDER_URL_ENV: &str = "FNBUILD_BUILDER_URL";
pub const PAYLOAD_SECRET_ENV: &str = "FNBUILD_PAYLOAD_SECRET";
pub const PAYLOAD_SECRET_FILE_ENV: &str = "FNBUILD_PAYLOAD_SECRET_FILE";
pub const BUILD_TIMEOUT_ENV: &str = "FNBUILD_BUILD_TIMEOUT";
