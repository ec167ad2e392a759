pub mod config;
pub mod dedup;
pub mod emit;
pub mod error;
pub mod job;
pub mod mapping;
pub mod parse;
pub mod source;
pub mod transform;

/// Value of the `$lib_version` property stamped on every imported event.
pub fn lib_version() -> String {
    format!("{}@{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
