pub mod checks;
pub mod config;
pub mod record;
pub mod rename;
pub mod scanner;

#[cfg(test)]
pub(crate) mod test_support;

/// Extension that marks a file as a DVK record
pub const RECORD_EXTENSION: &str = "dvk";

/// Application name for XDG paths
pub const APP_NAME: &str = "dvk-archive";
