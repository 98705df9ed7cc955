/// TOML configuration with environment overrides.
pub mod config;
/// Crate-wide error type.
pub mod error;
