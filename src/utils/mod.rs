//! Environment variable helpers.

pub mod env;

pub use env::{get_env_with_prefix, get_non_empty_env, parse_env};
