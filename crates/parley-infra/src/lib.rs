//! Infrastructure layer for Parley.
//!
//! Contains implementations of the port traits defined in `parley-core`:
//! the SQLite conversation store and the AWS Bedrock inference provider,
//! plus the configuration loader (TOML file + environment overrides).

pub mod config;
pub mod llm;
pub mod sqlite;
