//! Core engine for tagship
//!
//! - **config**: ship.toml parsing and validation
//! - **context**: repository context built once in main.rs
//! - **error**: error taxonomy with contextual help messages
//! - **process**: typed subprocess invocation
//! - **vcs**: git operations (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod process;
pub mod vcs;
