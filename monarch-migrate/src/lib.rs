//! Monarch migration tooling
//!
//! - [`cli`]: the `generate` / `list` / `migrate` commands, usable from any runner binary
//! - [`generate`]: migration template generation
//! - [`build_script`]: `build.rs` helper that compiles migrations into a runner

pub mod build_script;
pub mod cli;
pub mod generate;
