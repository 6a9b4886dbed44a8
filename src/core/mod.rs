// src/core/mod.rs

//! Workflow toolkit used by scripts running under a GitHub-Actions-style runner, plus
//! config loading and the text helpers behind `exec`.

pub mod commands;
pub mod config_loader;
pub mod inputs;
pub mod paths;
pub mod properties;
pub mod runner;
pub mod summary;
pub mod text;
