// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for the annotation tool.
//!
//! This module contains the command-line interface logic: argument parsing,
//! the interactive `label` loop, and the batch commands (`export`, `coco`,
//! `validate`, `list`).

// Modules
/// CLI arguments.
pub mod args;

/// Command implementations.
pub mod commands;

/// Interactive labeling loop.
pub mod label;

/// Logging macros and verbosity flag.
pub mod logging;
