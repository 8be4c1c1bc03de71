//! # Interface Layer
//!
//! The console shell and its administrative command handlers.

pub mod commands;
pub mod console;
