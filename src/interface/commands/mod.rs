//! # Command Handlers
//!
//! Host-side command handlers (the administrative group). Module-supplied
//! commands come from the loader instead.

pub mod admin;
