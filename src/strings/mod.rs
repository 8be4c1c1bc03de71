//! # Strings
//!
//! User-facing message text, kept in one place.

pub mod messages;
