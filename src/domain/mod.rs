//! # Domain Layer
//!
//! Configuration, error taxonomy, core types, and the capability traits the
//! rest of the system is written against.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;
