//! # Application Layer
//!
//! The command pipeline (tokenizer, descriptors, groups, router) and the
//! runtime orchestrator that drives the lifecycle state machine.

pub mod command;
pub mod group;
pub mod help;
pub mod orchestrator;
pub mod router;
pub mod tokenizer;
