//! # Infrastructure Layer
//!
//! Concrete implementations at the edges: the Lua module loader, module
//! path resolution, the offline gateway, and the settings store.

pub mod gateway;
pub mod loader;
pub mod paths;
pub mod settings;
