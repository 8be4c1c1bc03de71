//! # Error Taxonomy
//!
//! Typed errors for the recoverable failure classes: module path resolution,
//! module loading, and session authentication. None of these are fatal to
//! the host process; the orchestrator maps them onto `LoadFailed` or
//! `ConnectFailed` and a later reload or login can retry.

use std::path::PathBuf;
use thiserror::Error;

/// No usable module path could be resolved from any candidate source.
#[derive(Debug, Error)]
#[error("failed to locate a bot module archive")]
pub struct ConfigurationError;

/// A module archive could not be brought up. Each variant corresponds to a
/// distinct point of failure in the load sequence; whichever fires, no
/// module namespace remains resident afterward.
#[derive(Debug, Error)]
pub enum PluginLoadError {
    /// The archive could not be read or executed far enough to expose its
    /// manifest.
    #[error("failed to open bot module at {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// The module executed but declared no `manifest.entry`.
    #[error("missing entry declaration in module manifest")]
    MissingManifestEntry,

    /// The declared entry symbol does not exist in the module namespace.
    #[error("entry point {0:?} not found in module")]
    EntryNotFound(String),

    /// The declared entry symbol exists but is not callable.
    #[error("entry point {0:?} is not callable")]
    NotInstantiable(String),

    /// The entry invocation itself raised, or produced an unusable
    /// configuration.
    #[error("entry point invocation failed: {0}")]
    EntryFailed(String),
}

/// Lifecycle misuse of a [`Module`](crate::infrastructure::loader::Module).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModuleStateError {
    /// The module's configuration was read while the module was unloaded.
    #[error("module not loaded")]
    NotLoaded,

    /// `unload` was called on an already-unloaded module.
    #[error("module already unloaded")]
    AlreadyUnloaded,
}

/// A session could not be established with the chat gateway.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("invalid credential token")]
    InvalidToken,

    #[error("network failure during login: {0}")]
    Network(String),

    #[error("login interrupted")]
    Interrupted,
}
