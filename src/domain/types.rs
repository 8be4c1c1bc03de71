//! # Domain Types
//!
//! Common data structures shared across the application logic: the runtime
//! lifecycle state, chat identities, and per-guild state handles.

use crate::domain::traits::SettingsStore;
use std::sync::Arc;

/// Lifecycle state of the bot session. Exactly one value is current at any
/// time; every state except `Connecting` is "settled" (logout and reload may
/// only proceed from a settled state).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    Idle,
    Connecting,
    Connected,
    ConnectFailed,
    LoadFailed,
}

impl RuntimeState {
    /// Human-readable status line shown by the shell for this state.
    pub fn status_text(&self) -> &'static str {
        match self {
            RuntimeState::Idle => "Idle.",
            RuntimeState::Connecting => "Connecting...",
            RuntimeState::Connected => "Connected.",
            RuntimeState::ConnectFailed => "Failed to connect to the chat gateway!",
            RuntimeState::LoadFailed => "Bot loading failed!",
        }
    }

    /// Whether lifecycle operations (logout, reload) may start from here.
    pub fn is_settled(&self) -> bool {
        *self != RuntimeState::Connecting
    }
}

/// A chat user as seen by the router: an opaque id plus a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: String,
    pub name: String,
}

impl UserRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A guild (server) the bot is a member of, as reported by the gateway on
/// login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildContext {
    pub id: String,
    pub name: String,
}

/// Per-guild state handle built after a successful login. Wraps the durable
/// settings store with keys namespaced by guild id.
#[derive(Clone)]
pub struct GuildState {
    guild: GuildContext,
    settings: Arc<dyn SettingsStore>,
}

impl GuildState {
    pub fn new(guild: GuildContext, settings: Arc<dyn SettingsStore>) -> Self {
        Self { guild, settings }
    }

    pub fn id(&self) -> &str {
        &self.guild.id
    }

    pub fn name(&self) -> &str {
        &self.guild.name
    }

    pub async fn get_persist(&self, key: &str, default: &str) -> String {
        self.settings.get(&self.guild.id, key, default).await
    }

    pub async fn put_persist(&self, key: &str, value: &str) {
        self.settings.put(&self.guild.id, key, value).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_states() {
        assert!(RuntimeState::Idle.is_settled());
        assert!(RuntimeState::Connected.is_settled());
        assert!(RuntimeState::ConnectFailed.is_settled());
        assert!(RuntimeState::LoadFailed.is_settled());
        assert!(!RuntimeState::Connecting.is_settled());
    }
}
