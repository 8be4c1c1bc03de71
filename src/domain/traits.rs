//! # Domain Traits
//!
//! Capability interfaces for the external collaborators (chat gateway,
//! shell, settings store, reply channel). The core only ever talks to these
//! traits; concrete implementations live in the Infrastructure layer.

use crate::domain::error::AuthenticationError;
use crate::domain::types::{GuildContext, RuntimeState, UserRef};
use async_trait::async_trait;

/// Abstract interface for the network chat-gateway session. The core treats
/// login/logout as opaque asynchronous operations and delegates permission
/// lookups to the gateway's member/role knowledge.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Establish a session with the given credential token, advertising the
    /// given activity text. On success, returns the roster of guilds the
    /// bot is a member of.
    async fn login(
        &self,
        token: &str,
        activity: &str,
    ) -> Result<Vec<GuildContext>, AuthenticationError>;

    /// Tear down the current session. A no-op when no session is live.
    async fn logout(&self);

    /// Deliver a message to a channel.
    async fn send_message(&self, channel: &str, content: &str);

    /// Whether `sender` holds (or outranks) the named role. An absent sender
    /// never passes a role check.
    async fn check_permission(&self, sender: Option<&UserRef>, role: &str) -> bool;
}

/// Abstract interface for the shell (GUI window, console, ...). The
/// orchestrator calls exactly one `notify_state` per state transition; the
/// shell renders and has no other write access into the state machine.
pub trait ShellNotifier: Send + Sync {
    /// Render a state transition with its human-readable status line.
    fn notify_state(&self, state: RuntimeState, status: &str);

    /// Clear the shell's output area (admin `clear` command).
    fn clear_output(&self);
}

/// Durable per-guild key-value settings store.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, guild: &str, key: &str, default: &str) -> String;
    async fn put(&self, guild: &str, key: &str, value: &str);
}

/// Reply channel for conversational output produced during routing
/// ("empty command", help text, handler replies). Gateway-originated
/// invocations reply into the source channel; console-originated ones reply
/// to the console.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, content: &str);
}
