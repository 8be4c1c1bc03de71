//! # Commands
//!
//! The descriptor metadata for a single command ([`CommandSpec`]), one
//! parsed user request ([`CommandInvocation`]), and the handler interface
//! the router invokes.

use crate::application::group::CommandGroup;
use crate::domain::traits::Responder;
use crate::domain::types::UserRef;
use async_trait::async_trait;

/// Metadata for one command: alias names, help text, usage, visibility, and
/// the authorization role required to run it (empty = ungated). A command
/// whose first name is the empty string is a wildcard and matches any first
/// token.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    names: Vec<String>,
    summary: String,
    details: String,
    usage: String,
    visible: bool,
    auth_role: String,
}

impl CommandSpec {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            summary: String::new(),
            details: String::new(),
            usage: String::new(),
            visible: true,
            auth_role: String::new(),
        }
    }

    /// A wildcard spec: matches any first token.
    pub fn wildcard() -> Self {
        Self::new([""])
    }

    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.summary = text.into();
        self
    }

    pub fn details(mut self, text: impl Into<String>) -> Self {
        self.details = text.into();
        self
    }

    pub fn usage(mut self, text: impl Into<String>) -> Self {
        self.usage = text.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn auth(mut self, role: impl Into<String>) -> Self {
        self.auth_role = role.into();
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The display name: the first alias.
    pub fn name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or("")
    }

    pub fn summary_text(&self) -> &str {
        &self.summary
    }

    pub fn details_text(&self) -> &str {
        &self.details
    }

    pub fn usage_text(&self) -> &str {
        &self.usage
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn auth_role(&self) -> &str {
        &self.auth_role
    }

    pub fn requires_auth(&self) -> bool {
        !self.auth_role.is_empty()
    }

    /// Whether this spec claims the given first token. Wildcard names (empty
    /// string) match anything.
    pub fn matches(&self, token: &str) -> bool {
        self.names.iter().any(|n| n.is_empty() || n == token)
    }
}

/// One parsed user request: the token sequence plus the identities attached
/// to it. The sender may be absent for externally triggered invocations
/// (console admin input).
#[derive(Debug, Clone, Default)]
pub struct CommandInvocation {
    tokens: Vec<String>,
    mentions: Vec<UserRef>,
    sender: Option<UserRef>,
}

impl CommandInvocation {
    pub fn new(tokens: Vec<String>, mentions: Vec<UserRef>, sender: Option<UserRef>) -> Self {
        Self {
            tokens,
            mentions,
            sender,
        }
    }

    pub fn from_tokens(tokens: Vec<String>) -> Self {
        Self {
            tokens,
            ..Self::default()
        }
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Consume a token, e.g. before delegating the rest of the invocation to
    /// a nested command group.
    pub fn discard_token(&mut self, index: usize) {
        if index < self.tokens.len() {
            self.tokens.remove(index);
        }
    }

    pub fn mentions(&self) -> &[UserRef] {
        &self.mentions
    }

    pub fn sender(&self) -> Option<&UserRef> {
        self.sender.as_ref()
    }
}

/// A command handler. Receives the owning group by reference (non-owning:
/// the group owns the handler, not the other way around), a mutable copy of
/// the invocation, and the reply channel.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn exec(
        &self,
        group: &CommandGroup,
        input: &mut CommandInvocation,
        responder: &dyn Responder,
    ) -> anyhow::Result<()>;
}
