//! # Local Gateway
//!
//! An offline stand-in for the network chat-gateway session, used when no
//! real backend is wired up: any non-empty token logs in, outbound messages
//! are rendered to the log, and permission checks pass for users named in
//! the host config's admin list. Useful for exercising modules from the
//! console.

use crate::domain::error::AuthenticationError;
use crate::domain::traits::{ChatGateway, Responder};
use crate::domain::types::{GuildContext, UserRef};
use async_trait::async_trait;
use std::sync::Arc;

pub struct LocalGateway {
    admins: Vec<String>,
}

impl LocalGateway {
    pub fn new(admins: Vec<String>) -> Self {
        Self { admins }
    }
}

#[async_trait]
impl ChatGateway for LocalGateway {
    async fn login(
        &self,
        token: &str,
        activity: &str,
    ) -> Result<Vec<GuildContext>, AuthenticationError> {
        if token.is_empty() {
            return Err(AuthenticationError::InvalidToken);
        }
        if !activity.is_empty() {
            tracing::info!("now playing: {activity}");
        }
        Ok(vec![GuildContext {
            id: "local".to_string(),
            name: "Local".to_string(),
        }])
    }

    async fn logout(&self) {}

    async fn send_message(&self, channel: &str, content: &str) {
        tracing::info!("[{channel}] {content}");
    }

    async fn check_permission(&self, sender: Option<&UserRef>, _role: &str) -> bool {
        match sender {
            Some(user) => self.admins.iter().any(|a| *a == user.id),
            None => false,
        }
    }
}

/// Replies into a fixed gateway channel.
pub struct ChannelResponder {
    gateway: Arc<dyn ChatGateway>,
    channel: String,
}

impl ChannelResponder {
    pub fn new(gateway: Arc<dyn ChatGateway>, channel: impl Into<String>) -> Self {
        Self {
            gateway,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl Responder for ChannelResponder {
    async fn reply(&self, content: &str) {
        self.gateway.send_message(&self.channel, content).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        let gateway = LocalGateway::new(Vec::new());
        assert!(matches!(
            gateway.login("", "").await,
            Err(AuthenticationError::InvalidToken)
        ));
        assert!(gateway.login("anything", "").await.is_ok());
    }

    #[tokio::test]
    async fn test_permission_requires_listed_admin() {
        let gateway = LocalGateway::new(vec!["ops".to_string()]);
        let ops = UserRef::new("ops", "Ops");
        let other = UserRef::new("guest", "Guest");
        assert!(gateway.check_permission(Some(&ops), "Admin").await);
        assert!(!gateway.check_permission(Some(&other), "Admin").await);
        assert!(!gateway.check_permission(None, "Admin").await);
    }
}
