//! # Command Router
//!
//! Routes raw input lines against command groups: prefix claim check,
//! tokenization, alias matching (including wildcards), authorization via
//! the gateway, and handler invocation. `route_ordered` composes several
//! groups with short-circuit semantics so an administrative group can
//! overlay the user-configured ones.

use crate::application::command::CommandInvocation;
use crate::application::group::CommandGroup;
use crate::application::tokenizer::tokenize;
use crate::domain::traits::{ChatGateway, Responder};
use crate::domain::types::UserRef;
use crate::strings::messages;
use std::sync::Arc;

pub struct CommandRouter {
    gateway: Arc<dyn ChatGateway>,
}

impl CommandRouter {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self { gateway }
    }

    /// Try to route `raw` inside one group. Returns whether the group
    /// claimed the input and at least one handler ran.
    ///
    /// Matching descriptors are evaluated independently: an authorization
    /// failure on one is reported and skipped, not a short-circuit. Each
    /// invoked handler gets its own mutable copy of the invocation.
    pub async fn route(
        &self,
        group: &CommandGroup,
        raw: &str,
        mentions: &[UserRef],
        sender: Option<&UserRef>,
        silent: bool,
        responder: &dyn Responder,
    ) -> bool {
        // The prefix claim happens on the raw input, before tokenization.
        if !group.prefix().is_empty() && !raw.starts_with(group.prefix()) {
            return false;
        }
        let rest = &raw[group.prefix().len()..];
        let quiet = silent || group.silent_by_default();

        let tokens: Vec<String> = tokenize(rest).map(str::to_string).collect();
        let Some(first) = tokens.first() else {
            if !quiet {
                responder.reply(messages::EMPTY_COMMAND).await;
            }
            return false;
        };

        let mut invoked = false;
        for entry in group.entries() {
            let spec = entry.spec();
            if !spec.matches(first) {
                continue;
            }
            if spec.requires_auth()
                && !self.gateway.check_permission(sender, spec.auth_role()).await
            {
                if !quiet {
                    responder.reply(messages::NO_PERMISSION).await;
                }
                continue;
            }

            let mut input =
                CommandInvocation::new(tokens.clone(), mentions.to_vec(), sender.cloned());
            if let Err(err) = entry.handler().exec(group, &mut input, responder).await {
                tracing::warn!("command {:?} failed: {err:#}", spec.name());
            }
            invoked = true;
        }

        if !invoked && !quiet {
            responder.reply(messages::UNKNOWN_COMMAND).await;
        }
        invoked
    }

    /// Route against groups in declaration order, stopping at the first
    /// group that claims the input.
    pub async fn route_ordered(
        &self,
        groups: &[CommandGroup],
        raw: &str,
        mentions: &[UserRef],
        sender: Option<&UserRef>,
        responder: &dyn Responder,
    ) -> bool {
        for group in groups {
            if self
                .route(group, raw, mentions, sender, false, responder)
                .await
            {
                return true;
            }
        }
        false
    }
}
