//! # Administrative Commands
//!
//! Handlers for the console-only `\`-prefixed group: pinning the
//! guild/sender/channel used to impersonate chat input from the console,
//! inspecting pin status, clearing the console, and the lifecycle requests
//! (login, logout, reload, quit).

use crate::application::command::{CommandHandler, CommandInvocation, CommandSpec};
use crate::application::group::CommandGroup;
use crate::application::orchestrator::Orchestrator;
use crate::domain::traits::{Responder, ShellNotifier};
use crate::domain::types::UserRef;
use crate::interface::console::Pinned;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub struct PinGuildCommand {
    pub orchestrator: Arc<Orchestrator>,
    pub pins: Arc<Mutex<Pinned>>,
}

impl PinGuildCommand {
    pub fn spec() -> CommandSpec {
        CommandSpec::new(["g", "pinGuild"])
            .summary("select the guild to run commands in")
            .usage("<guild id>")
    }
}

#[async_trait]
impl CommandHandler for PinGuildCommand {
    async fn exec(
        &self,
        _group: &CommandGroup,
        input: &mut CommandInvocation,
        _responder: &dyn Responder,
    ) -> anyhow::Result<()> {
        let Some(id) = input.token(1) else {
            tracing::warn!("please specify a guild ID to use");
            return Ok(());
        };
        if self.orchestrator.guild_state(id).is_none() {
            tracing::warn!("guild not found");
            return Ok(());
        }
        self.pins.lock().unwrap().guild = Some(id.to_string());
        Ok(())
    }
}

pub struct PinSenderCommand {
    pub pins: Arc<Mutex<Pinned>>,
}

impl PinSenderCommand {
    pub fn spec() -> CommandSpec {
        CommandSpec::new(["u", "pinUser"])
            .summary("select the sender to run commands as")
            .usage("<user id>")
    }
}

#[async_trait]
impl CommandHandler for PinSenderCommand {
    async fn exec(
        &self,
        _group: &CommandGroup,
        input: &mut CommandInvocation,
        _responder: &dyn Responder,
    ) -> anyhow::Result<()> {
        let Some(id) = input.token(1) else {
            tracing::warn!("please specify a user ID to use");
            return Ok(());
        };
        let mut pins = self.pins.lock().unwrap();
        if pins.guild.is_none() {
            tracing::warn!("please pin a guild first");
            return Ok(());
        }
        pins.sender = Some(UserRef::new(id, id));
        Ok(())
    }
}

pub struct PinChannelCommand {
    pub pins: Arc<Mutex<Pinned>>,
}

impl PinChannelCommand {
    pub fn spec() -> CommandSpec {
        CommandSpec::new(["c", "pinChannel"])
            .summary("select the channel to send messages to")
            .usage("<channel id>")
    }
}

#[async_trait]
impl CommandHandler for PinChannelCommand {
    async fn exec(
        &self,
        _group: &CommandGroup,
        input: &mut CommandInvocation,
        _responder: &dyn Responder,
    ) -> anyhow::Result<()> {
        let Some(id) = input.token(1) else {
            tracing::warn!("please specify a channel ID to use");
            return Ok(());
        };
        let mut pins = self.pins.lock().unwrap();
        if pins.guild.is_none() {
            tracing::warn!("please pin a guild first");
            return Ok(());
        }
        pins.channel = Some(id.to_string());
        Ok(())
    }
}

pub struct PinStatusCommand {
    pub pins: Arc<Mutex<Pinned>>,
}

impl PinStatusCommand {
    pub fn spec() -> CommandSpec {
        CommandSpec::new(["s", "pinStatus"]).summary("print status information about the pinned entities")
    }
}

#[async_trait]
impl CommandHandler for PinStatusCommand {
    async fn exec(
        &self,
        _group: &CommandGroup,
        _input: &mut CommandInvocation,
        responder: &dyn Responder,
    ) -> anyhow::Result<()> {
        let pins = self.pins.lock().unwrap().clone();
        let status = format!(
            "Guild: {}\nSender: {}\nChannel: {}",
            pins.guild.as_deref().unwrap_or("null"),
            pins.sender.as_ref().map(|u| u.id.as_str()).unwrap_or("null"),
            pins.channel.as_deref().unwrap_or("null"),
        );
        responder.reply(&status).await;
        Ok(())
    }
}

pub struct ClearConsoleCommand {
    pub shell: Arc<dyn ShellNotifier>,
}

impl ClearConsoleCommand {
    pub fn spec() -> CommandSpec {
        CommandSpec::new(["clear"]).summary("clear the console")
    }
}

#[async_trait]
impl CommandHandler for ClearConsoleCommand {
    async fn exec(
        &self,
        _group: &CommandGroup,
        _input: &mut CommandInvocation,
        _responder: &dyn Responder,
    ) -> anyhow::Result<()> {
        self.shell.clear_output();
        Ok(())
    }
}

/// One lifecycle request forwarded to the orchestrator.
pub enum LifecycleAction {
    Login,
    Logout,
    Reload,
}

pub struct LifecycleCommand {
    pub orchestrator: Arc<Orchestrator>,
    pub action: LifecycleAction,
}

impl LifecycleCommand {
    pub fn login_spec() -> CommandSpec {
        CommandSpec::new(["login"]).summary("log the bot in")
    }

    pub fn logout_spec() -> CommandSpec {
        CommandSpec::new(["logout"]).summary("log the bot out")
    }

    pub fn reload_spec() -> CommandSpec {
        CommandSpec::new(["reload"]).summary("reload the bot module")
    }
}

#[async_trait]
impl CommandHandler for LifecycleCommand {
    async fn exec(
        &self,
        _group: &CommandGroup,
        _input: &mut CommandInvocation,
        _responder: &dyn Responder,
    ) -> anyhow::Result<()> {
        match self.action {
            LifecycleAction::Login => self.orchestrator.request_login(),
            LifecycleAction::Logout => self.orchestrator.request_logout(),
            LifecycleAction::Reload => self.orchestrator.request_reload(),
        }
        Ok(())
    }
}

pub struct QuitCommand {
    pub quit_tx: mpsc::UnboundedSender<()>,
}

impl QuitCommand {
    pub fn spec() -> CommandSpec {
        CommandSpec::new(["quit"]).summary("shut the host down")
    }
}

#[async_trait]
impl CommandHandler for QuitCommand {
    async fn exec(
        &self,
        _group: &CommandGroup,
        _input: &mut CommandInvocation,
        _responder: &dyn Responder,
    ) -> anyhow::Result<()> {
        let _ = self.quit_tx.send(());
        Ok(())
    }
}
