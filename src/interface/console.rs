//! # Console Shell
//!
//! The interactive shell: renders state-change notifications, reads raw
//! text lines, and feeds them into the routing pipeline. Lines starting
//! with the admin prefix go to the administrative command group; anything
//! else impersonates a chat message from the pinned sender in the pinned
//! guild/channel and is routed through the active module's groups.

use crate::application::group::CommandGroup;
use crate::application::orchestrator::Orchestrator;
use crate::application::router::CommandRouter;
use crate::domain::traits::{ChatGateway, Responder, ShellNotifier};
use crate::domain::types::{RuntimeState, UserRef};
use crate::infrastructure::gateway::ChannelResponder;
use crate::interface::commands::admin::{
    ClearConsoleCommand, LifecycleAction, LifecycleCommand, PinChannelCommand, PinGuildCommand,
    PinSenderCommand, PinStatusCommand, QuitCommand,
};
use crate::strings::messages;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};

/// Session-scoped selection used to impersonate chat input from the
/// console.
#[derive(Debug, Default, Clone)]
pub struct Pinned {
    pub guild: Option<String>,
    pub sender: Option<UserRef>,
    pub channel: Option<String>,
}

/// Renders orchestrator notifications to the terminal.
pub struct ConsoleNotifier;

impl ShellNotifier for ConsoleNotifier {
    fn notify_state(&self, _state: RuntimeState, status: &str) {
        println!("[gantry] {status}");
    }

    fn clear_output(&self) {
        // ANSI clear screen + cursor home
        print!("\x1b[2J\x1b[H");
        let _ = std::io::Write::flush(&mut std::io::stdout());
    }
}

/// Replies from console-originated admin commands go back to the terminal.
struct ConsoleResponder;

#[async_trait]
impl Responder for ConsoleResponder {
    async fn reply(&self, content: &str) {
        println!("{content}");
    }
}

pub struct Console {
    orchestrator: Arc<Orchestrator>,
    gateway: Arc<dyn ChatGateway>,
    router: CommandRouter,
    admin_group: CommandGroup,
    pins: Arc<Mutex<Pinned>>,
}

impl Console {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        gateway: Arc<dyn ChatGateway>,
        shell: Arc<dyn ShellNotifier>,
        admin_prefix: &str,
        quit_tx: mpsc::UnboundedSender<()>,
    ) -> Self {
        let pins = Arc::new(Mutex::new(Pinned::default()));
        let admin_group = CommandGroup::builder()
            .prefix(admin_prefix)
            .command(
                PinGuildCommand::spec(),
                Arc::new(PinGuildCommand {
                    orchestrator: orchestrator.clone(),
                    pins: pins.clone(),
                }),
            )
            .command(
                PinSenderCommand::spec(),
                Arc::new(PinSenderCommand { pins: pins.clone() }),
            )
            .command(
                PinChannelCommand::spec(),
                Arc::new(PinChannelCommand { pins: pins.clone() }),
            )
            .command(
                PinStatusCommand::spec(),
                Arc::new(PinStatusCommand { pins: pins.clone() }),
            )
            .command(
                ClearConsoleCommand::spec(),
                Arc::new(ClearConsoleCommand { shell }),
            )
            .command(
                LifecycleCommand::login_spec(),
                Arc::new(LifecycleCommand {
                    orchestrator: orchestrator.clone(),
                    action: LifecycleAction::Login,
                }),
            )
            .command(
                LifecycleCommand::logout_spec(),
                Arc::new(LifecycleCommand {
                    orchestrator: orchestrator.clone(),
                    action: LifecycleAction::Logout,
                }),
            )
            .command(
                LifecycleCommand::reload_spec(),
                Arc::new(LifecycleCommand {
                    orchestrator: orchestrator.clone(),
                    action: LifecycleAction::Reload,
                }),
            )
            .command(QuitCommand::spec(), Arc::new(QuitCommand { quit_tx }))
            .build();

        Self {
            orchestrator,
            router: CommandRouter::new(gateway.clone()),
            gateway,
            admin_group,
            pins,
        }
    }

    /// Read stdin until EOF, signalling `ready` once the loop is up (the
    /// startup rendezvous).
    pub async fn run(&self, ready: oneshot::Sender<()>) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let _ = ready.send(());
        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if !line.is_empty() {
                self.handle_line(line).await;
            }
        }
    }

    pub async fn handle_line(&self, line: &str) {
        if line.starts_with(self.admin_group.prefix()) {
            self.router
                .route(&self.admin_group, line, &[], None, false, &ConsoleResponder)
                .await;
            return;
        }

        let pins = self.pins.lock().unwrap().clone();
        let Some(_guild) = pins.guild else {
            tracing::warn!("{}", messages::NO_PINNED_GUILD);
            return;
        };
        let Some(sender) = pins.sender else {
            tracing::warn!("{}", messages::NO_PINNED_SENDER);
            return;
        };
        let Some(channel) = pins.channel else {
            tracing::warn!("{}", messages::NO_PINNED_CHANNEL);
            return;
        };

        let responder = ChannelResponder::new(self.gateway.clone(), channel);
        self.orchestrator
            .dispatch(line, &[], Some(&sender), &responder)
            .await;
    }
}
