//! # Command Groups
//!
//! A prefixed bundle of command descriptors with shared silence/help policy,
//! plus the registry data precomputed when the group is built: the sorted
//! authorization-aware view used for help listings, the widest visible
//! authorization role (presentation alignment), and the prerendered general
//! help text.

use crate::application::command::{CommandHandler, CommandSpec};
use crate::application::help::HelpCommand;
use std::sync::Arc;

/// One registered command: its descriptor plus the handler to invoke.
pub struct CommandEntry {
    spec: CommandSpec,
    handler: Arc<dyn CommandHandler>,
}

impl CommandEntry {
    pub fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }
}

/// An ordered table of commands sharing a prefix. Immutable once built;
/// construct with [`CommandGroup::builder`].
pub struct CommandGroup {
    prefix: String,
    silent_by_default: bool,
    entries: Vec<CommandEntry>,
    // registry caches, computed once at build
    visible: Vec<usize>,
    longest_auth_role: usize,
    has_auth_commands: bool,
    help_text: String,
}

impl CommandGroup {
    pub fn builder() -> CommandGroupBuilder {
        CommandGroupBuilder::new()
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn silent_by_default(&self) -> bool {
        self.silent_by_default
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    /// Visible commands in help order: authorization role ascending, then
    /// first alias ascending. Role-empty commands sort before gated ones.
    pub fn visible_entries(&self) -> impl Iterator<Item = &CommandEntry> {
        self.visible.iter().map(|&i| &self.entries[i])
    }

    /// Length of the widest authorization role among visible commands.
    pub fn longest_auth_role(&self) -> usize {
        self.longest_auth_role
    }

    /// Whether any visible command requires authorization.
    pub fn has_auth_commands(&self) -> bool {
        self.has_auth_commands
    }

    /// The prerendered general help listing for this group.
    pub fn help_text(&self) -> &str {
        &self.help_text
    }

    fn render_help(&mut self) {
        let mut output = String::from("```");
        for entry in self.visible.iter().map(|&i| &self.entries[i]) {
            let spec = entry.spec();
            if self.has_auth_commands {
                let role = if spec.requires_auth() { spec.auth_role() } else { "" };
                output.push_str(&format!(
                    "[ {role:<width$} ] ",
                    width = self.longest_auth_role
                ));
            }
            output.push_str(&self.prefix);
            output.push_str(spec.name());
            output.push_str(": ");
            output.push_str(spec.summary_text());
            output.push('\n');
        }
        if output.ends_with('\n') {
            output.pop();
        }
        output.push_str("```");
        self.help_text = output;
    }
}

/// Builder for [`CommandGroup`]. When help is enabled (the default), a
/// built-in `help` command is registered ahead of the user commands.
pub struct CommandGroupBuilder {
    prefix: String,
    silent_by_default: bool,
    help_enabled: bool,
    entries: Vec<CommandEntry>,
}

impl CommandGroupBuilder {
    fn new() -> Self {
        Self {
            prefix: String::new(),
            silent_by_default: false,
            help_enabled: true,
            entries: Vec::new(),
        }
    }

    /// Set the string that must prefix raw input for this group to claim it.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Suppress this group's own "empty"/"unknown command" replies.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent_by_default = silent;
        self
    }

    /// Enable or disable the built-in help command.
    pub fn help(mut self, enabled: bool) -> Self {
        self.help_enabled = enabled;
        self
    }

    pub fn command(mut self, spec: CommandSpec, handler: Arc<dyn CommandHandler>) -> Self {
        self.entries.push(CommandEntry { spec, handler });
        self
    }

    pub fn build(mut self) -> CommandGroup {
        if self.help_enabled {
            self.entries.insert(
                0,
                CommandEntry {
                    spec: HelpCommand::spec(),
                    handler: Arc::new(HelpCommand),
                },
            );
        }

        let mut visible: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.spec.is_visible())
            .map(|(i, _)| i)
            .collect();
        visible.sort_by(|&a, &b| {
            let (sa, sb) = (&self.entries[a].spec, &self.entries[b].spec);
            sa.auth_role()
                .cmp(sb.auth_role())
                .then_with(|| sa.name().cmp(sb.name()))
        });

        let longest_auth_role = visible
            .iter()
            .map(|&i| self.entries[i].spec.auth_role().len())
            .max()
            .unwrap_or(0);

        let mut group = CommandGroup {
            prefix: self.prefix,
            silent_by_default: self.silent_by_default,
            entries: self.entries,
            visible,
            longest_auth_role,
            has_auth_commands: longest_auth_role > 0,
            help_text: String::new(),
        };
        group.render_help();
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::command::{CommandHandler, CommandInvocation};
    use crate::domain::traits::Responder;
    use async_trait::async_trait;

    struct Nop;

    #[async_trait]
    impl CommandHandler for Nop {
        async fn exec(
            &self,
            _group: &CommandGroup,
            _input: &mut CommandInvocation,
            _responder: &dyn Responder,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn entry(spec: CommandSpec) -> (CommandSpec, Arc<dyn CommandHandler>) {
        (spec, Arc::new(Nop))
    }

    #[test]
    fn test_visible_sorted_by_role_then_name() {
        let (s1, h1) = entry(CommandSpec::new(["kick"]).auth("Moderator"));
        let (s2, h2) = entry(CommandSpec::new(["play"]).summary("play a song"));
        let (s3, h3) = entry(CommandSpec::new(["ban"]).auth("Admin"));
        let (s4, h4) = entry(CommandSpec::new(["secret"]).hidden());
        let group = CommandGroup::builder()
            .help(false)
            .command(s1, h1)
            .command(s2, h2)
            .command(s3, h3)
            .command(s4, h4)
            .build();

        let order: Vec<&str> = group.visible_entries().map(|e| e.spec().name()).collect();
        // ungated first, then gated ordered by role
        assert_eq!(order, vec!["play", "ban", "kick"]);
        assert_eq!(group.longest_auth_role(), "Moderator".len());
        assert!(group.has_auth_commands());
    }

    #[test]
    fn test_no_auth_commands() {
        let (s, h) = entry(CommandSpec::new(["play"]));
        let group = CommandGroup::builder().help(false).command(s, h).build();
        assert!(!group.has_auth_commands());
        assert_eq!(group.longest_auth_role(), 0);
    }

    #[test]
    fn test_help_injected_first() {
        let (s, h) = entry(CommandSpec::new(["play"]));
        let group = CommandGroup::builder().command(s, h).build();
        assert_eq!(group.entries()[0].spec().name(), "help");
    }

    #[test]
    fn test_help_text_alignment() {
        let (s1, h1) = entry(CommandSpec::new(["play"]).summary("play a song"));
        let (s2, h2) = entry(CommandSpec::new(["kick"]).summary("kick a user").auth("Mod"));
        let group = CommandGroup::builder()
            .help(false)
            .prefix("!")
            .command(s1, h1)
            .command(s2, h2)
            .build();
        assert_eq!(
            group.help_text(),
            "```[     ] !play: play a song\n[ Mod ] !kick: kick a user```"
        );
    }

    #[test]
    fn test_help_text_without_roles_has_no_column() {
        let (s, h) = entry(CommandSpec::new(["play"]).summary("play a song"));
        let group = CommandGroup::builder().help(false).prefix("!").command(s, h).build();
        assert_eq!(group.help_text(), "```!play: play a song```");
    }
}
