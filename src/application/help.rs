//! # Help Command
//!
//! The built-in `help` command injected into every help-enabled group.
//! With no argument it replies with the group's prerendered listing; with a
//! command name it prints that command's usage and detail text.

use crate::application::command::{CommandHandler, CommandInvocation, CommandSpec};
use crate::application::group::CommandGroup;
use crate::domain::traits::Responder;
use crate::strings::messages;
use async_trait::async_trait;

pub struct HelpCommand;

impl HelpCommand {
    pub fn spec() -> CommandSpec {
        CommandSpec::new(["help", "?"])
            .summary("provide information about commands you can use with this bot")
            .usage("[command]")
    }

    fn detail_for(group: &CommandGroup, name: &str) -> Option<String> {
        let entry = group
            .visible_entries()
            .find(|e| e.spec().names().iter().any(|n| n == name))?;
        let spec = entry.spec();

        let mut output = String::new();
        if spec.requires_auth() {
            output.push_str(&format!("[ {} ] ", spec.auth_role()));
        }
        output.push_str(spec.name());
        output.push(' ');
        output.push_str(spec.usage_text());
        output.push_str("\n\n");

        let summary = spec.summary_text();
        let mut chars = summary.chars();
        if let Some(first) = chars.next() {
            output.extend(first.to_uppercase());
            output.push_str(chars.as_str());
        }
        output.push_str(". ");
        output.push_str(spec.details_text());

        Some(format!("```{}```", output.trim()))
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn exec(
        &self,
        group: &CommandGroup,
        input: &mut CommandInvocation,
        responder: &dyn Responder,
    ) -> anyhow::Result<()> {
        if input.token_count() > 1 {
            let name = input.token(1).unwrap_or("");
            // every help detail reply is fenced, the not-found case included
            let reply = Self::detail_for(group, name)
                .unwrap_or_else(|| format!("```{}```", messages::help_not_found(name)));
            responder.reply(&reply).await;
        } else {
            responder.reply(group.help_text()).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_includes_usage_and_role() {
        let group = CommandGroup::builder()
            .help(false)
            .command(
                CommandSpec::new(["kick"])
                    .summary("kick a user")
                    .details("The user can rejoin with an invite.")
                    .usage("<user>")
                    .auth("Mod"),
                std::sync::Arc::new(HelpCommand),
            )
            .build();

        let detail = HelpCommand::detail_for(&group, "kick").unwrap();
        assert_eq!(
            detail,
            "```[ Mod ] kick <user>\n\nKick a user. The user can rejoin with an invite.```"
        );
    }

    #[test]
    fn test_detail_matches_aliases_but_prints_first_name() {
        let group = CommandGroup::builder().build();
        let detail = HelpCommand::detail_for(&group, "?").unwrap();
        assert!(detail.starts_with("```help [command]"));
    }

    #[test]
    fn test_detail_unknown_command() {
        let group = CommandGroup::builder().build();
        assert!(HelpCommand::detail_for(&group, "bogus").is_none());
    }

    #[tokio::test]
    async fn test_not_found_reply_is_fenced() {
        #[derive(Default)]
        struct Capturing {
            replies: std::sync::Mutex<Vec<String>>,
        }

        #[async_trait]
        impl Responder for Capturing {
            async fn reply(&self, content: &str) {
                self.replies.lock().unwrap().push(content.to_string());
            }
        }

        let group = CommandGroup::builder().build();
        let responder = Capturing::default();
        let mut input = CommandInvocation::from_tokens(vec!["help".into(), "bogus".into()]);
        HelpCommand.exec(&group, &mut input, &responder).await.unwrap();

        let replies = responder.replies.lock().unwrap().clone();
        assert_eq!(
            replies,
            vec!["```Didn't find a command with the name \"bogus\"```".to_string()]
        );
    }
}
