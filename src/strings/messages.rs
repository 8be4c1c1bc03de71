//! # Messages
//!
//! Constant strings and format functions for user-facing routing and shell
//! messages.

pub const EMPTY_COMMAND: &str = "Empty command";
pub const NO_PERMISSION: &str = "You do not have permission to use this command";
pub const UNKNOWN_COMMAND: &str = "Couldn't understand that";

pub const NO_PINNED_GUILD: &str = "You must select a guild to run commands in first!";
pub const NO_PINNED_SENDER: &str = "You must select a sender to run commands first!";
pub const NO_PINNED_CHANNEL: &str = "You must select a channel to send messages to first!";

pub fn help_not_found(name: &str) -> String {
    format!("Didn't find a command with the name \"{name}\"")
}

pub fn load_failed(reason: &str) -> String {
    format!("Bot loading failed! Reason: {reason}")
}
