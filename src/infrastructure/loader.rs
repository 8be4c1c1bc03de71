//! # Module Loader
//!
//! Loads an externally built bot module into an isolated execution
//! namespace and converts the configuration it produces into host types.
//!
//! A module is a Lua script. Loading creates a **fresh Lua VM** scoped to
//! that script (the isolated namespace), executes it, reads the declared
//! `manifest.entry` global function, and invokes it with no arguments to
//! obtain the bot configuration:
//!
//! ```lua
//! manifest = { entry = "create_bot" }
//!
//! function create_bot()
//!   return {
//!     token = "...",
//!     activity = "playing something",
//!     groups = {
//!       {
//!         prefix = "!",
//!         commands = {
//!           { names = { "ping" }, summary = "ping the bot",
//!             run = function(input) return "pong" end },
//!         },
//!       },
//!     },
//!     lotteries = { { chance = 0.01, message = "You win!" } },
//!   }
//! end
//! ```
//!
//! Unloading drops the VM; nothing of the module's namespace survives, and
//! a failed load cleans up before returning. Command handlers hold handles
//! into their VM, so a configuration snapshot still in use by an in-flight
//! invocation keeps the old VM alive until that invocation finishes.

use crate::application::command::{CommandHandler, CommandInvocation, CommandSpec};
use crate::application::group::CommandGroup;
use crate::domain::error::{ModuleStateError, PluginLoadError};
use crate::domain::traits::Responder;
use async_trait::async_trait;
use mlua::{Function, Lua, Table, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Immutable bot behavior produced by a module's entry invocation. Replaced
/// wholesale on reload, never mutated in place.
pub struct BotConfig {
    token: String,
    activity: String,
    groups: Vec<CommandGroup>,
    lotteries: Vec<Lottery>,
    on_login: Option<Function>,
    on_logout: Option<Function>,
}

impl BotConfig {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn activity(&self) -> &str {
        &self.activity
    }

    pub fn groups(&self) -> &[CommandGroup] {
        &self.groups
    }

    pub fn lotteries(&self) -> &[Lottery] {
        &self.lotteries
    }

    /// Run the module's post-login hook, if declared.
    pub fn run_login_hook(&self) {
        if let Some(hook) = &self.on_login {
            if let Err(err) = hook.call::<()>(()) {
                tracing::warn!("module on_login hook failed: {err}");
            }
        }
    }

    /// Run the module's pre-logout hook, if declared.
    pub fn run_logout_hook(&self) {
        if let Some(hook) = &self.on_logout {
            if let Err(err) = hook.call::<()>(()) {
                tracing::warn!("module on_logout hook failed: {err}");
            }
        }
    }
}

/// A chance of replying with a fixed message, drawn on every inbound chat
/// message.
#[derive(Debug, Clone)]
pub struct Lottery {
    chance: f64,
    message: String,
}

impl Lottery {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn draw(&self) -> bool {
        rand::random::<f64>() < self.chance
    }
}

/// A loaded external module: its source location, the isolated namespace,
/// and the live configuration it produced.
pub struct Module {
    path: PathBuf,
    loaded: Option<LoadedModule>,
}

struct LoadedModule {
    // Owns the namespace. Kept so the VM outlives configs that have already
    // been dropped, and to make the ownership explicit.
    _lua: Lua,
    entry_name: String,
    config: Arc<BotConfig>,
}

impl Module {
    /// Load the module at `path`. On any failure no namespace remains
    /// resident.
    pub fn load(path: &Path) -> Result<Self, PluginLoadError> {
        let unreadable = |reason: String| PluginLoadError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        let source = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;

        let lua = Lua::new();
        lua.load(&source)
            .set_name(path.display().to_string())
            .exec()
            .map_err(|e| unreadable(e.to_string()))?;

        let globals = lua.globals();
        let manifest: Table = globals
            .get("manifest")
            .map_err(|_| PluginLoadError::MissingManifestEntry)?;
        let entry_name: String = manifest
            .get("entry")
            .map_err(|_| PluginLoadError::MissingManifestEntry)?;

        let entry: Function = match globals.get::<Value>(entry_name.as_str()) {
            Ok(Value::Function(f)) => f,
            Ok(Value::Nil) | Err(_) => {
                return Err(PluginLoadError::EntryNotFound(entry_name));
            }
            Ok(_) => return Err(PluginLoadError::NotInstantiable(entry_name)),
        };

        let bot: Table = entry
            .call(())
            .map_err(|e: mlua::Error| PluginLoadError::EntryFailed(e.to_string()))?;
        let config = parse_config(&lua, bot)?;

        tracing::info!("bot module {} loaded via {entry_name}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            loaded: Some(LoadedModule {
                _lua: lua,
                entry_name,
                config: Arc::new(config),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_point(&self) -> Option<&str> {
        self.loaded.as_ref().map(|l| l.entry_name.as_str())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// The configuration this module produced. Fails once the module has
    /// been unloaded.
    pub fn config(&self) -> Result<Arc<BotConfig>, ModuleStateError> {
        self.loaded
            .as_ref()
            .map(|l| l.config.clone())
            .ok_or(ModuleStateError::NotLoaded)
    }

    /// Tear down the namespace. Unloading an already-unloaded module is a
    /// no-op error.
    pub fn unload(&mut self) -> Result<(), ModuleStateError> {
        match self.loaded.take() {
            Some(_) => Ok(()),
            None => Err(ModuleStateError::AlreadyUnloaded),
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn shape_err(what: &str) -> PluginLoadError {
    PluginLoadError::EntryFailed(format!("bad bot configuration: {what}"))
}

fn parse_config(lua: &Lua, bot: Table) -> Result<BotConfig, PluginLoadError> {
    let token: String = bot.get("token").map_err(|_| shape_err("missing token"))?;
    let activity: Option<String> = bot
        .get("activity")
        .map_err(|_| shape_err("activity must be a string"))?;

    let mut groups = Vec::new();
    let group_tables: Vec<Table> = bot
        .get("groups")
        .map_err(|_| shape_err("groups must be a list of tables"))?;
    for table in group_tables {
        groups.push(parse_group(lua, table)?);
    }

    let mut lotteries = Vec::new();
    let lottery_tables: Option<Vec<Table>> = bot
        .get("lotteries")
        .map_err(|_| shape_err("lotteries must be a list of tables"))?;
    for table in lottery_tables.unwrap_or_default() {
        let chance: f64 = table
            .get("chance")
            .map_err(|_| shape_err("lottery chance must be a number"))?;
        let message: String = table
            .get("message")
            .map_err(|_| shape_err("lottery message must be a string"))?;
        lotteries.push(Lottery { chance, message });
    }

    let on_login: Option<Function> = bot
        .get("on_login")
        .map_err(|_| shape_err("on_login must be a function"))?;
    let on_logout: Option<Function> = bot
        .get("on_logout")
        .map_err(|_| shape_err("on_logout must be a function"))?;

    Ok(BotConfig {
        token,
        activity: activity.unwrap_or_default(),
        groups,
        lotteries,
        on_login,
        on_logout,
    })
}

fn parse_group(lua: &Lua, table: Table) -> Result<CommandGroup, PluginLoadError> {
    let prefix: Option<String> = table
        .get("prefix")
        .map_err(|_| shape_err("group prefix must be a string"))?;
    let silent: Option<bool> = table
        .get("silent")
        .map_err(|_| shape_err("group silent must be a boolean"))?;
    let help: Option<bool> = table
        .get("help")
        .map_err(|_| shape_err("group help must be a boolean"))?;

    let mut builder = CommandGroup::builder()
        .prefix(prefix.unwrap_or_default())
        .silent(silent.unwrap_or(false))
        .help(help.unwrap_or(true));

    let commands: Vec<Table> = table
        .get("commands")
        .map_err(|_| shape_err("group commands must be a list of tables"))?;
    for command in commands {
        let names: Vec<String> = command
            .get("names")
            .map_err(|_| shape_err("command names must be a list of strings"))?;
        if names.is_empty() {
            return Err(shape_err("command declares no names"));
        }
        let summary: Option<String> = command.get("summary").unwrap_or_default();
        let details: Option<String> = command.get("details").unwrap_or_default();
        let usage: Option<String> = command.get("usage").unwrap_or_default();
        let visible: Option<bool> = command.get("visible").unwrap_or_default();
        let auth: Option<String> = command.get("auth").unwrap_or_default();
        let run: Function = command
            .get("run")
            .map_err(|_| shape_err("command run must be a function"))?;

        let mut spec = CommandSpec::new(names)
            .summary(summary.unwrap_or_default())
            .details(details.unwrap_or_default())
            .usage(usage.unwrap_or_default())
            .auth(auth.unwrap_or_default());
        if !visible.unwrap_or(true) {
            spec = spec.hidden();
        }

        builder = builder.command(
            spec,
            Arc::new(LuaCommand {
                lua: lua.clone(),
                run,
            }),
        );
    }

    Ok(builder.build())
}

/// A command handler backed by a module function. The invocation crosses
/// into the VM as a table `{ tokens, sender, mentions }`; a string return
/// value becomes a chat reply.
struct LuaCommand {
    lua: Lua,
    run: Function,
}

#[async_trait]
impl CommandHandler for LuaCommand {
    async fn exec(
        &self,
        _group: &CommandGroup,
        input: &mut CommandInvocation,
        responder: &dyn Responder,
    ) -> anyhow::Result<()> {
        let args = self.lua.create_table()?;

        let tokens = self.lua.create_table()?;
        for i in 0..input.token_count() {
            tokens.push(input.token(i).unwrap_or(""))?;
        }
        args.set("tokens", tokens)?;

        if let Some(sender) = input.sender() {
            let user = self.lua.create_table()?;
            user.set("id", sender.id.as_str())?;
            user.set("name", sender.name.as_str())?;
            args.set("sender", user)?;
        }

        let mentions = self.lua.create_table()?;
        for mention in input.mentions() {
            let user = self.lua.create_table()?;
            user.set("id", mention.id.as_str())?;
            user.set("name", mention.name.as_str())?;
            mentions.push(user)?;
        }
        args.set("mentions", mentions)?;

        let result: Value = self.run.call(args)?;
        if let Value::String(reply) = result {
            responder.reply(&reply.to_string_lossy()).await;
        }
        Ok(())
    }
}
