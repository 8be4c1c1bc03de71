//! # Runtime Orchestrator
//!
//! Owns the lifecycle state machine and the current module, drives
//! asynchronous login/logout/reload operations on a serially draining
//! worker queue, and publishes every state transition to the shell.
//!
//! The request entry points never block: they enqueue work and return.
//! Jobs execute in submission order. RuntimeState lives in a `watch`
//! channel and the current module behind its own mutex; the two are never
//! held together across an await point.

use crate::application::router::CommandRouter;
use crate::domain::traits::{ChatGateway, Responder, SettingsStore, ShellNotifier};
use crate::domain::types::{GuildState, RuntimeState, UserRef};
use crate::infrastructure::loader::{BotConfig, Module};
use crate::infrastructure::paths::PathResolver;
use crate::strings::messages;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

type Job = BoxFuture<'static, ()>;

pub struct Orchestrator {
    inner: Arc<Inner>,
    jobs: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown_grace: Duration,
}

struct Inner {
    gateway: Arc<dyn ChatGateway>,
    shell: Arc<dyn ShellNotifier>,
    settings: Arc<dyn SettingsStore>,
    resolver: PathResolver,
    router: CommandRouter,
    state_tx: watch::Sender<RuntimeState>,
    module: tokio::sync::Mutex<Option<Module>>,
    guilds: Mutex<HashMap<String, GuildState>>,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn ChatGateway>,
        shell: Arc<dyn ShellNotifier>,
        settings: Arc<dyn SettingsStore>,
        resolver: PathResolver,
        shutdown_grace: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(RuntimeState::Idle);
        let inner = Arc::new(Inner {
            router: CommandRouter::new(gateway.clone()),
            gateway,
            shell,
            settings,
            resolver,
            state_tx,
            module: tokio::sync::Mutex::new(None),
            guilds: Mutex::new(HashMap::new()),
        });

        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                job.await;
            }
        });

        Self {
            inner,
            jobs: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            shutdown_grace,
        }
    }

    pub fn state(&self) -> RuntimeState {
        *self.inner.state_tx.borrow()
    }

    /// Observe state transitions (coalescing; use the shell notifier for an
    /// exact transition log).
    pub fn subscribe(&self) -> watch::Receiver<RuntimeState> {
        self.inner.state_tx.subscribe()
    }

    pub fn guild_state(&self, guild_id: &str) -> Option<GuildState> {
        self.inner.guilds.lock().unwrap().get(guild_id).cloned()
    }

    fn submit(&self, job: Job) {
        let jobs = self.jobs.lock().unwrap();
        match jobs.as_ref() {
            Some(tx) => {
                if tx.send(job).is_err() {
                    tracing::warn!("worker queue closed; dropping request");
                }
            }
            None => tracing::warn!("orchestrator shutting down; dropping request"),
        }
    }

    /// Begin asynchronous authentication. Only attempted from Idle.
    pub fn request_login(&self) {
        let inner = self.inner.clone();
        self.submit(Box::pin(async move { inner.do_login().await }));
    }

    /// Tear down the session. A no-op unless Connected.
    pub fn request_logout(&self) {
        let inner = self.inner.clone();
        self.submit(Box::pin(async move { inner.do_logout().await }));
    }

    /// Swap the bot module: unload, re-resolve, load, and re-authenticate
    /// when a session was live.
    pub fn request_reload(&self) {
        let inner = self.inner.clone();
        self.submit(Box::pin(async move { inner.do_reload().await }));
    }

    /// Route one raw input line through the active configuration's command
    /// groups. Returns whether any group claimed it. Lotteries attached to
    /// the configuration are drawn first.
    pub async fn dispatch(
        &self,
        raw: &str,
        mentions: &[UserRef],
        sender: Option<&UserRef>,
        responder: &dyn Responder,
    ) -> bool {
        // Snapshot the configuration and release the module lock before
        // routing, so a concurrent reload swaps the reference while we
        // finish against the fully-old one.
        let config = {
            let slot = self.inner.module.lock().await;
            slot.as_ref().and_then(|m| m.config().ok())
        };
        let Some(config) = config else {
            return false;
        };

        for lottery in config.lotteries() {
            if lottery.draw() {
                responder.reply(lottery.message()).await;
            }
        }

        self.inner
            .router
            .route_ordered(config.groups(), raw, mentions, sender, responder)
            .await
    }

    /// Enqueue a final logout, stop accepting requests, and wait out the
    /// grace period for in-flight work before forcing termination.
    pub async fn shutdown(&self) {
        self.request_logout();
        drop(self.jobs.lock().unwrap().take());

        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let abort = handle.abort_handle();
            if tokio::time::timeout(self.shutdown_grace, handle)
                .await
                .is_err()
            {
                tracing::warn!("worker did not drain in time; aborting outstanding tasks");
                abort.abort();
            }
        }
    }
}

impl Inner {
    fn set_state(&self, state: RuntimeState, status: Option<&str>) {
        self.state_tx.send_replace(state);
        self.shell
            .notify_state(state, status.unwrap_or_else(|| state.status_text()));
    }

    fn state(&self) -> RuntimeState {
        *self.state_tx.borrow()
    }

    async fn do_login(self: Arc<Self>) {
        if self.state() != RuntimeState::Idle {
            tracing::debug!("login requested while not idle; ignoring");
            return;
        }
        self.login_flow().await;
    }

    /// Idle -> Connecting -> Connected | ConnectFailed.
    async fn login_flow(&self) {
        let config = {
            let slot = self.module.lock().await;
            slot.as_ref().and_then(|m| m.config().ok())
        };
        let Some(config) = config else {
            self.set_state(RuntimeState::ConnectFailed, Some("No bot module loaded."));
            return;
        };

        self.set_state(RuntimeState::Connecting, None);
        tracing::info!("logging in...");

        match self
            .gateway
            .login(config.token(), config.activity())
            .await
        {
            Ok(roster) => {
                let states: HashMap<String, GuildState> = roster
                    .into_iter()
                    .map(|guild| {
                        (
                            guild.id.clone(),
                            GuildState::new(guild, self.settings.clone()),
                        )
                    })
                    .collect();
                *self.guilds.lock().unwrap() = states;

                config.run_login_hook();
                tracing::info!("successfully logged in");
                self.set_state(RuntimeState::Connected, None);
            }
            Err(err) => {
                tracing::error!("failed to log the bot in: {err}");
                self.set_state(RuntimeState::ConnectFailed, None);
            }
        }
    }

    async fn do_logout(self: Arc<Self>) {
        if self.state() != RuntimeState::Connected {
            tracing::debug!("logout requested while not connected; ignoring");
            return;
        }
        let config = {
            let slot = self.module.lock().await;
            slot.as_ref().and_then(|m| m.config().ok())
        };
        self.logout_flow(config).await;
    }

    /// Connected -> Idle, running the module's pre-logout hook first. The
    /// config is passed in so a reload can hand over the old module's
    /// configuration after its slot has already been cleared.
    async fn logout_flow(&self, config: Option<Arc<BotConfig>>) {
        tracing::info!("logging out...");
        if let Some(config) = config {
            config.run_logout_hook();
        }

        self.gateway.logout().await;
        self.guilds.lock().unwrap().clear();
        tracing::info!("successfully logged out");
        self.set_state(RuntimeState::Idle, None);
    }

    async fn do_reload(self: Arc<Self>) {
        // Wait for any in-flight login/logout against the current module to
        // settle before tearing anything down.
        let mut rx = self.state_tx.subscribe();
        let _ = rx.wait_for(RuntimeState::is_settled).await;

        let was_connected = self.state() == RuntimeState::Connected;

        // Snapshot the old configuration before tearing the slot down: the
        // pre-logout hook still belongs to the outgoing module, and the Arc
        // keeps its namespace alive until the hook has run.
        let old_config = {
            let mut slot = self.module.lock().await;
            let config = slot.as_ref().and_then(|m| m.config().ok());
            if let Some(module) = slot.as_mut() {
                if let Err(err) = module.unload() {
                    tracing::warn!("unloading previous module: {err}");
                }
            }
            *slot = None;
            config
        };

        // Credential rotation must never straddle two live sessions: the
        // old session comes down fully before any login with the new
        // module's token.
        if was_connected {
            self.logout_flow(old_config).await;
        } else {
            drop(old_config);
        }

        let path = match self.resolver.resolve() {
            Ok(path) => path,
            Err(err) => {
                tracing::error!("{err}");
                self.set_state(RuntimeState::LoadFailed, Some(&messages::load_failed(&err.to_string())));
                return;
            }
        };

        match Module::load(&path) {
            Ok(module) => {
                *self.module.lock().await = Some(module);
            }
            Err(err) => {
                tracing::error!("{err}");
                self.set_state(RuntimeState::LoadFailed, Some(&messages::load_failed(&err.to_string())));
                return;
            }
        }

        if was_connected {
            self.login_flow().await;
        } else {
            // Refresh the shell for the (unchanged) current state.
            let state = self.state();
            self.shell.notify_state(state, state.status_text());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::AuthenticationError;
    use crate::domain::types::GuildContext;
    use async_trait::async_trait;
    use std::io::Write;
    use std::path::PathBuf;

    struct RecordingGateway {
        events: Mutex<Vec<String>>,
    }

    impl RecordingGateway {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: Mutex::new(Vec::new()),
            })
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatGateway for RecordingGateway {
        async fn login(
            &self,
            token: &str,
            _activity: &str,
        ) -> Result<Vec<GuildContext>, AuthenticationError> {
            self.events.lock().unwrap().push(format!("login {token}"));
            if token == "bad-token" {
                return Err(AuthenticationError::InvalidToken);
            }
            Ok(vec![GuildContext {
                id: "g1".into(),
                name: "Test Guild".into(),
            }])
        }

        async fn logout(&self) {
            self.events.lock().unwrap().push("logout".into());
        }

        async fn send_message(&self, _channel: &str, _content: &str) {}

        async fn check_permission(&self, _sender: Option<&UserRef>, _role: &str) -> bool {
            true
        }
    }

    struct RecordingShell {
        states: Mutex<Vec<RuntimeState>>,
    }

    impl RecordingShell {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                states: Mutex::new(Vec::new()),
            })
        }

        fn states(&self) -> Vec<RuntimeState> {
            self.states.lock().unwrap().clone()
        }
    }

    impl ShellNotifier for RecordingShell {
        fn notify_state(&self, state: RuntimeState, _status: &str) {
            self.states.lock().unwrap().push(state);
        }

        fn clear_output(&self) {}
    }

    struct NullStore;

    #[async_trait]
    impl SettingsStore for NullStore {
        async fn get(&self, _guild: &str, _key: &str, default: &str) -> String {
            default.to_string()
        }
        async fn put(&self, _guild: &str, _key: &str, _value: &str) {}
    }

    fn module_source(token: &str) -> String {
        format!(
            r#"
manifest = {{ entry = "create_bot" }}
function create_bot()
  return {{
    token = "{token}",
    groups = {{
      {{ commands = {{ {{ names = {{ "ping" }}, run = function() return "pong" end }} }} }},
    }},
  }}
end
"#
        )
    }

    fn write_module(dir: &tempfile::TempDir, token: &str) -> PathBuf {
        let path = dir.path().join("bot.lua");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(module_source(token).as_bytes()).unwrap();
        path
    }

    fn orchestrator_for(
        path: PathBuf,
        gateway: Arc<RecordingGateway>,
        shell: Arc<RecordingShell>,
    ) -> Orchestrator {
        Orchestrator::new(
            gateway,
            shell,
            Arc::new(NullStore),
            PathResolver::new().check_arg(Some(path)),
            Duration::from_secs(1),
        )
    }

    async fn wait_for(orchestrator: &Orchestrator, target: RuntimeState) {
        let mut rx = orchestrator.subscribe();
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| *s == target))
            .await
            .expect("timed out waiting for state")
            .expect("state channel closed");
    }

    #[tokio::test]
    async fn test_login_passes_through_connecting() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(&dir, "token-a");
        let gateway = RecordingGateway::new();
        let shell = RecordingShell::new();
        let orchestrator = orchestrator_for(path, gateway.clone(), shell.clone());

        orchestrator.request_reload();
        orchestrator.request_login();
        wait_for(&orchestrator, RuntimeState::Connected).await;

        assert_eq!(
            shell.states(),
            vec![
                RuntimeState::Idle, // reload refreshing the idle shell
                RuntimeState::Connecting,
                RuntimeState::Connected,
            ]
        );
        assert_eq!(gateway.events(), vec!["login token-a".to_string()]);
    }

    #[tokio::test]
    async fn test_bad_token_reaches_connect_failed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(&dir, "bad-token");
        let gateway = RecordingGateway::new();
        let shell = RecordingShell::new();
        let orchestrator = orchestrator_for(path, gateway.clone(), shell.clone());

        orchestrator.request_reload();
        orchestrator.request_login();
        wait_for(&orchestrator, RuntimeState::ConnectFailed).await;

        assert_eq!(
            shell.states(),
            vec![
                RuntimeState::Idle,
                RuntimeState::Connecting,
                RuntimeState::ConnectFailed,
            ]
        );
    }

    #[tokio::test]
    async fn test_reload_while_connected_rotates_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(&dir, "token-a");
        let gateway = RecordingGateway::new();
        let shell = RecordingShell::new();
        let orchestrator = orchestrator_for(path.clone(), gateway.clone(), shell.clone());

        orchestrator.request_reload();
        orchestrator.request_login();
        wait_for(&orchestrator, RuntimeState::Connected).await;

        // swap the module on disk, then hot-reload
        write_module(&dir, "token-b");
        orchestrator.request_reload();
        wait_for(&orchestrator, RuntimeState::Connected).await;
        // make sure the reload job fully finished, not just reached Connected
        tokio::time::sleep(Duration::from_millis(50)).await;

        // full logout of the old credential strictly before the new login
        assert_eq!(
            gateway.events(),
            vec![
                "login token-a".to_string(),
                "logout".to_string(),
                "login token-b".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_reload_runs_old_module_pre_logout_hook() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("logged-out");
        let path = dir.path().join("bot.lua");
        std::fs::write(
            &path,
            format!(
                r#"
manifest = {{ entry = "create_bot" }}
function create_bot()
  return {{
    token = "token-a",
    groups = {{
      {{ commands = {{ {{ names = {{ "ping" }}, run = function() return "pong" end }} }} }},
    }},
    on_logout = function()
      local f = io.open("{marker}", "w")
      f:write("done")
      f:close()
    end,
  }}
end
"#,
                marker = marker.display()
            ),
        )
        .unwrap();
        let gateway = RecordingGateway::new();
        let orchestrator = orchestrator_for(path, gateway.clone(), RecordingShell::new());

        orchestrator.request_reload();
        orchestrator.request_login();
        wait_for(&orchestrator, RuntimeState::Connected).await;
        assert!(!marker.exists());

        // the hook belongs to the outgoing module and must run on the
        // logout leg of a reload-from-Connected
        orchestrator.request_reload();
        let mut fired = false;
        for _ in 0..100 {
            if marker.exists() {
                fired = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(fired);
    }

    #[tokio::test]
    async fn test_load_failure_transitions_to_load_failed() {
        let gateway = RecordingGateway::new();
        let shell = RecordingShell::new();
        let orchestrator = orchestrator_for(
            PathBuf::from("no/such/module.lua"),
            gateway.clone(),
            shell.clone(),
        );

        orchestrator.request_reload();
        wait_for(&orchestrator, RuntimeState::LoadFailed).await;
        assert_eq!(shell.states(), vec![RuntimeState::LoadFailed]);

        // a later reload against a fixed path recovers
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(&dir, "token-a");
        let recovered = orchestrator_for(path, gateway.clone(), RecordingShell::new());
        recovered.request_reload();
        recovered.request_login();
        wait_for(&recovered, RuntimeState::Connected).await;
    }

    #[tokio::test]
    async fn test_logout_from_idle_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(&dir, "token-a");
        let gateway = RecordingGateway::new();
        let shell = RecordingShell::new();
        let orchestrator = orchestrator_for(path, gateway.clone(), shell.clone());

        orchestrator.request_reload();
        orchestrator.request_logout();
        orchestrator.shutdown().await;

        assert!(gateway.events().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_routes_into_module_groups() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(&dir, "token-a");
        let orchestrator =
            orchestrator_for(path, RecordingGateway::new(), RecordingShell::new());

        orchestrator.request_reload();

        struct Silent;
        #[async_trait]
        impl Responder for Silent {
            async fn reply(&self, _content: &str) {}
        }

        // reload ends by refreshing Idle without a state change; poll until
        // the new configuration is routable
        let mut handled = false;
        for _ in 0..100 {
            if orchestrator.dispatch("ping", &[], None, &Silent).await {
                handled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(handled);
        assert!(!orchestrator.dispatch("bogus", &[], None, &Silent).await);
    }

    #[tokio::test]
    async fn test_dispatch_draws_lotteries_before_routing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.lua");
        std::fs::write(
            &path,
            r#"
manifest = { entry = "create_bot" }
function create_bot()
  return {
    token = "token-a",
    groups = {
      { commands = { { names = { "ping" }, run = function() return "pong" end } } },
    },
    lotteries = { { chance = 1.0, message = "You win!" } },
  }
end
"#,
        )
        .unwrap();
        let orchestrator =
            orchestrator_for(path, RecordingGateway::new(), RecordingShell::new());
        orchestrator.request_reload();

        #[derive(Default)]
        struct Capturing {
            replies: Mutex<Vec<String>>,
        }
        #[async_trait]
        impl Responder for Capturing {
            async fn reply(&self, content: &str) {
                self.replies.lock().unwrap().push(content.to_string());
            }
        }

        let responder = Capturing::default();
        let mut handled = false;
        for _ in 0..100 {
            if orchestrator.dispatch("ping", &[], None, &responder).await {
                handled = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(handled);
        let replies = responder.replies.lock().unwrap().clone();
        // the certain lottery fires ahead of the handler's reply
        assert_eq!(replies.last(), Some(&"pong".to_string()));
        assert!(replies.contains(&"You win!".to_string()));
    }

    #[tokio::test]
    async fn test_shutdown_logs_out_and_drains() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_module(&dir, "token-a");
        let gateway = RecordingGateway::new();
        let orchestrator = orchestrator_for(path, gateway.clone(), RecordingShell::new());

        orchestrator.request_reload();
        orchestrator.request_login();
        wait_for(&orchestrator, RuntimeState::Connected).await;

        orchestrator.shutdown().await;
        assert_eq!(
            gateway.events().last(),
            Some(&"logout".to_string())
        );
        assert_eq!(orchestrator.state(), RuntimeState::Idle);
    }
}
