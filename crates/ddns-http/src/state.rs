use ddns_core::{AuthToken, HostRegistry, ReconciliationEngine, SecretStore, SettingsStore};
use std::sync::Arc;
use std::time::Duration;

use crate::tasks::UpdateTasks;

/// Default per-request timeout enforced by the router
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub(crate) engine: Arc<ReconciliationEngine>,
    pub(crate) registry: Arc<dyn HostRegistry>,
    pub(crate) settings: Arc<dyn SettingsStore>,
    pub(crate) secrets: Arc<SecretStore>,
    pub(crate) admin_token: Option<AuthToken>,
    pub(crate) trust_forwarded_for: bool,
    pub(crate) request_timeout: Duration,
    pub(crate) tasks: UpdateTasks,
}

impl AppState {
    /// Create the state with admin routes disabled and proxy headers ignored
    ///
    /// # Parameters
    ///
    /// - `engine`: Reconciliation engine behind `POST /update`
    /// - `registry`: Same registry the engine uses; read by `/status` and the admin API
    /// - `settings`: Same settings store the engine uses
    /// - `secrets`: Encrypts API tokens submitted through the admin API
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        registry: Arc<dyn HostRegistry>,
        settings: Arc<dyn SettingsStore>,
        secrets: Arc<SecretStore>,
    ) -> Self {
        Self {
            engine,
            registry,
            settings,
            secrets,
            admin_token: None,
            trust_forwarded_for: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tasks: UpdateTasks::new(),
        }
    }

    /// Mount the admin API behind `token`
    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(AuthToken::from_value(token));
        self
    }

    pub fn with_trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    /// Time an update may take before the client gets an error
    ///
    /// The reconciliation itself keeps running and commits if the provider
    /// succeeds; `GET /status` shows the outcome.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Handle to the detached update tasks, for draining at shutdown
    pub fn update_tasks(&self) -> UpdateTasks {
        self.tasks.clone()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("admin_api", &self.admin_token.is_some())
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("request_timeout", &self.request_timeout)
            .field("tasks", &self.tasks)
            .finish()
    }
}
