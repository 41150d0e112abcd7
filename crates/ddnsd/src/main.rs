// # ddnsd - DDNS Update Server
//
// Thin integration layer: all reconciliation logic lives in ddns-core.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Opening the host/settings store
// 3. Seeding provider settings from the environment, if given
// 4. Serving the HTTP API until SIGINT/SIGTERM, then waiting for in-flight
//    updates and flushing the store
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Secrets
// - `DDNS_SECRET_KEY`: Master secret for encrypting stored credentials (required)
// - `DDNS_ADMIN_TOKEN`: Bearer token for the admin API (admin API off when unset)
//
// ### Server
// - `DDNS_BIND_ADDR`: Listen address (default `0.0.0.0:8080`)
// - `DDNS_REQUEST_TIMEOUT_SECS`: Per-request timeout (default 30)
// - `DDNS_TRUST_FORWARDED_FOR`: Take the client address from `X-Forwarded-For`
//
// ### State Store
// - `DDNS_STATE_STORE_TYPE`: Type of state store (file, memory)
// - `DDNS_STATE_STORE_PATH`: Path to state file (for file store)
//
// ### DNS Provider
// - `DDNS_PROVIDER_TIMEOUT_SECS`: Cloudflare API timeout (default 10)
// - `DDNS_CLOUDFLARE_ZONE_ID`: Zone id written into settings at startup
// - `DDNS_CLOUDFLARE_API_TOKEN`: API token encrypted into settings at startup
//
// ## Example
//
// ```bash
// export DDNS_SECRET_KEY=$(openssl rand -hex 32)
// export DDNS_ADMIN_TOKEN=$(openssl rand -hex 24)
// export DDNS_CLOUDFLARE_ZONE_ID=023e105f4ecef8ad9ca31a8372d0c353
// export DDNS_CLOUDFLARE_API_TOKEN=your_token
// export DDNS_STATE_STORE_PATH=/var/lib/ddns/state.json
//
// ddnsd
// ```

use anyhow::Result;
use ddns_core::config::MIN_SECRET_LEN;
use ddns_core::{
    DdnsConfig, FileStore, HostRegistry, MemoryStore, ProviderConfig, ReconciliationEngine,
    SecretStore, ServerConfig, SettingsStore, StateStoreConfig,
};
use ddns_http::AppState;
use ddns_provider_cloudflare::CloudflareProvider;
use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    secret_key: String,
    ddns: DdnsConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, treating blank values as unset
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let state_store = match var("DDNS_STATE_STORE_TYPE").as_deref() {
            None | Some("file") => StateStoreConfig::File {
                path: var("DDNS_STATE_STORE_PATH")
                    .unwrap_or_else(|| ddns_core::config::DEFAULT_STATE_PATH.to_string()),
            },
            Some("memory") => StateStoreConfig::Memory,
            Some(other) => anyhow::bail!(
                "DDNS_STATE_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                other
            ),
        };

        let defaults = DdnsConfig::default();

        let server = ServerConfig {
            bind_addr: var("DDNS_BIND_ADDR").unwrap_or(defaults.server.bind_addr),
            request_timeout_secs: parse_secs(
                "DDNS_REQUEST_TIMEOUT_SECS",
                var("DDNS_REQUEST_TIMEOUT_SECS"),
                defaults.server.request_timeout_secs,
            )?,
            trust_forwarded_for: parse_bool(
                "DDNS_TRUST_FORWARDED_FOR",
                var("DDNS_TRUST_FORWARDED_FOR"),
            )?,
            admin_token: var("DDNS_ADMIN_TOKEN"),
        };

        let provider = ProviderConfig {
            timeout_secs: parse_secs(
                "DDNS_PROVIDER_TIMEOUT_SECS",
                var("DDNS_PROVIDER_TIMEOUT_SECS"),
                defaults.provider.timeout_secs,
            )?,
            zone_id: var("DDNS_CLOUDFLARE_ZONE_ID"),
            api_token: var("DDNS_CLOUDFLARE_API_TOKEN"),
        };

        Ok(Self {
            secret_key: var("DDNS_SECRET_KEY").unwrap_or_default(),
            ddns: DdnsConfig {
                server,
                state_store,
                provider,
            },
            log_level: var("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks the master secret, then delegates range and format checks to
    /// `DdnsConfig::validate`.
    fn validate(&self) -> Result<()> {
        if self.secret_key.is_empty() {
            anyhow::bail!(
                "DDNS_SECRET_KEY is required. \
                Generate one via: export DDNS_SECRET_KEY=$(openssl rand -hex 32)"
            );
        }

        if self.secret_key.len() < MIN_SECRET_LEN {
            anyhow::bail!(
                "DDNS_SECRET_KEY is too short ({} chars, minimum {}).",
                self.secret_key.len(),
                MIN_SECRET_LEN
            );
        }

        self.ddns.validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn parse_secs(name: &str, value: Option<String>, default: u64) -> Result<u64> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            anyhow::anyhow!("{} must be a whole number of seconds. Got: {}", name, raw)
        }),
    }
}

fn parse_bool(name: &str, value: Option<String>) -> Result<bool> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("false" | "0" | "no") => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some(other) => anyhow::bail!("{} must be true or false. Got: {}", name, other),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {:#}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: Config) -> Result<()> {
    let Config {
        secret_key, ddns, ..
    } = config;

    let secrets = Arc::new(SecretStore::new(&secret_key));

    let (registry, settings) = open_store(&ddns.state_store).await?;
    seed_settings(settings.as_ref(), &secrets, &ddns.provider).await?;

    let provider = Arc::new(CloudflareProvider::new(Duration::from_secs(
        ddns.provider.timeout_secs,
    ))?);
    info!("DNS provider: cloudflare");

    let engine = Arc::new(ReconciliationEngine::new(
        registry.clone(),
        settings.clone(),
        provider,
        secrets.clone(),
    ));

    let mut state = AppState::new(engine, registry.clone(), settings, secrets)
        .with_trust_forwarded_for(ddns.server.trust_forwarded_for)
        .with_request_timeout(Duration::from_secs(ddns.server.request_timeout_secs));
    if let Some(token) = &ddns.server.admin_token {
        state = state.with_admin_token(token.as_str());
        info!("Admin API enabled");
    }
    if ddns.server.trust_forwarded_for {
        info!("Client addresses taken from X-Forwarded-For");
    }

    let tasks = state.update_tasks();
    let router = ddns_http::router(state);
    let shutdown = shutdown_signal()?;

    let listener = tokio::net::TcpListener::bind(&ddns.server.bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", ddns.server.bind_addr, e))?;
    info!("Listening on {}", ddns.server.bind_addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    info!("Shutting down, waiting for in-flight updates");
    let drained = tasks.drain().await;
    info!("{} update(s) finished, flushing state", drained);
    registry.flush().await?;
    info!("Shutdown complete");

    Ok(())
}

/// Open the configured store as both registry and settings store
async fn open_store(
    config: &StateStoreConfig,
) -> Result<(Arc<dyn HostRegistry>, Arc<dyn SettingsStore>)> {
    match config {
        StateStoreConfig::File { path } => {
            let store = Arc::new(FileStore::new(path).await?);
            info!("State store: file ({})", store.path().display());
            let registry: Arc<dyn HostRegistry> = store.clone();
            let settings: Arc<dyn SettingsStore> = store;
            Ok((registry, settings))
        }
        StateStoreConfig::Memory => {
            warn!("State store: memory (hosts are lost on restart)");
            let store = Arc::new(MemoryStore::new());
            let registry: Arc<dyn HostRegistry> = store.clone();
            let settings: Arc<dyn SettingsStore> = store;
            Ok((registry, settings))
        }
    }
}

/// Write provider settings given in the environment into the store
///
/// Values from the environment replace stored ones; unset values leave the
/// store untouched so admin edits survive restarts.
async fn seed_settings(
    settings: &dyn SettingsStore,
    secrets: &SecretStore,
    provider: &ProviderConfig,
) -> Result<()> {
    if let Some(zone_id) = &provider.zone_id {
        settings.set_zone_id(Some(zone_id.clone())).await?;
        info!("Zone id set from environment");
    }

    if let Some(api_token) = &provider.api_token {
        let ciphertext = secrets.encrypt(api_token)?;
        settings.set_api_token_ciphertext(ciphertext).await?;
        info!("API token set from environment");
    }

    let current = settings.provider_settings().await?;
    if current.zone_id.is_none() || !current.has_api_token() {
        warn!("Provider settings are incomplete; updates will fail until they are configured");
    }

    Ok(())
}

/// Install handlers for SIGTERM and SIGINT
///
/// Installation happens eagerly so a failure is reported at startup; the
/// returned future resolves on the first signal.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        let received = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", received);
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: SIGINT"),
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    })
}
