use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use warden_auth::clock::{Clock, SystemClock};
use warden_auth::storage::{
    ConfigCredentialVerifier, MemoryAuthorizationCodes, MemoryTokenStore, StatelessTokenStore,
    StaticClientRegistry, TokenStore,
};
use warden_auth::token::{TokenConfig, TokenService};
use warden_auth::{OAuthService, OAuthState};
use warden_auth_postgres::PostgresTokenStore;

use crate::config::{AppConfig, StorageBackend};

pub struct WardenServer {
    addr: SocketAddr,
    app: Router,
    service: Arc<OAuthService>,
    sweep_interval: Duration,
}

/// Wires the OAuth service from configuration.
///
/// Connects to PostgreSQL and creates the schema when that backend is
/// selected.
pub async fn build_service(cfg: &AppConfig) -> anyhow::Result<Arc<OAuthService>> {
    cfg.auth.validate().context("invalid auth configuration")?;

    let codec = Arc::new(cfg.auth.codec()?);
    if codec.algorithm().is_weak() {
        tracing::warn!(algorithm = %codec.algorithm(), "Signing with a weak HMAC digest");
    }

    let store: Arc<dyn TokenStore> = match cfg.storage.backend {
        StorageBackend::Memory => Arc::new(MemoryTokenStore::new()),
        StorageBackend::Stateless => Arc::new(StatelessTokenStore),
        StorageBackend::Postgres => {
            let pg = cfg
                .storage
                .postgres
                .as_ref()
                .context("storage.backend = \"postgres\" requires [storage.postgres]")?;
            let pool = warden_auth_postgres::connect(&pg.connection_url(), pg.pool_size)
                .await
                .context("failed to connect to PostgreSQL")?;
            let store = PostgresTokenStore::new(Arc::new(pool), codec.clone());
            store.migrate().await.context("failed to create token schema")?;
            Arc::new(store)
        }
    };
    tracing::info!(backend = %cfg.storage.backend, "Token store ready");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tokens = Arc::new(TokenService::new(
        codec,
        store,
        Arc::new(ConfigCredentialVerifier::new(&cfg.auth.users)),
        clock.clone(),
        TokenConfig::from_auth_config(&cfg.auth),
    ));

    let clients = StaticClientRegistry::from_config(&cfg.auth.clients);
    let codes = MemoryAuthorizationCodes::new(cfg.auth.oauth.authorization_code_lifetime, clock);

    Ok(Arc::new(OAuthService::new(
        tokens,
        Arc::new(clients),
        Arc::new(codes),
        cfg.auth.enabled_grants(),
    )))
}

pub fn build_app(cfg: &AppConfig, service: Arc<OAuthService>) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    warden_auth::router(OAuthState::new(service))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    // Query strings carry tokens and codes; only the path is recorded
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

/// Prunes expired pairs and codes every `interval` until aborted.
pub fn spawn_sweeper(service: Arc<OAuthService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(e) = service.sweep_expired().await {
                tracing::warn!(error = %e, "Expiry sweep failed");
            }
        }
    })
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<WardenServer> {
        let service = build_service(&self.config).await?;
        let app = build_app(&self.config, service.clone());

        Ok(WardenServer {
            addr: self.addr,
            app,
            service,
            sweep_interval: self.config.storage.sweep_interval,
        })
    }
}

impl WardenServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        tracing::info!("listening on {}", self.addr);

        let sweeper = spawn_sweeper(self.service, self.sweep_interval);
        let served = axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        sweeper.abort();
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
