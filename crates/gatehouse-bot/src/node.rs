//! Gatehouse node - the daemon that owns the ledger.
//!
//! Architecture:
//! - Single process with one RocksDB-backed ledger store
//! - Command socket for the gateway bridge and gatehouse-admin
//! - Read-only HTTP API for ledger inspection

use crate::api;
use crate::command_socket::CommandSocket;
use crate::commands::Dispatcher;
use crate::config::BotConfig;
use crate::discord::DiscordClient;
use crate::error::Result;
use gatehouse_ledger::{LedgerStore, Platform, RocksBackend, WhitelistService};
use std::sync::Arc;

/// A gatehouse node instance.
pub struct BotNode<P> {
    config: BotConfig,
    service: Arc<WhitelistService<P>>,
}

impl BotNode<DiscordClient> {
    /// Connect to the platform and open the ledger.
    ///
    /// Fails with `Authentication` if the token is rejected and with a
    /// configuration error if the whitelist role does not exist.
    pub async fn connect(config: BotConfig) -> Result<Self> {
        let client = DiscordClient::new(&config)?;

        let me = client.current_user().await?;
        tracing::info!("======================================");
        tracing::info!("Logged in as {} ({})", me.username, me.id);
        tracing::info!("Running gatehouse {}", env!("CARGO_PKG_VERSION"));
        tracing::info!("======================================");

        let role = client.verify_role(config.whitelist_role).await?;
        tracing::info!("Whitelist role: {} ({})", role.name, role.id);

        Self::new(config, Arc::new(client))
    }
}

impl<P: Platform + 'static> BotNode<P> {
    /// Open the ledger under `config.data_dir` and wire it to `platform`.
    pub fn new(config: BotConfig, platform: Arc<P>) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let backend = RocksBackend::open(config.data_dir.join("ledger"))?;
        let store = Arc::new(LedgerStore::open(backend)?);
        let service = Arc::new(WhitelistService::new(
            config.whitelist_settings(),
            store,
            platform,
        ));

        Ok(Self { config, service })
    }

    pub fn service(&self) -> &Arc<WhitelistService<P>> {
        &self.service
    }

    /// Run the node (command socket and inspection API).
    pub async fn run(self) -> Result<()> {
        tracing::info!("Gatehouse node starting");
        tracing::info!("  Socket: {:?}", self.config.command_socket);
        tracing::info!("  HTTP: http://{}", self.config.http_addr);
        tracing::info!("  Data: {:?}", self.config.data_dir);

        if self.config.bootstrap_founders {
            let added = self.service.bootstrap_founders().await?;
            tracing::info!("Initialized {} founders from current role holders", added);
        }

        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&self.service)));
        let socket = CommandSocket::new(dispatcher, &self.config.command_socket);
        let listener = socket.bind()?;
        tokio::spawn(async move {
            if let Err(e) = socket.serve(listener).await {
                tracing::error!("Command socket error: {}", e);
            }
        });

        let app = api::build_router(Arc::clone(self.service.store()));
        let listener = tokio::net::TcpListener::bind(self.config.http_addr).await?;
        tracing::info!("Bot is ready");

        axum::serve(listener, app).await?;

        Ok(())
    }
}
