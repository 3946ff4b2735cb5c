//! Gatehouse Bot - invite-limited whitelist for a chat community
//!
//! Runs the whitelist ledger as a daemon next to a chat gateway bridge.
//!
//! # Architecture
//!
//! - **Config**: environment and optional JSON file, read once at startup
//! - **Discord**: REST adapter implementing the ledger's platform capabilities
//! - **Commands**: typed commands and replies, dispatched to the ledger service
//! - **Command Socket**: Unix socket for the bridge and the gatehouse-admin CLI
//! - **API**: read-only HTTP view of the ledger
//!
//! # Example
//!
//! ```no_run
//! use gatehouse_bot::{BotConfig, BotNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BotConfig::from_env()?;
//!     let node = BotNode::connect(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod command_socket;
pub mod commands;
pub mod config;
pub mod discord;
pub mod error;
pub mod node;
pub mod templates;

pub use commands::{Command, Dispatcher, ProfileCard, Reply};
pub use config::BotConfig;
pub use discord::DiscordClient;
pub use error::{Error, Result};
pub use node::BotNode;
