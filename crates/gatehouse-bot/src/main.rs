//! Gatehouse node binary
//!
//! Owns the whitelist ledger and serves commands from the gateway bridge.

use gatehouse_bot::{BotConfig, BotNode, Error};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    gatehouse_logging::init("gatehouse_node=info,gatehouse_bot=info,gatehouse_ledger=info");

    let config = match BotConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };

    let node = match BotNode::connect(config).await {
        Ok(node) => node,
        Err(Error::Authentication(e)) => {
            tracing::error!("Authentication to the platform failed: {}", e);
            return Err(Error::Authentication(e).into());
        }
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            return Err(e.into());
        }
    };

    node.run().await?;

    Ok(())
}
