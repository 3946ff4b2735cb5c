//! Unix socket server for commands.
//!
//! The gateway bridge and `gatehouse-admin` send one JSON [`Command`] per
//! line and receive one JSON [`Reply`] per line.

use crate::commands::{Command, Dispatcher, Reply};
use crate::error::Result;
use gatehouse_ledger::Platform;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

/// Command socket server.
pub struct CommandSocket<P> {
    dispatcher: Arc<Dispatcher<P>>,
    socket_path: PathBuf,
}

impl<P: Platform + 'static> CommandSocket<P> {
    pub fn new(dispatcher: Arc<Dispatcher<P>>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            dispatcher,
            socket_path: socket_path.into(),
        }
    }

    /// Bind the socket, replacing a stale socket file.
    pub fn bind(&self) -> Result<UnixListener> {
        let _ = std::fs::remove_file(&self.socket_path);
        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("Command socket listening on {:?}", self.socket_path);
        Ok(listener)
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(&self, listener: UnixListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let dispatcher = Arc::clone(&self.dispatcher);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, dispatcher).await {
                            tracing::error!("Command connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept command connection: {}", e);
                }
            }
        }
    }
}

async fn handle_connection<P: Platform>(
    stream: UnixStream,
    dispatcher: Arc<Dispatcher<P>>,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let reply = if line.trim().is_empty() {
            None
        } else {
            Some(match serde_json::from_str::<Command>(&line) {
                Ok(cmd) => {
                    tracing::debug!(?cmd, "Command received");
                    dispatcher.dispatch(cmd).await
                }
                Err(e) => Reply::Error {
                    error: format!("Invalid command: {}", e),
                },
            })
        };

        if let Some(reply) = reply {
            let reply_json = serde_json::to_string(&reply)? + "\n";
            writer.write_all(reply_json.as_bytes()).await?;
        }
        line.clear();
    }

    Ok(())
}

/// Default socket path.
pub fn default_socket_path() -> PathBuf {
    let data_dir =
        std::env::var("GATEHOUSE_DATA_DIR").unwrap_or_else(|_| "./gatehouse-data".to_string());
    PathBuf::from(data_dir).join("command.sock")
}
