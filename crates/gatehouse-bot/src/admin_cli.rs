//! gatehouse-admin CLI tool
//!
//! Sends commands to a running gatehouse-node over its command socket.
//!
//! Usage:
//!   gatehouse-admin ping
//!   gatehouse-admin whitelist <invoker> <target>
//!   gatehouse-admin grant-invites <amount> [--user <id>]
//!   gatehouse-admin profile <user>

use clap::{Parser, Subcommand};
use gatehouse_bot::command_socket::default_socket_path;
use gatehouse_bot::{Command, Reply};
use gatehouse_ledger::UserId;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "gatehouse-admin", version, about = "Manage a gatehouse node")]
struct Cli {
    /// Path to the node's command socket
    #[arg(long, env = "GATEHOUSE_SOCKET")]
    socket: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Check if the node is running
    Ping,
    /// Spend one of <invoker>'s invites to whitelist <target>
    Whitelist { invoker: UserId, target: UserId },
    /// Add invites to one user, or to every member when --user is omitted
    GrantInvites {
        #[arg(allow_negative_numbers = true)]
        amount: i64,
        #[arg(long)]
        user: Option<UserId>,
    },
    /// Show a user's profile
    Profile { user: UserId },
}

impl From<Action> for Command {
    fn from(action: Action) -> Self {
        match action {
            Action::Ping => Command::Ping,
            Action::Whitelist { invoker, target } => Command::Whitelist { invoker, target },
            Action::GrantInvites { amount, user } => Command::GrantInvites {
                amount,
                target: user,
            },
            Action::Profile { user } => Command::Profile {
                invoker: user,
                target: None,
            },
        }
    }
}

fn send_command(socket_path: &PathBuf, cmd: &Command) -> Result<Reply, String> {
    let mut stream = UnixStream::connect(socket_path).map_err(|e| {
        format!(
            "Failed to connect to gatehouse-node at {:?}: {}\n\
             Is the gatehouse-node running?",
            socket_path, e
        )
    })?;

    let cmd_json = serde_json::to_string(cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    let mut reader = BufReader::new(&stream);
    let mut reply_line = String::new();
    reader
        .read_line(&mut reply_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&reply_line).map_err(|e| format!("Invalid reply: {}", e))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let socket_path = cli.socket.unwrap_or_else(default_socket_path);

    match send_command(&socket_path, &cli.action.into()) {
        Ok(Reply::Success { message, footer }) => {
            println!("{}", message);
            if let Some(footer) = footer {
                println!("{}", footer);
            }
            ExitCode::SUCCESS
        }
        Ok(Reply::Error { error }) => {
            eprintln!("Error: {}", error);
            ExitCode::FAILURE
        }
        Ok(Reply::Profile(card)) => {
            println!("{}", card.title);
            println!("{}", card.description);
            if !card.invitees.is_empty() {
                println!("Invited members:");
                for invitee in &card.invitees {
                    println!("  {}", invitee);
                }
            }
            println!("{}", card.footer);
            ExitCode::SUCCESS
        }
        Ok(Reply::Pong { latency_ms }) => {
            println!("pong - gatehouse-node is running (platform {} ms)", latency_ms);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
