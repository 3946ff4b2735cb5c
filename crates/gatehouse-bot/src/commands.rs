//! Command surface: one typed command in, one typed reply out.
//!
//! The gateway bridge turns each interaction into a [`Command`] and renders
//! the [`Reply`] back to the member. Administrator privilege for
//! `grant_invites` is checked by the bridge before forwarding.

use crate::templates;
use gatehouse_ledger::{Error, GrantTarget, Platform, UserId, WhitelistService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// A command forwarded by the bridge or the admin CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Health check, timed against one platform round-trip
    Ping,
    /// Spend one invite to whitelist `target`
    Whitelist { invoker: UserId, target: UserId },
    /// Add invites to one user, or everyone when `target` is absent
    GrantInvites {
        amount: i64,
        #[serde(default)]
        target: Option<UserId>,
    },
    /// Show a profile; `target` defaults to the invoker
    Profile {
        invoker: UserId,
        #[serde(default)]
        target: Option<UserId>,
    },
}

/// Reply sent back for each command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Success {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        footer: Option<String>,
    },
    Error {
        error: String,
    },
    Profile(ProfileCard),
    Pong {
        latency_ms: u64,
    },
}

/// Rendered profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileCard {
    pub user: UserId,
    pub founder: bool,
    pub inviter: Option<UserId>,
    pub invites_left: u64,
    pub invitees: Vec<UserId>,
    pub title: String,
    pub description: String,
    pub footer: String,
}

/// Routes commands to the whitelist service.
pub struct Dispatcher<P> {
    service: Arc<WhitelistService<P>>,
}

impl<P: Platform> Dispatcher<P> {
    pub fn new(service: Arc<WhitelistService<P>>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<WhitelistService<P>> {
        &self.service
    }

    /// Execute `cmd`. Never fails: every error becomes a [`Reply::Error`].
    pub async fn dispatch(&self, cmd: Command) -> Reply {
        match cmd {
            Command::Ping => {
                let started = Instant::now();
                match self.service.require_role().await {
                    Ok(()) => Reply::Pong {
                        latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    },
                    Err(e) => failure(e),
                }
            }

            Command::Whitelist { invoker, target } => {
                match self.service.redeem_invite(invoker, target).await {
                    Ok(redemption) => templates::redeemed(&redemption),
                    Err(e) => failure(e),
                }
            }

            Command::GrantInvites { amount, target } => {
                let target = target.map_or(GrantTarget::AllMembers, GrantTarget::User);
                match self.service.grant_quota(amount, target).await {
                    Ok(outcome) => templates::granted(&outcome),
                    Err(e) => failure(e),
                }
            }

            Command::Profile { invoker, target } => {
                let user = target.unwrap_or(invoker);
                match self.service.evaluate_profile(user).await {
                    Ok(profile) if !profile.whitelisted => templates::not_whitelisted(user),
                    Ok(profile) => Reply::Profile(templates::profile_card(&profile)),
                    Err(e) => failure(e),
                }
            }
        }
    }
}

/// Turn an error into the reply shown to the member.
fn failure(e: Error) -> Reply {
    if !e.is_rejection() && !matches!(e, Error::RoleGrantFailed { .. }) {
        tracing::error!("Command failed: {}", e);
    }
    templates::rejection(&e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_ledger::{LedgerStore, LocalGuild, MemoryBackend, RoleId, WhitelistSettings};

    const ROLE: RoleId = RoleId(77);

    fn dispatcher() -> (Dispatcher<LocalGuild>, Arc<LocalGuild>) {
        let guild = Arc::new(LocalGuild::new());
        guild.add_member(UserId(1), &[ROLE]);
        guild.add_member(UserId(2), &[]);
        let store = Arc::new(LedgerStore::open(MemoryBackend::new()).unwrap());
        let service = WhitelistService::new(WhitelistSettings::new(ROLE), store, Arc::clone(&guild));
        (Dispatcher::new(Arc::new(service)), guild)
    }

    #[test]
    fn command_wire_format() {
        let cmd: Command =
            serde_json::from_str(r#"{"cmd":"whitelist","invoker":"1","target":"2"}"#).unwrap();
        assert!(matches!(
            cmd,
            Command::Whitelist { invoker: UserId(1), target: UserId(2) }
        ));

        let cmd: Command = serde_json::from_str(r#"{"cmd":"grant_invites","amount":3}"#).unwrap();
        assert!(matches!(cmd, Command::GrantInvites { amount: 3, target: None }));

        let json = serde_json::to_string(&Reply::Pong { latency_ms: 12 }).unwrap();
        assert_eq!(json, r#"{"status":"pong","latency_ms":12}"#);
    }

    #[tokio::test]
    async fn ping_reports_platform_latency() {
        let (dispatcher, guild) = dispatcher();
        assert!(matches!(dispatcher.dispatch(Command::Ping).await, Reply::Pong { .. }));

        guild.delete_role(ROLE);
        assert_eq!(
            dispatcher.dispatch(Command::Ping).await,
            Reply::Error { error: "The whitelist role could not be found.".into() }
        );
    }

    #[tokio::test]
    async fn deleted_role_gets_configuration_reply() {
        let (dispatcher, guild) = dispatcher();
        guild.delete_role(ROLE);
        let expected = Reply::Error { error: "The whitelist role could not be found.".into() };

        let reply = dispatcher
            .dispatch(Command::Whitelist { invoker: UserId(1), target: UserId(2) })
            .await;
        assert_eq!(reply, expected);

        let reply = dispatcher
            .dispatch(Command::Profile { invoker: UserId(1), target: None })
            .await;
        assert_eq!(reply, expected);

        let ledger = dispatcher.service().store().snapshot().await;
        assert!(ledger.invited_by.is_empty());
        assert!(!guild.holds(UserId(2), ROLE));
    }

    #[tokio::test]
    async fn whitelist_then_profile() {
        let (dispatcher, guild) = dispatcher();

        let reply = dispatcher
            .dispatch(Command::Whitelist { invoker: UserId(1), target: UserId(2) })
            .await;
        match reply {
            Reply::Success { footer, .. } => assert_eq!(footer.as_deref(), Some("Invites left: 0")),
            other => panic!("unexpected reply {:?}", other),
        }
        assert!(guild.holds(UserId(2), ROLE));

        let reply = dispatcher
            .dispatch(Command::Profile { invoker: UserId(2), target: Some(UserId(1)) })
            .await;
        match reply {
            Reply::Profile(card) => {
                assert!(card.founder);
                assert_eq!(card.invitees, vec![UserId(2)]);
                assert_eq!(card.invites_left, 0);
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[tokio::test]
    async fn rejections_become_error_replies() {
        let (dispatcher, _) = dispatcher();

        let reply = dispatcher
            .dispatch(Command::Whitelist { invoker: UserId(2), target: UserId(1) })
            .await;
        assert_eq!(
            reply,
            Reply::Error { error: "You do not have whitelist permission.".into() }
        );

        let reply = dispatcher
            .dispatch(Command::GrantInvites { amount: -1, target: None })
            .await;
        assert_eq!(
            reply,
            Reply::Error { error: "Enter a number greater than zero.".into() }
        );

        let reply = dispatcher
            .dispatch(Command::Profile { invoker: UserId(2), target: None })
            .await;
        assert_eq!(
            reply,
            Reply::Error { error: "<@2> is not whitelisted.".into() }
        );
    }

    #[tokio::test]
    async fn grant_to_everyone() {
        let (dispatcher, _) = dispatcher();
        let reply = dispatcher
            .dispatch(Command::GrantInvites { amount: 4, target: None })
            .await;
        assert!(matches!(reply, Reply::Success { .. }));

        let ledger = dispatcher.service().store().snapshot().await;
        assert_eq!(ledger.quota(UserId(1)), 4);
        assert_eq!(ledger.quota(UserId(2)), 4);
    }
}
