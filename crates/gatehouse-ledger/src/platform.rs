//! Narrow capabilities the ledger needs from the chat platform.
//!
//! Role membership is owned by the platform, not the ledger. The core only
//! asks whether a user holds a role, grants it after a redemption, and lists
//! members for bulk quota grants.

use crate::ids::{RoleId, UserId};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a platform adapter.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// Transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Platform answered with an unexpected status
    #[error("platform returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Request did not finish in time
    #[error("platform request timed out")]
    Timeout,

    /// Resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Response could not be decoded
    #[error("could not decode platform response: {0}")]
    Decode(String),
}

/// What kind of account a user id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Human,
    /// Bot or other service account
    Automated,
    /// Not a member of the guild
    Absent,
}

#[async_trait]
pub trait RoleChecker: Send + Sync {
    async fn has_role(&self, user: UserId, role: RoleId) -> Result<bool, PlatformError>;
    async fn account_kind(&self, user: UserId) -> Result<AccountKind, PlatformError>;
    /// Whether the guild still defines `role`.
    async fn role_exists(&self, role: RoleId) -> Result<bool, PlatformError>;
}

#[async_trait]
pub trait RoleGranter: Send + Sync {
    async fn grant_role(&self, user: UserId, role: RoleId, reason: &str)
        -> Result<(), PlatformError>;
}

#[async_trait]
pub trait MemberEnumerator: Send + Sync {
    /// Snapshot of current members; not kept live.
    async fn all_members(&self) -> Result<Vec<UserId>, PlatformError>;
}

/// Everything the whitelist service needs from a platform.
pub trait Platform: RoleChecker + RoleGranter + MemberEnumerator {}

impl<T: RoleChecker + RoleGranter + MemberEnumerator> Platform for T {}

#[derive(Debug, Clone, Default)]
struct LocalMember {
    automated: bool,
    roles: BTreeSet<RoleId>,
}

#[derive(Debug, Default)]
struct LocalState {
    members: BTreeMap<UserId, LocalMember>,
    roles: BTreeSet<RoleId>,
    grant_failure: Option<PlatformError>,
    grant_delay: Option<Duration>,
}

/// In-process guild.
///
/// Used in tests and by embedders without a platform connection. Roles
/// exist once created or once any member is added holding them.
#[derive(Debug, Default)]
pub struct LocalGuild {
    state: RwLock<LocalState>,
}

impl LocalGuild {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_role(&self, role: RoleId) {
        if let Ok(mut state) = self.state.write() {
            state.roles.insert(role);
        }
    }

    /// Delete `role` from the guild and from every member holding it.
    pub fn delete_role(&self, role: RoleId) {
        if let Ok(mut state) = self.state.write() {
            state.roles.remove(&role);
            for member in state.members.values_mut() {
                member.roles.remove(&role);
            }
        }
    }

    /// Add a human member holding `roles`.
    pub fn add_member(&self, user: UserId, roles: &[RoleId]) {
        self.insert(user, false, roles);
    }

    /// Add a bot account.
    pub fn add_bot(&self, user: UserId) {
        self.insert(user, true, &[]);
    }

    fn insert(&self, user: UserId, automated: bool, roles: &[RoleId]) {
        if let Ok(mut state) = self.state.write() {
            state.roles.extend(roles.iter().copied());
            state.members.insert(
                user,
                LocalMember {
                    automated,
                    roles: roles.iter().copied().collect(),
                },
            );
        }
    }

    /// The user leaves the guild.
    pub fn remove_member(&self, user: UserId) {
        if let Ok(mut state) = self.state.write() {
            state.members.remove(&user);
        }
    }

    /// Remove a role outside of the ledger's knowledge.
    pub fn revoke_role(&self, user: UserId, role: RoleId) {
        if let Ok(mut state) = self.state.write() {
            if let Some(member) = state.members.get_mut(&user) {
                member.roles.remove(&role);
            }
        }
    }

    /// Make role grants fail with `error` until cleared with `None`.
    pub fn fail_grants(&self, error: Option<PlatformError>) {
        if let Ok(mut state) = self.state.write() {
            state.grant_failure = error;
        }
    }

    /// Delay every role grant by `delay`.
    pub fn delay_grants(&self, delay: Option<Duration>) {
        if let Ok(mut state) = self.state.write() {
            state.grant_delay = delay;
        }
    }

    pub fn holds(&self, user: UserId, role: RoleId) -> bool {
        self.state
            .read()
            .map(|state| {
                state
                    .members
                    .get(&user)
                    .is_some_and(|m| m.roles.contains(&role))
            })
            .unwrap_or(false)
    }

    fn poisoned() -> PlatformError {
        PlatformError::Http("local guild lock poisoned".into())
    }
}

#[async_trait]
impl RoleChecker for LocalGuild {
    async fn has_role(&self, user: UserId, role: RoleId) -> Result<bool, PlatformError> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state
            .members
            .get(&user)
            .is_some_and(|m| m.roles.contains(&role)))
    }

    async fn account_kind(&self, user: UserId) -> Result<AccountKind, PlatformError> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(match state.members.get(&user) {
            None => AccountKind::Absent,
            Some(m) if m.automated => AccountKind::Automated,
            Some(_) => AccountKind::Human,
        })
    }

    async fn role_exists(&self, role: RoleId) -> Result<bool, PlatformError> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.roles.contains(&role))
    }
}

#[async_trait]
impl RoleGranter for LocalGuild {
    async fn grant_role(
        &self,
        user: UserId,
        role: RoleId,
        _reason: &str,
    ) -> Result<(), PlatformError> {
        let delay = {
            let state = self.state.read().map_err(|_| Self::poisoned())?;
            state.grant_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().map_err(|_| Self::poisoned())?;
        if let Some(error) = state.grant_failure.clone() {
            return Err(error);
        }
        if !state.roles.contains(&role) {
            return Err(PlatformError::NotFound(format!("role {}", role)));
        }
        let member = state
            .members
            .get_mut(&user)
            .ok_or_else(|| PlatformError::NotFound(format!("member {}", user)))?;
        member.roles.insert(role);
        Ok(())
    }
}

#[async_trait]
impl MemberEnumerator for LocalGuild {
    async fn all_members(&self) -> Result<Vec<UserId>, PlatformError> {
        let state = self.state.read().map_err(|_| Self::poisoned())?;
        Ok(state.members.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLE: RoleId = RoleId(100);

    #[tokio::test]
    async fn local_guild_tracks_roles() {
        let guild = LocalGuild::new();
        guild.add_member(UserId(1), &[ROLE]);
        guild.add_member(UserId(2), &[]);
        guild.add_bot(UserId(3));

        assert!(guild.has_role(UserId(1), ROLE).await.unwrap());
        assert!(!guild.has_role(UserId(2), ROLE).await.unwrap());
        assert_eq!(guild.account_kind(UserId(3)).await.unwrap(), AccountKind::Automated);
        assert_eq!(guild.account_kind(UserId(4)).await.unwrap(), AccountKind::Absent);

        guild.grant_role(UserId(2), ROLE, "test").await.unwrap();
        assert!(guild.holds(UserId(2), ROLE));

        guild.revoke_role(UserId(1), ROLE);
        assert!(!guild.holds(UserId(1), ROLE));
        assert_eq!(guild.all_members().await.unwrap().len(), 3);

        guild.remove_member(UserId(2));
        assert_eq!(guild.account_kind(UserId(2)).await.unwrap(), AccountKind::Absent);
    }

    #[tokio::test]
    async fn deleted_role_is_gone_everywhere() {
        let guild = LocalGuild::new();
        guild.add_member(UserId(1), &[ROLE]);
        assert!(guild.role_exists(ROLE).await.unwrap());

        guild.delete_role(ROLE);
        assert!(!guild.role_exists(ROLE).await.unwrap());
        assert!(!guild.holds(UserId(1), ROLE));
        assert!(matches!(
            guild.grant_role(UserId(1), ROLE, "test").await,
            Err(PlatformError::NotFound(_))
        ));

        guild.create_role(RoleId(7));
        assert!(guild.role_exists(RoleId(7)).await.unwrap());
    }

    #[tokio::test]
    async fn injected_grant_failure() {
        let guild = LocalGuild::new();
        guild.add_member(UserId(1), &[]);
        guild.fail_grants(Some(PlatformError::Status {
            status: 403,
            body: "Missing Permissions".into(),
        }));

        assert!(guild.grant_role(UserId(1), ROLE, "test").await.is_err());
        assert!(!guild.holds(UserId(1), ROLE));
    }
}
