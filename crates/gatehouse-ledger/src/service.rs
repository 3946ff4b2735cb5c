//! The whitelist service: ledger store plus platform capabilities.
//!
//! Command handlers hold one `WhitelistService` for the life of the process.
//! The operations themselves live next to their ledger rules in
//! [`crate::profile`], [`crate::redeem`] and [`crate::grant`].

use crate::error::{Error, Result};
use crate::ids::{RoleId, UserId};
use crate::platform::Platform;
use crate::store::LedgerStore;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Default bound on a single role grant request.
pub const DEFAULT_GRANT_TIMEOUT: Duration = Duration::from_secs(10);

/// Audit-log reason attached to role grants.
pub const DEFAULT_GRANT_REASON: &str = "Whitelist invitation";

/// Settings fixed at startup.
#[derive(Debug, Clone)]
pub struct WhitelistSettings {
    /// Role that marks a member as whitelisted
    pub whitelist_role: RoleId,

    /// Upper bound on the role grant after a redemption
    pub grant_timeout: Duration,

    /// Reason recorded with the role grant
    pub grant_reason: String,
}

impl WhitelistSettings {
    pub fn new(whitelist_role: RoleId) -> Self {
        Self {
            whitelist_role,
            grant_timeout: DEFAULT_GRANT_TIMEOUT,
            grant_reason: DEFAULT_GRANT_REASON.to_string(),
        }
    }

    pub fn with_grant_timeout(mut self, timeout: Duration) -> Self {
        self.grant_timeout = timeout;
        self
    }
}

pub struct WhitelistService<P> {
    pub(crate) settings: WhitelistSettings,
    pub(crate) store: Arc<LedgerStore>,
    pub(crate) platform: Arc<P>,
    /// Targets with a redemption between ledger commit and role grant
    pub(crate) in_flight: Mutex<BTreeSet<UserId>>,
}

/// Marks a redemption target as in flight until dropped.
pub(crate) struct TargetClaim<'a> {
    in_flight: &'a Mutex<BTreeSet<UserId>>,
    target: UserId,
}

impl Drop for TargetClaim<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.target);
        }
    }
}

impl<P: Platform> WhitelistService<P> {
    pub fn new(settings: WhitelistSettings, store: Arc<LedgerStore>, platform: Arc<P>) -> Self {
        Self {
            settings,
            store,
            platform,
            in_flight: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn settings(&self) -> &WhitelistSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<LedgerStore> {
        &self.store
    }

    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    /// Fail with a configuration error if the guild no longer has the whitelist role.
    pub async fn require_role(&self) -> Result<()> {
        let role = self.settings.whitelist_role;
        if self.platform.role_exists(role).await? {
            Ok(())
        } else {
            Err(Error::Configuration(format!(
                "whitelist role {} not found in the guild",
                role
            )))
        }
    }

    /// Claim `target` for one redemption; `None` if another one holds it.
    pub(crate) fn claim_target(&self, target: UserId) -> Result<Option<TargetClaim<'_>>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| Error::Persistence("in-flight set poisoned".into()))?;
        if !in_flight.insert(target) {
            return Ok(None);
        }
        Ok(Some(TargetClaim {
            in_flight: &self.in_flight,
            target,
        }))
    }

    /// Record every untracked holder of the whitelist role as a founder.
    ///
    /// Role checks run before the ledger lock is taken; the initialization
    /// itself is one transaction. Returns how many founders were added.
    pub async fn bootstrap_founders(&self) -> Result<usize> {
        self.require_role().await?;
        let role = self.settings.whitelist_role;
        let mut holders = Vec::new();
        for user in self.platform.all_members().await? {
            if self.platform.has_role(user, role).await? {
                holders.push(user);
            }
        }

        let added = self
            .store
            .transaction(|ledger| {
                Ok(holders
                    .iter()
                    .filter(|user| ledger.ensure_founder(**user))
                    .count())
            })
            .await?;

        tracing::info!(
            holders = holders.len(),
            added,
            "Founder bootstrap complete"
        );
        Ok(added)
    }

    /// Members who hold the whitelist role right now.
    pub async fn is_whitelisted(&self, user: UserId) -> Result<bool> {
        Ok(self
            .platform
            .has_role(user, self.settings.whitelist_role)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Inviter;
    use crate::platform::LocalGuild;
    use crate::storage::MemoryBackend;

    const ROLE: RoleId = RoleId(500);

    #[tokio::test]
    async fn bootstrap_marks_untracked_holders() {
        let guild = Arc::new(LocalGuild::new());
        guild.add_member(UserId(1), &[ROLE]);
        guild.add_member(UserId(2), &[ROLE]);
        guild.add_member(UserId(3), &[]);

        let store = Arc::new(LedgerStore::open(MemoryBackend::new()).unwrap());
        store
            .transaction(|ledger| {
                ledger.ensure_founder(UserId(1));
                ledger.record_invite(UserId(1), UserId(2));
                Ok(())
            })
            .await
            .unwrap();
        guild.add_member(UserId(4), &[ROLE]);

        let service = WhitelistService::new(WhitelistSettings::new(ROLE), store, guild);
        assert_eq!(service.bootstrap_founders().await.unwrap(), 1);
        assert_eq!(service.bootstrap_founders().await.unwrap(), 0);

        let ledger = service.store().snapshot().await;
        assert_eq!(ledger.inviter(UserId(2)), Some(Inviter::Member(UserId(1))));
        assert_eq!(ledger.inviter(UserId(4)), Some(Inviter::Founder));
        assert!(!ledger.is_tracked(UserId(3)));
    }

    #[tokio::test]
    async fn missing_role_is_a_configuration_error() {
        let guild = Arc::new(LocalGuild::new());
        guild.add_member(UserId(1), &[ROLE]);
        let store = Arc::new(LedgerStore::open(MemoryBackend::new()).unwrap());
        let service = WhitelistService::new(WhitelistSettings::new(ROLE), store, Arc::clone(&guild));
        assert!(service.require_role().await.is_ok());

        guild.delete_role(ROLE);
        assert!(matches!(service.require_role().await, Err(Error::Configuration(_))));
        assert!(matches!(
            service.bootstrap_founders().await,
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn target_claim_released_on_drop() {
        let store = Arc::new(LedgerStore::open(MemoryBackend::new()).unwrap());
        let service =
            WhitelistService::new(WhitelistSettings::new(ROLE), store, Arc::new(LocalGuild::new()));

        let claim = service.claim_target(UserId(5)).unwrap();
        assert!(claim.is_some());
        assert!(service.claim_target(UserId(5)).unwrap().is_none());
        assert!(service.claim_target(UserId(6)).unwrap().is_some());

        drop(claim);
        assert!(service.claim_target(UserId(5)).unwrap().is_some());
    }
}
