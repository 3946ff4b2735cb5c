//! Profile evaluation.

use crate::error::Result;
use crate::ids::{Inviter, UserId};
use crate::ledger::Ledger;
use crate::platform::{AccountKind, Platform};
use crate::service::WhitelistService;
use serde::Serialize;

/// Derived view of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub user: UserId,
    pub whitelisted: bool,
    pub founder: bool,
    pub invites_left: u64,
    /// `None` only for users without the whitelist role
    pub inviter: Option<Inviter>,
    /// Users this one invited, by reverse scan of the ledger. The service
    /// drops those who have since left the guild.
    pub invitees: Vec<UserId>,
}

impl Profile {
    pub fn not_whitelisted(user: UserId) -> Self {
        Self {
            user,
            whitelisted: false,
            founder: false,
            invites_left: 0,
            inviter: None,
            invitees: Vec::new(),
        }
    }
}

/// Evaluate `user` against the ledger, given whether they hold the role.
///
/// A role holder the ledger has never seen becomes a founder here, so the
/// caller must run this inside a transaction.
pub fn evaluate(ledger: &mut Ledger, user: UserId, has_role: bool) -> Profile {
    if !has_role {
        return Profile::not_whitelisted(user);
    }

    if ledger.ensure_founder(user) {
        tracing::info!(%user, invites = ledger.quota(user), "Initialized founder");
    }

    let inviter = ledger.inviter(user);
    Profile {
        user,
        whitelisted: true,
        founder: inviter.is_some_and(|i| i.is_founder()),
        invites_left: ledger.quota(user),
        inviter,
        invitees: ledger.invitees_of(user),
    }
}

impl<P: Platform> WhitelistService<P> {
    /// Profile of `user` as the platform and ledger currently see them.
    ///
    /// Users without the whitelist role never touch the ledger. Invitees
    /// are checked against the platform after the transaction and only
    /// those still in the guild are listed.
    pub async fn evaluate_profile(&self, user: UserId) -> Result<Profile> {
        self.require_role().await?;
        if !self.is_whitelisted(user).await? {
            return Ok(Profile::not_whitelisted(user));
        }
        let mut profile = self
            .store
            .transaction(|ledger| Ok(evaluate(ledger, user, true)))
            .await?;

        let mut present = Vec::with_capacity(profile.invitees.len());
        for invitee in profile.invitees {
            if self.platform.account_kind(invitee).await? != AccountKind::Absent {
                present.push(invitee);
            }
        }
        profile.invitees = present;
        Ok(profile)
    }
}
