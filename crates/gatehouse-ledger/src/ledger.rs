//! The two ledger mappings and the rules that mutate them.

use crate::error::{Error, Result};
use crate::ids::{Inviter, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quota a founder starts with when first observed.
pub const FOUNDER_QUOTA: u64 = 1;

/// Remaining invites per user.
pub type InviteQuota = BTreeMap<UserId, u64>;

/// Inviter per whitelisted user.
pub type InviterOf = BTreeMap<UserId, Inviter>;

/// In-memory copy of the ledger.
///
/// A user with an `invited_by` entry has been observed as whitelisted at
/// least once. Quota is unsigned, so it can never go below zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub invites: InviteQuota,
    #[serde(default)]
    pub invited_by: InviterOf,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining invites; untracked users have none.
    pub fn quota(&self, user: UserId) -> u64 {
        self.invites.get(&user).copied().unwrap_or(0)
    }

    pub fn inviter(&self, user: UserId) -> Option<Inviter> {
        self.invited_by.get(&user).copied()
    }

    pub fn is_tracked(&self, user: UserId) -> bool {
        self.invited_by.contains_key(&user)
    }

    /// Record an untracked role holder as a founder.
    ///
    /// An existing quota is kept as is; otherwise the founder starts with
    /// [`FOUNDER_QUOTA`]. Returns `true` if the user was initialized by this call.
    pub fn ensure_founder(&mut self, user: UserId) -> bool {
        if self.invited_by.contains_key(&user) {
            return false;
        }
        self.invited_by.insert(user, Inviter::Founder);
        self.invites.entry(user).or_insert(FOUNDER_QUOTA);
        true
    }

    /// Take one invite from `user`, returning what is left.
    pub fn spend_invite(&mut self, user: UserId) -> Result<u64> {
        let left = self.quota(user);
        if left < 1 {
            return Err(Error::QuotaExhausted);
        }
        self.invites.insert(user, left - 1);
        Ok(left - 1)
    }

    pub fn record_invite(&mut self, inviter: UserId, target: UserId) {
        self.invited_by.insert(target, Inviter::Member(inviter));
    }

    /// Add invites, creating the entry at zero if absent.
    pub fn add_quota(&mut self, user: UserId, amount: u64) -> u64 {
        let entry = self.invites.entry(user).or_insert(0);
        *entry = entry.saturating_add(amount);
        *entry
    }

    /// Users whose recorded inviter is `user`, in id order.
    pub fn invitees_of(&self, user: UserId) -> Vec<UserId> {
        self.invited_by
            .iter()
            .filter(|(_, inviter)| **inviter == Inviter::Member(user))
            .map(|(invitee, _)| *invitee)
            .collect()
    }

    pub fn founders(&self) -> impl Iterator<Item = UserId> + '_ {
        self.invited_by
            .iter()
            .filter(|(_, inviter)| inviter.is_founder())
            .map(|(user, _)| *user)
    }

    pub fn total_invites(&self) -> u64 {
        self.invites.values().fold(0u64, |acc, n| acc.saturating_add(*n))
    }
}
