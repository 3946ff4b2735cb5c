//! Administrative quota grants.

use crate::error::{Error, Result};
use crate::ids::UserId;
use crate::ledger::Ledger;
use crate::platform::Platform;
use crate::service::WhitelistService;
use serde::Serialize;
use std::collections::BTreeSet;

/// Who receives a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "user", rename_all = "snake_case")]
pub enum GrantTarget {
    User(UserId),
    AllMembers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrantOutcome {
    pub target: GrantTarget,
    pub amount: u64,
    /// Number of distinct users credited
    pub credited: usize,
}

/// Reject non-positive amounts.
pub fn validate_amount(amount: i64) -> Result<u64> {
    if amount <= 0 {
        return Err(Error::InvalidAmount(amount));
    }
    Ok(amount as u64)
}

/// Credit `amount` to each distinct user in `users`. Returns how many were credited.
pub fn apply(ledger: &mut Ledger, amount: u64, users: &[UserId]) -> usize {
    let distinct: BTreeSet<UserId> = users.iter().copied().collect();
    for user in &distinct {
        ledger.add_quota(*user, amount);
    }
    distinct.len()
}

impl<P: Platform> WhitelistService<P> {
    /// Add `amount` invites to one user or to every current member.
    ///
    /// Members are listed before the ledger lock is taken; the whole credit
    /// is then a single transaction.
    pub async fn grant_quota(&self, amount: i64, target: GrantTarget) -> Result<GrantOutcome> {
        let amount = validate_amount(amount)?;

        let users = match target {
            GrantTarget::User(user) => vec![user],
            GrantTarget::AllMembers => self.platform.all_members().await?,
        };

        let credited = self
            .store
            .transaction(|ledger| Ok(apply(ledger, amount, &users)))
            .await?;

        match target {
            GrantTarget::User(user) => tracing::info!(%user, amount, "Granted invites"),
            GrantTarget::AllMembers => {
                tracing::info!(members = credited, amount, "Granted invites to all members")
            }
        }

        Ok(GrantOutcome {
            target,
            amount,
            credited,
        })
    }
}
