//! Reply wording.

use crate::commands::{ProfileCard, Reply};
use gatehouse_ledger::{Error, GrantOutcome, GrantTarget, Inviter, Profile, Redemption, UserId};

pub fn success(message: impl Into<String>) -> Reply {
    Reply::Success {
        message: message.into(),
        footer: None,
    }
}

pub fn error(message: impl Into<String>) -> Reply {
    Reply::Error {
        error: message.into(),
    }
}

fn invites_left(n: u64) -> String {
    format!("Invites left: {}", n)
}

pub fn redeemed(r: &Redemption) -> Reply {
    Reply::Success {
        message: format!(
            "{} gave the whitelist role to {}.",
            r.invoker.mention(),
            r.target.mention()
        ),
        footer: Some(invites_left(r.remaining)),
    }
}

pub fn granted(outcome: &GrantOutcome) -> Reply {
    match outcome.target {
        GrantTarget::User(user) => success(format!(
            "Added {} invites to {}.",
            outcome.amount,
            user.mention()
        )),
        GrantTarget::AllMembers => success(format!(
            "Added {} invites to all {} members of the server.",
            outcome.amount, outcome.credited
        )),
    }
}

pub fn not_whitelisted(user: UserId) -> Reply {
    error(format!("{} is not whitelisted.", user.mention()))
}

pub fn profile_card(profile: &Profile) -> ProfileCard {
    let inviter = profile.inviter.and_then(|i| i.member());
    let description = match profile.inviter {
        Some(Inviter::Member(id)) => format!("Invited by: {}", id.mention()),
        _ => "`Founding member`".to_string(),
    };

    ProfileCard {
        user: profile.user,
        founder: profile.founder,
        inviter,
        invites_left: profile.invites_left,
        invitees: profile.invitees.clone(),
        title: format!("Profile of {}", profile.user.mention()),
        description,
        footer: invites_left(profile.invites_left),
    }
}

/// Message for a failed command. Faults get a generic message; details are in the log.
pub fn rejection(e: &Error) -> Reply {
    let message = match e {
        Error::Unauthorized => "You do not have whitelist permission.".to_string(),
        Error::InvalidTarget => "That account cannot be whitelisted.".to_string(),
        Error::SelfInviteRejected => "You cannot whitelist yourself.".to_string(),
        Error::AlreadyWhitelisted(user) => format!("{} is already whitelisted.", user.mention()),
        Error::QuotaExhausted => "You have no invites left.".to_string(),
        Error::InvalidAmount(_) => "Enter a number greater than zero.".to_string(),
        Error::RoleGrantFailed { .. } => {
            "Failed to grant the whitelist role. Please try again.".to_string()
        }
        Error::Configuration(_) => "The whitelist role could not be found.".to_string(),
        Error::Persistence(_) | Error::Serialization(_) | Error::Platform(_) => {
            "Something went wrong. Please try again later.".to_string()
        }
    };
    error(message)
}
