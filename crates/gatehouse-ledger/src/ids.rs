//! Platform identifiers and the founder marker.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Literal stored in place of an inviter id for founders.
pub const FOUNDER_MARKER: &str = "founder";

/// A platform-assigned user id (snowflake).
///
/// Transmitted as a decimal string, which is how the chat platform encodes
/// 64-bit ids on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct UserId(pub u64);

/// A platform-assigned role id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RoleId(pub u64);

macro_rules! snowflake {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($ty)
            }
        }

        impl From<$ty> for String {
            fn from(id: $ty) -> Self {
                id.to_string()
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ParseIntError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<u64> for $ty {
            fn from(raw: u64) -> Self {
                $ty(raw)
            }
        }
    };
}

snowflake!(UserId);
snowflake!(RoleId);

impl UserId {
    /// Mention markup understood by the chat client.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

/// Who brought a whitelisted user in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Inviter {
    /// Whitelisted without a recorded inviter; root of an invite chain.
    Founder,
    /// Invited by this member.
    Member(UserId),
}

impl Inviter {
    pub fn is_founder(&self) -> bool {
        matches!(self, Inviter::Founder)
    }

    pub fn member(&self) -> Option<UserId> {
        match self {
            Inviter::Founder => None,
            Inviter::Member(id) => Some(*id),
        }
    }
}

impl fmt::Display for Inviter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Inviter::Founder => f.write_str(FOUNDER_MARKER),
            Inviter::Member(id) => write!(f, "{}", id),
        }
    }
}

impl From<Inviter> for String {
    fn from(inviter: Inviter) -> Self {
        inviter.to_string()
    }
}

impl TryFrom<String> for Inviter {
    type Error = ParseIntError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == FOUNDER_MARKER {
            Ok(Inviter::Founder)
        } else {
            s.parse().map(Inviter::Member)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_is_a_json_string() {
        let json = serde_json::to_string(&UserId(1234567890123)).unwrap();
        assert_eq!(json, "\"1234567890123\"");
        let back: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UserId(1234567890123));
    }

    #[test]
    fn founder_marker_never_parses_as_user() {
        assert!(FOUNDER_MARKER.parse::<UserId>().is_err());
        let founder: Inviter = serde_json::from_str("\"founder\"").unwrap();
        assert_eq!(founder, Inviter::Founder);
        let member: Inviter = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(member, Inviter::Member(UserId(42)));
    }

    #[test]
    fn mention_markup() {
        assert_eq!(UserId(7).mention(), "<@7>");
    }
}
