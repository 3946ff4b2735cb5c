//! Gatehouse Ledger - invite quotas for a whitelisted community
//!
//! Members holding the whitelist role may pass it on to others, spending one
//! invite each time. The ledger records how many invites each user has left
//! and who invited whom; whitelisted users with no recorded inviter are
//! founders.
//!
//! # Architecture
//!
//! - **Ledger**: the `invites` and `invited_by` mappings and their rules
//! - **Storage**: RocksDB and in-memory backends
//! - **Store**: serialized transactions over the committed ledger
//! - **Platform**: role checks, role grants and member listing
//! - **Service**: profile evaluation, invite redemption, quota grants
//!
//! # Example
//!
//! ```no_run
//! use gatehouse_ledger::{
//!     LedgerStore, LocalGuild, RocksBackend, RoleId, UserId, WhitelistService,
//!     WhitelistSettings,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(LedgerStore::open(RocksBackend::open("./gatehouse-data")?)?);
//!     let guild = Arc::new(LocalGuild::new());
//!     guild.add_member(UserId(42), &[RoleId(1)]);
//!     let service = WhitelistService::new(WhitelistSettings::new(RoleId(1)), store, guild);
//!     let profile = service.evaluate_profile(UserId(42)).await?;
//!     println!("{} invites left", profile.invites_left);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod grant;
pub mod ids;
pub mod ledger;
pub mod platform;
pub mod profile;
pub mod redeem;
pub mod service;
pub mod storage;
pub mod store;

pub use error::{Error, Result};
pub use grant::{GrantOutcome, GrantTarget};
pub use ids::{Inviter, RoleId, UserId, FOUNDER_MARKER};
pub use ledger::{Ledger, FOUNDER_QUOTA};
pub use platform::{
    AccountKind, LocalGuild, MemberEnumerator, Platform, PlatformError, RoleChecker, RoleGranter,
};
pub use profile::Profile;
pub use redeem::Redemption;
pub use service::{WhitelistService, WhitelistSettings};
pub use storage::{LedgerBackend, MemoryBackend, RocksBackend};
pub use store::LedgerStore;
