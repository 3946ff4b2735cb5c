//! Durable backends for the ledger.

use crate::error::{Error, Result};
use crate::ledger::{InviteQuota, InviterOf, Ledger};
use rocksdb::{Options, WriteBatch, DB};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

const INVITES_KEY: &[u8] = b"invites";
const INVITED_BY_KEY: &[u8] = b"invited_by";

/// Somewhere the two ledger mappings live between restarts.
///
/// `save` must commit both mappings together or not at all.
pub trait LedgerBackend: Send + Sync {
    fn load(&self) -> Result<Ledger>;
    fn save(&self, ledger: &Ledger) -> Result<()>;
}

/// RocksDB-backed ledger.
///
/// Holds exactly two keys, `invites` and `invited_by`, each a JSON object
/// keyed by user id.
pub struct RocksBackend {
    db: DB,
}

impl RocksBackend {
    /// Open or create the database, creating empty mappings if either is missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        let backend = Self { db };
        backend.init()?;
        Ok(backend)
    }

    fn init(&self) -> Result<()> {
        let has_invites = self.db.get(INVITES_KEY)?.is_some();
        let has_invited_by = self.db.get(INVITED_BY_KEY)?.is_some();
        if has_invites && has_invited_by {
            return Ok(());
        }

        let mut batch = WriteBatch::default();
        if !has_invites {
            batch.put(INVITES_KEY, serde_json::to_vec(&InviteQuota::new())?);
        }
        if !has_invited_by {
            batch.put(INVITED_BY_KEY, serde_json::to_vec(&InviterOf::new())?);
        }
        self.db.write(batch)?;
        tracing::info!("Initialized empty ledger mappings");
        Ok(())
    }
}

impl LedgerBackend for RocksBackend {
    fn load(&self) -> Result<Ledger> {
        let invites = match self.db.get(INVITES_KEY)? {
            Some(data) => serde_json::from_slice(&data)?,
            None => InviteQuota::new(),
        };
        let invited_by = match self.db.get(INVITED_BY_KEY)? {
            Some(data) => serde_json::from_slice(&data)?,
            None => InviterOf::new(),
        };
        Ok(Ledger { invites, invited_by })
    }

    fn save(&self, ledger: &Ledger) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.put(INVITES_KEY, serde_json::to_vec(&ledger.invites)?);
        batch.put(INVITED_BY_KEY, serde_json::to_vec(&ledger.invited_by)?);
        self.db.write(batch)?;
        Ok(())
    }
}

/// Process-local backend for tests and local development.
#[derive(Default)]
pub struct MemoryBackend {
    saved: Mutex<Ledger>,
    fail_saves: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing ledger.
    pub fn with_ledger(ledger: Ledger) -> Self {
        Self {
            saved: Mutex::new(ledger),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `save` fail until switched back.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// What was last durably saved.
    pub fn saved(&self) -> Ledger {
        self.saved
            .lock()
            .map(|ledger| ledger.clone())
            .unwrap_or_default()
    }
}

impl LedgerBackend for MemoryBackend {
    fn load(&self) -> Result<Ledger> {
        let saved = self
            .saved
            .lock()
            .map_err(|_| Error::Persistence("memory backend poisoned".into()))?;
        Ok(saved.clone())
    }

    fn save(&self, ledger: &Ledger) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Persistence("injected save failure".into()));
        }
        let mut saved = self
            .saved
            .lock()
            .map_err(|_| Error::Persistence("memory backend poisoned".into()))?;
        *saved = ledger.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{Inviter, UserId};
    use tempfile::tempdir;

    #[test]
    fn fresh_database_has_empty_mappings() {
        let dir = tempdir().unwrap();
        let backend = RocksBackend::open(dir.path()).unwrap();
        assert_eq!(backend.load().unwrap(), Ledger::new());
    }

    #[test]
    fn ledger_survives_reopen() {
        let dir = tempdir().unwrap();
        let mut ledger = Ledger::new();
        ledger.ensure_founder(UserId(10));
        ledger.record_invite(UserId(10), UserId(11));
        ledger.add_quota(UserId(12), 4);

        {
            let backend = RocksBackend::open(dir.path()).unwrap();
            backend.save(&ledger).unwrap();
        }

        let backend = RocksBackend::open(dir.path()).unwrap();
        let loaded = backend.load().unwrap();
        assert_eq!(loaded, ledger);
        assert_eq!(loaded.inviter(UserId(11)), Some(Inviter::Member(UserId(10))));
    }

    #[test]
    fn missing_mapping_is_recreated() {
        let dir = tempdir().unwrap();
        {
            let mut opts = Options::default();
            opts.create_if_missing(true);
            let db = DB::open(&opts, dir.path()).unwrap();
            db.put(INVITES_KEY, br#"{"5":3}"#).unwrap();
        }

        let backend = RocksBackend::open(dir.path()).unwrap();
        let loaded = backend.load().unwrap();
        assert_eq!(loaded.quota(UserId(5)), 3);
        assert!(loaded.invited_by.is_empty());
    }

    #[test]
    fn memory_backend_injected_failure() {
        let backend = MemoryBackend::new();
        backend.fail_saves(true);
        assert!(matches!(
            backend.save(&Ledger::new()),
            Err(Error::Persistence(_))
        ));
        backend.fail_saves(false);
        assert!(backend.save(&Ledger::new()).is_ok());
    }
}
