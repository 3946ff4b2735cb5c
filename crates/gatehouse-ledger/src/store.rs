//! Transactional access to the ledger.

use crate::error::Result;
use crate::ledger::Ledger;
use crate::storage::LedgerBackend;
use tokio::sync::Mutex;

/// Single source of truth for the ledger.
///
/// Every read-modify-write goes through [`LedgerStore::transaction`], which
/// holds one global lock for the whole mutation plus the durable write.
pub struct LedgerStore {
    backend: Box<dyn LedgerBackend>,
    committed: Mutex<Ledger>,
}

impl LedgerStore {
    /// Load the committed ledger from `backend`.
    pub fn open(backend: impl LedgerBackend + 'static) -> Result<Self> {
        let ledger = backend.load()?;
        tracing::info!(
            tracked = ledger.invited_by.len(),
            quotas = ledger.invites.len(),
            "Ledger loaded"
        );
        Ok(Self {
            backend: Box::new(backend),
            committed: Mutex::new(ledger),
        })
    }

    /// Run `f` against a private draft of the ledger and commit it.
    ///
    /// If `f` fails, nothing is written. If the backend fails to save, the
    /// committed state stays as it was before the call. A draft identical to
    /// the committed state is not written.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Ledger) -> Result<T>,
    {
        let mut committed = self.committed.lock().await;
        let mut draft = committed.clone();
        let out = f(&mut draft)?;

        if draft != *committed {
            if let Err(e) = self.backend.save(&draft) {
                tracing::error!("Ledger commit failed, transaction discarded: {}", e);
                return Err(e);
            }
            *committed = draft;
        }

        Ok(out)
    }

    /// Copy of the committed ledger.
    pub async fn snapshot(&self) -> Ledger {
        self.committed.lock().await.clone()
    }
}
