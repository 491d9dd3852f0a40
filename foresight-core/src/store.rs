//! Ledger snapshot persistence.
//!
//! Snapshots are JSON. A save writes a temporary file next to the target and
//! renames it over the old snapshot, so readers see either the previous or
//! the new ledger, never a partial one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{error::Result, ledger::Ledger, LedgerError};

#[derive(Clone, Debug)]
pub struct LedgerStore {
    path: PathBuf,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the snapshot, finishing any settlement a crash left incomplete.
    pub fn load(&self) -> Result<Ledger> {
        let raw = fs::read_to_string(&self.path)?;
        let mut ledger: Ledger = serde_json::from_str(&raw)?;
        debug!(path = %self.path.display(), events = ledger.registry().len(), "snapshot loaded");

        let loaded_len = ledger.journal().len();
        let recovered = ledger.recover_settlements()?;
        if !recovered.is_empty() {
            info!(events = recovered.len(), "recovered interrupted settlements");
            self.commit(&ledger, loaded_len)?;
        }
        Ok(ledger)
    }

    /// Replace the snapshot with `ledger`, which was loaded when the journal
    /// held `loaded_len` entries.
    ///
    /// Fails with [`LedgerError::StaleSnapshot`] if another writer committed
    /// in between. The journal only grows, so its length identifies the
    /// snapshot a ledger was derived from.
    pub fn commit(&self, ledger: &Ledger, loaded_len: usize) -> Result<()> {
        if self.exists() {
            let on_disk = self.journal_len()?;
            if on_disk != loaded_len {
                warn!(loaded = loaded_len, on_disk, "refusing to overwrite newer snapshot");
                return Err(LedgerError::StaleSnapshot {
                    loaded: loaded_len,
                    on_disk,
                });
            }
        }
        self.save(ledger)
    }

    fn journal_len(&self) -> Result<usize> {
        let raw = fs::read_to_string(&self.path)?;
        let ledger: Ledger = serde_json::from_str(&raw)?;
        Ok(ledger.journal().len())
    }

    /// Atomically replace the snapshot without checking what is on disk.
    pub fn save(&self, ledger: &Ledger) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, ledger)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| LedgerError::Io(e.error))?;

        debug!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }
}
