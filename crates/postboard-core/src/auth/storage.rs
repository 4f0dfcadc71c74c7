//! Durable client-local storage for the serialized session.
//!
//! The store holds exactly one named entry. Backends only move strings;
//! parsing and validation belong to the session store.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;

/// Session file name in the data directory
pub const SESSION_FILE: &str = "session.json";

/// Keychain service name
const SERVICE_NAME: &str = "postboard";

/// Keychain entry holding the serialized session
const KEYRING_ENTRY: &str = "session";

/// Persistence boundary for the session store.
pub trait SessionStorage: Send + Sync {
    /// Read the stored entry, `None` when nothing has been written.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored entry.
    fn save(&self, contents: &str) -> Result<()>;

    /// Delete the stored entry. Removing a missing entry is not an error.
    fn remove(&self) -> Result<()>;
}

/// JSON file in the application data directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

impl SessionStorage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        Ok(Some(contents))
    }

    fn save(&self, contents: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create data directory")?;
        std::fs::write(self.path(), contents).context("Failed to write session file")?;
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        let path = self.path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }
}

/// OS keychain entry, for machines where a plaintext token on disk is unwanted.
pub struct KeyringStorage {
    service: String,
    entry: String,
}

impl KeyringStorage {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
            entry: KEYRING_ENTRY.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.entry).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStorage for KeyringStorage {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(contents) => Ok(Some(contents)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session from keychain"),
        }
    }

    fn save(&self, contents: &str) -> Result<()> {
        self.entry()?
            .set_password(contents)
            .context("Failed to store session in keychain")
    }

    fn remove(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}

/// In-process storage. Nothing survives the process; writes can be made to fail.
#[derive(Default)]
pub struct MemoryStorage {
    entry: Mutex<Option<String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            entry: Mutex::new(Some(contents.into())),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `save`/`remove` return an error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current raw entry.
    pub fn contents(&self) -> Option<String> {
        self.entry.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("storage is read-only");
        }
        Ok(())
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        let entry = self
            .entry
            .lock()
            .map_err(|_| anyhow::anyhow!("session storage lock poisoned"))?;
        Ok(entry.clone())
    }

    fn save(&self, contents: &str) -> Result<()> {
        self.check_writable()?;
        let mut entry = self
            .entry
            .lock()
            .map_err(|_| anyhow::anyhow!("session storage lock poisoned"))?;
        *entry = Some(contents.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        self.check_writable()?;
        let mut entry = self
            .entry
            .lock()
            .map_err(|_| anyhow::anyhow!("session storage lock poisoned"))?;
        *entry = None;
        Ok(())
    }
}
