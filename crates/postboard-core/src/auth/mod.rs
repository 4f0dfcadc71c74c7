//! Authentication state for the running client.
//!
//! This module provides:
//! - `SessionStore`: the single shared session, with login/logout/restore
//!   and change subscription
//! - `SessionStorage`: the persistence boundary, with file, keychain and
//!   in-memory backends
//!
//! The session is written through to storage on every change and restored
//! once at startup.

pub mod session;
pub mod storage;

pub use session::{RestoreOutcome, Session, SessionData, SessionStore};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, SessionStorage};
