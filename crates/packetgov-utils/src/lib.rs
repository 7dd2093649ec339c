//! Shared infrastructure for the packetgov kernel.
//!
//! Everything that hashes, locks, or writes files goes through this crate so
//! the integrity rules live in exactly one place: JCS canonical JSON with
//! SHA-256 hashing, advisory sidecar file locks, and temp-file-plus-rename
//! atomic writes.

pub mod atomic_write;
pub mod canon;
pub mod lock;
pub mod logging;
pub mod paths;

pub use atomic_write::{atomic_write_json, atomic_write_json_locked};
pub use canon::{CanonError, canon, canon_value, now_utc, sha256_hex, sha256_hex_bytes};
pub use lock::{FileLock, LockError, LockOptions};
