//! Unique task identifiers.
//!
//! Mirrors the source's `uid_t`: equality is the only observable property,
//! internals are a `(time, pid, host fingerprint, counter)` tuple.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque identifier for a scheduled task, unique across the process.
///
/// `Uid::default()` is the sentinel "bad" value returned on minting failure;
/// `Uid::create` never returns it on success because `sequence` is always
/// incremented before being stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Uid {
    created_secs: u64,
    pid: u32,
    host_fingerprint: u32,
    sequence: u64,
}

impl Uid {
    /// Mint a new unique id. Failure (host fingerprint unavailable) still
    /// produces a usable id — unlike the source, there is no libc call here
    /// that can fail outright, so this never returns the bad sentinel itself;
    /// callers that need a "no id yet" placeholder use `Uid::default()`.
    pub fn create() -> Self {
        let created_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let pid = std::process::id();
        let host_fingerprint = host_fingerprint();
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed) + 1;

        Self {
            created_secs,
            pid,
            host_fingerprint,
            sequence,
        }
    }

    /// True if this is the sentinel bad id (all fields zero).
    pub fn is_bad(&self) -> bool {
        *self == Self::default()
    }
}

fn host_fingerprint() -> u32 {
    let name = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_default();

    // FNV-1a, good enough for a display-only disambiguator; only equality
    // of the whole `Uid` is ever observed.
    let mut hash: u32 = 0x811c_9dc5;
    for byte in name.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
