//! In-flight request registry keyed by `signal[METHOD](url)`.
//!
//! # Design
//! At most one live exchange exists per key. Acquiring a key that is already
//! held cancels the previous holder's token before handing out a fresh one,
//! so the older call settles as aborted and the newer one proceeds.
//!
//! Each slot remembers which handle currently owns it. [`Registry::release`]
//! only removes the slot when called with the owning handle: a preempted
//! exchange that finishes late can never evict its successor.
//!
//! The lock is a `parking_lot::Mutex` held only for map operations, never
//! across an await point.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use log::debug;
use parking_lot::Mutex;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

use crate::http::HttpMethod;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(signal: &str, method: HttpMethod, url: &str) -> Self {
        Self(format!("{signal}[{}]({url})", method.as_upper()))
    }

    /// The cancellation group: everything before the first `[`.
    pub fn group(&self) -> &str {
        self.0.split('[').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Abort handle for one exchange.
#[derive(Debug, Clone)]
pub struct Handle {
    id: Uuid,
    key: RequestKey,
    token: CancellationToken,
}

impl Handle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn key(&self) -> &RequestKey {
        &self.key
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Abort this exchange only. No-op once it has settled.
    pub fn abort(&self) {
        self.token.cancel();
    }

    pub(crate) fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

#[derive(Debug)]
struct Slot {
    holder: Uuid,
    token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct Registry {
    slots: Mutex<HashMap<RequestKey, Slot>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new exchange under `key`, aborting any exchange that
    /// already holds it.
    pub fn acquire(&self, key: RequestKey) -> Handle {
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        let mut slots = self.slots.lock();
        match slots.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                debug!("preempting in-flight request {key}");
                let slot = entry.get_mut();
                slot.token.cancel();
                slot.holder = id;
                slot.token = token.clone();
            }
            Entry::Vacant(entry) => {
                entry.insert(Slot {
                    holder: id,
                    token: token.clone(),
                });
            }
        }
        Handle { id, key, token }
    }

    /// Drop the slot for `handle` if it still owns it.
    pub fn release(&self, handle: &Handle) -> bool {
        let mut slots = self.slots.lock();
        match slots.get(&handle.key) {
            Some(slot) if slot.holder == handle.id => {
                slots.remove(&handle.key);
                true
            }
            _ => false,
        }
    }

    /// Abort every in-flight exchange in `signal`'s group, or all of them when
    /// `signal` is `None` or empty. Returns how many were aborted.
    pub fn cancel(&self, signal: Option<&str>) -> usize {
        let signal = signal.filter(|s| !s.is_empty());
        let slots = self.slots.lock();
        let mut aborted = 0;
        for (key, slot) in slots.iter() {
            if signal.is_some_and(|group| key.group() != group) {
                continue;
            }
            if !slot.token.is_cancelled() {
                slot.token.cancel();
                aborted += 1;
            }
        }
        debug!("cancelled {aborted} request(s) in group {:?}", signal.unwrap_or("*"));
        aborted
    }

    pub fn contains(&self, key: &RequestKey) -> bool {
        self.slots.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }
}
