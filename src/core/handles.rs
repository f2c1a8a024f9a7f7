//! Object handles exposing committed bytes to a collaborator (e.g. a preview pane).
//!
//! A handle stays resolvable until the owning record's encoding is replaced or
//! the record is removed; the session revokes it inside that same mutation.

use std::collections::HashMap;
use std::sync::Arc;
use serde::Serialize;
use tracing::debug;

use crate::core::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectHandle(u64);

#[derive(Debug, Default)]
pub struct HandleRegistry {
    next: u64,
    live: HashMap<ObjectHandle, (RecordId, Arc<[u8]>)>,
}

impl HandleRegistry {
    pub fn issue(&mut self, owner: RecordId, bytes: Arc<[u8]>) -> ObjectHandle {
        self.next += 1;
        let handle = ObjectHandle(self.next);
        self.live.insert(handle, (owner, bytes));
        handle
    }

    pub fn resolve(&self, handle: ObjectHandle) -> Option<Arc<[u8]>> {
        self.live.get(&handle).map(|(_, bytes)| Arc::clone(bytes))
    }

    pub fn revoke(&mut self, handle: ObjectHandle) -> bool {
        self.live.remove(&handle).is_some()
    }

    /// Revokes every handle issued for `owner`; returns how many were live.
    pub fn revoke_owner(&mut self, owner: RecordId) -> usize {
        let before = self.live.len();
        self.live.retain(|_, (id, _)| *id != owner);
        let revoked = before - self.live.len();
        if revoked > 0 {
            debug!("Revoked {} handle(s) for record {}", revoked, owner);
        }
        revoked
    }

    pub fn clear(&mut self) -> usize {
        let revoked = self.live.len();
        self.live.clear();
        revoked
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
