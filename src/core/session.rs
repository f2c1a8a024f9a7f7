//! Ordered record collection with a single selection.
//!
//! Insertion order is export order. `selected`, when set, always names a
//! record currently in `records`.

use std::sync::Arc;
use tracing::debug;

use crate::core::{
    ConversionRecord, ConversionSummary, EncodedResult, HandleRegistry, ObjectHandle, PixelBuffer,
    RecordId, SourceImage,
};
use crate::utils::{ConverterError, ConverterResult};

#[derive(Debug, Default)]
pub struct Session {
    records: Vec<ConversionRecord>,
    selected: Option<RecordId>,
    next_seq: u64,
    handles: HandleRegistry,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ConversionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: RecordId) -> Option<&ConversionRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    fn get_mut(&mut self, id: RecordId) -> Option<&mut ConversionRecord> {
        self.records.iter_mut().find(|r| r.id() == id)
    }

    pub fn selected_id(&self) -> Option<RecordId> {
        self.selected
    }

    /// Appends a freshly encoded record. The first record of an empty session
    /// becomes the selection.
    pub fn add(
        &mut self,
        source: SourceImage,
        committed: EncodedResult,
        cached: Option<Arc<PixelBuffer>>,
    ) -> RecordId {
        self.next_seq += 1;
        let id = RecordId::new(self.next_seq);
        debug!("Appending record {} for '{}'", id, source.name());
        self.records.push(ConversionRecord::new(id, source, committed, cached));

        if self.records.len() == 1 {
            self.selected = Some(id);
        }
        id
    }

    /// Selects `id`. Unknown ids leave the selection untouched and return `false`.
    pub fn select(&mut self, id: RecordId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.selected = Some(id);
        true
    }

    /// Removes `id`, revoking its handles. Removing the selection moves it to
    /// the first remaining record. Unknown ids are a no-op.
    pub fn remove(&mut self, id: RecordId) -> Option<ConversionRecord> {
        let idx = self.records.iter().position(|r| r.id() == id)?;
        let removed = self.records.remove(idx);
        self.handles.revoke_owner(id);

        if self.selected == Some(id) {
            self.selected = self.records.first().map(|r| r.id());
        }
        debug!("Removed record {} ('{}')", id, removed.name());
        Some(removed)
    }

    /// Replaces the committed encoding of `id`, revoking handles to the old
    /// bytes. Returns the previous result.
    pub fn commit(&mut self, id: RecordId, result: EncodedResult) -> ConverterResult<EncodedResult> {
        let record = self
            .get_mut(id)
            .ok_or_else(|| ConverterError::not_found(id.to_string()))?;
        let previous = record.replace_committed(result);
        self.handles.revoke_owner(id);
        Ok(previous)
    }

    /// Owned copy of the record sequence; shares byte buffers with the session.
    pub fn snapshot(&self) -> Vec<ConversionRecord> {
        self.records.clone()
    }

    pub fn summaries(&self) -> Vec<ConversionSummary> {
        self.records
            .iter()
            .map(|r| r.summary(self.selected == Some(r.id())))
            .collect()
    }

    pub fn issue_handle(&mut self, id: RecordId) -> ConverterResult<ObjectHandle> {
        let bytes = self
            .get(id)
            .map(|r| r.committed().shared_bytes())
            .ok_or_else(|| ConverterError::not_found(id.to_string()))?;
        Ok(self.handles.issue(id, bytes))
    }

    pub fn resolve_handle(&self, handle: ObjectHandle) -> Option<Arc<[u8]>> {
        self.handles.resolve(handle)
    }

    pub fn revoke_handle(&mut self, handle: ObjectHandle) -> bool {
        self.handles.revoke(handle)
    }

    pub fn live_handles(&self) -> usize {
        self.handles.live_count()
    }

    /// Drops every record and handle.
    pub fn clear(&mut self) {
        let revoked = self.handles.clear();
        debug!("Clearing {} record(s), {} handle(s)", self.records.len(), revoked);
        self.records.clear();
        self.selected = None;
    }
}
