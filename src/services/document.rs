//! Document store: the authoritative element list of every live room.
//!
//! DESIGN
//! ======
//! The outer map is a `tokio::sync::RwLock`, touched only to find or create a
//! room's document. Each document sits behind its own `std::sync::Mutex`.
//! Admission and reconciliation run with no `.await` in between, so merges
//! are serialized per room while other rooms proceed in parallel.
//!
//! Documents are created on first write and evicted when their room empties.
//! Eviction re-checks emptiness under the map's write lock, so a session that
//! joined after the last one left keeps its document.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::element::{Element, RemoteElement};
use crate::payload::RoomId;
use crate::reconcile::reconcile;
use crate::services::admission;

/// Element list of one room.
#[derive(Debug, Default)]
pub struct Document {
    elements: Vec<Arc<Element>>,
}

/// Result of one merge.
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// The room's list after the merge.
    pub elements: Vec<Arc<Element>>,
    /// Entries in the submitted batch.
    pub submitted: usize,
    /// Entries that passed admission.
    pub accepted: usize,
}

#[derive(Clone, Default)]
pub struct DocumentStore {
    docs: Arc<RwLock<HashMap<RoomId, Arc<Mutex<Document>>>>>,
}

impl DocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit and reconcile a remote batch into a room's list.
    pub async fn apply(&self, room_id: &str, batch: Vec<RemoteElement>) -> ApplyOutcome {
        let document = self.document(room_id).await;
        let mut document = document.lock().unwrap_or_else(PoisonError::into_inner);

        let submitted = batch.len();
        let admitted = admission::admit(&document.elements, batch);
        let accepted = admitted.len();
        document.elements = reconcile(&document.elements, admitted);

        info!(%room_id, submitted, accepted, count = document.elements.len(), "document: applied batch");
        ApplyOutcome { elements: document.elements.clone(), submitted, accepted }
    }

    /// Current list of a room. Empty for an unknown room.
    pub async fn snapshot(&self, room_id: &str) -> Vec<Arc<Element>> {
        let docs = self.docs.read().await;
        docs.get(room_id)
            .map(|document| {
                document
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .elements
                    .clone()
            })
            .unwrap_or_default()
    }

    /// Drop a room's document if `abandoned` still holds once the map is
    /// write-locked. Returns whether a document was removed.
    pub async fn evict_if(&self, room_id: &str, abandoned: impl FnOnce() -> bool) -> bool {
        let mut docs = self.docs.write().await;
        if !abandoned() {
            debug!(%room_id, "document: eviction skipped, room has members");
            return false;
        }
        let removed = docs.remove(room_id).is_some();
        if removed {
            info!(%room_id, "document: evicted");
        }
        removed
    }

    pub async fn room_count(&self) -> usize {
        self.docs.read().await.len()
    }

    async fn document(&self, room_id: &str) -> Arc<Mutex<Document>> {
        if let Some(document) = self.docs.read().await.get(room_id) {
            return Arc::clone(document);
        }
        let mut docs = self.docs.write().await;
        let document = docs.entry(room_id.to_owned()).or_insert_with(|| {
            debug!(%room_id, "document: created");
            Arc::default()
        });
        Arc::clone(document)
    }
}

#[cfg(test)]
#[path = "document_test.rs"]
mod tests;
