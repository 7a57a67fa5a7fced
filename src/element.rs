//! Element model: the drawable objects a room's document is made of.
//!
//! DESIGN
//! ======
//! The sync core reads four fields of an element: `id`, `version`,
//! `versionNonce` and `isDeleted`. Everything else (geometry, style, grouping,
//! bindings) lands in `attributes` and is passed through untouched.
//!
//! Elements are immutable once built and shared as `Arc<Element>`. Two list
//! entries are the same instance when `Arc::ptr_eq` holds; equal values in
//! different allocations are different instances.
//!
//! A remote element may carry an ordering hint on the wire
//! (`__precedingElement__`). The hint lives in `RemoteElement`, never in
//! `Element`, so it cannot leak into a stored list.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stable identifier of an element within a room's document.
pub type ElementId = String;

/// Wire value of `__precedingElement__` meaning "insert at the head".
pub const FIRST_SENTINEL: &str = "^";

// =============================================================================
// ELEMENT
// =============================================================================

/// One drawable object on the shared canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    /// Incremented by the authoring client on every edit.
    #[serde(default)]
    pub version: u64,
    /// Regenerated on every edit; breaks ties between equal versions.
    #[serde(rename = "versionNonce", default)]
    pub version_nonce: i64,
    /// Tombstone flag. Deleted elements stay in the list as ordering anchors.
    #[serde(rename = "isDeleted", default)]
    pub is_deleted: bool,
    /// Opaque payload (geometry, style, bindings).
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Element {
    /// A fresh element at version 1 with a random nonce and no attributes.
    #[must_use]
    pub fn new(id: impl Into<ElementId>) -> Self {
        Self {
            id: id.into(),
            version: 1,
            version_nonce: random_nonce(),
            is_deleted: false,
            attributes: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_nonce(mut self, version_nonce: i64) -> Self {
        self.version_nonce = version_nonce;
        self
    }

    /// The next edit of this element: version + 1 and a fresh nonce.
    #[must_use]
    pub fn bumped(&self) -> Self {
        Self { version: self.version + 1, version_nonce: random_nonce(), ..self.clone() }
    }

    /// Soft-delete: a bumped copy with the tombstone flag set.
    #[must_use]
    pub fn deleted(&self) -> Self {
        Self { is_deleted: true, ..self.bumped() }
    }
}

fn random_nonce() -> i64 {
    rand::rng().random_range(0..i64::from(i32::MAX))
}

// =============================================================================
// ORDERING HINT
// =============================================================================

/// Where a remote element wants to land in the reconciled list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderingHint {
    /// Head of the list.
    First,
    /// Immediately after the element with this id.
    After(ElementId),
}

impl From<String> for OrderingHint {
    fn from(value: String) -> Self {
        if value == FIRST_SENTINEL { Self::First } else { Self::After(value) }
    }
}

impl From<OrderingHint> for String {
    fn from(hint: OrderingHint) -> Self {
        match hint {
            OrderingHint::First => FIRST_SENTINEL.to_owned(),
            OrderingHint::After(id) => id,
        }
    }
}

// =============================================================================
// REMOTE ELEMENT
// =============================================================================

/// An element received from a peer, with its optional ordering hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteElement {
    #[serde(flatten)]
    pub element: Arc<Element>,
    #[serde(rename = "__precedingElement__", default, skip_serializing_if = "Option::is_none")]
    pub preceding: Option<OrderingHint>,
}

impl RemoteElement {
    /// A remote element without an ordering hint.
    #[must_use]
    pub fn new(element: impl Into<Arc<Element>>) -> Self {
        Self { element: element.into(), preceding: None }
    }

    /// A remote element that goes to the head of the list.
    #[must_use]
    pub fn first(element: impl Into<Arc<Element>>) -> Self {
        Self { element: element.into(), preceding: Some(OrderingHint::First) }
    }

    /// A remote element that goes right after `preceding`.
    #[must_use]
    pub fn after(element: impl Into<Arc<Element>>, preceding: impl Into<ElementId>) -> Self {
        Self { element: element.into(), preceding: Some(OrderingHint::After(preceding.into())) }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.element.id
    }
}
