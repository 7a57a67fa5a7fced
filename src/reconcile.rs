//! Reconciliation: fold a remote batch of element edits into a room's list.
//!
//! ALGORITHM
//! =========
//! One pass over the remote batch, in batch order, against a working copy of
//! the local list. `index` maps every live id to its current slot, so an
//! ordering hint always resolves against positions already shifted by the
//! insertions made earlier in the same pass.
//!
//! For each remote element:
//! - same id, same instance (`Arc::ptr_eq`) → skip, nothing changed;
//! - same id, different instance → the existing slot is superseded;
//! - `First` hint → insert at the head;
//! - `After(p)` hint with `p` live → insert right after `p`;
//! - no hint, known id → replace in place;
//! - otherwise → append.
//!
//! Superseded slots are dropped at the end, so the output holds each id once.
//!
//! NON-GOALS
//! =========
//! `version` and `versionNonce` are not consulted here. Deciding whether a
//! remote edit is admitted at all happens before this call
//! (see `services::admission`). Tombstones are kept like any other element;
//! they still anchor hints from other elements.

use std::collections::HashMap;
use std::sync::Arc;

use crate::element::{Element, ElementId, OrderingHint, RemoteElement};

// =============================================================================
// WORKING LIST
// =============================================================================

struct Slot {
    element: Arc<Element>,
    superseded: bool,
}

impl Slot {
    fn live(element: Arc<Element>) -> Self {
        Self { element, superseded: false }
    }
}

struct WorkingList {
    slots: Vec<Slot>,
    /// Live id → current slot position. Superseded slots are never indexed.
    index: HashMap<ElementId, usize>,
}

impl WorkingList {
    fn from_local(local: &[Arc<Element>]) -> Self {
        let mut list = Self { slots: Vec::with_capacity(local.len()), index: HashMap::with_capacity(local.len()) };
        for element in local {
            // A repeated id in the input keeps only its last occurrence.
            if let Some(&previous) = list.index.get(&element.id) {
                list.slots[previous].superseded = true;
            }
            list.index.insert(element.id.clone(), list.slots.len());
            list.slots.push(Slot::live(Arc::clone(element)));
        }
        list
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn is_same_instance(&self, pos: usize, element: &Arc<Element>) -> bool {
        Arc::ptr_eq(&self.slots[pos].element, element)
    }

    fn supersede(&mut self, pos: usize) {
        self.slots[pos].superseded = true;
    }

    fn insert(&mut self, at: usize, element: Arc<Element>) {
        self.index.insert(element.id.clone(), at);
        self.slots.insert(at, Slot::live(element));

        for pos in at + 1..self.slots.len() {
            let slot = &self.slots[pos];
            if slot.superseded {
                continue;
            }
            if let Some(indexed) = self.index.get_mut(&slot.element.id) {
                *indexed = pos;
            }
        }
    }

    fn replace(&mut self, pos: usize, element: Arc<Element>) {
        self.slots[pos] = Slot::live(element);
    }

    fn push(&mut self, element: Arc<Element>) {
        self.index.insert(element.id.clone(), self.slots.len());
        self.slots.push(Slot::live(element));
    }

    fn into_elements(self) -> Vec<Arc<Element>> {
        self.slots
            .into_iter()
            .filter(|slot| !slot.superseded)
            .map(|slot| slot.element)
            .collect()
    }
}

// =============================================================================
// RECONCILE
// =============================================================================

/// Merge `remote` into `local` and return the next canonical list.
///
/// `local` is left untouched. The result contains every id of `local` and
/// `remote` exactly once; remote instances win over local ones with the same
/// id. Unresolvable hints fall back to appending.
#[must_use]
pub fn reconcile(local: &[Arc<Element>], remote: Vec<RemoteElement>) -> Vec<Arc<Element>> {
    let mut working = WorkingList::from_local(local);

    for RemoteElement { element, preceding } in remote {
        let existing = working.position(&element.id);
        if existing.is_some_and(|pos| working.is_same_instance(pos, &element)) {
            continue;
        }

        match preceding {
            Some(OrderingHint::First) => {
                if let Some(pos) = existing {
                    working.supersede(pos);
                }
                working.insert(0, element);
            }
            Some(OrderingHint::After(parent)) => {
                // Resolve before superseding: a self-referencing hint anchors
                // on the slot being replaced.
                let anchor = working.position(&parent);
                if let Some(pos) = existing {
                    working.supersede(pos);
                }
                match anchor {
                    Some(pos) => working.insert(pos + 1, element),
                    None => working.push(element),
                }
            }
            None => match existing {
                Some(pos) => working.replace(pos, element),
                None => working.push(element),
            },
        }
    }

    working.into_elements()
}

#[cfg(test)]
#[path = "reconcile_test.rs"]
mod tests;
