//! Admission: decide which remote elements are allowed into a merge.
//!
//! DESIGN
//! ======
//! `reconcile` is version-agnostic: a remote instance always wins. The server
//! runs this filter first so a stale edit cannot overwrite a newer one.
//!
//! A remote element is discarded when the stored copy is newer:
//! - stored `version` is higher, or
//! - versions tie and the stored `versionNonce` is lower.
//!
//! Equal version and equal nonce is the same edit and is admitted; the merge
//! then keeps whichever instance is already stored.
//!
//! Later entries in a batch are judged against earlier admitted entries, so a
//! batch that repeats an id keeps only its newest copy.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::element::{Element, RemoteElement};

/// Whether `remote` may replace `local` (or be added, when `local` is absent).
#[must_use]
pub fn should_accept(local: Option<&Element>, remote: &Element) -> bool {
    let Some(local) = local else {
        return true;
    };
    if local.version > remote.version {
        return false;
    }
    !(local.version == remote.version && local.version_nonce < remote.version_nonce)
}

/// Filter a remote batch down to the entries that pass `should_accept`.
#[must_use]
pub fn admit(local: &[Arc<Element>], remote: Vec<RemoteElement>) -> Vec<RemoteElement> {
    let mut latest: HashMap<&str, Arc<Element>> = local.iter().map(|el| (el.id.as_str(), Arc::clone(el))).collect();
    let mut admitted: Vec<RemoteElement> = Vec::with_capacity(remote.len());

    for entry in &remote {
        let current = latest.get(entry.id()).map(Arc::as_ref);
        if should_accept(current, &entry.element) {
            latest.insert(entry.id(), Arc::clone(&entry.element));
            admitted.push(entry.clone());
        } else {
            debug!(id = %entry.id(), version = entry.element.version, "admission: discarded stale element");
        }
    }

    admitted
}

#[cfg(test)]
#[path = "admission_test.rs"]
mod tests;
