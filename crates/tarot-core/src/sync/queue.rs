//! Ordering for background remote saves.
//!
//! Every patch replaces whole top-level fields, so only the newest patch per
//! user and field matters. Saves hold one writer lock while talking to the
//! remote store, and a save whose fields have all been re-queued since it was
//! enqueued is skipped instead of overwriting the newer value.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::DocumentPatch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PatchField {
    Favorites,
    Notes,
    Spreads,
}

fn patch_fields(patch: &DocumentPatch) -> Vec<PatchField> {
    let mut fields = Vec::with_capacity(3);
    if patch.favorites.is_some() {
        fields.push(PatchField::Favorites);
    }
    if patch.notes.is_some() {
        fields.push(PatchField::Notes);
    }
    if patch.spreads.is_some() {
        fields.push(PatchField::Spreads);
    }
    fields
}

/// A save waiting for its turn at the remote store
#[derive(Debug)]
pub(super) struct PendingSave {
    pub uid: String,
    pub patch: DocumentPatch,
    ticket: u64,
}

#[derive(Default)]
struct Tickets {
    next: u64,
    latest: HashMap<(String, PatchField), u64>,
}

#[derive(Default)]
pub(super) struct SaveQueue {
    writer: tokio::sync::Mutex<()>,
    tickets: Mutex<Tickets>,
}

impl SaveQueue {
    /// Register a save. Must be called in the same order the state changed.
    pub fn enqueue(&self, uid: String, patch: DocumentPatch) -> PendingSave {
        let ticket = match self.tickets.lock() {
            Ok(mut tickets) => {
                tickets.next += 1;
                let ticket = tickets.next;
                for field in patch_fields(&patch) {
                    tickets.latest.insert((uid.clone(), field), ticket);
                }
                ticket
            }
            Err(_) => 0,
        };
        PendingSave { uid, patch, ticket }
    }

    /// Whether every field of `save` was queued again after it
    fn is_superseded(&self, save: &PendingSave) -> bool {
        let Ok(tickets) = self.tickets.lock() else {
            return false;
        };
        patch_fields(&save.patch).into_iter().all(|field| {
            tickets
                .latest
                .get(&(save.uid.clone(), field))
                .is_some_and(|latest| *latest > save.ticket)
        })
    }

    /// Run `write` for `save` unless a newer save made it obsolete.
    ///
    /// Returns `None` when the save was skipped.
    pub async fn run<F, Fut, T>(&self, save: &PendingSave, write: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let _writer = self.writer.lock().await;
        if self.is_superseded(save) {
            return None;
        }
        Some(write().await)
    }
}
