//! Sync engine: owns favorites, notes and spreads for the current identity.
//!
//! Mutations update the in-memory state synchronously and then persist:
//! favorites and notes are written through to the local store, and every
//! collection is saved to the remote store in a background task when the
//! engine is `Ready` and signed in. Remote failures are logged and dropped.
//! Remote saves run one at a time, and a save made obsolete by a newer one for
//! the same field is skipped.
//!
//! Identity transitions happen in two steps. [`SyncEngine::begin_transition`]
//! bumps a generation counter and enters `Loading`; the async
//! [`SyncEngine::complete_transition`] loads the new state and applies it only
//! if no later transition has begun in the meantime.

mod queue;
mod state;

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::local::{LocalCache, SharedLocalStore};
use crate::models::{
    sort_by_updated_desc, CardId, DocumentPatch, FavoriteSet, Identity, NoteMap, SpreadId,
    SpreadRecord, UserDocument,
};
use crate::remote::SharedRemoteStore;
use crate::session::IdentityEvents;

use queue::{PendingSave, SaveQueue};
pub use state::{SyncPhase, SyncState};

/// What a freshly created remote document starts with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NewDocumentSeed {
    /// The in-memory collections at the moment of sign-in, when they are
    /// pre-login data. A switch between two accounts always starts empty.
    #[default]
    SessionState,
    /// Empty collections
    Empty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    pub new_document_seed: NewDocumentSeed,
}

/// A begun identity transition waiting for its load to complete
#[derive(Debug, Clone)]
pub struct Transition {
    generation: u64,
    identity: Identity,
    /// Pre-login collections, absent when switching from another account
    seed: Option<UserDocument>,
}

impl Transition {
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Collections adopted when a transition completes
struct Loaded {
    favorites: FavoriteSet,
    notes: NoteMap,
    spreads: Vec<SpreadRecord>,
    mirror_locally: bool,
}

impl Loaded {
    fn empty() -> Self {
        Self {
            favorites: FavoriteSet::new(),
            notes: NoteMap::new(),
            spreads: Vec::new(),
            mirror_locally: false,
        }
    }
}

struct Inner {
    state: watch::Sender<SyncState>,
    local: LocalCache,
    remote: SharedRemoteStore,
    options: SyncOptions,
    saves: Arc<SaveQueue>,
    tails: Mutex<JoinSet<()>>,
}

/// Cheaply cloneable handle to the engine
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

impl SyncEngine {
    pub fn new(local: SharedLocalStore, remote: SharedRemoteStore) -> Self {
        Self::with_options(local, remote, SyncOptions::default())
    }

    pub fn with_options(
        local: SharedLocalStore,
        remote: SharedRemoteStore,
        options: SyncOptions,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self {
            inner: Arc::new(Inner {
                state,
                local: LocalCache::new(local),
                remote,
                options,
                saves: Arc::new(SaveQueue::default()),
                tails: Mutex::new(JoinSet::new()),
            }),
        }
    }

    /// Consume identity transitions until the session stream closes.
    ///
    /// Transitions begin strictly in arrival order; their loads run
    /// concurrently and superseded ones are discarded on completion.
    pub async fn run(self, mut events: IdentityEvents) {
        let mut loads = JoinSet::new();
        loop {
            tokio::select! {
                event = events.next() => {
                    let Some(identity) = event else { break };
                    let transition = self.begin_transition(identity);
                    let engine = self.clone();
                    loads.spawn(async move { engine.complete_transition(transition).await });
                }
                Some(result) = loads.join_next(), if !loads.is_empty() => {
                    if let Err(error) = result {
                        tracing::error!("Identity transition task failed: {}", error);
                    }
                }
            }
        }

        while let Some(result) = loads.join_next().await {
            if let Err(error) = result {
                tracing::error!("Identity transition task failed: {}", error);
            }
        }
        tracing::debug!("Session stream closed; sync engine loop stopped");
    }

    /// Begin and complete a transition in one call
    pub async fn apply_identity(&self, identity: Identity) {
        let transition = self.begin_transition(identity);
        self.complete_transition(transition).await;
    }

    /// Enter `Loading` for `identity` and invalidate any in-flight load
    pub fn begin_transition(&self, identity: Identity) -> Transition {
        let mut generation = 0;
        let mut seed = None;
        self.inner.state.send_modify(|state| {
            generation = state.next_generation();
            state.phase = SyncPhase::Loading;
            state.identity = identity.clone();
            if state.holds_signed_out_data() {
                seed = Some(UserDocument::seeded(
                    state.favorites.clone(),
                    state.notes.clone(),
                    state.spreads.clone(),
                ));
            }
        });
        tracing::info!("Loading state for {} (generation {})", identity, generation);

        Transition {
            generation,
            identity,
            seed,
        }
    }

    /// Load the state for a begun transition and enter `Ready`.
    ///
    /// Returns `false` when a newer transition superseded this one; nothing is
    /// applied in that case.
    pub async fn complete_transition(&self, transition: Transition) -> bool {
        let loaded = match transition.identity.uid() {
            Some(uid) => self.load_signed_in(uid, &transition).await,
            None => Loaded::empty(),
        };
        let local = &self.inner.local;
        let applied = self.inner.state.send_if_modified(|state| {
            if state.generation() != transition.generation {
                return false;
            }
            if loaded.mirror_locally {
                local.write_favorites(&loaded.favorites);
                local.write_notes(&loaded.notes);
            }
            state.favorites = loaded.favorites;
            state.notes = loaded.notes;
            state.spreads = loaded.spreads;
            state.owner = transition.identity.clone();
            state.phase = SyncPhase::Ready;
            true
        });

        if !applied {
            tracing::debug!(
                "Discarding stale load for {} (generation {})",
                transition.identity,
                transition.generation
            );
            return false;
        }
        tracing::info!("Ready for {}", transition.identity);
        true
    }

    async fn load_signed_in(&self, uid: &str, transition: &Transition) -> Loaded {
        match self.inner.remote.load_user_document(uid).await {
            Ok(Some(document)) => {
                let mut spreads = document.spreads;
                sort_by_updated_desc(&mut spreads);
                Loaded {
                    favorites: document.favorites,
                    notes: document.notes,
                    spreads,
                    mirror_locally: true,
                }
            }
            Ok(None) => self.create_document(uid, transition).await,
            Err(error) => {
                tracing::warn!(
                    "Failed to load remote document for {}: {}; using local cache",
                    uid,
                    error
                );
                Loaded {
                    favorites: self.inner.local.favorites_or_empty(),
                    notes: self.inner.local.notes_or_empty(),
                    spreads: Vec::new(),
                    mirror_locally: false,
                }
            }
        }
    }

    async fn create_document(&self, uid: &str, transition: &Transition) -> Loaded {
        let document = match (self.inner.options.new_document_seed, &transition.seed) {
            (NewDocumentSeed::SessionState, Some(seed)) => seed.clone(),
            _ => UserDocument::seeded(FavoriteSet::new(), NoteMap::new(), Vec::new()),
        };

        let created = match self.inner.remote.create_user_document(uid, &document).await {
            Ok(()) => {
                tracing::info!("Created remote document for {}", uid);
                true
            }
            Err(error) => {
                tracing::warn!("Failed to create remote document for {}: {}", uid, error);
                false
            }
        };

        Loaded {
            favorites: document.favorites,
            notes: document.notes,
            spreads: document.spreads,
            mirror_locally: created,
        }
    }

    /// Add the card to favorites, or remove it if present.
    ///
    /// Returns whether the card is a favorite afterwards.
    pub fn toggle_favorite(&self, card_id: CardId) -> bool {
        let mut favorited = false;
        let mut pending = None;
        self.inner.state.send_modify(|state| {
            favorited = state.favorites.insert(card_id);
            if !favorited {
                state.favorites.remove(&card_id);
            }
            self.inner.local.write_favorites(&state.favorites);
            pending = self.queue_save(state, |state| DocumentPatch::favorites(state.favorites.clone()));
        });

        self.spawn_save(pending);
        favorited
    }

    /// Set the note for a card; blank text removes it.
    ///
    /// Returns whether the notes changed. Nothing is persisted otherwise.
    pub fn set_note(&self, card_id: CardId, text: &str) -> bool {
        let mut pending = None;
        let changed = self.inner.state.send_if_modified(|state| {
            let changed = if text.trim().is_empty() {
                state.notes.remove(&card_id).is_some()
            } else if state.notes.get(&card_id).map(String::as_str) == Some(text) {
                false
            } else {
                state.notes.insert(card_id, text.to_string());
                true
            };
            if changed {
                self.inner.local.write_notes(&state.notes);
                pending = self.queue_save(state, |state| DocumentPatch::notes(state.notes.clone()));
            }
            changed
        });

        self.spawn_save(pending);
        changed
    }

    /// Insert or replace a spread and return the stored copy.
    ///
    /// Placeholder cards are dropped, `updated_at` is set to now and
    /// `created_at` is kept from the stored record (or set to now for a new
    /// one). The collection stays sorted newest-updated first.
    pub fn save_spread(&self, record: SpreadRecord) -> SpreadRecord {
        let now = Utc::now();
        let mut record = record;
        record.strip_placeholders();
        record.updated_at = now;

        let mut pending = None;
        self.inner.state.send_modify(|state| {
            if let Some(existing) = state.spreads.iter_mut().find(|spread| spread.id == record.id) {
                record.created_at = existing.created_at;
                *existing = record.clone();
            } else {
                record.created_at = now;
                state.spreads.insert(0, record.clone());
            }
            sort_by_updated_desc(&mut state.spreads);
            pending = self.queue_save(state, |state| DocumentPatch::spreads(state.spreads.clone()));
        });

        tracing::debug!("Saved spread {}", record.id);
        self.spawn_save(pending);
        record
    }

    /// Remove a spread by id. Returns whether one was removed.
    pub fn delete_spread(&self, id: &SpreadId) -> bool {
        let mut pending = None;
        let removed = self.inner.state.send_if_modified(|state| {
            let before = state.spreads.len();
            state.spreads.retain(|spread| &spread.id != id);
            if state.spreads.len() == before {
                return false;
            }
            pending = self.queue_save(state, |state| DocumentPatch::spreads(state.spreads.clone()));
            true
        });

        if removed {
            tracing::debug!("Deleted spread {}", id);
            self.spawn_save(pending);
        }
        removed
    }

    /// Register a remote save for the state just modified.
    ///
    /// Called while the state is held so saves are queued in mutation order.
    fn queue_save(
        &self,
        state: &SyncState,
        patch: impl FnOnce(&SyncState) -> DocumentPatch,
    ) -> Option<PendingSave> {
        let uid = state.remote_target()?;
        Some(self.inner.saves.enqueue(uid, patch(state)))
    }

    fn spawn_save(&self, pending: Option<PendingSave>) {
        let Some(save) = pending else {
            return;
        };
        let remote = Arc::clone(&self.inner.remote);
        let saves = Arc::clone(&self.inner.saves);
        let Ok(mut tails) = self.inner.tails.lock() else {
            tracing::warn!("Persistence queue poisoned; dropping remote save for {}", save.uid);
            return;
        };
        while let Some(result) = tails.try_join_next() {
            if let Err(error) = result {
                tracing::error!("Remote persistence task failed: {}", error);
            }
        }
        tails.spawn(async move {
            let written = saves
                .run(&save, || remote.save_user_document(&save.uid, &save.patch))
                .await;
            match written {
                Some(Ok(())) => tracing::debug!("Persisted remote document for {}", save.uid),
                Some(Err(error)) => {
                    tracing::warn!("Failed to persist remote document for {}: {}", save.uid, error);
                }
                None => tracing::debug!("Skipping superseded save for {}", save.uid),
            }
        });
    }

    /// Wait for every outstanding remote save to finish
    pub async fn flush(&self) {
        loop {
            let mut pending = match self.inner.tails.lock() {
                Ok(mut tails) => std::mem::take(&mut *tails),
                Err(_) => return,
            };
            if pending.is_empty() {
                return;
            }
            while let Some(result) = pending.join_next().await {
                if let Err(error) = result {
                    tracing::error!("Remote persistence task failed: {}", error);
                }
            }
        }
    }

    /// Observe state changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    /// Wait until the engine is `Ready` and return that state
    pub async fn ready(&self) -> SyncState {
        let mut receiver = self.subscribe();
        let result = receiver.wait_for(SyncState::is_ready).await.map(|state| state.clone());
        result.unwrap_or_else(|_| self.snapshot())
    }

    /// Wait until the engine is `Ready` for `identity`
    pub async fn ready_for(&self, identity: &Identity) -> SyncState {
        let mut receiver = self.subscribe();
        let result = receiver
            .wait_for(|state| state.is_ready() && &state.identity == identity)
            .await
            .map(|state| state.clone());
        result.unwrap_or_else(|_| self.snapshot())
    }

    #[must_use]
    pub fn snapshot(&self) -> SyncState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        self.inner.state.borrow().identity.clone()
    }

    #[must_use]
    pub fn phase(&self) -> SyncPhase {
        self.inner.state.borrow().phase
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading()
    }

    #[must_use]
    pub fn favorites(&self) -> FavoriteSet {
        self.inner.state.borrow().favorites.clone()
    }

    #[must_use]
    pub fn is_favorite(&self, card_id: CardId) -> bool {
        self.inner.state.borrow().is_favorite(card_id)
    }

    #[must_use]
    pub fn notes(&self) -> NoteMap {
        self.inner.state.borrow().notes.clone()
    }

    #[must_use]
    pub fn note(&self, card_id: CardId) -> Option<String> {
        self.inner.state.borrow().note(card_id).map(str::to_string)
    }

    #[must_use]
    pub fn spreads(&self) -> Vec<SpreadRecord> {
        self.inner.state.borrow().spreads.clone()
    }

    #[must_use]
    pub fn spread(&self, id: &SpreadId) -> Option<SpreadRecord> {
        self.inner.state.borrow().spread(id).cloned()
    }
}
