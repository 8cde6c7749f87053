//! Per-invocation runtime: stores, session and the running sync engine.

use std::sync::Arc;

use tarot_core::auth::{AccountService, AuthError};
use tarot_core::db::{SqliteDocumentStore, SqliteLocalStore, LOCAL_PROFILE_UID};
use tarot_core::invite::{SharedInviteGate, SupabaseInviteGate};
use tarot_core::remote::{AccessToken, SharedRemoteStore, SupabaseDocumentStore};
use tarot_core::session::SessionMonitor;
use tarot_core::{Deck, Identity, SupabaseProject, SyncEngine};
use tokio::task::JoinHandle;

use crate::auth::auth_client;
use crate::error::CliError;
use crate::settings::Settings;

/// Account and invite services for a configured Supabase project
pub struct RemoteServices {
    pub project: SupabaseProject,
    pub accounts: AccountService,
    pub invites: SharedInviteGate,
}

pub struct App {
    pub deck: Deck,
    pub engine: SyncEngine,
    pub remote: Option<RemoteServices>,
    monitor: SessionMonitor,
    run_loop: JoinHandle<()>,
}

impl App {
    /// Open the local store, resolve the session and wait for the first
    /// `Ready` state.
    ///
    /// Without a configured project the app signs in to a device-local
    /// profile whose document lives in the local store file.
    pub async fn start(settings: &Settings) -> Result<Self, CliError> {
        let deck = Deck::bundled()?;

        let local = Arc::new(SqliteLocalStore::open(&settings.local_store_path)?);

        let (monitor, events) = SessionMonitor::channel();
        let (remote_store, remote): (SharedRemoteStore, Option<RemoteServices>) =
            match settings.config.supabase()? {
                Some(project) => {
                    let token = AccessToken::new();
                    let documents: SharedRemoteStore = Arc::new(
                        SupabaseDocumentStore::new(&project.url, &project.anon_key, token.clone())
                            .map_err(AuthError::from)?,
                    );
                    let invites: SharedInviteGate = Arc::new(SupabaseInviteGate::new(
                        &project.url,
                        &project.anon_key,
                        token.clone(),
                    )?);
                    let accounts = AccountService::new(
                        Arc::new(auth_client(&project)?),
                        invites.clone(),
                        monitor.clone(),
                    )
                    .with_access_token(token);
                    let services = RemoteServices {
                        project,
                        accounts,
                        invites,
                    };
                    (documents, Some(services))
                }
                None => {
                    let documents: SharedRemoteStore =
                        Arc::new(SqliteDocumentStore::open(&settings.local_store_path)?);
                    (documents, None)
                }
            };

        let engine = SyncEngine::with_options(local, remote_store, settings.config.sync_options());
        let run_loop = tokio::spawn(engine.clone().run(events));

        let identity = match &remote {
            Some(services) => services.accounts.restore().await,
            None => {
                tracing::debug!("No remote configured; using the device-local profile");
                let identity = Identity::signed_in(LOCAL_PROFILE_UID);
                monitor.publish(identity.clone());
                identity
            }
        };
        engine.ready_for(&identity).await;

        Ok(Self {
            deck,
            engine,
            remote,
            monitor,
            run_loop,
        })
    }

    /// The remote services, or an error when running local-only
    pub fn require_remote(&self) -> Result<&RemoteServices, CliError> {
        self.remote.as_ref().ok_or(CliError::RemoteNotConfigured)
    }

    /// Finish pending remote saves and stop the engine loop
    pub async fn shutdown(self) {
        let Self {
            engine,
            remote,
            monitor,
            run_loop,
            ..
        } = self;

        engine.flush().await;
        drop(remote);
        drop(monitor);
        if let Err(error) = run_loop.await {
            tracing::error!("Sync engine loop failed: {}", error);
        }
    }
}
