//! Guest check-in and check-out flows.
//!
//! Provisioning touches two systems that can fail independently: the
//! router and the guest store. Neither flow stops at the first failure.
//! Each step's outcome is kept in the report, so the caller can tell "the
//! guest is recorded but has no account yet" from "the account is gone
//! but the guest is still marked checked in".

use std::sync::Arc;

use hotspot_transport::Connection;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::store::{Guest, GuestStatus, GuestStore, NewGuest, StoreError};
use crate::{DirectoryError, HotspotDirectory, NewAccount, RemovalOutcome};

// ---------------------------------------------------------------------------
// ProvisionConfig
// ---------------------------------------------------------------------------

/// Configuration for guest provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    /// Digits in a generated guest secret.
    ///
    /// Default: 6.
    pub secret_length: usize,

    /// Prefix for router usernames: `<prefix><room>`.
    ///
    /// Default: `room`, so room 101 logs in as `room101`.
    pub username_prefix: String,

    /// Hotspot user profile when the request doesn't name one.
    pub default_profile: Option<String>,

    /// Uptime limit when the request doesn't set one (router duration
    /// syntax, e.g. `3d`).
    pub default_limit_uptime: Option<String>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            secret_length: 6,
            username_prefix: "room".to_string(),
            default_profile: None,
            default_limit_uptime: None,
        }
    }
}

impl ProvisionConfig {
    /// The router username for a room.
    pub fn username_for(&self, room: &str) -> String {
        format!("{}{room}", self.username_prefix)
    }
}

// ---------------------------------------------------------------------------
// Requests and reports
// ---------------------------------------------------------------------------

/// A guest arriving at a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRequest {
    pub room: String,
    pub guest_name: String,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub limit_uptime: Option<String>,
}

impl GuestRequest {
    pub fn new(room: impl Into<String>, guest_name: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            guest_name: guest_name.into(),
            profile: None,
            limit_uptime: None,
        }
    }
}

/// What the guest is handed at the front desk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestAccess {
    pub room: String,
    pub username: String,
    pub secret: String,
}

/// Outcome of [`Provisioner::check_in`].
#[derive(Debug)]
pub struct CheckInReport {
    /// The credentials generated for the guest.
    pub guest: GuestAccess,
    /// Router account creation: the router-assigned id on success.
    pub router: Result<Option<String>, DirectoryError>,
    /// The stored guest record.
    pub store: Result<Guest, StoreError>,
}

impl CheckInReport {
    /// Returns `true` if both the router and the store succeeded.
    pub fn is_complete(&self) -> bool {
        self.router.is_ok() && self.store.is_ok()
    }
}

/// Outcome of [`Provisioner::check_out`].
#[derive(Debug)]
pub struct CheckOutReport {
    /// The router username that was cleaned up.
    pub username: String,
    /// Active session termination: `true` if no session remains.
    pub session: Result<bool, DirectoryError>,
    /// Account removal.
    pub router: Result<RemovalOutcome, DirectoryError>,
    /// `true` only if a re-query confirmed the account is gone.
    pub verified_absent: bool,
    /// The guest record after being marked disabled, or `None` if the store
    /// had no current guest for the room.
    pub store: Result<Option<Guest>, StoreError>,
}

impl CheckOutReport {
    /// Returns `true` if every step succeeded and the account is verified
    /// gone.
    pub fn is_complete(&self) -> bool {
        matches!(self.session, Ok(true)) && self.verified_absent && self.store.is_ok()
    }
}

// ---------------------------------------------------------------------------
// Provisioner
// ---------------------------------------------------------------------------

/// Runs check-in and check-out against a directory and a guest store.
pub struct Provisioner<S: GuestStore> {
    store: Arc<S>,
    config: ProvisionConfig,
}

impl<S: GuestStore> Provisioner<S> {
    pub fn new(store: Arc<S>, config: ProvisionConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// Checks a guest in: creates a router account with a fresh secret and
    /// records the guest.
    ///
    /// The guest is stored [`GuestStatus::Active`] if the router accepted
    /// the account, [`GuestStatus::PendingSync`] otherwise.
    ///
    /// # Errors
    /// Only for preconditions, before anything is changed: the store lookup
    /// failed, or the room already has a current guest.
    pub async fn check_in<C: Connection>(
        &self,
        directory: &mut HotspotDirectory<C>,
        request: GuestRequest,
    ) -> Result<CheckInReport, DirectoryError> {
        if self.store.find_active_by_room(&request.room).await?.is_some() {
            return Err(StoreError::RoomOccupied(request.room).into());
        }

        let access = GuestAccess {
            username: self.config.username_for(&request.room),
            secret: generate_secret(self.config.secret_length),
            room: request.room,
        };
        let profile = request.profile.or_else(|| self.config.default_profile.clone());
        let limit_uptime = request
            .limit_uptime
            .or_else(|| self.config.default_limit_uptime.clone());

        let mut account = NewAccount::new(&access.username, &access.secret)
            .comment(request.guest_name.clone());
        account.profile = profile.clone();
        account.limit_uptime = limit_uptime.clone();

        let router = directory.create_account(&account).await;
        let status = match &router {
            Ok(_) => GuestStatus::Active,
            Err(e) => {
                tracing::warn!(
                    room = %access.room,
                    error = %e,
                    "router account not created, guest pending sync"
                );
                GuestStatus::PendingSync
            }
        };

        let store = self
            .store
            .insert(NewGuest {
                room: access.room.clone(),
                guest_name: request.guest_name,
                username: access.username.clone(),
                secret: access.secret.clone(),
                profile,
                limit_uptime,
                status,
            })
            .await;
        if let Err(e) = &store {
            tracing::error!(room = %access.room, error = %e, "guest record not stored");
        }

        tracing::info!(
            room = %access.room,
            username = %access.username,
            router_ok = router.is_ok(),
            store_ok = store.is_ok(),
            "guest checked in"
        );
        Ok(CheckInReport {
            guest: access,
            router,
            store,
        })
    }

    /// Checks a room out: logs out active sessions, removes the account
    /// with verification, and marks the guest disabled.
    ///
    /// Every step runs even if an earlier one failed. Without a stored
    /// guest the router username is derived from the room.
    ///
    /// # Errors
    /// Only if the store lookup itself fails.
    pub async fn check_out<C: Connection>(
        &self,
        directory: &mut HotspotDirectory<C>,
        room: &str,
    ) -> Result<CheckOutReport, DirectoryError> {
        let guest = self.store.find_active_by_room(room).await?;
        let username = match &guest {
            Some(guest) => guest.username.clone(),
            None => {
                tracing::warn!(%room, "no current guest recorded, cleaning up router anyway");
                self.config.username_for(room)
            }
        };

        let session = directory.terminate_active_session(&username).await;
        let router = directory.remove_account_verified(&username).await;
        let verified_absent = matches!(&router, Ok(outcome) if outcome.is_absent());

        let store = match guest {
            Some(guest) => self.store.mark_disabled(guest.id).await.map(Some),
            None => Ok(None),
        };

        tracing::info!(
            %room,
            %username,
            session_ok = matches!(session, Ok(true)),
            verified_absent,
            store_ok = store.is_ok(),
            "guest checked out"
        );
        Ok(CheckOutReport {
            username,
            session,
            router,
            verified_absent,
            store,
        })
    }

    /// Retries router account creation for guests stuck in
    /// [`GuestStatus::PendingSync`] for `room`.
    ///
    /// Returns the updated guest, or `None` if the room has no pending
    /// guest.
    pub async fn sync_pending<C: Connection>(
        &self,
        directory: &mut HotspotDirectory<C>,
        room: &str,
    ) -> Result<Option<Guest>, DirectoryError> {
        let Some(mut guest) = self.store.find_active_by_room(room).await? else {
            return Ok(None);
        };
        if guest.status != GuestStatus::PendingSync {
            return Ok(None);
        }

        let mut account = NewAccount::new(&guest.username, &guest.secret)
            .comment(guest.guest_name.clone());
        account.profile = guest.profile.clone();
        account.limit_uptime = guest.limit_uptime.clone();
        directory.create_account(&account).await?;

        guest.status = GuestStatus::Active;
        self.store.update(&guest).await?;
        tracing::info!(%room, username = %guest.username, "pending guest synced");
        Ok(Some(guest))
    }
}

/// A numeric secret of `len` digits.
fn generate_secret(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len.max(1))
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}
