//! Guest record store: where guest ↔ hotspot account mappings live.
//!
//! The directory doesn't own persistence. A hotel system keeps its own
//! guest table (SQL, a PMS API, a flat file) and plugs it in through the
//! [`GuestStore`] trait. [`InMemoryGuestStore`] is provided for tests,
//! demos, and single-process deployments that don't need durability.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

// ---------------------------------------------------------------------------
// Guest types
// ---------------------------------------------------------------------------

/// Store-assigned guest identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(pub u64);

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "guest-{}", self.0)
    }
}

/// Where a guest stands relative to the router.
///
/// ```text
/// PendingSync ──┐
///               ├──→ Disabled
/// Active ───────┘
/// ```
///
/// - **Active**: the router account was created.
/// - **PendingSync**: the guest was recorded but the router call failed;
///   someone has to create the account later.
/// - **Disabled**: the guest checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestStatus {
    Active,
    PendingSync,
    Disabled,
}

impl GuestStatus {
    /// Returns `true` while the guest still occupies the room.
    pub fn is_current(self) -> bool {
        !matches!(self, Self::Disabled)
    }
}

/// A guest as recorded in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: GuestId,
    pub room: String,
    pub guest_name: String,
    /// Hotspot account name on the router.
    pub username: String,
    /// Hotspot account password handed to the guest.
    pub secret: String,
    pub profile: Option<String>,
    /// Uptime limit the account was requested with (router duration
    /// syntax), reapplied if the account has to be created again.
    #[serde(default)]
    pub limit_uptime: Option<String>,
    pub status: GuestStatus,
}

/// A guest not yet stored; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGuest {
    pub room: String,
    pub guest_name: String,
    pub username: String,
    pub secret: String,
    pub profile: Option<String>,
    pub limit_uptime: Option<String>,
    pub status: GuestStatus,
}

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors a guest store can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No guest with this id.
    #[error("{0} not found")]
    NotFound(GuestId),

    /// The room already has a current guest.
    #[error("room {0} already has a checked-in guest")]
    RoomOccupied(String),

    /// The backing store failed.
    #[error("guest store failure: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// GuestStore
// ---------------------------------------------------------------------------

/// Persistence contract for guest records.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` so one store can be shared by every
/// provisioning task, and the returned futures are `Send` so those tasks
/// can be spawned on a multi-threaded runtime.
pub trait GuestStore: Send + Sync + 'static {
    /// The current (not disabled) guest for `room`, if any.
    fn find_active_by_room(
        &self,
        room: &str,
    ) -> impl Future<Output = Result<Option<Guest>, StoreError>> + Send;

    /// The most recent guest using this router username.
    fn find_by_username(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<Guest>, StoreError>> + Send;

    /// Looks up a guest by id.
    fn find_by_id(
        &self,
        id: GuestId,
    ) -> impl Future<Output = Result<Option<Guest>, StoreError>> + Send;

    /// Stores a new guest and returns it with its assigned id.
    ///
    /// Fails with [`StoreError::RoomOccupied`] if the room already has a
    /// current guest.
    fn insert(&self, guest: NewGuest) -> impl Future<Output = Result<Guest, StoreError>> + Send;

    /// Replaces a stored guest.
    fn update(&self, guest: &Guest) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Marks a guest [`GuestStatus::Disabled`] and returns the new record.
    fn mark_disabled(&self, id: GuestId) -> impl Future<Output = Result<Guest, StoreError>> + Send;
}

// ---------------------------------------------------------------------------
// InMemoryGuestStore
// ---------------------------------------------------------------------------

/// A [`GuestStore`] kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryGuestStore {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    guests: BTreeMap<GuestId, Guest>,
}

impl InMemoryGuestStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored guest, in id order.
    pub async fn all(&self) -> Vec<Guest> {
        self.inner.lock().await.guests.values().cloned().collect()
    }
}

impl GuestStore for InMemoryGuestStore {
    async fn find_active_by_room(&self, room: &str) -> Result<Option<Guest>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .guests
            .values()
            .find(|g| g.room == room && g.status.is_current())
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Guest>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .guests
            .values()
            .rev()
            .find(|g| g.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: GuestId) -> Result<Option<Guest>, StoreError> {
        Ok(self.inner.lock().await.guests.get(&id).cloned())
    }

    async fn insert(&self, guest: NewGuest) -> Result<Guest, StoreError> {
        let mut inner = self.inner.lock().await;
        if guest.status.is_current()
            && inner
                .guests
                .values()
                .any(|g| g.room == guest.room && g.status.is_current())
        {
            return Err(StoreError::RoomOccupied(guest.room));
        }

        inner.next_id += 1;
        let stored = Guest {
            id: GuestId(inner.next_id),
            room: guest.room,
            guest_name: guest.guest_name,
            username: guest.username,
            secret: guest.secret,
            profile: guest.profile,
            limit_uptime: guest.limit_uptime,
            status: guest.status,
        };
        inner.guests.insert(stored.id, stored.clone());
        tracing::debug!(id = %stored.id, room = %stored.room, "guest stored");
        Ok(stored)
    }

    async fn update(&self, guest: &Guest) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        match inner.guests.get_mut(&guest.id) {
            Some(slot) => {
                *slot = guest.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(guest.id)),
        }
    }

    async fn mark_disabled(&self, id: GuestId) -> Result<Guest, StoreError> {
        let mut inner = self.inner.lock().await;
        let guest = inner.guests.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        guest.status = GuestStatus::Disabled;
        Ok(guest.clone())
    }
}
