//! Hotspot account management and guest provisioning.
//!
//! Built on an authenticated [`Session`](hotspot_session::Session), this
//! crate turns router tables into typed rows and wraps the guest lifecycle:
//!
//! - [`HotspotDirectory`]: list, find, create, disable, and remove hotspot
//!   accounts; list and terminate active sessions; print diagnostic tables
//! - [`GuestStore`]: the persistence contract for guest records, with
//!   [`InMemoryGuestStore`] as a ready-made implementation
//! - [`Provisioner`]: check-in and check-out flows that report router,
//!   verification, and store outcomes separately
//!
//! # Removal is verified
//!
//! Routers in the field sometimes acknowledge a remove and keep the row.
//! [`HotspotDirectory::remove_account_verified`] re-lists after every remove
//! and says so with [`RemovalOutcome::StillPresent`].

mod config;
mod directory;
mod error;
mod provision;
mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{DirectoryConfig, LookupStrategy};
pub use directory::{Account, ActiveSession, HotspotDirectory, NewAccount, RemovalOutcome};
pub use error::DirectoryError;
pub use provision::{
    CheckInReport, CheckOutReport, GuestAccess, GuestRequest, ProvisionConfig, Provisioner,
};
pub use store::{Guest, GuestId, GuestStatus, GuestStore, InMemoryGuestStore, NewGuest, StoreError};
