//! # hotspot
//!
//! Client for a router's captive-portal (hotspot) API, built for hotel guest
//! Wi-Fi provisioning.
//!
//! The workspace is layered; this crate re-exports the pieces most callers
//! need and adds a TOML-loadable [`ClientConfig`] and the [`HotspotClient`]
//! entry point.
//!
//! ```text
//! hotspot-transport  → byte streams (TCP, in-memory)
//! hotspot-protocol   → length-prefixed sentences, reply parsing
//! hotspot-session    → login with credential fallback, command/reply
//! hotspot-directory  → hotspot accounts, active sessions, guest flows
//! hotspot            → config, client builder, unified error (this crate)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hotspot::prelude::*;
//!
//! # async fn run() -> Result<(), HotspotError> {
//! let client = HotspotClient::from_config(ClientConfig::load("hotspot.toml")?)?;
//! let mut directory = client.connect().await?;
//! let provisioner = client.provisioner(Arc::new(InMemoryGuestStore::new()));
//!
//! let report = provisioner
//!     .check_in(&mut directory, GuestRequest::new("101", "Ada Lovelace"))
//!     .await?;
//! println!("wifi login: {} / {}", report.guest.username, report.guest.secret);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;

pub use client::{HotspotClient, HotspotClientBuilder};
pub use config::{ClientConfig, ConfigError, DEFAULT_PORT};
pub use error::HotspotError;

pub use hotspot_directory as directory;
pub use hotspot_protocol as protocol;
pub use hotspot_session as session;
pub use hotspot_transport as transport;

/// Common imports for hotspot clients.
pub mod prelude {
    pub use crate::{ClientConfig, ConfigError, HotspotClient, HotspotClientBuilder, HotspotError};

    pub use hotspot_directory::{
        Account, ActiveSession, CheckInReport, CheckOutReport, DirectoryConfig, DirectoryError,
        Guest, GuestAccess, GuestId, GuestRequest, GuestStatus, GuestStore, HotspotDirectory,
        InMemoryGuestStore, LookupStrategy, NewAccount, ProvisionConfig, Provisioner,
        RemovalOutcome, StoreError,
    };
    pub use hotspot_protocol::{CommandError, FrameLimits, Record, Reply, ReplyTag, attr, query};
    pub use hotspot_session::{Credential, Session, SessionConfig, SessionError, SessionState};
    pub use hotspot_transport::{TcpConnection, TcpConnector, TransportError};
}
