//! Authenticated command sessions against a router.
//!
//! This crate handles the lifecycle of one API connection:
//!
//! 1. **Login** with an ordered, caller-supplied list of [`Credential`]s,
//!    each tried on a fresh connection
//! 2. **Command execution**, one request/reply exchange at a time
//!    ([`Session::execute`], [`Session::run`])
//! 3. **State tracking**, so a connection that timed out or was dropped
//!    mid-reply is never reused ([`SessionState`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Directory Layer (above)  ← hotspot accounts and active sessions
//!     ↕
//! Session Layer (this crate)  ← login, command/reply, session state
//!     ↕
//! Protocol Layer (below)  ← sentences, reply tags, records
//! ```

mod credential;
mod error;
mod exchange;
mod login;
mod session;

pub use credential::Credential;
pub use error::SessionError;
pub use session::{Session, SessionConfig, SessionState};
