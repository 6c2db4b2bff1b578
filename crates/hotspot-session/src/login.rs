//! The two-sentence login handshake.
//!
//! ```text
//! client: /login                               (sync)
//! router: !done            or  !trap ...       (either is fine)
//! client: /login =name=api =password=secret
//! router: !done            → authenticated
//!         !trap / !fatal   → credential rejected
//! ```

use hotspot_protocol::{ReplyTag, attr};
use hotspot_transport::Connection;

use crate::exchange::exchange;
use crate::{Credential, SessionConfig, SessionError};

/// Runs the handshake for one credential on a fresh connection.
///
/// A rejected credential comes back as [`SessionError::Command`]; any
/// other error means the router never got to judge it.
pub(crate) async fn login<C: Connection>(
    conn: &C,
    credential: &Credential,
    config: &SessionConfig,
) -> Result<(), SessionError> {
    let timeout = config.io_timeout();

    let sync = exchange(conn, &["/login"], &config.limits, timeout).await?;
    if sync.terminal() == ReplyTag::Fatal {
        sync.parse()?;
    } else if sync.has_error() {
        tracing::trace!(id = %conn.id(), "router trapped the empty /login, continuing");
    }

    let mut words = vec!["/login".to_string(), attr("name", &credential.username)];
    if credential.has_password() {
        words.push(attr("password", &credential.password));
    }

    let reply = exchange(conn, &words, &config.limits, timeout).await?;
    reply.parse().map(drop).map_err(SessionError::Command)
}
