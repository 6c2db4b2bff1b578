//! An in-process fake router for tests and demos.
//!
//! [`FakeRouter`] speaks the real wire protocol and keeps hotspot tables
//! in memory, so directory and provisioning flows can be exercised end to
//! end without hardware. It can be reached over an in-memory pipe
//! ([`FakeRouter::connector`]) or a loopback TCP port
//! ([`FakeRouter::listen`]).
//!
//! Fault switches reproduce field behaviour the client must survive:
//! removes that are acknowledged but ignored, and `?name=` queries that
//! match nothing.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hotspot_protocol::{FrameLimits, Record, attr, read_sentence, split_attr, write_sentence};
use hotspot_transport::{Connection, Connector, StreamConnection, TransportError};
use tokio::io::DuplexStream;
use tokio::net::TcpListener;

/// The connection type handed out by [`FakeConnector`].
pub type FakeConnection = StreamConnection<DuplexStream>;

const USER_TABLE: &str = "/ip/hotspot/user";
const ACTIVE_TABLE: &str = "/ip/hotspot/active";

/// A scriptable, stateful router.
///
/// Cloning shares the same tables.
#[derive(Clone)]
pub struct FakeRouter {
    state: Arc<Mutex<RouterState>>,
}

#[derive(Default)]
struct RouterState {
    credentials: Vec<(String, String)>,
    tables: BTreeMap<String, Vec<Record>>,
    next_id: u32,
    commands: Vec<Vec<String>>,
    ignore_removes: bool,
    refuse_removes: bool,
    ignore_queries: bool,
}

impl FakeRouter {
    /// A router with empty hotspot tables that accepts any login until a
    /// credential is registered.
    pub fn new() -> Self {
        let mut state = RouterState::default();
        for table in [USER_TABLE, ACTIVE_TABLE, "/log", "/interface"] {
            state.tables.insert(table.to_string(), Vec::new());
        }
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Only accept this username/password (may be called several times).
    pub fn with_credential(self, username: &str, password: &str) -> Self {
        self.lock()
            .credentials
            .push((username.to_string(), password.to_string()));
        self
    }

    /// Adds a hotspot user account.
    pub fn with_account(self, name: &str, password: &str) -> Self {
        self.lock()
            .add_row(USER_TABLE, [("name", name), ("password", password)]);
        self
    }

    /// Adds an active hotspot session.
    pub fn with_active(self, user: &str, address: &str, mac_address: &str) -> Self {
        self.lock().add_row(
            ACTIVE_TABLE,
            [
                ("user", user),
                ("address", address),
                ("mac-address", mac_address),
                ("uptime", "5m12s"),
            ],
        );
        self
    }

    /// Registers a read-only table (e.g. `/ip/dns/static`) with rows.
    pub fn with_rows(self, path: &str, rows: Vec<Vec<(&str, &str)>>) -> Self {
        {
            let mut state = self.lock();
            state.tables.entry(path.to_string()).or_default();
            for row in rows {
                state.add_row(path, row);
            }
        }
        self
    }

    /// Acknowledge removes without removing anything.
    pub fn set_ignore_removes(&self, ignore: bool) {
        self.lock().ignore_removes = ignore;
    }

    /// Answer every remove with a `!trap`.
    pub fn set_refuse_removes(&self, refuse: bool) {
        self.lock().refuse_removes = refuse;
    }

    /// Answer every print carrying `?` queries with no rows.
    pub fn set_ignore_queries(&self, ignore: bool) {
        self.lock().ignore_queries = ignore;
    }

    /// Names in the hotspot user table.
    pub fn account_names(&self) -> Vec<String> {
        self.column(USER_TABLE, "name")
    }

    /// Users with an active session.
    pub fn active_users(&self) -> Vec<String> {
        self.column(ACTIVE_TABLE, "user")
    }

    /// Every sentence received, in order, across all connections.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.lock().commands.clone()
    }

    /// How many received sentences started with `command`.
    pub fn command_count(&self, command: &str) -> usize {
        self.lock()
            .commands
            .iter()
            .filter(|words| words.first().is_some_and(|w| w == command))
            .count()
    }

    /// How many received sentences carried a word starting with `prefix`.
    pub fn commands_with_prefix(&self, prefix: &str) -> usize {
        self.lock()
            .commands
            .iter()
            .filter(|words| words.iter().any(|w| w.starts_with(prefix)))
            .count()
    }

    /// A connector that reaches this router over in-memory pipes.
    pub fn connector(&self) -> FakeConnector {
        FakeConnector {
            router: self.clone(),
        }
    }

    /// Serves this router on a loopback TCP port and returns its address.
    pub async fn listen(&self) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let router = self.clone();
        tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                tracing::debug!(%peer, "fake router accepted connection");
                tokio::spawn(router.clone().serve(StreamConnection::new(stream)));
            }
        });
        Ok(addr)
    }

    fn lock(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn column(&self, table: &str, key: &str) -> Vec<String> {
        self.lock()
            .tables
            .get(table)
            .into_iter()
            .flatten()
            .filter_map(|row| row.get(key).map(str::to_string))
            .collect()
    }

    /// Answers sentences on `conn` until the client hangs up.
    async fn serve<C: Connection>(self, conn: C) {
        let limits = FrameLimits::default();
        let mut logged_in = false;
        while let Ok(sentence) = read_sentence(&conn, &limits).await {
            if sentence.is_empty() {
                continue;
            }
            let replies = self.lock().handle(sentence.words(), &mut logged_in);
            for reply in replies {
                if write_sentence(&conn, &reply).await.is_err() {
                    return;
                }
            }
        }
    }
}

impl Default for FakeRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterState {
    fn add_row<'a>(
        &mut self,
        table: &str,
        attrs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> String {
        self.next_id += 1;
        let id = format!("*{:X}", self.next_id);
        let mut row: Record = attrs.into_iter().collect();
        row.insert(".id", id.clone());
        self.tables.entry(table.to_string()).or_default().push(row);
        id
    }

    fn handle(&mut self, words: &[String], logged_in: &mut bool) -> Vec<Vec<String>> {
        self.commands.push(words.to_vec());
        let Some((command, args)) = words.split_first() else {
            return Vec::new();
        };
        let attrs: Record = args.iter().filter_map(|w| split_attr(w)).collect();
        let queries: Vec<(&str, &str)> = args
            .iter()
            .filter_map(|w| w.strip_prefix('?')?.split_once('='))
            .collect();

        if command == "/login" {
            return self.login(&attrs, logged_in);
        }
        if !*logged_in {
            return trap("not logged in");
        }

        let Some((table, verb)) = command.rsplit_once('/') else {
            return trap("no such command");
        };
        if !self.tables.contains_key(table) {
            return trap("no such command prefix");
        }

        match verb {
            "print" => self.print(table, &queries),
            "add" => self.add(table, attrs),
            "set" => self.set(table, &attrs),
            "remove" => self.remove(table, &attrs),
            _ => trap("no such command"),
        }
    }

    fn login(&self, attrs: &Record, logged_in: &mut bool) -> Vec<Vec<String>> {
        let Some(name) = attrs.get("name") else {
            return done(None);
        };
        let password = attrs.get("password").unwrap_or_default();
        let accepted = self.credentials.is_empty()
            || self
                .credentials
                .iter()
                .any(|(u, p)| u == name && p == password);
        if accepted {
            *logged_in = true;
            done(None)
        } else {
            trap("invalid user name or password (6)")
        }
    }

    fn print(&self, table: &str, queries: &[(&str, &str)]) -> Vec<Vec<String>> {
        if self.ignore_queries && !queries.is_empty() {
            return done(None);
        }
        let mut replies: Vec<Vec<String>> = self.tables[table]
            .iter()
            .filter(|row| queries.iter().all(|(k, v)| row.get(k) == Some(*v)))
            .map(|row| {
                std::iter::once("!re".to_string())
                    .chain(row.iter().map(|(k, v)| attr(k, v)))
                    .collect()
            })
            .collect();
        replies.extend(done(None));
        replies
    }

    fn add(&mut self, table: &str, attrs: Record) -> Vec<Vec<String>> {
        if let Some(name) = attrs.name() {
            if self.tables[table].iter().any(|row| row.name() == Some(name)) {
                return trap("failure: already have user with this name for this server");
            }
        }
        let attrs: Vec<(String, String)> = attrs.into_inner().into_iter().collect();
        let id = self.add_row(table, attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        done(Some(&id))
    }

    fn set(&mut self, table: &str, attrs: &Record) -> Vec<Vec<String>> {
        let Some(row) = self.row_mut(table, attrs) else {
            return trap("no such item");
        };
        for (key, value) in attrs.iter().filter(|(k, _)| *k != ".id") {
            row.insert(key, value);
        }
        done(None)
    }

    fn remove(&mut self, table: &str, attrs: &Record) -> Vec<Vec<String>> {
        if self.refuse_removes {
            return trap("failure: item is in use");
        }
        let Some(id) = attrs.id() else {
            return trap("no such item");
        };
        let rows = self.tables.entry(table.to_string()).or_default();
        let Some(index) = rows.iter().position(|row| row.id() == Some(id)) else {
            return trap("no such item");
        };
        if !self.ignore_removes {
            rows.remove(index);
        }
        done(None)
    }

    fn row_mut(&mut self, table: &str, attrs: &Record) -> Option<&mut Record> {
        let id = attrs.id()?;
        self.tables
            .get_mut(table)?
            .iter_mut()
            .find(|row| row.id() == Some(id))
    }
}

fn done(ret: Option<&str>) -> Vec<Vec<String>> {
    let mut sentence = vec!["!done".to_string()];
    if let Some(ret) = ret {
        sentence.push(attr("ret", ret));
    }
    vec![sentence]
}

fn trap(message: &str) -> Vec<Vec<String>> {
    vec![
        vec!["!trap".to_string(), attr("message", message)],
        vec!["!done".to_string()],
    ]
}

// ---------------------------------------------------------------------------
// FakeConnector
// ---------------------------------------------------------------------------

/// Opens in-memory connections to a [`FakeRouter`].
#[derive(Clone)]
pub struct FakeConnector {
    router: FakeRouter,
}

impl Connector for FakeConnector {
    type Connection = FakeConnection;

    async fn connect(&self) -> Result<FakeConnection, TransportError> {
        let (client, server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(self.router.clone().serve(StreamConnection::new(server)));
        Ok(StreamConnection::new(client))
    }

    fn peer(&self) -> String {
        "fake-router".to_string()
    }
}
