//! Hotspot directory operations: accounts and active sessions.
//!
//! [`HotspotDirectory`] owns one authenticated [`Session`] and turns
//! router tables into typed rows. Every mutation that can silently fail on
//! the router side (removals above all) is checked with a re-query.

use hotspot_protocol::{Record, attr, query};
use hotspot_session::{Session, SessionError};
use hotspot_transport::Connection;
use serde::Serialize;

use crate::{DirectoryConfig, DirectoryError, LookupStrategy};

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A hotspot user account as listed by the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Router-assigned id (`.id`), e.g. `*1A`.
    pub id: String,
    pub name: String,
    /// Every attribute the router sent, `.id` and `name` included.
    pub attributes: Record,
}

impl Account {
    fn from_record(record: Record) -> Option<Self> {
        let id = record.id()?.to_string();
        let name = record.name()?.to_string();
        Some(Self {
            id,
            name,
            attributes: record,
        })
    }

    pub fn profile(&self) -> Option<&str> {
        self.attributes.get("profile")
    }

    pub fn comment(&self) -> Option<&str> {
        self.attributes.get("comment")
    }

    pub fn limit_uptime(&self) -> Option<&str> {
        self.attributes.get("limit-uptime")
    }

    /// `disabled=true|yes`. A missing flag means enabled.
    pub fn is_disabled(&self) -> bool {
        self.attributes.flag("disabled").unwrap_or(false)
    }
}

/// A logged-in client on the hotspot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveSession {
    pub id: String,
    /// The hotspot account the client logged in with.
    pub user: String,
    pub attributes: Record,
}

impl ActiveSession {
    fn from_record(record: Record) -> Option<Self> {
        let id = record.id()?.to_string();
        let user = record.get("user")?.to_string();
        Some(Self {
            id,
            user,
            attributes: record,
        })
    }

    pub fn address(&self) -> Option<&str> {
        self.attributes.get("address")
    }

    pub fn mac_address(&self) -> Option<&str> {
        self.attributes.get("mac-address")
    }

    pub fn uptime(&self) -> Option<&str> {
        self.attributes.get("uptime")
    }
}

/// An account to create.
#[derive(Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub secret: String,
    pub profile: Option<String>,
    /// Router duration syntax, e.g. `1d` or `3h30m`.
    pub limit_uptime: Option<String>,
    pub comment: Option<String>,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
            profile: None,
            limit_uptime: None,
            comment: None,
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn limit_uptime(mut self, limit: impl Into<String>) -> Self {
        self.limit_uptime = Some(limit.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// The argument words for `user/add`.
    fn to_words(&self) -> Vec<String> {
        let mut words = vec![attr("name", &self.name), attr("password", &self.secret)];
        let optional = [
            ("profile", &self.profile),
            ("limit-uptime", &self.limit_uptime),
            ("comment", &self.comment),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                words.push(attr(key, value));
            }
        }
        words
    }
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .field("profile", &self.profile)
            .field("limit_uptime", &self.limit_uptime)
            .field("comment", &self.comment)
            .finish()
    }
}

/// What [`HotspotDirectory::remove_account_verified`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    /// No such account; nothing was sent.
    AlreadyAbsent,
    /// Removed, and a re-query confirms it is gone.
    Removed,
    /// The router accepted the remove but the account is still listed.
    StillPresent,
}

impl RemovalOutcome {
    /// Returns `true` if the account is known to be gone.
    pub fn is_absent(self) -> bool {
        !matches!(self, Self::StillPresent)
    }
}

// ---------------------------------------------------------------------------
// HotspotDirectory
// ---------------------------------------------------------------------------

/// Hotspot account and active-session operations over one session.
pub struct HotspotDirectory<C: Connection> {
    session: Session<C>,
    config: DirectoryConfig,
}

impl<C: Connection> std::fmt::Debug for HotspotDirectory<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotspotDirectory")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish()
    }
}

impl<C: Connection> HotspotDirectory<C> {
    pub fn new(session: Session<C>, config: DirectoryConfig) -> Self {
        Self { session, config }
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    /// The underlying session, for commands the directory doesn't wrap.
    pub fn session_mut(&mut self) -> &mut Session<C> {
        &mut self.session
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn into_session(self) -> Session<C> {
        self.session
    }

    /// Disconnects the underlying session. Idempotent.
    pub async fn disconnect(&mut self) {
        self.session.disconnect().await;
    }

    // -- Accounts ---------------------------------------------------------

    /// Lists every hotspot account.
    ///
    /// Rows without `.id` or `name` are skipped.
    pub async fn list_accounts(&mut self) -> Result<Vec<Account>, DirectoryError> {
        let records = self.print_table("user", &[]).await?;
        Ok(rows(records, Account::from_record, "account"))
    }

    /// Finds an account by exact name using the configured strategy.
    pub async fn find_account_by_name(
        &mut self,
        name: &str,
    ) -> Result<Option<Account>, DirectoryError> {
        self.find_account_with(name, self.config.lookup).await
    }

    /// Finds an account by exact name using `strategy`.
    pub async fn find_account_with(
        &mut self,
        name: &str,
        strategy: LookupStrategy,
    ) -> Result<Option<Account>, DirectoryError> {
        if strategy == LookupStrategy::Filtered {
            let records = self.print_table("user", &[query("name", name)]).await?;
            let found = rows(records, Account::from_record, "account")
                .into_iter()
                .find(|a| a.name == name);
            if found.is_some() {
                return Ok(found);
            }
            tracing::debug!(%name, "filtered lookup found nothing, falling back to full scan");
        }

        let accounts = self.list_accounts().await?;
        Ok(accounts.into_iter().find(|a| a.name == name))
    }

    /// Creates an account and returns the router-assigned id, when the
    /// router reports one.
    ///
    /// # Errors
    /// [`DirectoryError::Create`] if the router refuses (duplicate name,
    /// unknown profile, ...).
    pub async fn create_account(
        &mut self,
        account: &NewAccount,
    ) -> Result<Option<String>, DirectoryError> {
        let command = self.config.command("user", "add");
        let reply = self
            .session
            .run(&command, &account.to_words())
            .await
            .map_err(|e| {
                DirectoryError::from_refusal(e, |message| DirectoryError::Create {
                    name: account.name.clone(),
                    message,
                })
            })?;

        let id = reply.ret().map(str::to_string);
        tracing::info!(name = %account.name, id = ?id, "hotspot account created");
        Ok(id)
    }

    /// Re-lists accounts to confirm `name` exists.
    ///
    /// # Errors
    /// [`DirectoryError::Verification`] if it isn't listed.
    pub async fn confirm_account(&mut self, name: &str) -> Result<Account, DirectoryError> {
        self.find_account_with(name, LookupStrategy::FullScan)
            .await?
            .ok_or_else(|| DirectoryError::Verification {
                name: name.to_string(),
            })
    }

    /// Enables or disables an account.
    ///
    /// Returns `false` if there is no such account.
    pub async fn set_account_disabled(
        &mut self,
        name: &str,
        disabled: bool,
    ) -> Result<bool, DirectoryError> {
        let Some(account) = self.find_account_by_name(name).await? else {
            return Ok(false);
        };

        let command = self.config.command("user", "set");
        let value = if disabled { "yes" } else { "no" };
        self.session
            .run(&command, &[attr(".id", &account.id), attr("disabled", value)])
            .await
            .map_err(|e| {
                DirectoryError::from_refusal(e, |message| DirectoryError::Update {
                    name: name.to_string(),
                    message,
                })
            })?;

        tracing::info!(%name, disabled, "hotspot account updated");
        Ok(true)
    }

    /// Removes an account. Returns `true` if it is gone afterwards.
    ///
    /// Removing an absent account is a successful no-op. See
    /// [`remove_account_verified`](Self::remove_account_verified).
    pub async fn remove_account(&mut self, name: &str) -> Result<bool, DirectoryError> {
        Ok(self.remove_account_verified(name).await?.is_absent())
    }

    /// Removes an account and re-queries to check the removal took.
    ///
    /// 1. Look the account up; absent → [`RemovalOutcome::AlreadyAbsent`]
    ///    without sending a remove.
    /// 2. Remove it by `.id`.
    /// 3. Re-list with a full scan; still listed →
    ///    [`RemovalOutcome::StillPresent`].
    ///
    /// # Errors
    /// [`DirectoryError::Remove`] if the router refuses the remove.
    pub async fn remove_account_verified(
        &mut self,
        name: &str,
    ) -> Result<RemovalOutcome, DirectoryError> {
        let Some(account) = self.find_account_by_name(name).await? else {
            tracing::debug!(%name, "account already absent");
            return Ok(RemovalOutcome::AlreadyAbsent);
        };

        let command = self.config.command("user", "remove");
        self.session
            .run(&command, &[attr(".id", &account.id)])
            .await
            .map_err(|e| {
                DirectoryError::from_refusal(e, |message| DirectoryError::Remove {
                    name: name.to_string(),
                    message,
                })
            })?;

        let remaining = self.find_account_with(name, LookupStrategy::FullScan).await?;
        if remaining.is_some() {
            tracing::warn!(%name, id = %account.id, "remove accepted but account still listed");
            return Ok(RemovalOutcome::StillPresent);
        }

        tracing::info!(%name, id = %account.id, "hotspot account removed");
        Ok(RemovalOutcome::Removed)
    }

    // -- Active sessions --------------------------------------------------

    /// Lists clients currently logged in to the hotspot.
    pub async fn list_active_sessions(&mut self) -> Result<Vec<ActiveSession>, DirectoryError> {
        let records = self.print_table("active", &[]).await?;
        Ok(rows(records, ActiveSession::from_record, "active session"))
    }

    /// Logs out every active session of `username`.
    ///
    /// Returns `true` if none remain afterwards; no sessions at all counts
    /// as success.
    ///
    /// # Errors
    /// [`DirectoryError::Remove`] if the router refuses a removal.
    pub async fn terminate_active_session(
        &mut self,
        username: &str,
    ) -> Result<bool, DirectoryError> {
        let matching: Vec<ActiveSession> = self
            .list_active_sessions()
            .await?
            .into_iter()
            .filter(|s| s.user == username)
            .collect();
        if matching.is_empty() {
            return Ok(true);
        }

        let command = self.config.command("active", "remove");
        for active in &matching {
            self.session
                .run(&command, &[attr(".id", &active.id)])
                .await
                .map_err(|e| {
                    DirectoryError::from_refusal(e, |message| DirectoryError::Remove {
                        name: username.to_string(),
                        message,
                    })
                })?;
        }

        let remaining = self
            .list_active_sessions()
            .await?
            .iter()
            .filter(|s| s.user == username)
            .count();
        if remaining > 0 {
            tracing::warn!(%username, remaining, "active sessions survived removal");
            return Ok(false);
        }

        tracing::info!(%username, terminated = matching.len(), "active sessions terminated");
        Ok(true)
    }

    // -- Diagnostics ------------------------------------------------------

    /// Runs `<path>/print` with optional query words and returns the raw
    /// records.
    ///
    /// For read-only diagnostic tables such as `/ip/dns/static`,
    /// `/ip/firewall/filter`, `/ip/hotspot/walled-garden`, `/log` or
    /// `/interface`.
    pub async fn print(
        &mut self,
        path: &str,
        queries: &[String],
    ) -> Result<Vec<Record>, DirectoryError> {
        let command = format!("{}/print", path.trim_end_matches('/'));
        let reply = self.session.run(&command, queries).await?;
        Ok(reply.records)
    }

    async fn print_table(
        &mut self,
        table: &str,
        queries: &[String],
    ) -> Result<Vec<Record>, SessionError> {
        let command = self.config.command(table, "print");
        Ok(self.session.run(&command, queries).await?.records)
    }
}

/// Converts records into typed rows, skipping incomplete ones.
fn rows<T>(records: Vec<Record>, convert: fn(Record) -> Option<T>, kind: &str) -> Vec<T> {
    let total = records.len();
    let parsed: Vec<T> = records.into_iter().filter_map(convert).collect();
    if parsed.len() < total {
        tracing::warn!(kind, skipped = total - parsed.len(), "skipped rows missing .id or name");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use hotspot_session::{Credential, SessionConfig};

    use super::*;
    use crate::testing::{FakeConnection, FakeRouter};

    async fn directory(
        router: &FakeRouter,
        lookup: LookupStrategy,
    ) -> HotspotDirectory<FakeConnection> {
        let session = Session::connect(
            &router.connector(),
            &[Credential::new("api", "secret")],
            SessionConfig::default(),
        )
        .await
        .unwrap();
        let config = DirectoryConfig {
            lookup,
            ..DirectoryConfig::default()
        };
        HotspotDirectory::new(session, config)
    }

    fn router() -> FakeRouter {
        FakeRouter::new()
            .with_credential("api", "secret")
            .with_account("room101", "111111")
            .with_account("room102", "222222")
    }

    // =====================================================================
    // Accounts
    // =====================================================================

    #[tokio::test]
    async fn test_list_accounts_returns_typed_rows() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let accounts = dir.list_accounts().await.unwrap();

        let names: Vec<&str> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["room101", "room102"]);
        assert!(accounts.iter().all(|a| a.id.starts_with('*')));
    }

    #[tokio::test]
    async fn test_find_account_by_name_full_scan() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let found = dir.find_account_by_name("room102").await.unwrap().unwrap();
        assert_eq!(found.name, "room102");
        assert!(dir.find_account_by_name("room999").await.unwrap().is_none());
        assert_eq!(router.commands_with_prefix("?name="), 0);
    }

    #[tokio::test]
    async fn test_find_account_filtered_sends_query() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::Filtered).await;

        let found = dir.find_account_by_name("room101").await.unwrap();
        assert!(found.is_some());
        assert_eq!(router.commands_with_prefix("?name="), 1);
    }

    #[tokio::test]
    async fn test_find_account_filtered_falls_back_when_filter_broken() {
        let router = router();
        router.set_ignore_queries(true);
        let mut dir = directory(&router, LookupStrategy::Filtered).await;

        let found = dir.find_account_by_name("room101").await.unwrap();
        assert_eq!(found.map(|a| a.name), Some("room101".to_string()));
    }

    #[tokio::test]
    async fn test_create_account_returns_id_and_is_listed() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let account = NewAccount::new("room103", "333333")
            .profile("guest-1d")
            .limit_uptime("1d")
            .comment("Ada Lovelace");
        let id = dir.create_account(&account).await.unwrap();

        let confirmed = dir.confirm_account("room103").await.unwrap();
        assert_eq!(Some(confirmed.id.clone()), id);
        assert_eq!(confirmed.profile(), Some("guest-1d"));
        assert_eq!(confirmed.limit_uptime(), Some("1d"));
        assert_eq!(confirmed.comment(), Some("Ada Lovelace"));
        assert_eq!(confirmed.attributes.get("password"), Some("333333"));
    }

    #[tokio::test]
    async fn test_create_account_duplicate_is_create_error() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let err = dir
            .create_account(&NewAccount::new("room101", "x"))
            .await
            .unwrap_err();

        match err {
            DirectoryError::Create { name, message } => {
                assert_eq!(name, "room101");
                assert!(message.contains("already have user"));
            }
            other => panic!("expected Create, got {other:?}"),
        }
        assert!(dir.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_confirm_account_missing_is_verification_error() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let err = dir.confirm_account("room999").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Verification { name } if name == "room999"));
    }

    #[tokio::test]
    async fn test_set_account_disabled() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        assert!(dir.set_account_disabled("room101", true).await.unwrap());
        let account = dir.confirm_account("room101").await.unwrap();
        assert!(account.is_disabled());

        assert!(!dir.set_account_disabled("room999", true).await.unwrap());
    }

    // =====================================================================
    // Removal
    // =====================================================================

    #[tokio::test]
    async fn test_remove_absent_account_sends_no_remove() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let outcome = dir.remove_account_verified("room999").await.unwrap();

        assert_eq!(outcome, RemovalOutcome::AlreadyAbsent);
        assert!(dir.remove_account("room999").await.unwrap());
        assert_eq!(router.command_count("/ip/hotspot/user/remove"), 0);
    }

    #[tokio::test]
    async fn test_remove_account_verified_removed() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let outcome = dir.remove_account_verified("room101").await.unwrap();

        assert_eq!(outcome, RemovalOutcome::Removed);
        assert_eq!(router.account_names(), vec!["room102"]);
        assert_eq!(router.command_count("/ip/hotspot/user/remove"), 1);
    }

    #[tokio::test]
    async fn test_remove_account_router_ignores_remove_returns_false() {
        let router = router();
        router.set_ignore_removes(true);
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        assert!(!dir.remove_account("room101").await.unwrap());
        assert_eq!(router.account_names(), vec!["room101", "room102"]);
    }

    #[tokio::test]
    async fn test_remove_account_twice_is_idempotent() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::Filtered).await;

        assert!(dir.remove_account("room101").await.unwrap());
        assert!(dir.remove_account("room101").await.unwrap());
        assert_eq!(router.command_count("/ip/hotspot/user/remove"), 1);
    }

    #[tokio::test]
    async fn test_remove_account_refused_is_remove_error() {
        let router = router();
        router.set_refuse_removes(true);
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let err = dir.remove_account("room101").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Remove { name, .. } if name == "room101"));
    }

    // =====================================================================
    // Active sessions
    // =====================================================================

    #[tokio::test]
    async fn test_list_active_sessions() {
        let router = router().with_active("room101", "10.5.50.12", "AA:BB:CC:00:11:22");
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let active = dir.list_active_sessions().await.unwrap();

        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user, "room101");
        assert_eq!(active[0].address(), Some("10.5.50.12"));
        assert_eq!(active[0].mac_address(), Some("AA:BB:CC:00:11:22"));
    }

    #[tokio::test]
    async fn test_terminate_active_session_removes_all_for_user() {
        let router = router()
            .with_active("room101", "10.5.50.12", "AA:BB:CC:00:11:22")
            .with_active("room101", "10.5.50.13", "AA:BB:CC:00:11:23")
            .with_active("room102", "10.5.50.14", "AA:BB:CC:00:11:24");
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        assert!(dir.terminate_active_session("room101").await.unwrap());
        assert_eq!(router.active_users(), vec!["room102"]);
        assert_eq!(router.command_count("/ip/hotspot/active/remove"), 2);
    }

    #[tokio::test]
    async fn test_terminate_active_session_none_is_true() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        assert!(dir.terminate_active_session("room101").await.unwrap());
        assert_eq!(router.command_count("/ip/hotspot/active/remove"), 0);
    }

    #[tokio::test]
    async fn test_terminate_active_session_ignored_returns_false() {
        let router = router().with_active("room101", "10.5.50.12", "AA:BB:CC:00:11:22");
        router.set_ignore_removes(true);
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        assert!(!dir.terminate_active_session("room101").await.unwrap());
    }

    // =====================================================================
    // Diagnostics
    // =====================================================================

    #[tokio::test]
    async fn test_print_returns_raw_records() {
        let router = router().with_rows(
            "/ip/dns/static",
            vec![vec![("name", "portal.hotel.lan"), ("address", "10.5.50.1")]],
        );
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let records = dir.print("/ip/dns/static", &[]).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("address"), Some("10.5.50.1"));

        let empty = dir.print("/log/", &[]).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_print_empty_query_is_refused_without_desync() {
        let router = router().with_rows(
            "/ip/dns/static",
            vec![
                vec![("name", "portal"), ("address", "10.5.50.1")],
                vec![("name", "intranet"), ("address", "10.5.50.2")],
            ],
        );
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let queries = vec![String::new(), "?name=portal".to_string()];
        let err = dir.print("/ip/dns/static", &queries).await.unwrap_err();
        assert!(matches!(
            err,
            DirectoryError::Session(SessionError::Protocol(
                hotspot_protocol::ProtocolError::EmptyWord { index: 1 }
            ))
        ));
        assert_eq!(router.command_count("/ip/dns/static/print"), 0);

        // The session is still in step with the router.
        let accounts = dir.list_accounts().await.unwrap();
        let names: Vec<_> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["room101", "room102"]);
    }

    #[tokio::test]
    async fn test_print_unknown_path_is_command_error() {
        let router = router();
        let mut dir = directory(&router, LookupStrategy::FullScan).await;

        let err = dir.print("/no/such/menu", &[]).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Session(e) if e.is_command()));
        assert!(dir.session().is_authenticated());
    }
}
