//! Diagnostic CLI for a router's hotspot.
//!
//! # Usage
//!
//! ```bash
//! # Against a real router, settings from a TOML file
//! hotspot-admin --config hotspot.toml list
//!
//! # Settings on the command line
//! hotspot-admin --host 10.5.50.1 --user hotel-api --password s3cret active
//!
//! # Against an in-process fake router with a couple of sample accounts
//! hotspot-admin --fake check-in 101 "Ada Lovelace"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use hotspot::prelude::*;
use hotspot_directory::testing::FakeRouter;
use serde_json::{Value, json};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Inspect and manage hotspot accounts on a router
#[derive(Parser, Debug)]
#[command(name = "hotspot-admin")]
#[command(version)]
struct Args {
    /// TOML config file (host, credentials, timeouts)
    #[arg(short, long, conflicts_with = "fake")]
    config: Option<PathBuf>,

    /// Router host, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Router API port, overrides the config file
    #[arg(long)]
    port: Option<u16>,

    /// API username, tried before any credentials from the config file
    #[arg(short, long)]
    user: Option<String>,

    /// API password for --user
    #[arg(short, long, requires = "user")]
    password: Option<String>,

    /// Use lookup via `?name=` queries instead of full scans
    #[arg(long)]
    filtered: bool,

    /// Run against an in-process fake router instead of real hardware
    #[arg(long)]
    fake: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// List hotspot user accounts
    List,
    /// List active hotspot sessions
    Active,
    /// Create a hotspot account
    Add {
        name: String,
        secret: String,
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        limit_uptime: Option<String>,
        #[arg(long)]
        comment: Option<String>,
    },
    /// Remove a hotspot account and verify it is gone
    Remove { name: String },
    /// Enable or disable an account
    Disable {
        name: String,
        /// Re-enable instead
        #[arg(long)]
        undo: bool,
    },
    /// Log out every active session of a user
    Kick { user: String },
    /// Print any table, e.g. `/ip/dns/static` or `/log`
    Print {
        path: String,
        /// Query words such as `?topics=hotspot`
        queries: Vec<String>,
    },
    /// Create an account for a room and print the guest's credentials
    ///
    /// Guest records live in a store that only lasts for this invocation.
    CheckIn { room: String, guest: String },
    /// Remove a room's account and active sessions
    ///
    /// The guest store is per-invocation, so a guest recorded by an earlier
    /// `check-in` is not found; the username is derived from the room.
    CheckOut { room: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = if args.fake {
        fake_router_config(&args).await?
    } else {
        client_config(&args)?
    };
    let client = HotspotClient::from_config(config)?;
    let mut directory = client.connect().await.context("connecting to router")?;

    let output = run(&client, &mut directory, args.command).await;
    directory.disconnect().await;

    println!("{}", serde_json::to_string_pretty(&output?)?);
    Ok(())
}

/// Builds the client config from `--config` plus command-line overrides.
fn client_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::read(path)?,
        None => ClientConfig::default(),
    };

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(user) = &args.user {
        let password = args.password.as_deref().unwrap_or_default();
        config.credentials.insert(0, Credential::new(user.as_str(), password));
    }
    if args.filtered {
        config.directory.lookup = LookupStrategy::Filtered;
    }
    if config.host.is_empty() {
        bail!("no router given: pass --host, --config, or --fake");
    }
    Ok(config)
}

/// Starts a fake router on loopback and points a config at it.
async fn fake_router_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let router = FakeRouter::new()
        .with_credential("admin", "")
        .with_account("room101", "482913")
        .with_account("room102", "775120")
        .with_active("room101", "10.5.50.12", "3C:22:FB:10:4A:01")
        .with_rows(
            "/ip/hotspot/walled-garden",
            vec![vec![("dst-host", "*.hotel.example"), ("action", "allow")]],
        );
    let addr = router.listen().await.context("starting fake router")?;
    tracing::info!(%addr, "fake router listening");

    let mut config = ClientConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        credentials: vec![Credential::new("admin", "")],
        ..ClientConfig::default()
    };
    if args.filtered {
        config.directory.lookup = LookupStrategy::Filtered;
    }
    Ok(config)
}

async fn run(
    client: &HotspotClient,
    directory: &mut HotspotDirectory<TcpConnection>,
    command: Command,
) -> anyhow::Result<Value> {
    let output = match command {
        Command::List => json!(directory.list_accounts().await?),
        Command::Active => json!(directory.list_active_sessions().await?),
        Command::Add {
            name,
            secret,
            profile,
            limit_uptime,
            comment,
        } => {
            let mut account = NewAccount::new(name, secret);
            account.profile = profile;
            account.limit_uptime = limit_uptime;
            account.comment = comment;
            let id = directory.create_account(&account).await?;
            let confirmed = directory.confirm_account(&account.name).await?;
            json!({ "id": id, "account": confirmed })
        }
        Command::Remove { name } => {
            let outcome = directory.remove_account_verified(&name).await?;
            json!({ "name": name, "outcome": outcome })
        }
        Command::Disable { name, undo } => {
            let found = directory.set_account_disabled(&name, !undo).await?;
            if !found {
                bail!("no hotspot account named {name}");
            }
            json!({ "name": name, "disabled": !undo })
        }
        Command::Kick { user } => {
            let cleared = directory.terminate_active_session(&user).await?;
            json!({ "user": user, "cleared": cleared })
        }
        Command::Print { path, queries } => json!(directory.print(&path, &queries).await?),
        Command::CheckIn { room, guest } => {
            let provisioner = client.provisioner(Arc::new(InMemoryGuestStore::new()));
            let report = provisioner
                .check_in(directory, GuestRequest::new(room, guest))
                .await?;
            json!({
                "guest": report.guest,
                "router": outcome(&report.router),
                "store": outcome(&report.store),
            })
        }
        Command::CheckOut { room } => {
            let provisioner = client.provisioner(Arc::new(InMemoryGuestStore::new()));
            let report = provisioner.check_out(directory, &room).await?;
            json!({
                "username": report.username,
                "session": outcome(&report.session),
                "router": outcome(&report.router),
                "verified_absent": report.verified_absent,
                "store": outcome(&report.store),
            })
        }
    };
    Ok(output)
}

/// Renders one step of a report as `{"ok": ...}` or `{"error": "..."}`.
fn outcome<T: serde::Serialize, E: std::fmt::Display>(result: &Result<T, E>) -> Value {
    match result {
        Ok(value) => json!({ "ok": value }),
        Err(e) => json!({ "error": e.to_string() }),
    }
}
