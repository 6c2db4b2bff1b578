//! End-to-end tests over real TCP against the in-process fake router.

use std::sync::Arc;
use std::time::Duration;

use hotspot::prelude::*;
use hotspot_directory::testing::FakeRouter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("hotspot=debug")
        .with_test_writer()
        .try_init();
}

async fn client_for(router: &FakeRouter) -> HotspotClient {
    init_tracing();
    let addr = router.listen().await.unwrap();
    HotspotClient::builder()
        .host(&addr.ip().to_string())
        .port(addr.port())
        .credential("wrong", "nope")
        .credential("hotel-api", "s3cret")
        .io_timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

// =========================================================================
// Connecting
// =========================================================================

#[tokio::test]
async fn test_connect_over_tcp_falls_back_to_valid_credential() {
    let router = FakeRouter::new().with_credential("hotel-api", "s3cret");
    let client = client_for(&router).await;

    let directory = client.connect().await.unwrap();

    assert_eq!(directory.session().credential().unwrap().username, "hotel-api");
    assert_eq!(directory.session().state(), SessionState::Authenticated);
    assert_eq!(router.command_count("/login"), 4);
}

#[tokio::test]
async fn test_connect_all_rejected_is_authentication_error() {
    let router = FakeRouter::new().with_credential("someone-else", "x");
    let client = client_for(&router).await;

    let err = client.connect().await.unwrap_err();

    assert!(err.is_authentication(), "got {err:?}");
    assert!(err.to_string().contains("wrong, hotel-api"));
}

#[tokio::test]
async fn test_connect_nothing_listening_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = HotspotClient::builder()
        .host("127.0.0.1")
        .port(port)
        .credential("hotel-api", "s3cret")
        .build()
        .unwrap();

    let err = client.connect().await.unwrap_err();
    assert!(matches!(
        err,
        HotspotError::Session(SessionError::Connection(TransportError::ConnectFailed { .. }))
    ));
}

// =========================================================================
// Guest lifecycle
// =========================================================================

#[tokio::test]
async fn test_check_in_then_check_out_over_tcp() {
    let router = FakeRouter::new().with_credential("hotel-api", "s3cret");
    let client = client_for(&router).await;
    let mut directory = client.connect().await.unwrap();
    let provisioner = client.provisioner(Arc::new(InMemoryGuestStore::new()));

    let check_in = provisioner
        .check_in(&mut directory, GuestRequest::new("314", "Grace Hopper"))
        .await
        .unwrap();
    assert!(check_in.is_complete());
    assert_eq!(router.account_names(), vec!["room314"]);

    let router = router.with_active("room314", "10.5.50.77", "AA:BB:CC:DD:EE:01");
    let check_out = provisioner.check_out(&mut directory, "314").await.unwrap();

    assert!(check_out.is_complete());
    assert!(router.account_names().is_empty());
    assert!(router.active_users().is_empty());
    let guest = check_out.store.unwrap().unwrap();
    assert_eq!(guest.status, GuestStatus::Disabled);
    assert_eq!(guest.username, "room314");
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let router = FakeRouter::new()
        .with_credential("hotel-api", "s3cret")
        .with_account("room101", "111111");
    let client = client_for(&router).await;
    let mut first = client.connect().await.unwrap();
    let mut second = client.connect().await.unwrap();

    first.disconnect().await;

    assert!(second.find_account_by_name("room101").await.unwrap().is_some());
    assert!(matches!(
        first.list_accounts().await,
        Err(DirectoryError::Session(SessionError::Unusable(SessionState::Disconnected)))
    ));
}

#[tokio::test]
async fn test_concurrent_sessions_on_tasks() {
    let router = FakeRouter::new().with_credential("hotel-api", "s3cret");
    let client = client_for(&router).await;

    let mut tasks = Vec::new();
    for room in ["201", "202", "203"] {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let mut directory = client.connect().await.unwrap();
            let name = format!("room{room}");
            directory
                .create_account(&NewAccount::new(&name, "123456"))
                .await
                .unwrap();
            directory.disconnect().await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let mut names = router.account_names();
    names.sort();
    assert_eq!(names, vec!["room201", "room202", "room203"]);
}
