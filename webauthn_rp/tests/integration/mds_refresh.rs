use httpmock::prelude::*;

use webauthn_rp::mds::{AllowedAuthenticator, MdsError, MdsRefresher};
use webauthn_rp::storage::{InMemoryTrustAnchorStore, TrustAnchorStore};

use crate::common::*;

#[tokio::test]
async fn test_refresh_installs_and_replaces_anchors() {
    // Given a feed listing two models, one of them allow-listed
    let server = MockServer::start();
    serve_mds(
        &server,
        mds_blob(
            "2099-12-31",
            &[
                (YUBIKEY_NFC, "YubiKey 5 Series with NFC"),
                ("11111111-2222-3333-4444-555555555555", "Some Other Key"),
            ],
        ),
    );
    let store = InMemoryTrustAnchorStore::new();

    // When refreshing with the default allow-list
    let count = MdsRefresher::new(mds_config(&server))
        .unwrap()
        .refresh(&store)
        .await
        .unwrap();

    // Then only the allow-listed model and its root are stored
    assert_eq!(count, 1);
    let roots = store.get_root_certs(YUBIKEY_NFC).await.unwrap().unwrap();
    assert_eq!(roots, vec![pem_to_b64(ATT_ROOT_PEM)]);
    let entry = store.get_entry(YUBIKEY_NFC).await.unwrap().unwrap();
    assert_eq!(entry.status_reports[0].status, "FIDO_CERTIFIED_L2");
}

#[tokio::test]
async fn test_refresh_root_404_keeps_previous_anchors() {
    // Given anchors from an earlier refresh
    let good = MockServer::start();
    serve_mds(
        &good,
        mds_blob("2099-12-31", &[(YUBIKEY_NFC, "YubiKey 5 Series with NFC")]),
    );
    let store = InMemoryTrustAnchorStore::new();
    MdsRefresher::new(mds_config(&good))
        .unwrap()
        .refresh(&store)
        .await
        .unwrap();

    // When the next refresh finds the root certificate URL gone
    let broken = MockServer::start();
    let blob = mds_blob("2099-12-31", &[]);
    broken.mock(|when, then| {
        when.method(GET).path("/blob");
        then.status(200).body(blob);
    });
    broken.mock(|when, then| {
        when.method(GET).path("/root.pem");
        then.status(404);
    });
    let result = MdsRefresher::new(mds_config(&broken))
        .unwrap()
        .refresh(&store)
        .await;

    // Then the refresh fails and the earlier anchors are still served
    assert!(matches!(result, Err(MdsError::DownloadFailed(_))));
    assert_eq!(store.list_aaguids().await.unwrap(), vec![YUBIKEY_NFC]);
    assert!(store.get_root_certs(YUBIKEY_NFC).await.unwrap().is_some());
}

#[tokio::test]
async fn test_refresh_purges_models_dropped_from_feed() {
    let store = InMemoryTrustAnchorStore::new();
    let mut config_list = vec![
        AllowedAuthenticator::new(YUBIKEY_NFC, "YubiKey 5 Series with NFC"),
        AllowedAuthenticator::new("11111111-2222-3333-4444-555555555555", "Some Other Key"),
    ];

    // First feed lists both models
    let first = MockServer::start();
    serve_mds(
        &first,
        mds_blob(
            "2099-12-31",
            &[
                (YUBIKEY_NFC, "YubiKey 5 Series with NFC"),
                ("11111111-2222-3333-4444-555555555555", "Some Other Key"),
            ],
        ),
    );
    let mut config = mds_config(&first);
    config.allow_list = config_list.clone();
    assert_eq!(
        MdsRefresher::new(config).unwrap().refresh(&store).await.unwrap(),
        2
    );

    // Second feed drops one of them
    let second = MockServer::start();
    serve_mds(
        &second,
        mds_blob("2099-12-31", &[(YUBIKEY_NFC, "YubiKey 5 Series with NFC")]),
    );
    let mut config = mds_config(&second);
    config.allow_list = std::mem::take(&mut config_list);
    assert_eq!(
        MdsRefresher::new(config).unwrap().refresh(&store).await.unwrap(),
        1
    );

    assert_eq!(store.list_aaguids().await.unwrap(), vec![YUBIKEY_NFC]);
}

#[tokio::test]
async fn test_refresh_rejects_blob_for_other_host() {
    let server = MockServer::start();
    serve_mds(
        &server,
        mds_blob("2099-12-31", &[(YUBIKEY_NFC, "YubiKey 5 Series with NFC")]),
    );
    let mut config = mds_config(&server);
    config.host = "mds.fidoalliance.org".to_string();
    let store = InMemoryTrustAnchorStore::new();

    let result = MdsRefresher::new(config).unwrap().refresh(&store).await;

    assert!(matches!(result, Err(MdsError::HostMismatch(_))));
    assert!(store.list_aaguids().await.unwrap().is_empty());
}
