//! Share links from creation through expiry and revocation.

use chrono::Duration;
use tokio::io::AsyncReadExt;

use hcloud_core::ErrorKind;
use hcloud_entity::share::{ShareTarget, ShareVisibility};
use hcloud_service::{CreateShareRequest, ExpiryPolicy};

use crate::helpers::{TestApp, new_user};

fn file_share(
    target: ShareTarget,
    expiry: Option<ExpiryPolicy>,
    password: Option<&str>,
) -> CreateShareRequest {
    CreateShareRequest {
        target,
        expiry,
        password: password.map(str::to_string),
        visibility: ShareVisibility::default(),
    }
}

#[tokio::test]
async fn test_protected_share_end_to_end() {
    let app = TestApp::new().await;
    let owner = new_user();
    let uploaded = app.upload(&owner, "/", "photo.png", b"\x89PNG fake").await;

    let share = app
        .shares
        .create_share(
            &owner,
            file_share(
                ShareTarget::File(uploaded.file.id),
                Some(ExpiryPolicy::Days(3)),
                Some("open sesame"),
            ),
        )
        .await
        .expect("Failed to create share");
    assert_eq!(share.token.len(), 2 * app.config.share.token_bytes);
    assert!(share.token.chars().all(|c| c.is_ascii_hexdigit()));

    let info = app.shares.check_share(&share.token).await.expect("check");
    assert!(info.has_password);
    assert_eq!(info.size_bytes, Some(9));

    let err = app
        .shares
        .resolve_share(&share.token, Some("wrong"))
        .await
        .expect_err("wrong password");
    assert_eq!(err.kind, ErrorKind::Forbidden);

    let mut resolved = app
        .shares
        .resolve_share(&share.token, Some("open sesame"))
        .await
        .expect("resolve");
    let mut body = Vec::new();
    resolved.content.read_to_end(&mut body).await.expect("read");
    assert_eq!(body, b"\x89PNG fake");
    assert_eq!(resolved.file.id, uploaded.file.id);

    let expires_at = share.expires_at.expect("three day expiry");
    assert_eq!(expires_at, owner.request_time + Duration::days(3));
    let err = app
        .shares
        .resolve_share_at(&share.token, Some("open sesame"), expires_at + Duration::seconds(1))
        .await
        .expect_err("expired");
    assert_eq!(err.kind, ErrorKind::Expired);

    let listed = app.shares.list_shares(&owner).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].view_count, 1);
}

#[tokio::test]
async fn test_share_of_recycled_file_stops_resolving() {
    let app = TestApp::new().await;
    let owner = new_user();
    let uploaded = app.upload(&owner, "/", "notes.txt", b"n").await;
    let share = app
        .shares
        .create_share(&owner, file_share(ShareTarget::File(uploaded.file.id), None, None))
        .await
        .expect("share");

    app.files.delete_file(&owner, uploaded.file.id).await.expect("delete");

    let err = app
        .shares
        .resolve_share(&share.token, None)
        .await
        .expect_err("target gone");
    assert_eq!(err.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn test_tokens_are_unique() {
    let app = TestApp::new().await;
    let owner = new_user();
    let uploaded = app.upload(&owner, "/", "a.txt", b"a").await;

    let mut tokens = std::collections::HashSet::new();
    for _ in 0..20 {
        let share = app
            .shares
            .create_share(&owner, file_share(ShareTarget::File(uploaded.file.id), None, None))
            .await
            .expect("share");
        assert!(tokens.insert(share.token));
    }
    assert_eq!(app.shares.list_shares(&owner).await.expect("list").len(), 20);
}
