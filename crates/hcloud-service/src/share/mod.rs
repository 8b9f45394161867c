//! Share links: creation, revocation, and token-based access.

pub mod access;
pub mod link;
pub mod service;

pub use access::{ResolvedShare, ShareInfo};
pub use link::LinkService;
pub use service::{CreateShareRequest, ExpiryPolicy, ShareService, ShareSummary};

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tokio::io::AsyncReadExt;

    use hcloud_core::ErrorKind;
    use hcloud_core::types::FileId;
    use hcloud_entity::share::{ShareTarget, ShareVisibility};

    use super::{CreateShareRequest, ExpiryPolicy};
    use crate::testing::{Harness, user};

    fn request(target: ShareTarget, expiry: Option<ExpiryPolicy>, password: Option<&str>) -> CreateShareRequest {
        CreateShareRequest {
            target,
            expiry,
            password: password.map(str::to_string),
            visibility: ShareVisibility::default(),
        }
    }

    #[test]
    fn test_expiry_policy_resolution() {
        let now = chrono::Utc::now();
        let default = Duration::hours(24);
        assert_eq!(ExpiryPolicy::Forever.resolve(now, default).as_column(), None);
        assert_eq!(
            ExpiryPolicy::Hours(2).resolve(now, default).as_column(),
            Some(now + Duration::hours(2))
        );
        assert_eq!(
            ExpiryPolicy::Days(7).resolve(now, default).as_column(),
            Some(now + Duration::days(7))
        );
        assert_eq!(
            ExpiryPolicy::Hours(-3).resolve(now, default).as_column(),
            Some(now + default)
        );
        assert_eq!(
            ExpiryPolicy::Days(0).resolve(now, default).as_column(),
            Some(now + default)
        );
    }

    #[tokio::test]
    async fn test_resolve_counts_views_and_serves_content() {
        let h = Harness::new().await;
        let ctx = user();
        let uploaded = h.upload(&ctx, "/", "slides.pdf", b"%PDF-1.7 slides").await;

        let share = h
            .shares
            .create_share(&ctx, request(ShareTarget::File(uploaded.file.id), None, None))
            .await
            .expect("share");
        assert_eq!(share.token.len(), 32);
        assert_eq!(share.expires_at, Some(ctx.request_time + Duration::hours(24)));
        assert_eq!(share.view_count, 0);

        let info = h.shares.check_share(&share.token).await.expect("check");
        assert_eq!(info.target_name, "slides.pdf");
        assert!(!info.has_password);
        assert_eq!(info.view_count, 0);

        let mut resolved = h.shares.resolve_share(&share.token, None).await.expect("resolve");
        let mut body = Vec::new();
        resolved.content.read_to_end(&mut body).await.expect("read");
        assert_eq!(body, b"%PDF-1.7 slides");
        assert_eq!(resolved.share.view_count, 1);

        let again = h.shares.resolve_share(&share.token, None).await.expect("again");
        assert_eq!(again.share.view_count, 2);

        h.shares.verify_share(&share.token, None).await.expect("verify");
        assert_eq!(h.shares.check_share(&share.token).await.expect("check").view_count, 2);
    }

    #[tokio::test]
    async fn test_password_is_checked_exactly() {
        let h = Harness::new().await;
        let ctx = user();
        let uploaded = h.upload(&ctx, "/", "a.txt", b"a").await;
        let share = h
            .shares
            .create_share(&ctx, request(ShareTarget::File(uploaded.file.id), None, Some("hunter2")))
            .await
            .expect("share");
        assert!(share.has_password());

        for wrong in [None, Some(""), Some("Hunter2"), Some("hunter2 ")] {
            let err = h.shares.resolve_share(&share.token, wrong).await.expect_err("wrong password");
            assert_eq!(err.kind, ErrorKind::Forbidden);
        }
        let resolved = h.shares.resolve_share(&share.token, Some("hunter2")).await.expect("resolve");
        assert_eq!(resolved.share.view_count, 1);
    }

    #[tokio::test]
    async fn test_empty_password_means_none() {
        let h = Harness::new().await;
        let ctx = user();
        let uploaded = h.upload(&ctx, "/", "a.txt", b"a").await;
        let share = h
            .shares
            .create_share(&ctx, request(ShareTarget::File(uploaded.file.id), None, Some("")))
            .await
            .expect("share");
        assert!(!share.has_password());
        h.shares.resolve_share(&share.token, Some("anything")).await.expect("resolve");
    }

    #[tokio::test]
    async fn test_expiry_is_checked_before_password() {
        let h = Harness::new().await;
        let ctx = user();
        let uploaded = h.upload(&ctx, "/", "a.txt", b"a").await;
        let share = h
            .shares
            .create_share(
                &ctx,
                request(ShareTarget::File(uploaded.file.id), Some(ExpiryPolicy::Hours(1)), Some("pw")),
            )
            .await
            .expect("share");
        let expires_at = share.expires_at.expect("expiry");

        h.shares
            .resolve_share_at(&share.token, Some("pw"), expires_at - Duration::seconds(1))
            .await
            .expect("still valid");
        let err = h
            .shares
            .resolve_share_at(&share.token, Some("wrong"), expires_at)
            .await
            .expect_err("expired");
        assert_eq!(err.kind, ErrorKind::Expired);
    }

    #[tokio::test]
    async fn test_forever_shares_never_expire() {
        let h = Harness::new().await;
        let ctx = user();
        let uploaded = h.upload(&ctx, "/", "a.txt", b"a").await;
        let share = h
            .shares
            .create_share(&ctx, request(ShareTarget::File(uploaded.file.id), Some(ExpiryPolicy::Forever), None))
            .await
            .expect("share");
        assert!(share.expires_at.is_none());

        let far_future = ctx.request_time + Duration::days(365 * 100);
        h.shares
            .resolve_share_at(&share.token, None, far_future)
            .await
            .expect("resolve");
    }

    #[tokio::test]
    async fn test_directory_shares_are_not_served() {
        let h = Harness::new().await;
        let ctx = user();
        let dir = h.directories.create_directory(&ctx, "/", "album").await.expect("dir");
        let share = h
            .shares
            .create_share(&ctx, request(ShareTarget::Directory(dir.id), None, None))
            .await
            .expect("share");

        let info = h.shares.check_share(&share.token).await.expect("check");
        assert_eq!(info.target_type, "directory");
        let err = h.shares.resolve_share(&share.token, None).await.expect_err("dir");
        assert_eq!(err.kind, ErrorKind::NotImplemented);
        assert_eq!(h.shares.check_share(&share.token).await.expect("check").view_count, 0);
    }

    #[tokio::test]
    async fn test_ownership_and_existence_on_create() {
        let h = Harness::new().await;
        let owner = user();
        let other = user();
        let uploaded = h.upload(&owner, "/", "a.txt", b"a").await;

        let err = h
            .shares
            .create_share(&other, request(ShareTarget::File(uploaded.file.id), None, None))
            .await
            .expect_err("foreign file");
        assert_eq!(err.kind, ErrorKind::Forbidden);

        let err = h
            .shares
            .create_share(&owner, request(ShareTarget::File(FileId::new()), None, None))
            .await
            .expect_err("missing file");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_revoke_and_list() {
        let h = Harness::new().await;
        let owner = user();
        let other = user();
        let uploaded = h.upload(&owner, "/", "a.txt", b"a").await;
        let share = h
            .shares
            .create_share(&owner, request(ShareTarget::File(uploaded.file.id), Some(ExpiryPolicy::Forever), Some("pw")))
            .await
            .expect("share");

        let listed = h.shares.list_shares(&owner).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].target_name.as_deref(), Some("a.txt"));
        assert!(listed[0].has_password);
        assert!(listed[0].is_permanent);
        assert!(h.shares.list_shares(&other).await.expect("other").is_empty());

        let err = h.shares.revoke_share(&other, &share.token).await.expect_err("foreign");
        assert_eq!(err.kind, ErrorKind::Forbidden);
        h.shares.revoke_share(&owner, &share.token).await.expect("revoke");

        let err = h.shares.check_share(&share.token).await.expect_err("gone");
        assert_eq!(err.kind, ErrorKind::NotFound);
        let err = h.shares.revoke_share(&owner, &share.token).await.expect_err("twice");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_token_is_not_found() {
        let h = Harness::new().await;
        let err = h.shares.resolve_share("deadbeef", None).await.expect_err("unknown");
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
