//! B2 backend against a mock B2 API.

use bytes::Bytes;
use mockito::{Matcher, Mock, Server, ServerGuard};
use quire_core::constants::{PLACEHOLDER_BANNER_URL, PLACEHOLDER_IMAGE_URL};
use quire_storage::{
    is_placeholder_url, AssetStorage, B2Credentials, B2Storage, StorageError, UploadOutcome,
};
use serde_json::json;
use std::time::Duration;

const BUCKET: &str = "quire-assets";
const BASIC_AUTH: &str = "Basic a2V5LWlkOmFwcC1rZXk=";
const IMAGE: &[u8] = b"hello image";
const IMAGE_SHA1: &str = "3818c19e73f1ae3c25376cb051692246b0e75836";

fn credentials() -> B2Credentials {
    B2Credentials {
        key_id: Some("key-id".to_string()),
        application_key: Some("app-key".to_string()),
        bucket_name: Some(BUCKET.to_string()),
    }
}

fn storage_with(server: &ServerGuard, credentials: B2Credentials, ttl: Duration) -> B2Storage {
    B2Storage::new(
        &server.url(),
        credentials,
        ttl,
        Duration::from_secs(5),
        "quire",
    )
    .unwrap()
}

fn storage(server: &ServerGuard) -> B2Storage {
    storage_with(server, credentials(), Duration::from_secs(22 * 3600))
}

async fn mock_authorize(server: &mut ServerGuard, expect: usize) -> Mock {
    let body = json!({
        "accountId": "acc-1",
        "authorizationToken": "auth-token",
        "apiUrl": server.url(),
        "downloadUrl": server.url(),
    });
    server
        .mock("GET", "/b2api/v2/b2_authorize_account")
        .match_header("authorization", BASIC_AUTH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(expect)
        .create_async()
        .await
}

async fn mock_list_buckets(server: &mut ServerGuard, expect: usize) -> Mock {
    let body = json!({
        "buckets": [
            { "bucketId": "bucket-0", "bucketName": "someone-else" },
            { "bucketId": "bucket-1", "bucketName": BUCKET },
        ]
    });
    server
        .mock("POST", "/b2api/v2/b2_list_buckets")
        .match_header("authorization", "auth-token")
        .match_body(Matcher::PartialJson(json!({ "accountId": "acc-1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(expect)
        .create_async()
        .await
}

async fn mock_get_upload_url(server: &mut ServerGuard, expect: usize) -> Mock {
    let body = json!({
        "bucketId": "bucket-1",
        "uploadUrl": format!("{}/upload/bucket-1", server.url()),
        "authorizationToken": "upload-token",
    });
    server
        .mock("POST", "/b2api/v2/b2_get_upload_url")
        .match_header("authorization", "auth-token")
        .match_body(Matcher::PartialJson(json!({ "bucketId": "bucket-1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(expect)
        .create_async()
        .await
}

async fn mock_upload(server: &mut ServerGuard, expect: usize) -> Mock {
    server
        .mock("POST", "/upload/bucket-1")
        .match_header("authorization", "upload-token")
        .match_header("x-bz-content-sha1", IMAGE_SHA1)
        .match_header("x-bz-info-author", "quire")
        .match_header("x-bz-info-cache-control", Matcher::Any)
        .match_header("x-bz-file-name", Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "fileId": "4_zfile", "fileName": "ignored" }).to_string())
        .expect(expect)
        .create_async()
        .await
}

#[tokio::test]
async fn test_upload_returns_public_url() {
    let mut server = Server::new_async().await;
    let auth = mock_authorize(&mut server, 1).await;
    let buckets = mock_list_buckets(&mut server, 1).await;
    let upload_url = mock_get_upload_url(&mut server, 1).await;
    let upload = server
        .mock("POST", "/upload/bucket-1")
        .match_header("authorization", "upload-token")
        .match_header("content-type", "image/png")
        .match_header("x-bz-content-sha1", IMAGE_SHA1)
        .match_header(
            "x-bz-file-name",
            Matcher::Regex(r"^profiles%2F[0-9a-f\-]{36}\.png$".to_string()),
        )
        .match_header("x-bz-info-author", "quire")
        .match_header(
            "x-bz-info-cache-control",
            "public%2C%20max-age%3D86400",
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "fileId": "4_zfile", "fileName": "ignored" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let storage = storage(&server);
    let outcome = storage
        .upload(Bytes::from_static(IMAGE), "me.png", "image/png", Some("profiles"))
        .await;

    let asset = outcome.stored().expect("upload should be stored");
    let prefix = format!("{}/file/{}/profiles/", server.url(), BUCKET);
    assert!(asset.url.starts_with(&prefix), "unexpected url {}", asset.url);
    assert!(asset.url.ends_with(".png"));
    assert!(asset.url.ends_with(&asset.object_name));
    assert_eq!(asset.file_id.as_deref(), Some("4_zfile"));

    auth.assert_async().await;
    buckets.assert_async().await;
    upload_url.assert_async().await;
    upload.assert_async().await;
}

#[tokio::test]
async fn test_identical_uploads_get_distinct_urls_and_share_session() {
    let mut server = Server::new_async().await;
    let auth = mock_authorize(&mut server, 1).await;
    let buckets = mock_list_buckets(&mut server, 1).await;
    let upload_url = mock_get_upload_url(&mut server, 2).await;
    let upload = mock_upload(&mut server, 2).await;

    let storage = storage(&server);
    let first = storage
        .upload(Bytes::from_static(IMAGE), "cover.jpg", "image/jpeg", Some("articles"))
        .await;
    let second = storage
        .upload(Bytes::from_static(IMAGE), "cover.jpg", "image/jpeg", Some("articles"))
        .await;

    assert!(first.is_stored());
    assert!(second.is_stored());
    assert_ne!(first.url(), second.url());

    auth.assert_async().await;
    buckets.assert_async().await;
    upload_url.assert_async().await;
    upload.assert_async().await;
}

#[tokio::test]
async fn test_upload_to_bucket_root() {
    let mut server = Server::new_async().await;
    let _auth = mock_authorize(&mut server, 1).await;
    let _buckets = mock_list_buckets(&mut server, 1).await;
    let _upload_url = mock_get_upload_url(&mut server, 1).await;
    let _upload = mock_upload(&mut server, 1).await;

    let outcome = storage(&server)
        .upload(Bytes::from_static(IMAGE), "photo", "image/webp", Some(""))
        .await;

    let asset = outcome.stored().unwrap();
    assert!(!asset.object_name.contains('/'));
    assert!(!asset.object_name.contains('.'));
}

#[tokio::test]
async fn test_session_refreshed_once_after_expiry() {
    let mut server = Server::new_async().await;
    let auth = mock_authorize(&mut server, 2).await;
    let buckets = mock_list_buckets(&mut server, 2).await;

    let storage = storage_with(&server, credentials(), Duration::from_millis(300));

    let first = storage.session().await.unwrap();
    let reused = storage.session().await.unwrap();
    assert_eq!(first.expires_at, reused.expires_at);

    tokio::time::sleep(Duration::from_millis(400)).await;

    let refreshed = storage.session().await.unwrap();
    assert!(refreshed.expires_at > first.expires_at);
    assert_eq!(refreshed.bucket_id, "bucket-1");

    auth.assert_async().await;
    buckets.assert_async().await;
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let mut server = Server::new_async().await;
    let auth = mock_authorize(&mut server, 1).await;
    let buckets = mock_list_buckets(&mut server, 1).await;

    let storage = storage(&server);
    let (a, b, c, d) = tokio::join!(
        storage.session(),
        storage.session(),
        storage.session(),
        storage.session()
    );

    let a = a.unwrap();
    for other in [b.unwrap(), c.unwrap(), d.unwrap()] {
        assert_eq!(a.expires_at, other.expires_at);
    }

    auth.assert_async().await;
    buckets.assert_async().await;
}

#[tokio::test]
async fn test_missing_credentials_returns_generic_placeholder() {
    let mut server = Server::new_async().await;
    let auth = mock_authorize(&mut server, 0).await;

    let storage = storage_with(
        &server,
        B2Credentials {
            key_id: None,
            application_key: None,
            bucket_name: None,
        },
        Duration::from_secs(3600),
    );
    let outcome = storage
        .upload(Bytes::from_static(IMAGE), "a.png", "image/png", None)
        .await;

    assert_eq!(outcome.url(), PLACEHOLDER_IMAGE_URL);
    assert!(matches!(outcome.error(), Some(StorageError::Config(_))));

    auth.assert_async().await;
}

#[tokio::test]
async fn test_unknown_bucket_returns_placeholder() {
    let mut server = Server::new_async().await;
    let _auth = mock_authorize(&mut server, 1).await;
    let _buckets = mock_list_buckets(&mut server, 1).await;
    let upload_url = mock_get_upload_url(&mut server, 0).await;

    let mut creds = credentials();
    creds.bucket_name = Some("missing-bucket".to_string());
    let storage = storage_with(&server, creds, Duration::from_secs(3600));

    let outcome = storage
        .upload(Bytes::from_static(IMAGE), "a.png", "image/png", None)
        .await;

    assert_eq!(outcome.url(), PLACEHOLDER_IMAGE_URL);
    assert!(matches!(
        outcome.error(),
        Some(StorageError::BucketNotFound(name)) if name == "missing-bucket"
    ));

    upload_url.assert_async().await;
}

#[tokio::test]
async fn test_rejected_authorization_keeps_status_and_body() {
    let mut server = Server::new_async().await;
    let _auth = server
        .mock("GET", "/b2api/v2/b2_authorize_account")
        .with_status(401)
        .with_body(r#"{"code":"unauthorized","message":"bad key"}"#)
        .create_async()
        .await;

    let outcome = storage(&server)
        .upload(Bytes::from_static(IMAGE), "a.png", "image/png", Some("profiles"))
        .await;

    assert!(is_placeholder_url(outcome.url()));
    match outcome {
        UploadOutcome::Degraded {
            error: StorageError::Auth { status, body, .. },
            ..
        } => {
            assert_eq!(status, 401);
            assert!(body.contains("bad key"));
        }
        other => panic!("expected auth failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_upload_returns_folder_placeholder() {
    let mut server = Server::new_async().await;
    let _auth = mock_authorize(&mut server, 1).await;
    let _buckets = mock_list_buckets(&mut server, 1).await;
    let _upload_url = mock_get_upload_url(&mut server, 1).await;
    let _upload = server
        .mock("POST", "/upload/bucket-1")
        .with_status(503)
        .with_body(r#"{"code":"service_unavailable"}"#)
        .create_async()
        .await;

    let outcome = storage(&server)
        .upload(Bytes::from_static(IMAGE), "wide.jpg", "image/jpeg", Some("banners"))
        .await;

    assert_eq!(outcome.url(), PLACEHOLDER_BANNER_URL);
    assert!(matches!(
        outcome.error(),
        Some(StorageError::UploadProtocol { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_unauthorized_upload_drops_session_without_retry() {
    let mut server = Server::new_async().await;
    let auth = mock_authorize(&mut server, 2).await;
    let buckets = mock_list_buckets(&mut server, 2).await;
    let upload_url = server
        .mock("POST", "/b2api/v2/b2_get_upload_url")
        .with_status(401)
        .with_body(r#"{"code":"expired_auth_token"}"#)
        .expect(2)
        .create_async()
        .await;

    let storage = storage(&server);
    let first = storage
        .upload(Bytes::from_static(IMAGE), "a.png", "image/png", None)
        .await;
    let second = storage
        .upload(Bytes::from_static(IMAGE), "a.png", "image/png", None)
        .await;

    assert!(!first.is_stored());
    assert!(!second.is_stored());

    // One authorization per failed call, no retries inside a call.
    auth.assert_async().await;
    buckets.assert_async().await;
    upload_url.assert_async().await;
}

#[tokio::test]
async fn test_upload_then_delete() {
    let mut server = Server::new_async().await;
    let _auth = mock_authorize(&mut server, 1).await;
    let _buckets = mock_list_buckets(&mut server, 1).await;
    let _upload_url = mock_get_upload_url(&mut server, 1).await;
    let _upload = mock_upload(&mut server, 1).await;

    let storage = storage(&server);
    let outcome = storage
        .upload(Bytes::from_static(IMAGE), "me.png", "image/png", Some("profiles"))
        .await;
    let asset = outcome.stored().unwrap().clone();

    let list = server
        .mock("POST", "/b2api/v2/b2_list_file_names")
        .match_header("authorization", "auth-token")
        .match_body(Matcher::PartialJson(json!({
            "bucketId": "bucket-1",
            "prefix": asset.object_name,
            "maxFileCount": 1,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "files": [{ "fileId": "4_zfile", "fileName": asset.object_name }] })
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let delete = server
        .mock("POST", "/b2api/v2/b2_delete_file_version")
        .match_header("authorization", "auth-token")
        .match_body(Matcher::PartialJson(json!({
            "fileId": "4_zfile",
            "fileName": asset.object_name,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "fileId": "4_zfile", "fileName": asset.object_name }).to_string())
        .expect(1)
        .create_async()
        .await;

    assert!(storage.delete(&asset.url).await);

    list.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn test_delete_missing_object_returns_false() {
    let mut server = Server::new_async().await;
    let _auth = mock_authorize(&mut server, 1).await;
    let _buckets = mock_list_buckets(&mut server, 1).await;
    let _list = server
        .mock("POST", "/b2api/v2/b2_list_file_names")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"files":[],"nextFileName":null}"#)
        .create_async()
        .await;
    let delete = server
        .mock("POST", "/b2api/v2/b2_delete_file_version")
        .expect(0)
        .create_async()
        .await;

    let storage = storage(&server);
    let url = format!("{}/file/{}/profiles/gone.png", server.url(), BUCKET);

    assert!(matches!(
        storage.try_delete(&url).await,
        Err(StorageError::NotFound(name)) if name == "profiles/gone.png"
    ));
    assert!(!storage.delete(&url).await);

    delete.assert_async().await;
}

#[tokio::test]
async fn test_delete_ignores_prefix_only_match() {
    let mut server = Server::new_async().await;
    let _auth = mock_authorize(&mut server, 1).await;
    let _buckets = mock_list_buckets(&mut server, 1).await;
    let _list = server
        .mock("POST", "/b2api/v2/b2_list_file_names")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "files": [{ "fileId": "x", "fileName": "profiles/abc.png.bak" }] })
                .to_string(),
        )
        .create_async()
        .await;
    let delete = server
        .mock("POST", "/b2api/v2/b2_delete_file_version")
        .expect(0)
        .create_async()
        .await;

    let url = format!("{}/file/{}/profiles/abc.png", server.url(), BUCKET);
    assert!(!storage(&server).delete(&url).await);

    delete.assert_async().await;
}

#[tokio::test]
async fn test_delete_foreign_url_makes_no_requests() {
    let mut server = Server::new_async().await;
    let auth = mock_authorize(&mut server, 0).await;
    let list = server
        .mock("POST", "/b2api/v2/b2_list_file_names")
        .expect(0)
        .create_async()
        .await;

    let storage = storage(&server);
    let foreign = format!("{}/file/other-bucket/profiles/a.png", server.url());

    assert!(!storage.delete(&foreign).await);
    assert!(!storage.delete("definitely not a url").await);
    assert!(matches!(
        storage.try_delete(&foreign).await,
        Err(StorageError::ForeignUrl(_))
    ));

    auth.assert_async().await;
    list.assert_async().await;
}

#[tokio::test]
async fn test_delete_rejected_upstream_returns_false() {
    let mut server = Server::new_async().await;
    let _auth = mock_authorize(&mut server, 1).await;
    let _buckets = mock_list_buckets(&mut server, 1).await;
    let _list = server
        .mock("POST", "/b2api/v2/b2_list_file_names")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({ "files": [{ "fileId": "x", "fileName": "banners/b.jpg" }] }).to_string(),
        )
        .create_async()
        .await;
    let _delete = server
        .mock("POST", "/b2api/v2/b2_delete_file_version")
        .with_status(400)
        .with_body(r#"{"code":"bad_request"}"#)
        .create_async()
        .await;

    let storage = storage(&server);
    let url = format!("{}/file/{}/banners/b.jpg", server.url(), BUCKET);

    assert!(matches!(
        storage.try_delete(&url).await,
        Err(StorageError::DeletionProtocol { status: 400, .. })
    ));
    assert!(!storage.delete(&url).await);
}
