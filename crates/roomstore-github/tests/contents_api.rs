use std::time::Duration;

use pretty_assertions::assert_eq;
use roomstore_core::{ContentStore, EntryKind, StoreError, WriteOutcome};
use roomstore_github::{GitHubConfig, GitHubContentStore, RetryPolicy};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CONTENTS: &str = "/repos/acme/rooms/contents";

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
    }
}

fn store_for(server: &MockServer) -> GitHubContentStore {
    let config = GitHubConfig::new("acme/rooms")
        .with_api_url(server.uri())
        .with_token("test-token")
        .with_retry(fast_retry());
    GitHubContentStore::new(config).unwrap()
}

fn file_json(path_str: &str, sha: &str, content_b64: &str) -> serde_json::Value {
    let name = path_str.rsplit('/').next().unwrap();
    json!({
        "name": name,
        "path": path_str,
        "sha": sha,
        "type": "file",
        "size": 5,
        "content": content_b64,
        "encoding": "base64",
        "download_url": format!("https://raw.example/{}", path_str),
    })
}

fn put_response(path_str: &str, sha: &str) -> serde_json::Value {
    let name = path_str.rsplit('/').next().unwrap();
    json!({
        "content": {
            "name": name,
            "path": path_str,
            "sha": sha,
            "type": "file",
            "size": 0,
            "download_url": null,
        },
        "commit": { "sha": "commit-sha" }
    })
}

#[tokio::test]
async fn test_list_directory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms", CONTENTS)))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "415B", "path": "Rooms/415B", "sha": "d1", "type": "dir", "size": 0, "download_url": null},
            {"name": "README.md", "path": "Rooms/README.md", "sha": "f1", "type": "file", "size": 10, "download_url": "https://raw.example/Rooms/README.md"},
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let entries = store.list_children("Rooms").await.unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "415B");
    assert_eq!(entries[0].kind, EntryKind::Dir);
    assert_eq!(entries[0].sha, None);
    assert_eq!(entries[1].kind, EntryKind::File);
    assert_eq!(entries[1].sha.as_deref(), Some("f1"));

    // Repeated listing with no writes in between is identical
    assert_eq!(store.list_children("Rooms").await.unwrap(), entries);
}

#[tokio::test]
async fn test_list_missing_path_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms/nope", CONTENTS)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
        .mount(&server)
        .await;

    let store = store_for(&server);
    assert!(store.list_children("Rooms/nope").await.unwrap().is_empty());
    assert!(store.read_blob("Rooms/nope").await.unwrap().is_none());
    assert_eq!(store.read_text("Rooms/nope").await.unwrap(), "");
}

#[tokio::test]
async fn test_list_file_path_lists_the_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms/415B/1.jpg", CONTENTS)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(file_json("Rooms/415B/1.jpg", "abc", "aGVsbG8=")),
        )
        .mount(&server)
        .await;

    let store = store_for(&server);
    let entries = store.list_children("Rooms/415B/1.jpg").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "Rooms/415B/1.jpg");
    assert_eq!(entries[0].sha.as_deref(), Some("abc"));
}

#[tokio::test]
async fn test_read_blob_decodes_wrapped_base64() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms/415B/info.txt", CONTENTS)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(file_json("Rooms/415B/info.txt", "sha-info", "U2Vjb25k\nIGZsb29y\n")),
        )
        .mount(&server)
        .await;

    let store = store_for(&server);
    let blob = store.read_blob("Rooms/415B/info.txt").await.unwrap().unwrap();
    assert_eq!(blob.sha, "sha-info");
    assert_eq!(blob.content, b"Second floor".to_vec());
    assert_eq!(store.read_text("Rooms/415B/info.txt").await.unwrap(), "Second floor");
}

#[tokio::test]
async fn test_read_large_blob_falls_back_to_download_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms/415B/1.mp4", CONTENTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "1.mp4",
            "path": "Rooms/415B/1.mp4",
            "sha": "big",
            "type": "file",
            "size": 4,
            "content": "",
            "encoding": "none",
            "download_url": format!("{}/raw/Rooms/415B/1.mp4", server.uri()),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/raw/Rooms/415B/1.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8, 1, 2, 3]))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let blob = store.read_blob("Rooms/415B/1.mp4").await.unwrap().unwrap();
    assert_eq!(blob.content, vec![0u8, 1, 2, 3]);
}

#[tokio::test]
async fn test_create_sends_base64_without_sha() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/Rooms/415B/info.txt", CONTENTS)))
        .and(body_partial_json(json!({
            "message": "Create room 415B",
            "content": "",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(put_response("Rooms/415B/info.txt", "new-sha")))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let outcome = store
        .write_blob("Rooms/415B/info.txt", b"", "Create room 415B", None)
        .await
        .unwrap();

    assert_eq!(outcome, WriteOutcome::Created { sha: "new-sha".into() });
    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("sha").is_none());
}

#[tokio::test]
async fn test_update_sends_sha_and_branch() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/Rooms/415B/info.txt", CONTENTS)))
        .and(body_partial_json(json!({
            "content": "aGk=",
            "sha": "old-sha",
            "branch": "content",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(put_response("Rooms/415B/info.txt", "next-sha")))
        .expect(1)
        .mount(&server)
        .await;

    let config = GitHubConfig::new("acme/rooms")
        .with_api_url(server.uri())
        .with_token("test-token")
        .with_branch("content")
        .with_retry(fast_retry());
    let store = GitHubContentStore::new(config).unwrap();

    let outcome = store
        .write_blob("Rooms/415B/info.txt", b"hi", "Update info.txt", Some("old-sha"))
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Updated { sha: "next-sha".into() });
}

#[tokio::test]
async fn test_branch_is_sent_as_ref_on_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms", CONTENTS)))
        .and(query_param("ref", "content"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = GitHubConfig::new("acme/rooms")
        .with_api_url(server.uri())
        .with_branch("content")
        .with_retry(fast_retry());
    let store = GitHubContentStore::new(config).unwrap();
    assert!(store.list_children("Rooms").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_sha_is_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(json!({"message": "Rooms/415B/info.txt does not match old-sha"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"message": "\"sha\" wasn't supplied."})))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store
        .write_blob("Rooms/415B/info.txt", b"x", "m", Some("old-sha"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let err = store.delete_blob("Rooms/415B/1.jpg", "", "m").await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn test_bad_credentials_are_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store.list_children("Rooms").await.unwrap_err();
    assert!(matches!(err, StoreError::Unauthorized(ref m) if m == "Bad credentials"));
}

#[tokio::test]
async fn test_delete_sends_sha() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/Rooms/415B/1.jpg", CONTENTS)))
        .and(body_partial_json(json!({"message": "Delete file 1.jpg", "sha": "abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": null, "commit": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    store
        .delete_blob("Rooms/415B/1.jpg", "abc", "Delete file 1.jpg")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms", CONTENTS)))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms", CONTENTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    assert!(store.list_children("Rooms").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rate_limit_gives_up_after_bounded_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"message": "slow down"})))
        .expect(3) // first attempt + 2 retries
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store.list_children("Rooms").await.unwrap_err();
    assert!(matches!(err, StoreError::RateLimited(_)));
}

#[tokio::test]
async fn test_rename_collision_makes_no_write() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms/415B/1.jpg", CONTENTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("Rooms/415B/1.jpg", "s1", "b25l")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms/415B/2.jpg", CONTENTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("Rooms/415B/2.jpg", "s2", "dHdv")))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store.rename_blob("Rooms/415B/1.jpg", "2.jpg").await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists(ref p) if p == "Rooms/415B/2.jpg"));
}

#[tokio::test]
async fn test_rename_creates_then_deletes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms/415B/1.jpg", CONTENTS)))
        .respond_with(ResponseTemplate::new(200).set_body_json(file_json("Rooms/415B/1.jpg", "s1", "b25l")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/Rooms/415B/9.jpg", CONTENTS)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{}/Rooms/415B/9.jpg", CONTENTS)))
        .and(body_partial_json(json!({"content": "b25l", "message": "Rename 1.jpg to 9.jpg"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(put_response("Rooms/415B/9.jpg", "s9")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("{}/Rooms/415B/1.jpg", CONTENTS)))
        .and(body_partial_json(json!({"sha": "s1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": null})))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let new_path = store.rename_blob("Rooms/415B/1.jpg", "9.jpg").await.unwrap();
    assert_eq!(new_path, "Rooms/415B/9.jpg");
}
