//! Integration tests for on-demand downloads
//!
//! Resources are stored directly, then downloaded from a wiremock server.

use std::sync::Arc;
use web_resource_scanner::config::{Config, DownloadConfig};
use web_resource_scanner::crawler::{DownloadContext, DownloadManager};
use web_resource_scanner::model::{NewScanSession, NewWebResource};
use web_resource_scanner::storage::{
    lock_storage, shared, InsertOutcome, SharedStorage, SqliteStorage, Storage,
};
use web_resource_scanner::{ResourceType, ScannerError};
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> Config {
    let mut config = Config::default();
    config.fetcher.request_timeout_secs = 5;
    config.fetcher.connect_timeout_secs = 1;
    config.download = DownloadConfig {
        max_attempts: 3,
        backoff_base_ms: 10,
    };
    config
}

fn context() -> DownloadContext {
    DownloadContext {
        client_ip: Some("203.0.113.7".to_string()),
        user_agent: Some("Mozilla/5.0 (test)".to_string()),
    }
}

/// Stores a session and one resource pointing at `url`
fn seed(storage: &SharedStorage, session: NewScanSession, url: &str) -> i64 {
    let mut guard = lock_storage(storage).unwrap();
    let session_id = guard.create_session(&session).unwrap();
    let outcome = guard
        .insert_resource(
            &NewWebResource {
                scan_session_id: session_id,
                url: url.to_string(),
                relative_path: "/file.pdf".to_string(),
                resource_type: ResourceType::Pdf,
                file_extension: "pdf".to_string(),
                source_element: Some("a".to_string()),
            },
            None,
        )
        .unwrap();
    match outcome {
        InsertOutcome::Inserted(id) => id,
        other => panic!("unexpected insert outcome {:?}", other),
    }
}

fn manager(storage: &SharedStorage) -> DownloadManager {
    DownloadManager::new(&test_config(), Arc::clone(storage)).unwrap()
}

#[tokio::test]
async fn test_successful_download_records_history() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let storage = shared(SqliteStorage::new_in_memory().unwrap());
    let resource_id = seed(
        &storage,
        NewScanSession::new(server.uri()),
        &format!("{}/file.pdf", server.uri()),
    );

    let outcome = manager(&storage).download(resource_id, &context()).await.unwrap();
    assert!(outcome.succeeded());
    assert_eq!(outcome.content.as_deref(), Some(&b"%PDF-1.4"[..]));
    assert_eq!(outcome.history.file_size_bytes, Some(8));
    assert_eq!(outcome.history.client_ip.as_deref(), Some("203.0.113.7"));
    assert_eq!(outcome.history.user_agent.as_deref(), Some("Mozilla/5.0 (test)"));
    assert!(outcome.history.download_duration_seconds.is_some());

    let guard = lock_storage(&storage).unwrap();
    let resource = guard.get_resource(resource_id).unwrap();
    assert_eq!(resource.download_attempts, 1);
    assert!(resource.last_download_at.is_some());
    assert_eq!(guard.list_download_history(resource_id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_attempts_increase_by_one_per_call() {
    let server = MockServer::start().await;
    Mock::given(path("/file.pdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let storage = shared(SqliteStorage::new_in_memory().unwrap());
    let resource_id = seed(
        &storage,
        NewScanSession::new(server.uri()),
        &format!("{}/file.pdf", server.uri()),
    );
    let manager = manager(&storage);

    let mut previous = None;
    for call in 1..=3u32 {
        let outcome = manager.download(resource_id, &context()).await.unwrap();
        assert!(!outcome.succeeded());

        let resource = lock_storage(&storage).unwrap().get_resource(resource_id).unwrap();
        assert_eq!(resource.download_attempts, call);
        let at = resource.last_download_at.expect("last_download_at set");
        if let Some(prev) = previous {
            assert!(at >= prev);
        }
        previous = Some(at);
    }

    let history = lock_storage(&storage)
        .unwrap()
        .list_download_history(resource_id)
        .unwrap();
    assert_eq!(history.len(), 3);
    assert!(history.iter().all(|h| !h.success));
    assert!(history
        .iter()
        .all(|h| h.error_message.as_deref() == Some("HTTP 404")));
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(path("/file.pdf"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let storage = shared(SqliteStorage::new_in_memory().unwrap());
    let resource_id = seed(
        &storage,
        NewScanSession::new(server.uri()),
        &format!("{}/file.pdf", server.uri()),
    );

    let outcome = manager(&storage).download(resource_id, &context()).await.unwrap();
    assert!(!outcome.succeeded());
    assert!(outcome.content.is_none());

    // Retries inside one call still count as a single attempt
    let resource = lock_storage(&storage).unwrap().get_resource(resource_id).unwrap();
    assert_eq!(resource.download_attempts, 1);
}

#[tokio::test]
async fn test_retry_recovers_from_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(path("/file.pdf"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/file.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"ok".to_vec(), "text/plain"))
        .expect(1)
        .mount(&server)
        .await;

    let storage = shared(SqliteStorage::new_in_memory().unwrap());
    let resource_id = seed(
        &storage,
        NewScanSession::new(server.uri()),
        &format!("{}/file.pdf", server.uri()),
    );

    let outcome = manager(&storage).download(resource_id, &context()).await.unwrap();
    assert!(outcome.succeeded());
    assert_eq!(outcome.content.as_deref(), Some(&b"ok"[..]));
}

#[tokio::test]
async fn test_auth_rejection_not_retried() {
    let server = MockServer::start().await;
    Mock::given(path("/file.pdf"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let storage = shared(SqliteStorage::new_in_memory().unwrap());
    let resource_id = seed(
        &storage,
        NewScanSession::new(server.uri()),
        &format!("{}/file.pdf", server.uri()),
    );

    let outcome = manager(&storage).download(resource_id, &context()).await.unwrap();
    assert!(!outcome.succeeded());
    assert!(outcome
        .history
        .error_message
        .as_deref()
        .is_some_and(|m| m.contains("401")));
}

#[tokio::test]
async fn test_session_credentials_are_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/file.pdf"))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"data".to_vec(), "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let storage = shared(SqliteStorage::new_in_memory().unwrap());
    let session = NewScanSession {
        auth_token: Some("s3cret".to_string()),
        ..NewScanSession::new(server.uri())
    };
    let resource_id = seed(&storage, session, &format!("{}/file.pdf", server.uri()));

    let outcome = manager(&storage).download(resource_id, &context()).await.unwrap();
    assert!(outcome.succeeded());
}

/// Base URL of a local port nothing listens on
fn closed_port_base() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn test_network_failure_retried_then_recorded() {
    let base = closed_port_base();
    let storage = shared(SqliteStorage::new_in_memory().unwrap());
    let resource_id = seed(
        &storage,
        NewScanSession::new(base.clone()),
        &format!("{}/file.pdf", base),
    );

    let outcome = manager(&storage).download(resource_id, &context()).await.unwrap();
    assert!(!outcome.succeeded());
    assert!(outcome
        .history
        .error_message
        .as_deref()
        .is_some_and(|m| m.starts_with("Network error")));

    // Three attempts sleep 10ms then 20ms between them
    let elapsed = outcome.history.download_duration_seconds.unwrap();
    assert!(elapsed >= 0.03, "expected both backoff delays, took {}s", elapsed);

    let resource = lock_storage(&storage).unwrap().get_resource(resource_id).unwrap();
    assert_eq!(resource.download_attempts, 1);
}

#[tokio::test]
async fn test_credentials_withheld_from_other_hosts() {
    let server = MockServer::start().await;
    let port = server.address().port();
    Mock::given(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/lib.js"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"x".to_vec(), "text/javascript"))
        .expect(1)
        .mount(&server)
        .await;

    let storage = shared(SqliteStorage::new_in_memory().unwrap());
    let session = NewScanSession {
        username: Some("admin".to_string()),
        password: Some("secret".to_string()),
        ..NewScanSession::new(format!("http://localhost:{}/", port))
    };
    let resource_id = seed(
        &storage,
        session,
        &format!("http://127.0.0.1:{}/lib.js", port),
    );

    let outcome = manager(&storage).download(resource_id, &context()).await.unwrap();
    assert!(outcome.succeeded());
}

#[tokio::test]
async fn test_unknown_resource_is_an_error() {
    let storage = shared(SqliteStorage::new_in_memory().unwrap());
    let result = manager(&storage).download(999, &context()).await;
    assert!(matches!(result, Err(ScannerError::Storage(_))));
}

#[tokio::test]
async fn test_concurrent_downloads_of_different_resources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"x".to_vec(), "text/plain"))
        .mount(&server)
        .await;

    let storage = shared(SqliteStorage::new_in_memory().unwrap());
    let first = seed(
        &storage,
        NewScanSession::new(server.uri()),
        &format!("{}/one.txt", server.uri()),
    );
    let second = seed(
        &storage,
        NewScanSession::new(server.uri()),
        &format!("{}/two.txt", server.uri()),
    );

    let manager = Arc::new(manager(&storage));
    let handles: Vec<_> = [first, second]
        .into_iter()
        .map(|id| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.download(id, &context()).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().unwrap().succeeded());
    }

    let guard = lock_storage(&storage).unwrap();
    assert_eq!(guard.get_resource(first).unwrap().download_attempts, 1);
    assert_eq!(guard.get_resource(second).unwrap().download_attempts, 1);
}
