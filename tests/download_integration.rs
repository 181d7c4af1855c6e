//! Integration tests for the download module.
//!
//! These tests drive `Downloader::ensure` through computed targets against
//! mock HTTP servers.

mod support;

use pixiv_core::download::{
    DownloadError, Downloader, EnsureOutcome, album_dir, album_target, download_target,
    single_target,
};
use pixiv_core::model::{ImageReference, ItemMetadata};
use pixiv_core::page::album_ordinal;
use pixiv_core::session::{HttpTimeouts, Session};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, USER_AGENT};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use support::socket_guard::start_mock_server_or_skip;

fn item_session(referer: &str) -> Session {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("test-agent"));
    headers.insert(COOKIE, HeaderValue::from_static("PHPSESSID=abc"));
    let mut session = Session::new(&headers, HttpTimeouts::download()).unwrap();
    session.set_referer(referer).unwrap();
    session
}

#[tokio::test]
async fn test_album_page_written_under_its_ordinal() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/img-original/img/2018/01/01/66666666_p7.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"seventh page"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = format!(
        "{}/img-original/img/2018/01/01/66666666_p7.jpg",
        mock_server.uri()
    );
    let meta = ItemMetadata::new("Comic", "Drawer");
    let dir = album_dir(temp_dir.path(), &meta);
    std::fs::create_dir_all(&dir).unwrap();
    let ordinal = album_ordinal(&url).unwrap();
    let target = album_target(&dir, &ordinal, &url);

    let outcome = Downloader::new(HttpTimeouts::download())
        .unwrap()
        .ensure(&item_session("https://example.net/manga"), &url, &target)
        .await
        .unwrap();

    assert_eq!(outcome, EnsureOutcome::Downloaded { bytes: 12 });
    assert_eq!(target, temp_dir.path().join("Comic - Drawer").join("7.jpg"));
    assert_eq!(std::fs::read(&target).unwrap(), b"seventh page");
}

#[tokio::test]
async fn test_existing_target_is_never_requested() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let url = format!("{}/img/1_p0.png", mock_server.uri());
    let target = download_target(
        temp_dir.path(),
        &ItemMetadata::new("Kept", "Me"),
        &ImageReference::single(url.clone()),
    );
    std::fs::write(&target, b"old").unwrap();

    let outcome = Downloader::new(HttpTimeouts::download())
        .unwrap()
        .ensure(&item_session("https://example.net/detail"), &url, &target)
        .await
        .unwrap();

    assert_eq!(outcome, EnsureOutcome::Skipped);
    assert_eq!(std::fs::read(&target).unwrap(), b"old");
}

#[tokio::test]
async fn test_forbidden_leaves_nothing_on_disk() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/img/9_p0.jpg"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let url = format!("{}/img/9_p0.jpg", mock_server.uri());
    let target = single_target(temp_dir.path(), &ItemMetadata::new("No", "Access"), &url);

    let result = Downloader::new(HttpTimeouts::download())
        .unwrap()
        .ensure(&item_session("https://example.net/detail"), &url, &target)
        .await;

    match result {
        Err(DownloadError::Forbidden { url: refused }) => assert_eq!(refused, url),
        other => panic!("expected Forbidden, got {other:?}"),
    }
    assert!(!target.exists());
    assert!(std::fs::read_dir(temp_dir.path()).unwrap().next().is_none());
}
