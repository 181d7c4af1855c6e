//! End-to-end CLI tests for the pixiv-downloader binary.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use support::site::{
    SINGLE_CLASSES, detail_mock, detail_page, image_mock, mount_search, og_title,
    search_fragment, search_page,
};
use support::socket_guard::start_mock_server_or_skip;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn binary() -> Command {
    Command::cargo_bin("pixiv-downloader").unwrap()
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    binary()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("keyword search"))
        .stdout(predicate::str::contains("--config"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    binary()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_binary_missing_config_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    binary()
        .current_dir(temp_dir.path())
        .args(["cats", "page=1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config"));
    assert!(!temp_dir.path().join("img").exists());
}

#[test]
fn test_binary_invalid_config_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("config.json"), r#"{"base_url": "x"}"#).unwrap();
    binary()
        .current_dir(temp_dir.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config"));
}

#[test]
fn test_binary_malformed_page_token_exits_one() {
    binary()
        .arg("page=abc")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("page=abc"));
}

fn write_config(dir: &std::path::Path, base_url: &str) -> std::path::PathBuf {
    let config = dir.join("pixiv.json");
    std::fs::write(
        &config,
        format!(
            r#"{{"headers": {{"User-Agent": "test-agent", "Cookie": "PHPSESSID=x"}}, "base_url": "{base_url}", "throttle_ms": 0}}"#
        ),
    )
    .unwrap();
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_crawls_mock_site() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();

    mount_search(
        &server,
        1,
        search_page(&[search_fragment("100", SINGLE_CLASSES)]),
    )
    .await;
    let image = format!("{}/img/100_p0.jpg", server.uri());
    detail_mock("100", detail_page(&og_title("Night", "Owl"), Some(&image)))
        .mount(&server)
        .await;
    image_mock("/img/100_p0.jpg", b"owl").mount(&server).await;

    let config = write_config(temp_dir.path(), &server.uri());
    let out = temp_dir.path().join("out");

    let assert = tokio::task::spawn_blocking({
        let out = out.clone();
        move || {
            binary()
                .arg("--config")
                .arg(&config)
                .arg("--output-dir")
                .arg(&out)
                .args(["-D", "night", "owl", "page=1"])
                .assert()
        }
    })
    .await
    .unwrap();

    assert.success();
    assert_eq!(std::fs::read(out.join("Night - Owl.jpg")).unwrap(), b"owl");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_forbidden_exits_three() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp_dir = TempDir::new().unwrap();

    mount_search(
        &server,
        1,
        search_page(&[search_fragment("100", SINGLE_CLASSES)]),
    )
    .await;
    let image = format!("{}/img/100_p0.jpg", server.uri());
    detail_mock("100", detail_page(&og_title("Locked", "Out"), Some(&image)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/100_p0.jpg"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let config = write_config(temp_dir.path(), &server.uri());
    let out = temp_dir.path().join("out");

    let assert = tokio::task::spawn_blocking(move || {
        binary()
            .arg("--config")
            .arg(&config)
            .arg("--output-dir")
            .arg(&out)
            .arg("page=1")
            .assert()
    })
    .await
    .unwrap();

    assert
        .code(3)
        .stderr(predicate::str::contains("403"))
        .stderr(predicate::str::contains("PHPSESSID=x").not());
}
