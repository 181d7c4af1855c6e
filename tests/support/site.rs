//! Mock site fixtures: HTML builders and wiremock mounts mirroring the
//! search, detail, album, and image endpoints.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pixiv_core::{CrawlOptions, RunConfig};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockBuilder, MockServer, Request, Respond, ResponseTemplate};

pub const TEST_USER_AGENT: &str = "test-agent";
pub const TEST_COOKIE: &str = "PHPSESSID=test-session";

/// Anchor classes of a single-image result.
pub const SINGLE_CLASSES: &str = "work _work ui-scroll-view";
/// Anchor classes of an album result.
pub const ALBUM_CLASSES: &str = "work _work multiple ui-scroll-view";
/// Anchor classes of a layout the crawler does not know.
pub const UNKNOWN_CLASSES: &str = "work _work ugoku-illust ui-scroll-view";

pub fn search_fragment(id: &str, classes: &str) -> String {
    format!(
        r#"<li class="image-item"><a href="/member_illust.php?mode=medium&amp;illust_id={id}" class="{classes}"><div class="_layout-thumbnail"><img src="/thumb/{id}.jpg"></div></a><a href="/member.php?id=9" class="user ui-profile-popup">someone</a></li>"#
    )
}

pub fn search_page(fragments: &[String]) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><title>search</title></head><body><section><ul class="_image-items autopagerize_page_element">{}</ul></section></body></html>"#,
        fragments.concat()
    )
}

pub fn og_title(title: &str, artist: &str) -> String {
    format!("「{title}」/「{artist}」[pixiv]")
}

pub fn detail_page(og_title: &str, image_url: Option<&str>) -> String {
    let image = image_url
        .map(|src| {
            format!(r#"<img alt="work" width="800" height="600" data-src="{src}" class="original-image">"#)
        })
        .unwrap_or_default();
    format!(
        r#"<!DOCTYPE html><html><head><meta property="og:title" content="{og_title}"><meta property="og:type" content="article"></head><body><div class="works_display">{image}</div></body></html>"#
    )
}

pub fn album_page(image_urls: &[String]) -> String {
    let containers: String = image_urls
        .iter()
        .map(|url| {
            format!(
                r#"<div class="item-container"><img src="/loading.gif" data-src="{url}" class="image ui-scroll-view" data-index="0"></div>"#
            )
        })
        .collect();
    format!(r#"<!DOCTYPE html><html><head></head><body>{containers}</body></html>"#)
}

pub async fn mount_search(server: &MockServer, page: u32, html: String) {
    Mock::given(method("GET"))
        .and(path("/search.php"))
        .and(query_param("order", "date_d"))
        .and(query_param("p", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}

pub fn detail_request(id: &str) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path("/member_illust.php"))
        .and(query_param("mode", "medium"))
        .and(query_param("illust_id", id))
}

pub fn album_request(id: &str) -> MockBuilder {
    Mock::given(method("GET"))
        .and(path("/member_illust.php"))
        .and(query_param("mode", "manga"))
        .and(query_param("illust_id", id))
}

pub fn detail_mock(id: &str, html: String) -> Mock {
    detail_request(id).respond_with(ResponseTemplate::new(200).set_body_string(html))
}

pub fn album_mock(id: &str, html: String) -> Mock {
    album_request(id).respond_with(ResponseTemplate::new(200).set_body_string(html))
}

pub fn image_mock(image_path: &str, body: &[u8]) -> Mock {
    Mock::given(method("GET"))
        .and(path(image_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
}

pub fn detail_url(server: &MockServer, id: &str) -> String {
    format!(
        "{}/member_illust.php?mode=medium&illust_id={id}",
        server.uri()
    )
}

pub fn album_url(server: &MockServer, id: &str) -> String {
    format!("{}/member_illust.php?mode=manga&illust_id={id}", server.uri())
}

pub fn test_config(server: &MockServer) -> RunConfig {
    let mut config = RunConfig::with_headers([
        ("User-Agent", TEST_USER_AGENT),
        ("Cookie", TEST_COOKIE),
    ]);
    config.base_url = server.uri();
    config.throttle_ms = 0;
    config
}

pub fn fast_options() -> CrawlOptions {
    CrawlOptions {
        throttle: Duration::ZERO,
        ..CrawlOptions::default()
    }
}

/// Arrival times of requests, grouped by a label chosen per mock.
#[derive(Clone, Default)]
pub struct ArrivalLog(Arc<Mutex<Vec<(String, Instant)>>>);

impl ArrivalLog {
    /// Responder that logs each arrival under `label` and answers with `template`.
    pub fn responder(&self, label: &str, template: ResponseTemplate) -> RecordingResponder {
        RecordingResponder {
            log: self.clone(),
            label: label.to_string(),
            template,
        }
    }

    /// Arrival times logged under `label`, in arrival order.
    pub fn arrivals(&self, label: &str) -> Vec<Instant> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(logged, _)| logged == label)
            .map(|(_, at)| *at)
            .collect()
    }
}

pub struct RecordingResponder {
    log: ArrivalLog,
    label: String,
    template: ResponseTemplate,
}

impl Respond for RecordingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.log
            .0
            .lock()
            .unwrap()
            .push((self.label.clone(), Instant::now()));
        self.template.clone()
    }
}

/// Largest number of arrivals inside any window shorter than `window`.
///
/// When every response is delayed by more than `window`, requests arriving
/// inside one such window were all in flight together, so this is a lower
/// bound on the client's peak concurrency that can never exceed it.
pub fn peak_overlap(arrivals: &[Instant], window: Duration) -> usize {
    let mut sorted = arrivals.to_vec();
    sorted.sort();
    (0..sorted.len())
        .map(|i| {
            sorted[i..]
                .iter()
                .take_while(|at| at.duration_since(sorted[i]) < window)
                .count()
        })
        .max()
        .unwrap_or(0)
}
