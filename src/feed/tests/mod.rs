use super::*;
use crate::config::FeedConfig;
use chrono::{TimeZone, Utc};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example News</title>
    <link>https://news.example.com</link>
    <description>Latest news</description>
    <item>
      <title>Herri &amp; kultura</title>
      <link>https://news.example.com/articles/2</link>
      <guid isPermaLink="false">abc123</guid>
      <pubDate>Tue, 14 Oct 2025 08:00:00 +0000</pubDate>
      <description><![CDATA[<p>First <b>paragraph</b> of the story.</p>]]></description>
    </item>
    <item>
      <title>Older story</title>
      <link>https://news.example.com/articles/1</link>
      <guid>older-guid</guid>
    </item>
  </channel>
</rss>"#;

const ATOM_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Atom</title>
  <id>urn:uuid:feed</id>
  <updated>2025-10-14T08:00:00Z</updated>
  <entry>
    <title>Atom headline</title>
    <id>urn:uuid:entry-1</id>
    <link rel="alternate" href="https://news.example.com/atom/1"/>
    <updated>2025-10-14T08:00:00Z</updated>
    <summary>Summary &lt;b&gt;text&lt;/b&gt;</summary>
  </entry>
</feed>"#;

fn rss_with_item(item: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title><link>https://x</link><description>d</description>{}</channel></rss>"#,
        item
    )
}

fn test_config(url: String) -> FeedConfig {
    FeedConfig {
        url,
        ..FeedConfig::default()
    }
}

fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.timestamp_opt(1_760_000_000, 0).unwrap(),
    ))
}

// --- novelty marker ---

#[test]
fn test_marker_prefers_guid() {
    assert_eq!(
        novelty_marker(Some("g"), Some("https://l"), Some("t")),
        "g"
    );
}

#[test]
fn test_marker_falls_back_to_link_then_title() {
    assert_eq!(novelty_marker(None, Some("https://l"), Some("t")), "https://l");
    assert_eq!(novelty_marker(None, None, Some("t")), "t");
    assert_eq!(novelty_marker(None, None, None), "");
}

#[test]
fn test_marker_treats_blank_as_absent() {
    assert_eq!(novelty_marker(Some("  "), Some(""), Some("t")), "t");
}

// --- parsing ---

#[test]
fn test_parse_rss_takes_first_item() {
    let item = parse_newest(RSS_FEED, "https://news.example.com/feed").unwrap();

    assert_eq!(item.novelty_marker, "abc123");
    assert_eq!(item.title.as_deref(), Some("Herri & kultura"));
    assert_eq!(item.link.as_deref(), Some("https://news.example.com/articles/2"));
    assert_eq!(
        item.published_at.as_deref(),
        Some("Tue, 14 Oct 2025 08:00:00 +0000")
    );
    assert!(item.description_html.unwrap().contains("<b>paragraph</b>"));
}

#[test]
fn test_parse_rss_without_guid_uses_link() {
    let doc = rss_with_item("<item><title>T</title><link>https://x/1</link></item>");
    let item = parse_newest(&doc, "u").unwrap();
    assert_eq!(item.novelty_marker, "https://x/1");
}

#[test]
fn test_parse_rss_without_guid_or_link_uses_title() {
    let doc = rss_with_item("<item><title>Only a title</title></item>");
    let item = parse_newest(&doc, "u").unwrap();
    assert_eq!(item.novelty_marker, "Only a title");
    assert!(item.link.is_none());
}

#[test]
fn test_parse_empty_rss_is_empty_error() {
    let doc = rss_with_item("");
    let err = parse_newest(&doc, "https://news.example.com/feed").unwrap_err();
    assert!(matches!(err, Error::Feed(FeedError::Empty { ref url }) if url == "https://news.example.com/feed"));
}

#[test]
fn test_parse_atom_fallback() {
    let item = parse_newest(ATOM_FEED, "u").unwrap();

    assert_eq!(item.novelty_marker, "urn:uuid:entry-1");
    assert_eq!(item.title.as_deref(), Some("Atom headline"));
    assert_eq!(item.link.as_deref(), Some("https://news.example.com/atom/1"));
    assert_eq!(item.description_html.as_deref(), Some("Summary <b>text</b>"));
    assert!(item.published_at.unwrap().starts_with("2025-10-14T08:00:00"));
}

#[test]
fn test_atom_prefers_published_over_updated() {
    let doc = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>t</title>
  <id>urn:uuid:feed</id>
  <updated>2025-10-14T08:00:00Z</updated>
  <entry>
    <title>Entry</title>
    <id>urn:uuid:entry-2</id>
    <published>2025-10-13T06:30:00+02:00</published>
    <updated>2025-10-14T08:00:00Z</updated>
  </entry>
</feed>"#;

    let item = parse_newest(doc, "u").unwrap();
    assert_eq!(item.published_at.as_deref(), Some("2025-10-13T06:30:00+02:00"));
}

#[test]
fn test_long_title_is_cut_but_marker_is_not() {
    let long_title = "Berria ".repeat(40);
    let doc = rss_with_item(&format!("<item><title>{}</title></item>", long_title));

    let item = parse_newest(&doc, "u").unwrap();

    let title = item.title.unwrap();
    assert_eq!(title.chars().count(), DEFAULT_SUMMARY_CHARS + 1);
    assert!(title.ends_with('…'));
    assert_eq!(item.novelty_marker, long_title.trim());
}

#[test]
fn test_parse_garbage_is_parse_error() {
    let err = parse_newest("this is not xml", "u").unwrap_err();
    assert!(matches!(err, Error::Feed(FeedError::Parse(_))));
}

// --- fetching ---

#[tokio::test]
async fn test_fetch_newest_from_server() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS_FEED))
        .mount(&mock_server)
        .await;

    let fetcher = FeedFetcher::new(
        &test_config(format!("{}/feed", mock_server.uri())),
        manual_clock(),
    )
    .unwrap();

    let item = fetcher.fetch_newest().await.unwrap();
    assert_eq!(item.novelty_marker, "abc123");
}

#[tokio::test]
async fn test_non_success_status_is_fetch_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let fetcher = FeedFetcher::new(
        &test_config(format!("{}/feed", mock_server.uri())),
        manual_clock(),
    )
    .unwrap();

    let err = fetcher.fetch_newest().await.unwrap_err();
    match err {
        Error::Feed(FeedError::Fetch { status, .. }) => assert_eq!(status, Some(503)),
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_server_is_fetch_error() {
    // Nothing listens on port 9 (discard) in the test environment
    let fetcher = FeedFetcher::new(
        &FeedConfig {
            url: "http://127.0.0.1:9/feed".to_string(),
            request_timeout: Duration::from_secs(2),
            ..FeedConfig::default()
        },
        manual_clock(),
    )
    .unwrap();

    let err = fetcher.fetch_newest().await.unwrap_err();
    assert!(matches!(err, Error::Feed(FeedError::Fetch { status: None, .. })));
}

#[tokio::test]
async fn test_cache_serves_within_ttl_and_refetches_after() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS_FEED))
        .expect(2)
        .mount(&mock_server)
        .await;

    let clock = manual_clock();
    let fetcher = FeedFetcher::new(
        &test_config(format!("{}/feed", mock_server.uri())),
        clock.clone(),
    )
    .unwrap();

    fetcher.fetch_newest().await.unwrap();
    clock.advance(Duration::from_secs(299));
    fetcher.fetch_newest().await.unwrap();

    clock.advance(Duration::from_secs(1));
    fetcher.fetch_newest().await.unwrap();

    // expect(2) is verified when the server drops
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS_FEED))
        .mount(&mock_server)
        .await;

    let fetcher = FeedFetcher::new(
        &test_config(format!("{}/feed", mock_server.uri())),
        manual_clock(),
    )
    .unwrap();

    assert!(fetcher.fetch_newest().await.is_err());
    assert_eq!(fetcher.fetch_newest().await.unwrap().novelty_marker, "abc123");
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RSS_FEED))
        .expect(2)
        .mount(&mock_server)
        .await;

    let fetcher = FeedFetcher::new(
        &test_config(format!("{}/feed", mock_server.uri())),
        manual_clock(),
    )
    .unwrap();

    fetcher.fetch_newest().await.unwrap();
    fetcher.invalidate().await;
    fetcher.fetch_newest().await.unwrap();
}

// --- cache ---

#[tokio::test]
async fn test_cache_empty_until_put() {
    let clock = manual_clock();
    let cache = FeedCache::new(Duration::from_secs(60), clock.clone());
    assert!(cache.get().await.is_none());

    let item = parse_newest(RSS_FEED, "u").unwrap();
    cache.put(item.clone()).await;
    assert_eq!(cache.get().await, Some(item));

    clock.advance(Duration::from_secs(60));
    assert!(cache.get().await.is_none());
}

#[tokio::test]
async fn test_zero_ttl_never_serves() {
    let cache = FeedCache::new(Duration::ZERO, manual_clock());
    cache.put(parse_newest(RSS_FEED, "u").unwrap()).await;
    assert!(cache.get().await.is_none());
}
