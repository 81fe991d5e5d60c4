//! Feed documents and service assembly for integration tests

use feed_push::config::FeedConfig;
use feed_push::{
    Database, FeedFetcher, MessageSettings, Notifier, NotifierParts, Recipient, SystemClock,
};
use std::sync::Arc;
use tempfile::TempDir;

use super::RecordingTransport;

/// RSS document whose newest item has the given guid and title
pub fn rss_feed(guid: &str, title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Berriak</title>
    <link>https://news.example.com</link>
    <description>Latest news</description>
    <item>
      <title>{title}</title>
      <link>https://news.example.com/articles/{guid}</link>
      <guid isPermaLink="false">{guid}</guid>
      <pubDate>Tue, 14 Oct 2025 08:00:00 +0000</pubDate>
      <description><![CDATA[<p>Story about <b>{title}</b></p>]]></description>
    </item>
    <item>
      <title>Older story</title>
      <link>https://news.example.com/articles/older</link>
      <guid>older</guid>
    </item>
  </channel>
</rss>"#
    )
}

/// Subscription for `https://push.example.com/{name}`
pub fn subscription(name: &str) -> Recipient {
    Recipient::new(
        format!("https://push.example.com/{name}"),
        format!("auth-{name}"),
        format!("p256dh-{name}"),
    )
}

/// A notifier over a real SQLite database and HTTP feed fetcher
pub struct Harness {
    pub db: Arc<Database>,
    pub transport: Arc<RecordingTransport>,
    pub notifier: Notifier,
    _dir: TempDir,
}

/// Wire a notifier against `feed_url`, with the cache disabled so every cycle refetches
pub async fn harness(feed_url: String, transport: RecordingTransport) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::new(&dir.path().join("feed-push.db")).await.unwrap());
    let transport = Arc::new(transport);

    let config = FeedConfig {
        url: feed_url,
        cache_ttl: std::time::Duration::ZERO,
        ..FeedConfig::default()
    };
    let clock = Arc::new(SystemClock);
    let feed = Arc::new(FeedFetcher::new(&config, clock.clone()).unwrap());

    let notifier = Notifier::new(
        NotifierParts {
            feed,
            recipients: db.clone(),
            control: db.clone(),
            transport: transport.clone(),
            clock,
        },
        MessageSettings::from(&config),
    );

    Harness {
        db,
        transport,
        notifier,
        _dir: dir,
    }
}
