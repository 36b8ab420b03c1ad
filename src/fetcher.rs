use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feed_rs::parser;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = "BlogDigest/1.0 (RSS Aggregator)";

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, timeout)
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Body could not be parsed as RSS, Atom or JSON Feed
    #[error("Parse error: {0}")]
    Parse(String),
}

/// One entry of a fetched feed, reduced to what aggregation needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

/// Retrieves and parses the feed behind a URL.
pub trait FeedClient {
    fn fetch(&self, url: &str)
        -> impl Future<Output = Result<Vec<FeedEntry>, FetchError>> + Send;
}

pub struct HttpFeedClient {
    client: Client,
}

impl HttpFeedClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

impl FeedClient for HttpFeedClient {
    async fn fetch(&self, url: &str) -> Result<Vec<FeedEntry>, FetchError> {
        debug!("Requesting {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let bytes = response.bytes().await?;
        parse_entries(&bytes)
    }
}

/// Parse a feed document into entries.
///
/// Only the entry's own publish time is kept; `updated` is not a substitute.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<FeedEntry>, FetchError> {
    let parsed = parser::parse(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;

    let entries = parsed
        .entries
        .into_iter()
        .map(|entry| FeedEntry {
            title: entry.title.map(|t| t.content),
            link: entry.links.into_iter().next().map(|l| l.href),
            published: entry.published,
        })
        .collect();

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0">
            <channel>
                <title>AWS News Blog</title>
                <link>https://aws.amazon.com/blogs/aws/</link>
                <description>Announcements</description>
                <item>
                    <title>New Region Launch</title>
                    <link>https://aws.amazon.com/blogs/aws/new-region/</link>
                    <guid>https://aws.amazon.com/blogs/aws/new-region/</guid>
                    <pubDate>Mon, 09 Dec 2024 12:00:00 GMT</pubDate>
                </item>
                <item>
                    <title>Undated Post</title>
                    <link>https://aws.amazon.com/blogs/aws/undated/</link>
                    <guid>https://aws.amazon.com/blogs/aws/undated/</guid>
                </item>
            </channel>
        </rss>
    "#;

    mod parse_entries_tests {
        use super::*;

        #[test]
        fn test_parse_rss_entries() {
            let entries = parse_entries(RSS.as_bytes()).unwrap();

            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].title.as_deref(), Some("New Region Launch"));
            assert_eq!(
                entries[0].link.as_deref(),
                Some("https://aws.amazon.com/blogs/aws/new-region/")
            );
            assert_eq!(
                entries[0].published,
                Some(Utc.with_ymd_and_hms(2024, 12, 9, 12, 0, 0).unwrap())
            );
        }

        #[test]
        fn test_parse_entry_without_pub_date() {
            let entries = parse_entries(RSS.as_bytes()).unwrap();
            assert_eq!(entries[1].published, None);
        }

        #[test]
        fn test_parse_converts_offset_to_utc() {
            let xml = r#"<?xml version="1.0"?>
                <rss version="2.0"><channel><title>T</title>
                    <item>
                        <title>Offset</title>
                        <link>https://example.com/a</link>
                        <pubDate>Tue, 10 Dec 2024 01:30:00 +0200</pubDate>
                    </item>
                </channel></rss>
            "#;

            let entries = parse_entries(xml.as_bytes()).unwrap();
            assert_eq!(
                entries[0].published,
                Some(Utc.with_ymd_and_hms(2024, 12, 9, 23, 30, 0).unwrap())
            );
        }

        #[test]
        fn test_atom_updated_is_not_published() {
            let xml = r#"<?xml version="1.0" encoding="utf-8"?>
                <feed xmlns="http://www.w3.org/2005/Atom">
                    <title>Atom Feed</title>
                    <id>urn:uuid:feed</id>
                    <updated>2024-12-09T12:00:00Z</updated>
                    <entry>
                        <title>Only Updated</title>
                        <id>urn:uuid:entry-1</id>
                        <link href="https://example.com/only-updated"/>
                        <updated>2024-12-09T12:00:00Z</updated>
                    </entry>
                </feed>
            "#;

            let entries = parse_entries(xml.as_bytes()).unwrap();
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].published, None);
            assert_eq!(entries[0].link.as_deref(), Some("https://example.com/only-updated"));
        }

        #[test]
        fn test_parse_entry_without_title_or_link() {
            let xml = r#"<?xml version="1.0"?>
                <rss version="2.0"><channel><title>T</title>
                    <item>
                        <description>Bare item</description>
                        <pubDate>Mon, 09 Dec 2024 12:00:00 GMT</pubDate>
                    </item>
                </channel></rss>
            "#;

            let entries = parse_entries(xml.as_bytes()).unwrap();
            assert_eq!(entries[0].title, None);
            assert_eq!(entries[0].link, None);
            assert!(entries[0].published.is_some());
        }

        #[test]
        fn test_parse_garbage() {
            let result = parse_entries(b"this is not a feed");
            assert!(matches!(result, Err(FetchError::Parse(_))));
        }

        #[test]
        fn test_parse_empty_channel() {
            let xml = r#"<?xml version="1.0"?>
                <rss version="2.0"><channel><title>Empty</title></channel></rss>
            "#;
            assert!(parse_entries(xml.as_bytes()).unwrap().is_empty());
        }
    }

    mod http_client_tests {
        use super::*;

        fn client() -> HttpFeedClient {
            HttpFeedClient::new(Duration::from_secs(5)).unwrap()
        }

        #[tokio::test]
        async fn test_fetch_success() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/feed/"))
                .respond_with(ResponseTemplate::new(200).set_body_string(RSS))
                .mount(&server)
                .await;

            let entries = client()
                .fetch(&format!("{}/feed/", server.uri()))
                .await
                .unwrap();
            assert_eq!(entries.len(), 2);
        }

        #[tokio::test]
        async fn test_fetch_http_error_status() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(404))
                .mount(&server)
                .await;

            let result = client().fetch(&format!("{}/missing", server.uri())).await;
            assert!(matches!(result, Err(FetchError::HttpStatus(404))));
        }

        #[tokio::test]
        async fn test_fetch_malformed_body() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
                .mount(&server)
                .await;

            let result = client().fetch(&server.uri()).await;
            assert!(matches!(result, Err(FetchError::Parse(_))));
        }

        #[tokio::test]
        async fn test_fetch_timeout() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(RSS)
                        .set_delay(Duration::from_millis(500)),
                )
                .mount(&server)
                .await;

            let client = HttpFeedClient::new(Duration::from_millis(50)).unwrap();
            let result = client.fetch(&server.uri()).await;
            assert!(matches!(result, Err(FetchError::Request(_))));
        }

        #[tokio::test]
        async fn test_fetch_unreachable_host() {
            let result = client().fetch("http://127.0.0.1:1/feed").await;
            assert!(matches!(result, Err(FetchError::Request(_))));
        }
    }
}
