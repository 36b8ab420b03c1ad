use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, FeedSource};
use crate::fetcher::{FeedClient, FeedEntry};

/// Display format of a post's publish date, e.g. "Jan 02, 2024".
pub const DATE_FORMAT: &str = "%b %d, %Y";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    pub title: String,
    pub link: String,
    /// Registered name of the feed the post came from
    pub source: String,
    /// Short display date
    pub published: String,
    pub published_at: DateTime<Utc>,
    pub category: String,
}

impl Post {
    pub fn new(
        title: String,
        link: String,
        source: String,
        category: String,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title,
            link,
            source,
            published: published_at.format(DATE_FORMAT).to_string(),
            published_at,
            category,
        }
    }
}

/// A source that contributed nothing because its feed could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchWarning {
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Newest first
    pub posts: Vec<Post>,
    pub warnings: Vec<FetchWarning>,
}

pub async fn fetch_recent_posts<C: FeedClient>(
    client: &C,
    catalog: &Catalog,
    sources: &[FeedSource],
    days: u32,
) -> FetchOutcome {
    fetch_recent_posts_at(client, catalog, sources, days, Utc::now()).await
}

/// Fetch `sources` one after another and keep entries published strictly
/// after `now - days`. A source that fails yields a warning and no posts.
pub async fn fetch_recent_posts_at<C: FeedClient>(
    client: &C,
    catalog: &Catalog,
    sources: &[FeedSource],
    days: u32,
    now: DateTime<Utc>,
) -> FetchOutcome {
    // A window reaching past chrono's range keeps everything dated
    let cutoff = now
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    info!("Fetching {} feeds (posts since {})", sources.len(), cutoff);

    let mut outcome = FetchOutcome::default();

    for source in sources {
        let entries = match client.fetch(&source.url).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Error fetching {}: {}", source.name, e);
                outcome.warnings.push(FetchWarning {
                    source: source.name.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        let total = entries.len();
        let category = catalog.category_of(source);
        let before = outcome.posts.len();

        for entry in entries {
            if let Some(post) = recent_post(entry, source, category, cutoff) {
                outcome.posts.push(post);
            }
        }

        info!(
            "Kept {} of {} entries from '{}'",
            outcome.posts.len() - before,
            total,
            source.name
        );
    }

    // Stable, so posts with equal timestamps keep fetch order
    outcome
        .posts
        .sort_by(|a, b| b.published_at.cmp(&a.published_at));

    info!(
        "Fetch complete: {} posts, {} warnings",
        outcome.posts.len(),
        outcome.warnings.len()
    );
    outcome
}

fn recent_post(
    entry: FeedEntry,
    source: &FeedSource,
    category: &str,
    cutoff: DateTime<Utc>,
) -> Option<Post> {
    let Some(published_at) = entry.published else {
        debug!("Skipping undated entry from '{}'", source.name);
        return None;
    };

    if published_at <= cutoff {
        return None;
    }

    Some(Post::new(
        entry.title.unwrap_or_else(|| "Untitled".to_string()),
        entry.link.unwrap_or_default(),
        source.name.clone(),
        category.to_string(),
        published_at,
    ))
}
