//! Browsing state of one client: the posts and warnings of the latest fetch.
//!
//! A session is never mutated in place. Each fetch yields a new one that
//! replaces the previous session wholesale.

use serde::Serialize;

use crate::pipeline::{FetchOutcome, FetchWarning, Post};

pub const DEFAULT_DAYS: u32 = 7;
pub const MIN_DAYS: u32 = 1;
pub const MAX_DAYS: u32 = 30;

/// Returns `days` if it lies within the selectable window.
pub fn validate_days(days: u32) -> Option<u32> {
    (MIN_DAYS..=MAX_DAYS).contains(&days).then_some(days)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub count: usize,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    posts: Vec<Post>,
    warnings: Vec<FetchWarning>,
    days: Option<u32>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_outcome(outcome: FetchOutcome, days: u32) -> Self {
        Self {
            posts: outcome.posts,
            warnings: outcome.warnings,
            days: Some(days),
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn warnings(&self) -> &[FetchWarning] {
        &self.warnings
    }

    /// Window of the fetch that produced this session, `None` before any fetch.
    pub fn days(&self) -> Option<u32> {
        self.days
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Post count per category, in order of first appearance.
    pub fn category_counts(&self) -> Vec<CategoryCount> {
        let mut counts: Vec<CategoryCount> = Vec::new();
        for post in &self.posts {
            match counts.iter_mut().find(|c| c.category == post.category) {
                Some(entry) => entry.count += 1,
                None => counts.push(CategoryCount {
                    category: post.category.clone(),
                    count: 1,
                }),
            }
        }
        counts
    }

    /// Posts in the selected categories; an empty selection selects everything.
    pub fn filter<S: AsRef<str>>(&self, selected: &[S]) -> Vec<&Post> {
        self.posts
            .iter()
            .filter(|p| selected.is_empty() || selected.iter().any(|s| s.as_ref() == p.category))
            .collect()
    }
}

/// Group posts by category in order of first appearance, keeping post order.
pub fn group_by_category(posts: &[&Post]) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();
    for &post in posts {
        match groups.iter_mut().find(|g| g.category == post.category) {
            Some(group) => {
                group.posts.push(post.clone());
                group.count += 1;
            }
            None => groups.push(CategoryGroup {
                category: post.category.clone(),
                count: 1,
                posts: vec![post.clone()],
            }),
        }
    }
    groups
}
