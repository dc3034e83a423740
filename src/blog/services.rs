use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::blog::{repo::PostStore, repo_types::BlogPost};
use crate::store::{DocumentStore, StoreError};

pub const MAX_POSTS: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Post not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Read-only access to blog posts plus the startup seed.
#[derive(Clone)]
pub struct ContentService {
    posts: PostStore,
}

impl ContentService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            posts: PostStore::new(store),
        }
    }

    /// Up to `limit` posts (default and ceiling [`MAX_POSTS`]) in store order.
    pub async fn list_posts(&self, limit: Option<usize>) -> Result<Vec<BlogPost>, ContentError> {
        let limit = limit.unwrap_or(MAX_POSTS).min(MAX_POSTS);
        Ok(self.posts.list(limit).await?)
    }

    pub async fn get_post_by_slug(&self, slug: &str) -> Result<BlogPost, ContentError> {
        self.posts
            .find_by_slug(slug)
            .await?
            .ok_or(ContentError::NotFound)
    }

    /// Inserts `posts` only into an empty collection. Returns how many were inserted.
    pub async fn seed_if_empty(&self, posts: Vec<BlogPost>) -> Result<usize, ContentError> {
        let existing = self.posts.count().await?;
        if existing > 0 {
            debug!(existing, "blog posts already present, skipping seed");
            return Ok(0);
        }
        match self.posts.insert_many(&posts).await {
            Ok(()) => {
                info!(count = posts.len(), "sample blog posts created");
                Ok(posts.len())
            }
            // Another instance seeded between the count and the insert.
            Err(StoreError::Duplicate { .. }) => {
                warn!("blog seed raced with another process, skipping");
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn post(
    post_id: &str,
    title: &str,
    slug: &str,
    excerpt: &str,
    content: &str,
    image_url: &str,
    tags: &[&str],
    published_at: OffsetDateTime,
) -> BlogPost {
    BlogPost {
        post_id: post_id.into(),
        title: title.into(),
        slug: slug.into(),
        excerpt: excerpt.into(),
        content: content.into(),
        author: "Trading Academy Team".into(),
        image_url: image_url.into(),
        published_at,
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

/// The fixed sample set inserted on first start.
pub fn seed_posts() -> Vec<BlogPost> {
    let now = OffsetDateTime::now_utc();
    vec![
        post(
            "post_001",
            "5 Essential Risk Management Strategies Every Trader Should Know",
            "risk-management-strategies",
            "Learn how to protect your capital with proven risk management techniques used by professional traders.",
            "Risk management is the cornerstone of successful trading. In this comprehensive guide, we'll explore five essential strategies that every trader should implement...",
            "https://images.unsplash.com/photo-1611974789855-9c2a0a7236a3?w=800",
            &["Risk Management", "Trading Strategy", "Beginner"],
            now,
        ),
        post(
            "post_002",
            "Understanding Market Psychology: The Key to Better Trading Decisions",
            "market-psychology",
            "Discover how emotions and crowd behavior influence markets and learn to use psychology to your advantage.",
            "Market psychology plays a crucial role in price movements. Understanding the emotional drivers behind market participants can give you a significant edge...",
            "https://images.unsplash.com/photo-1590283603385-17ffb3a7f29f?w=800",
            &["Psychology", "Trading Mindset", "Advanced"],
            now,
        ),
        post(
            "post_003",
            "Technical Analysis 101: Reading Charts Like a Pro",
            "technical-analysis-101",
            "Master the fundamentals of technical analysis and start identifying profitable trading opportunities.",
            "Technical analysis is an essential skill for any trader. This beginner-friendly guide will walk you through chart patterns, indicators, and more...",
            "https://images.unsplash.com/photo-1642790106117-e829e14a795f?w=800",
            &["Technical Analysis", "Charts", "Beginner"],
            now,
        ),
    ]
}
