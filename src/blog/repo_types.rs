use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Blog post document in the `blog_posts` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    pub post_id: String,
    pub title: String,
    pub slug: String, // public lookup key, unique
    pub excerpt: String,
    pub content: String,
    pub author: String,
    pub image_url: String,
    #[serde(with = "crate::timestamp")]
    pub published_at: OffsetDateTime,
    #[serde(default)]
    pub tags: Vec<String>,
}
