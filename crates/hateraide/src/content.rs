//! Feed content model
//!
//! Mirrors the mock feed the backend serves from `/api/mock-data`. Only the
//! fields the moderation layer and the view binding read are typed; anything
//! else in the document is ignored.

use crate::moderation::Sentiment;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Author of a post or reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name
    pub name: String,
    /// Avatar image URL
    #[serde(default)]
    pub avatar: String,
    /// Verified badge
    #[serde(default)]
    pub verified: bool,
    /// Marked as a notable account
    #[serde(default)]
    pub important: bool,
}

/// Media kind of a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    /// Plain text
    #[default]
    Text,
    /// Image attachment
    Image,
    /// Animated GIF
    Gif,
}

/// Media kind of a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    /// Plain text
    #[default]
    Text,
    /// Image attachment
    Image,
}

/// A reply under a post; the unit moderation decisions apply to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    /// Unique id within the post
    pub id: SmolStr,
    /// Media kind
    #[serde(rename = "type", default)]
    pub kind: ReplyKind,
    /// Reply text
    pub content: String,
    /// Attached media
    #[serde(default)]
    pub media_url: Option<String>,
    /// Who wrote it
    pub author: Author,
    /// Language tag
    #[serde(default = "default_language")]
    pub language: SmolStr,
    /// Sentiment label embedded in the content data, if any
    #[serde(default)]
    pub sentiment: Sentiment,
    /// Statically hidden by the content data
    #[serde(default)]
    pub hidden: bool,
    /// Display timestamp
    #[serde(default)]
    pub timestamp: Option<SmolStr>,
}

fn default_language() -> SmolStr {
    SmolStr::new_static("en")
}

/// A post and its replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post id
    pub id: SmolStr,
    /// Media kind
    #[serde(rename = "type", default)]
    pub kind: PostKind,
    /// Post text
    pub content: String,
    /// Attached image
    #[serde(default)]
    pub image_url: Option<String>,
    /// Who wrote it
    pub author: Author,
    /// Display timestamp
    #[serde(default)]
    pub timestamp: SmolStr,
    /// Replies, in display order
    #[serde(default)]
    pub replies: Vec<Reply>,
}

/// The whole mock feed document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Posts, in display order
    #[serde(default)]
    pub posts: Vec<Post>,
}

impl Feed {
    /// Every reply across all posts
    pub fn replies(&self) -> impl Iterator<Item = &Reply> {
        self.posts.iter().flat_map(|post| post.replies.iter())
    }

    /// Look up a post by id
    pub fn post(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == id)
    }
}
