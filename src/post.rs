use std::fmt;
use std::fmt::{Display, Formatter};

use serde::Deserialize;

/// Post metadata shown under the title.
#[derive(Debug, Clone, PartialEq)]
pub enum PostMeta {
    /// Structured fields coming from the manifest.
    Fields {
        date: Option<String>,
        categories: Vec<String>,
    },
    /// Text or markup taken from a rendered page, carried as is.
    Rendered(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostTags {
    List(Vec<String>),
    Rendered(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostSummary {
    pub url: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub meta: PostMeta,
    pub content: Option<String>,
    pub tags: PostTags,
}

impl PostSummary {
    /// Entries with a body can be shown without going to the network.
    pub fn has_content(&self) -> bool {
        matches!(self.content, Some(ref content) if !content.is_empty())
    }
}

impl Display for PostSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "url={}, title={}", self.url, self.title)?;
        if let PostMeta::Fields { date: Some(ref date), .. } = self.meta {
            write!(f, ", date={}", date)?;
        }
        Ok(())
    }
}

/// Manifest document: `{ "posts": [ ... ] }`
#[derive(Deserialize)]
pub struct Manifest {
    pub posts: Vec<ManifestPost>,
}

#[derive(Deserialize)]
pub struct ManifestPost {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub meta: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Manifest {
    pub fn from_json(buf: &str) -> serde_json::Result<Manifest> {
        serde_json::from_str::<Manifest>(buf)
    }
}

impl From<ManifestPost> for PostSummary {
    fn from(post: ManifestPost) -> Self {
        let meta = match post.meta {
            Some(rendered) if post.date.is_none() && post.categories.is_empty() => PostMeta::Rendered(rendered),
            _ => PostMeta::Fields {
                date: post.date,
                categories: post.categories,
            },
        };

        PostSummary {
            url: post.url,
            title: post.title,
            excerpt: post.excerpt,
            meta,
            content: post.content,
            tags: PostTags::List(post.tags),
        }
    }
}
