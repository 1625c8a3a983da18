use std::collections::HashMap;

use thiserror::Error;

use crate::document::ScrapedItem;
use crate::fetch::{FetchError, Fetcher};
use crate::post::{Manifest, PostMeta, PostSummary, PostTags};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest not available: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where the index entries came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    Empty,
    Manifest,
    Page,
}

/// Known posts keyed by url.
pub struct PostIndex {
    posts: HashMap<String, PostSummary>,
    source: IndexSource,
}

pub async fn fetch_manifest<F: Fetcher>(fetcher: &F, manifest_path: &str) -> Result<Manifest, ManifestError> {
    let body = fetcher.fetch_text(manifest_path).await?;
    Ok(Manifest::from_json(&body)?)
}

impl PostIndex {
    pub fn new() -> PostIndex {
        PostIndex {
            posts: Default::default(),
            source: IndexSource::Empty,
        }
    }

    pub fn from_manifest(manifest: Manifest) -> PostIndex {
        let posts = manifest.posts.into_iter()
            .map(PostSummary::from)
            .map(|post| (post.url.clone(), post))
            .collect();

        PostIndex {
            posts,
            source: IndexSource::Manifest,
        }
    }

    /// Builds the index from the list view. Items without a title link are skipped.
    pub fn from_list_items(items: Vec<ScrapedItem>) -> PostIndex {
        let mut posts = HashMap::new();
        for item in items {
            let Some(link) = item.title_link else {
                continue;
            };

            let post = PostSummary {
                url: link.href.clone(),
                title: link.text.trim().to_string(),
                excerpt: item.excerpt.map(|e| e.trim().to_string()),
                meta: PostMeta::Rendered(item.meta.map(|m| m.trim().to_string()).unwrap_or_default()),
                content: None,
                tags: PostTags::List(vec![]),
            };
            posts.insert(link.href, post);
        }

        PostIndex {
            posts,
            source: IndexSource::Page,
        }
    }

    pub fn source(&self) -> IndexSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&PostSummary> {
        self.posts.get(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.posts.contains_key(url)
    }

    /// Adds an entry unless the url is already known. Returns whether it was added.
    pub fn insert_if_absent(&mut self, post: PostSummary) -> bool {
        if self.posts.contains_key(&post.url) {
            return false;
        }
        self.posts.insert(post.url.clone(), post);
        true
    }

    /// Keeps entries of `other` whose url is not indexed yet.
    pub fn absorb(&mut self, other: PostIndex) {
        for (url, post) in other.posts {
            self.posts.entry(url).or_insert(post);
        }
    }

    /// Entries sorted by url.
    pub fn posts(&self) -> Vec<&PostSummary> {
        let mut posts: Vec<_> = self.posts.values().collect();
        posts.sort_by(|a, b| a.url.cmp(&b.url));
        posts
    }
}

impl Default for PostIndex {
    fn default() -> Self {
        Self::new()
    }
}
