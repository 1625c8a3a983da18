use lazy_static::lazy_static;

use crate::html::{HtmlTree, Selector};
use crate::post::{PostMeta, PostSummary, PostTags};
use crate::text_utils::strip_template_tags;
use crate::view::article_renderer::ArticleRenderer;

pub const UNTITLED: &str = "Untitled";
pub const CONTENT_NOT_FOUND: &str = "Content not found";

lazy_static! {
    static ref ARTICLE_CLASS: Selector = Selector::parse(".blog-post").unwrap();
    static ref ARTICLE_TAG: Selector = Selector::parse("article").unwrap();
    static ref TITLE: Selector = Selector::parse(".post-title, h1").unwrap();
    static ref META: Selector = Selector::parse(".post-meta").unwrap();
    static ref TAGS: Selector = Selector::parse(".post-tags").unwrap();
}

/// Everything the post region shows. `meta`, `content` and `tags` are markup.
#[derive(Debug, Clone, PartialEq)]
pub struct PostContent {
    pub title: String,
    pub meta: String,
    pub content: String,
    pub tags: String,
}

impl PostContent {
    /// Pulls the post out of a fetched page. Missing regions fall back to
    /// placeholders and never fail. Markup is kept exactly as found.
    pub fn from_html(html: &str) -> PostContent {
        let tree = HtmlTree::parse(html);

        let article = tree.select_first(&ARTICLE_CLASS)
            .or_else(|| tree.select_first(&ARTICLE_TAG));

        let title = tree.select_first(&TITLE)
            .map(|node| node.text_content().trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let meta = tree.select_first(&META)
            .map(|node| node.outer_html().to_string())
            .unwrap_or_default();

        let content = article
            .map(|node| node.inner_html().to_string())
            .unwrap_or_else(|| CONTENT_NOT_FOUND.to_string());

        let tags = tree.select_first(&TAGS)
            .map(|node| node.outer_html().to_string())
            .unwrap_or_default();

        PostContent {
            title,
            meta,
            content,
            tags,
        }
    }

    /// Builds the post from an indexed entry. Unrendered template
    /// placeholders are stripped from the body on this path only.
    pub fn from_summary(post: &PostSummary, renderer: &ArticleRenderer) -> PostContent {
        let meta = match post.meta {
            PostMeta::Fields { ref date, ref categories } => renderer.render_meta(date.as_deref(), categories),
            PostMeta::Rendered(ref rendered) => rendered.clone(),
        };

        let tags = match post.tags {
            PostTags::List(ref tags) => renderer.render_tags(tags),
            PostTags::Rendered(ref rendered) => rendered.clone(),
        };

        let content = post.content.as_deref()
            .map(strip_template_tags)
            .unwrap_or_default();

        PostContent {
            title: post.title.clone(),
            meta,
            content,
            tags,
        }
    }

    /// Index entry for a page fetched ahead of time.
    pub fn into_summary(self, url: &str) -> PostSummary {
        PostSummary {
            url: url.to_string(),
            title: self.title,
            excerpt: None,
            meta: PostMeta::Rendered(self.meta),
            content: Some(self.content),
            tags: PostTags::Rendered(self.tags),
        }
    }
}
