use std::io;
use std::io::ErrorKind;

use ramhorns::Template;

use crate::content::PostContent;
use crate::text_utils::format_long_date;

const ARTICLE_TPL: &str = r##"<article class="blog-post dynamic-post">
    <header class="post-header">
        <h1 class="post-title">{{title}}</h1>
        {{{meta}}}
    </header>
    <div class="post-content">
        {{{content}}}
    </div>
    {{{tags}}}
</article>"##;

const META_TPL: &str = r##"<div class="post-meta">
    {{#has_date}}<time datetime="{{date}}">{{long_date}}</time>{{/has_date}}
    {{#has_categories}}<span class="post-categories">in {{categories}}</span>{{/has_categories}}
</div>"##;

const TAGS_TPL: &str = r##"<div class="post-tags">
    <h4>Tags:</h4>
    {{#tags}}<span class="tag">{{tag}}</span>{{/tags}}
</div>"##;

#[derive(ramhorns::Content)]
struct ViewArticle<'a> {
    title: &'a str,
    meta: &'a str,
    content: &'a str,
    tags: &'a str,
}

#[derive(ramhorns::Content)]
struct ViewMeta<'a> {
    has_date: bool,
    date: &'a str,
    long_date: String,
    has_categories: bool,
    categories: String,
}

#[derive(ramhorns::Content)]
struct ViewTag<'a> {
    tag: &'a str,
}

#[derive(ramhorns::Content)]
struct ViewTags<'a> {
    tags: Vec<ViewTag<'a>>,
}

fn compile(name: &str, src: &'static str) -> io::Result<Template<'static>> {
    match Template::new(src) {
        Ok(x) => Ok(x),
        Err(e) => Err(io::Error::new(ErrorKind::InvalidInput, format!("Error parsing {} template: {}", name, e))),
    }
}

/// Renders the article shown in the post region, plus the meta and tag
/// blocks synthesized for indexed posts.
pub struct ArticleRenderer {
    article: Template<'static>,
    meta: Template<'static>,
    tags: Template<'static>,
}

impl ArticleRenderer {
    pub fn new() -> io::Result<ArticleRenderer> {
        Ok(ArticleRenderer {
            article: compile("article", ARTICLE_TPL)?,
            meta: compile("post meta", META_TPL)?,
            tags: compile("post tags", TAGS_TPL)?,
        })
    }

    pub fn render(&self, post: &PostContent) -> String {
        self.article.render(&ViewArticle {
            title: post.title.as_str(),
            meta: post.meta.as_str(),
            content: post.content.as_str(),
            tags: post.tags.as_str(),
        })
    }

    pub fn render_meta(&self, date: Option<&str>, categories: &[String]) -> String {
        self.meta.render(&ViewMeta {
            has_date: date.is_some(),
            date: date.unwrap_or_default(),
            long_date: date.map(format_long_date).unwrap_or_default(),
            has_categories: !categories.is_empty(),
            categories: categories.join(", "),
        })
    }

    /// Empty tag lists produce no block at all.
    pub fn render_tags(&self, tags: &[String]) -> String {
        if tags.is_empty() {
            return String::new();
        }
        let tags = tags.iter().map(|t| ViewTag { tag: t.as_str() }).collect();
        self.tags.render(&ViewTags { tags })
    }
}
