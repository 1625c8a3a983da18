use std::cell::{Cell, Ref, RefCell};
use std::io;
use std::rc::Rc;
use std::time::Duration;

use lazy_static::lazy_static;
use spdlog::{debug, error, info, warn};
use tokio::task::JoinHandle;

use crate::content::PostContent;
use crate::document::{ClickTarget, Document, HistoryEntry, HistoryState, Region};
use crate::fetch::{FetchError, Fetcher, WithTimeout};
use crate::html::Selector;
use crate::post_index::{fetch_manifest, IndexSource, PostIndex};
use crate::view::article_renderer::ArticleRenderer;
use crate::view::error_renderer::ErrorRenderer;

pub const LOAD_ERROR_MESSAGE: &str = "Failed to load blog post. Please try again.";

lazy_static! {
    static ref READ_MORE: Selector = Selector::parse(".blog-post-readmore").unwrap();
    static ref TITLE_LINK: Selector = Selector::parse(".blog-post-title a").unwrap();
    static ref BACK_BUTTON: Selector = Selector::parse(".blog-back-button").unwrap();
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigatorOptions {
    /// Used as the list view title and as the document title suffix.
    pub site_name: String,
    pub list_url: String,
    pub manifest_path: String,
    /// Post url template, `{slug}` is replaced.
    pub post_path_template: String,
    pub error_dismiss: Duration,
    /// `None` lets a request hang forever, blocking navigation while it does.
    pub fetch_timeout: Option<Duration>,
}

impl Default for NavigatorOptions {
    fn default() -> Self {
        NavigatorOptions {
            site_name: "Security Blog".to_string(),
            list_url: "/blog/".to_string(),
            manifest_path: "/blog/posts.json".to_string(),
            post_path_template: "/blog/{slug}/".to_string(),
            error_dismiss: Duration::from_secs(5),
            fetch_timeout: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    ListView,
    PostView(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Displayed,
    /// Another load was in flight.
    Ignored,
    /// Carries the id of the error notification shown.
    Failed(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Default navigation is cancelled, the post at this url is being loaded.
    Intercepted(String),
    /// The back control was clicked, the list is showing again.
    Back,
    PassThrough,
}

struct LoadingGuard<'a, D: Document> {
    loading: &'a Cell<bool>,
    document: &'a D,
}

impl<'a, D: Document> LoadingGuard<'a, D> {
    fn begin(loading: &'a Cell<bool>, document: &'a D) -> LoadingGuard<'a, D> {
        loading.set(true);
        document.set_loading(true);
        LoadingGuard { loading, document }
    }
}

impl<D: Document> Drop for LoadingGuard<'_, D> {
    fn drop(&mut self) {
        self.loading.set(false);
        self.document.set_loading(false);
    }
}

/// Swaps blog posts into the page without a full navigation and keeps the
/// browser history in step.
///
/// Lives on a single thread. Background work (error auto-dismiss, preloads,
/// event-routed loads) is spawned with `tokio::task::spawn_local`, so the
/// navigator must be driven from inside a `LocalSet`.
pub struct PostNavigator<D: Document, F: Fetcher> {
    document: Rc<D>,
    fetcher: WithTimeout<F>,
    options: NavigatorOptions,
    index: RefCell<PostIndex>,
    view: RefCell<ViewState>,
    loading: Cell<bool>,
    last_notification: Cell<u64>,
    articles: ArticleRenderer,
    errors: ErrorRenderer,
}

impl<D: Document + 'static, F: Fetcher + 'static> PostNavigator<D, F> {
    /// Builds a navigator with an empty index. See [`PostNavigator::init`].
    pub fn new(document: Rc<D>, fetcher: F, options: NavigatorOptions) -> io::Result<Rc<Self>> {
        let fetcher = WithTimeout::new(fetcher, options.fetch_timeout);
        Ok(Rc::new(PostNavigator {
            document,
            fetcher,
            options,
            index: RefCell::new(PostIndex::new()),
            view: RefCell::new(ViewState::ListView),
            loading: Cell::new(false),
            last_notification: Cell::new(0),
            articles: ArticleRenderer::new()?,
            errors: ErrorRenderer::new()?,
        }))
    }

    /// Builds the navigator and starts filling the index in the background.
    /// Navigation works right away; until the index is ready posts are fetched.
    ///
    /// # Panics
    ///
    /// When called outside a `LocalSet`.
    pub fn init(document: Rc<D>, fetcher: F, options: NavigatorOptions) -> io::Result<Rc<Self>> {
        let navigator = Self::new(document, fetcher, options)?;
        let bootstrapping = Rc::clone(&navigator);
        tokio::task::spawn_local(async move {
            bootstrapping.bootstrap().await;
        });
        Ok(navigator)
    }

    /// Fills the index from the manifest, or from the list view when the
    /// manifest can't be used. Never fails.
    pub async fn bootstrap(&self) -> IndexSource {
        let mut index = match fetch_manifest(&self.fetcher, &self.options.manifest_path).await {
            Ok(manifest) => PostIndex::from_manifest(manifest),
            Err(e) => {
                info!("{}. Reading posts from the page", e);
                PostIndex::from_list_items(self.document.list_items())
            }
        };
        info!("Indexed {} posts from {:?}", index.len(), index.source());

        // Keep whatever was preloaded while the manifest was in flight
        let preloaded = self.index.replace(PostIndex::new());
        index.absorb(preloaded);
        let source = index.source();
        *self.index.borrow_mut() = index;

        source
    }

    pub fn index(&self) -> Ref<'_, PostIndex> {
        self.index.borrow()
    }

    pub fn view_state(&self) -> ViewState {
        self.view.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.get()
    }

    /// Shows the post at `url` in place of the list. Dropped without effect
    /// when another load is in flight.
    ///
    /// # Panics
    ///
    /// A failed load schedules the error notification expiry with
    /// `spawn_local`, which panics outside a `LocalSet`.
    pub async fn load(&self, url: &str, update_history: bool) -> LoadOutcome {
        if self.loading.get() {
            debug!("Load of {} ignored, another load is in flight", url);
            return LoadOutcome::Ignored;
        }
        let _loading = LoadingGuard::begin(&self.loading, self.document.as_ref());

        let post = match self.resolve(url).await {
            Ok(post) => post,
            Err(e) => {
                error!("Failed to load post {}: {}", url, e);
                return LoadOutcome::Failed(self.show_error(LOAD_ERROR_MESSAGE));
            }
        };

        self.display(&post);
        if update_history {
            self.document.push_history(HistoryEntry {
                state: Some(HistoryState { post_url: url.to_string() }),
                title: post.title.clone(),
                url: url.to_string(),
            });
        }
        self.document.set_title(&format!("{} - {}", post.title, self.options.site_name));
        *self.view.borrow_mut() = ViewState::PostView(url.to_string());

        LoadOutcome::Displayed
    }

    async fn resolve(&self, url: &str) -> Result<PostContent, FetchError> {
        let indexed = self.index.borrow()
            .get(url)
            .filter(|post| post.has_content())
            .map(|post| PostContent::from_summary(post, &self.articles));
        if let Some(post) = indexed {
            debug!("Showing {} from the index", url);
            return Ok(post);
        }

        let html = self.fetcher.fetch_text(url).await?;
        Ok(PostContent::from_html(&html))
    }

    fn display(&self, post: &PostContent) {
        self.document.set_post_content(&self.articles.render(post));
        self.document.set_visible(Region::PostList, false);
        self.document.set_visible(Region::PostContent, true);
        self.document.set_visible(Region::BackButton, true);
        self.document.scroll_to_top();
        self.document.highlight_code_blocks();
    }

    /// Back to the list view. Always succeeds.
    pub fn show_list(&self, update_history: bool) {
        self.document.set_visible(Region::PostList, true);
        self.document.set_visible(Region::PostContent, false);
        self.document.set_visible(Region::BackButton, false);

        if update_history {
            self.document.push_history(HistoryEntry {
                state: None,
                title: self.options.site_name.clone(),
                url: self.options.list_url.clone(),
            });
        }

        self.document.set_title(&self.options.site_name);
        self.document.scroll_to_top();
        *self.view.borrow_mut() = ViewState::ListView;
    }

    /// Replays a history entry the browser moved to. Never pushes history.
    pub async fn pop_history(&self, state: Option<&HistoryState>) {
        match state {
            Some(state) => {
                self.load(&state.post_url, false).await;
            }
            None => self.show_list(false),
        }
    }

    /// The post url a click should open, if the click is on a "read more"
    /// control or a post title link.
    pub fn route_click(&self, click: &ClickTarget) -> Option<String> {
        if READ_MORE.matches_path(click.path()) || TITLE_LINK.matches_path(click.path()) {
            return click.link_href().map(|href| href.to_string());
        }
        None
    }

    /// Document-wide click handler. Post loads run on the current `LocalSet`.
    pub fn handle_click(self: &Rc<Self>, click: &ClickTarget) -> ClickOutcome {
        if click.within(&BACK_BUTTON) {
            self.show_list(true);
            return ClickOutcome::Back;
        }

        let Some(url) = self.route_click(click) else {
            return ClickOutcome::PassThrough;
        };

        let navigator = Rc::clone(self);
        let target = url.clone();
        tokio::task::spawn_local(async move {
            navigator.load(&target, true).await;
        });
        ClickOutcome::Intercepted(url)
    }

    pub fn handle_pop_state(self: &Rc<Self>, state: Option<HistoryState>) -> JoinHandle<()> {
        let navigator = Rc::clone(self);
        tokio::task::spawn_local(async move {
            navigator.pop_history(state.as_ref()).await;
        })
    }

    pub fn post_url(&self, slug: &str) -> String {
        self.options.post_path_template.replace("{slug}", slug)
    }

    pub async fn load_post_by_slug(&self, slug: &str) -> LoadOutcome {
        let url = self.post_url(slug);
        self.load(&url, true).await
    }

    /// Fetches a post into the index ahead of time. Returns false when the
    /// post was already known or could not be fetched.
    pub async fn preload(&self, url: &str) -> bool {
        if self.index.borrow().contains(url) {
            return false;
        }

        match self.fetcher.fetch_text(url).await {
            Ok(html) => {
                let post = PostContent::from_html(&html).into_summary(url);
                let added = self.index.borrow_mut().insert_if_absent(post);
                debug!("Preloaded {}", url);
                added
            }
            Err(e) => {
                warn!("Failed to preload {}: {}", url, e);
                false
            }
        }
    }

    /// Fire and forget version of [`PostNavigator::preload`].
    pub fn preload_post(self: &Rc<Self>, url: &str) -> Option<JoinHandle<()>> {
        if self.index.borrow().contains(url) {
            return None;
        }

        let navigator = Rc::clone(self);
        let url = url.to_string();
        Some(tokio::task::spawn_local(async move {
            navigator.preload(&url).await;
        }))
    }

    fn show_error(&self, message: &str) -> u64 {
        let id = self.last_notification.get() + 1;
        self.last_notification.set(id);
        self.document.show_notification(id, &self.errors.render(id, message));

        let document = Rc::clone(&self.document);
        let delay = self.options.error_dismiss;
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            if document.remove_notification(id) {
                debug!("Error notification {} expired", id);
            }
        });

        id
    }

    /// Closes an error notification before it expires.
    pub fn dismiss_error(&self, id: u64) -> bool {
        self.document.remove_notification(id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;

    use tokio::task::LocalSet;

    use crate::headless::HeadlessPage;
    use crate::test_data::{LIST_PAGE, MANIFEST_DATA, POST_PAGE};

    use super::*;

    #[derive(Clone, Default)]
    struct FakeFetcher {
        pages: HashMap<String, String>,
        delays: HashMap<String, Duration>,
        requests: Rc<RefCell<Vec<String>>>,
    }

    impl FakeFetcher {
        fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }

        fn with_delay(mut self, url: &str, delay: Duration) -> Self {
            self.delays.insert(url.to_string(), delay);
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.borrow().clone()
        }
    }

    impl Fetcher for FakeFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            self.requests.borrow_mut().push(url.to_string());
            if let Some(delay) = self.delays.get(url) {
                tokio::time::sleep(*delay).await;
            }
            match self.pages.get(url) {
                Some(body) => Ok(body.clone()),
                None => Err(FetchError::Status(404, "Not Found".to_string())),
            }
        }
    }

    async fn local<T: Future>(f: T) -> T::Output {
        LocalSet::new().run_until(f).await
    }

    fn navigator(fetcher: &FakeFetcher) -> (Rc<HeadlessPage>, Rc<PostNavigator<HeadlessPage, FakeFetcher>>) {
        let page = Rc::new(HeadlessPage::new(LIST_PAGE));
        let navigator = PostNavigator::new(Rc::clone(&page), fetcher.clone(), NavigatorOptions::default()).unwrap();
        (page, navigator)
    }

    fn with_manifest() -> FakeFetcher {
        FakeFetcher::default().with_page("/blog/posts.json", MANIFEST_DATA)
    }

    #[tokio::test]
    async fn test_manifest_takes_precedence() {
        let fetcher = with_manifest();
        let (_page, navigator) = navigator(&fetcher);

        assert_eq!(navigator.bootstrap().await, IndexSource::Manifest);
        let index = navigator.index();
        assert_eq!(index.len(), 2);
        assert!(index.contains("/blog/xss-basics/"));
        assert!(index.contains("/blog/threat-modeling/"));
        assert!(!index.contains("/blog/sql-injection/"));
        assert!(!index.contains("/blog/csrf/"));
    }

    #[tokio::test]
    async fn test_page_fallback() {
        let fetcher = FakeFetcher::default();
        let (_page, navigator) = navigator(&fetcher);

        assert_eq!(navigator.bootstrap().await, IndexSource::Page);
        let index = navigator.index();
        assert_eq!(index.len(), 2);
        let post = index.get("/blog/sql-injection/").unwrap();
        assert_eq!(post.title, "SQL Injection in Practice");
        assert_eq!(post.excerpt.as_deref(), Some("Parameterize & sleep well."));
    }

    #[tokio::test]
    async fn test_broken_manifest_falls_back() {
        let fetcher = FakeFetcher::default().with_page("/blog/posts.json", "<html>oops</html>");
        let (_page, navigator) = navigator(&fetcher);
        assert_eq!(navigator.bootstrap().await, IndexSource::Page);
        assert_eq!(navigator.index().len(), 2);
    }

    #[tokio::test]
    async fn test_load_indexed_post() {
        local(async {
            let fetcher = with_manifest();
            let (page, navigator) = navigator(&fetcher);
            navigator.bootstrap().await;

            assert_eq!(navigator.load("/blog/xss-basics/", true).await, LoadOutcome::Displayed);

            let content = page.post_content();
            assert!(content.contains(r#"<h1 class="post-title">XSS Basics</h1>"#));
            assert!(content.contains("March 5, 2024"));
            assert!(content.contains("in Security, Web"));
            assert!(content.contains(r#"<span class="tag">xss</span>"#));
            // Placeholders never reach the page on the indexed path
            assert!(!content.contains("{% raw %}"));
            assert!(!content.contains("{{ payload }}"));

            assert!(!page.is_visible(Region::PostList));
            assert!(page.is_visible(Region::PostContent));
            assert!(page.is_visible(Region::BackButton));
            assert!(!page.is_loading());
            assert_eq!(page.title(), "XSS Basics - Security Blog");
            assert_eq!(page.scroll_count(), 1);
            assert_eq!(page.highlighted_blocks(), 1);
            assert_eq!(page.history(), vec![HistoryEntry {
                state: Some(HistoryState { post_url: "/blog/xss-basics/".to_string() }),
                title: "XSS Basics".to_string(),
                url: "/blog/xss-basics/".to_string(),
            }]);
            assert_eq!(navigator.view_state(), ViewState::PostView("/blog/xss-basics/".to_string()));
            assert_eq!(fetcher.requests(), vec!["/blog/posts.json".to_string()]);
        }).await;
    }

    #[tokio::test]
    async fn test_load_fetched_post_keeps_placeholders() {
        local(async {
            let fetcher = FakeFetcher::default().with_page("/blog/sql-injection/", POST_PAGE);
            let (page, navigator) = navigator(&fetcher);
            navigator.bootstrap().await;

            // Scraped entries have no body, so the page is fetched
            assert_eq!(navigator.load("/blog/sql-injection/", true).await, LoadOutcome::Displayed);
            assert!(fetcher.requests().contains(&"/blog/sql-injection/".to_string()));

            let content = page.post_content();
            assert!(content.contains("{% raw %}{{ not a template }}{% endraw %}"));
            assert!(content.contains(r#"<div class="post-meta"><time datetime="2024-01-02">January 2, 2024</time></div>"#));
            assert!(content.contains(r#"<span class="tag">sqli</span>"#));
            assert_eq!(page.title(), "SQL Injection in Practice - Security Blog");
        }).await;
    }

    #[tokio::test]
    async fn test_empty_tags_render_no_block() {
        local(async {
            let fetcher = with_manifest();
            let (page, navigator) = navigator(&fetcher);
            navigator.bootstrap().await;

            navigator.load("/blog/threat-modeling/", true).await;
            let content = page.post_content();
            assert!(content.contains("Draw the data flows first."));
            assert!(!content.contains("post-tags"));
            assert!(!content.contains("Tags:"));
        }).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_load_is_dropped() {
        local(async {
            let fetcher = FakeFetcher::default()
                .with_page("/blog/a/", "<article><h1>A</h1></article>")
                .with_page("/blog/b/", "<article><h1>B</h1></article>")
                .with_delay("/blog/a/", Duration::from_secs(1));
            let (page, navigator) = navigator(&fetcher);

            let (first, second) = tokio::join!(
                navigator.load("/blog/a/", true),
                navigator.load("/blog/b/", true),
            );
            assert_eq!(first, LoadOutcome::Displayed);
            assert_eq!(second, LoadOutcome::Ignored);

            assert_eq!(fetcher.requests(), vec!["/blog/a/".to_string()]);
            assert!(page.post_content().contains("<h1>A</h1>"));
            assert_eq!(page.history().len(), 1);
            assert_eq!(page.history()[0].url, "/blog/a/");
            assert!(!navigator.is_loading());
        }).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_request_blocks_navigation() {
        local(async {
            let fetcher = FakeFetcher::default()
                .with_page("/blog/a/", "<article>A</article>")
                .with_page("/blog/b/", "<article>B</article>")
                .with_delay("/blog/a/", Duration::from_secs(24 * 3600));
            let (page, navigator) = navigator(&fetcher);

            let pending = Rc::clone(&navigator);
            tokio::task::spawn_local(async move {
                pending.load("/blog/a/", true).await;
            });
            while !navigator.is_loading() {
                tokio::task::yield_now().await;
            }

            assert!(navigator.is_loading());
            assert!(page.is_loading());
            assert_eq!(navigator.load("/blog/b/", true).await, LoadOutcome::Ignored);
            assert_eq!(navigator.view_state(), ViewState::ListView);
        }).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_releases_navigation() {
        local(async {
            let fetcher = FakeFetcher::default()
                .with_page("/blog/a/", "<article>A</article>")
                .with_page("/blog/b/", "<article>B</article>")
                .with_delay("/blog/a/", Duration::from_secs(24 * 3600));
            let page = Rc::new(HeadlessPage::new(LIST_PAGE));
            let options = NavigatorOptions {
                fetch_timeout: Some(Duration::from_secs(10)),
                ..Default::default()
            };
            let navigator = PostNavigator::new(Rc::clone(&page), fetcher.clone(), options).unwrap();

            assert_eq!(navigator.load("/blog/a/", true).await, LoadOutcome::Failed(1));
            assert!(!navigator.is_loading());
            assert_eq!(navigator.load("/blog/b/", true).await, LoadOutcome::Displayed);
        }).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_round_trip() {
        local(async {
            let fetcher = with_manifest();
            let (page, navigator) = navigator(&fetcher);
            navigator.bootstrap().await;

            navigator.load("/blog/xss-basics/", true).await;
            assert_eq!(page.history().len(), 1);

            navigator.pop_history(None).await;
            assert!(page.is_visible(Region::PostList));
            assert!(!page.is_visible(Region::PostContent));
            assert!(!page.is_visible(Region::BackButton));
            assert_eq!(page.title(), "Security Blog");
            assert_eq!(page.history().len(), 1);
            assert_eq!(navigator.view_state(), ViewState::ListView);

            // Forward again replays the post without a new entry
            let state = page.history()[0].state.clone();
            navigator.handle_pop_state(state).await.unwrap();
            assert!(page.is_visible(Region::PostContent));
            assert_eq!(page.title(), "XSS Basics - Security Blog");
            assert_eq!(page.history().len(), 1);
        }).await;
    }

    #[tokio::test]
    async fn test_back_to_list_pushes_history() {
        local(async {
            let fetcher = with_manifest();
            let (page, navigator) = navigator(&fetcher);
            navigator.bootstrap().await;

            navigator.load("/blog/xss-basics/", true).await;
            navigator.show_list(true);

            let history = page.history();
            assert_eq!(history.len(), 2);
            assert_eq!(history[1], HistoryEntry {
                state: None,
                title: "Security Blog".to_string(),
                url: "/blog/".to_string(),
            });
            assert_eq!(page.title(), "Security Blog");
            assert_eq!(page.scroll_count(), 2);
        }).await;
    }

    #[tokio::test]
    async fn test_back_click_shows_list() {
        local(async {
            let fetcher = with_manifest();
            let (page, navigator) = navigator(&fetcher);
            navigator.bootstrap().await;
            navigator.load("/blog/xss-basics/", true).await;

            let back = page.click_target(".blog-back-button span").unwrap().unwrap();
            assert_eq!(navigator.route_click(&back), None);
            assert_eq!(navigator.handle_click(&back), ClickOutcome::Back);
            assert_eq!(navigator.view_state(), ViewState::ListView);
            assert!(page.is_visible(Region::PostList));
            assert!(!page.is_visible(Region::BackButton));

            let history = page.history();
            assert_eq!(history.len(), 2);
            assert_eq!(history[1].state, None);
            assert_eq!(history[1].url, "/blog/");
        }).await;
    }

    #[tokio::test]
    #[should_panic(expected = "spawn_local")]
    async fn test_failed_load_requires_local_set() {
        let fetcher = FakeFetcher::default();
        let (_page, navigator) = navigator(&fetcher);
        navigator.load("/blog/missing/", true).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_notification_expires() {
        local(async {
            let fetcher = FakeFetcher::default();
            let (page, navigator) = navigator(&fetcher);

            let LoadOutcome::Failed(id) = navigator.load("/blog/missing/", true).await else {
                panic!("load should fail");
            };
            let notifications = page.notifications();
            assert_eq!(notifications.len(), 1);
            assert_eq!(notifications[0].0, id);
            assert!(notifications[0].1.contains(LOAD_ERROR_MESSAGE));

            // Nothing else changed
            assert!(page.is_visible(Region::PostList));
            assert!(!page.is_visible(Region::PostContent));
            assert!(page.history().is_empty());
            assert_eq!(page.title(), "Security Blog");
            assert!(!navigator.is_loading());

            tokio::time::sleep(Duration::from_secs(4)).await;
            assert_eq!(page.notifications().len(), 1);
            tokio::time::sleep(Duration::from_secs(2)).await;
            assert!(page.notifications().is_empty());
        }).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_notification_dismissed_early() {
        local(async {
            let fetcher = FakeFetcher::default();
            let (page, navigator) = navigator(&fetcher);

            let LoadOutcome::Failed(first) = navigator.load("/blog/missing/", true).await else {
                panic!("load should fail");
            };
            assert!(navigator.dismiss_error(first));
            assert!(page.notifications().is_empty());
            assert!(!navigator.dismiss_error(first));

            let LoadOutcome::Failed(second) = navigator.load("/blog/missing/", true).await else {
                panic!("load should fail");
            };
            assert_ne!(first, second);

            tokio::time::sleep(Duration::from_secs(6)).await;
            assert!(page.notifications().is_empty());
        }).await;
    }

    #[tokio::test]
    async fn test_click_routing() {
        local(async {
            let fetcher = FakeFetcher::default().with_page("/blog/sql-injection/", POST_PAGE);
            let (page, navigator) = navigator(&fetcher);

            let title_link = page.click_target(".blog-post-title a").unwrap().unwrap();
            assert_eq!(navigator.route_click(&title_link), Some("/blog/sql-injection/".to_string()));

            let read_more = page.click_target(".blog-post-readmore").unwrap().unwrap();
            assert_eq!(navigator.route_click(&read_more), Some("/blog/sql-injection/".to_string()));

            let image = page.click_target("img").unwrap().unwrap();
            assert_eq!(navigator.handle_click(&image), ClickOutcome::PassThrough);

            let excerpt = page.click_target(".blog-post-excerpt").unwrap().unwrap();
            assert_eq!(navigator.handle_click(&excerpt), ClickOutcome::PassThrough);

            assert_eq!(navigator.handle_click(&title_link), ClickOutcome::Intercepted("/blog/sql-injection/".to_string()));
            while navigator.view_state() == ViewState::ListView {
                tokio::task::yield_now().await;
            }
            assert_eq!(page.title(), "SQL Injection in Practice - Security Blog");
            assert_eq!(page.history().len(), 1);
        }).await;
    }

    #[tokio::test]
    async fn test_load_post_by_slug() {
        local(async {
            let fetcher = FakeFetcher::default().with_page("/blog/sql-injection/", POST_PAGE);
            let (page, navigator) = navigator(&fetcher);

            assert_eq!(navigator.post_url("sql-injection"), "/blog/sql-injection/");
            assert_eq!(navigator.load_post_by_slug("sql-injection").await, LoadOutcome::Displayed);
            assert_eq!(page.history()[0].url, "/blog/sql-injection/");
        }).await;
    }

    #[tokio::test]
    async fn test_preload() {
        local(async {
            let fetcher = FakeFetcher::default().with_page("/blog/sql-injection/", POST_PAGE);
            let (page, navigator) = navigator(&fetcher);

            assert!(navigator.preload("/blog/sql-injection/").await);
            assert!(navigator.index().get("/blog/sql-injection/").unwrap().has_content());
            assert!(navigator.preload_post("/blog/sql-injection/").is_none());

            // Failures stay silent
            navigator.preload_post("/blog/missing/").unwrap().await.unwrap();
            assert!(!navigator.index().contains("/blog/missing/"));
            assert!(page.notifications().is_empty());

            // The cached entry is served without another request
            assert_eq!(navigator.load("/blog/sql-injection/", true).await, LoadOutcome::Displayed);
            let requests = fetcher.requests();
            assert_eq!(requests.iter().filter(|r| r.as_str() == "/blog/sql-injection/").count(), 1);
            assert!(page.post_content().contains("Use bind parameters."));
            assert!(page.post_content().contains("<code></code>"));
        }).await;
    }

    #[tokio::test]
    async fn test_init_bootstraps_in_background() {
        local(async {
            let fetcher = with_manifest();
            let page = Rc::new(HeadlessPage::new(LIST_PAGE));
            let navigator = PostNavigator::init(Rc::clone(&page), fetcher.clone(), NavigatorOptions::default()).unwrap();
            assert!(navigator.index().is_empty());

            while navigator.index().source() == IndexSource::Empty {
                tokio::task::yield_now().await;
            }
            assert_eq!(navigator.index().source(), IndexSource::Manifest);
            assert_eq!(navigator.index().len(), 2);
        }).await;
    }
}
