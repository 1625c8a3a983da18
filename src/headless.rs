use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;

use crate::document::{ClickTarget, Document, ElementDesc, HistoryEntry, Link, Region, ScrapedItem};
use crate::html::{HtmlTree, Node, Selector, SelectorError};

lazy_static! {
    static ref LIST_ITEM: Selector = Selector::parse(".blog-post-item").unwrap();
    static ref TITLE_LINK: Selector = Selector::parse(".blog-post-title a").unwrap();
    static ref EXCERPT: Selector = Selector::parse(".blog-post-excerpt").unwrap();
    static ref META: Selector = Selector::parse(".post-meta").unwrap();
    static ref PAGE_TITLE: Selector = Selector::parse("title").unwrap();
    static ref CODE_BLOCK: Selector = Selector::parse("pre code").unwrap();
}

struct PageState {
    post_content: String,
    visible: HashMap<Region, bool>,
    loading: bool,
    title: String,
    history: Vec<HistoryEntry>,
    scrolls: usize,
    highlighted_blocks: usize,
    notifications: BTreeMap<u64, String>,
}

/// A page held in memory. The list view is read from the page markup, every
/// mutation the navigator makes is recorded and can be inspected.
pub struct HeadlessPage {
    tree: HtmlTree,
    state: RefCell<PageState>,
}

fn describe(node: Node) -> ElementDesc {
    ElementDesc {
        tag: node.name().to_string(),
        classes: node.classes().to_vec(),
        id: node.id().map(|id| id.to_string()),
        href: node.attr("href").map(|href| href.to_string()),
    }
}

impl HeadlessPage {
    pub fn new(page_html: &str) -> HeadlessPage {
        let tree = HtmlTree::parse(page_html);
        let title = tree.select_first(&PAGE_TITLE)
            .map(|node| node.text_content().trim().to_string())
            .unwrap_or_default();

        let visible = HashMap::from([
            (Region::PostList, true),
            (Region::PostContent, false),
            (Region::BackButton, false),
        ]);

        HeadlessPage {
            tree,
            state: RefCell::new(PageState {
                post_content: String::new(),
                visible,
                loading: false,
                title,
                history: vec![],
                scrolls: 0,
                highlighted_blocks: 0,
                notifications: BTreeMap::new(),
            }),
        }
    }

    pub fn empty() -> HeadlessPage {
        Self::new("")
    }

    /// Describes a click on the first element matching `selector`.
    pub fn click_target(&self, selector: &str) -> Result<Option<ClickTarget>, SelectorError> {
        let selector = Selector::parse(selector)?;
        let Some(node) = self.tree.select_first(&selector) else {
            return Ok(None);
        };

        let ancestors = std::iter::successors(node.parent(), |n| n.parent())
            .map(describe)
            .collect();

        Ok(Some(ClickTarget {
            target: describe(node),
            ancestors,
        }))
    }

    pub fn post_content(&self) -> String {
        self.state.borrow().post_content.clone()
    }

    pub fn is_visible(&self, region: Region) -> bool {
        self.state.borrow().visible.get(&region).copied().unwrap_or(false)
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn title(&self) -> String {
        self.state.borrow().title.clone()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state.borrow().history.clone()
    }

    pub fn scroll_count(&self) -> usize {
        self.state.borrow().scrolls
    }

    pub fn highlighted_blocks(&self) -> usize {
        self.state.borrow().highlighted_blocks
    }

    pub fn notifications(&self) -> Vec<(u64, String)> {
        self.state.borrow().notifications.iter()
            .map(|(id, markup)| (*id, markup.clone()))
            .collect()
    }
}

impl Document for HeadlessPage {
    fn list_items(&self) -> Vec<ScrapedItem> {
        self.tree.select_all(&LIST_ITEM).into_iter()
            .map(|item| {
                let title_link = item.select_first(&TITLE_LINK).map(|link| Link {
                    href: link.attr("href").unwrap_or_default().to_string(),
                    text: link.text_content().into_owned(),
                });
                ScrapedItem {
                    title_link,
                    excerpt: item.select_first(&EXCERPT).map(|n| n.text_content().into_owned()),
                    meta: item.select_first(&META).map(|n| n.text_content().into_owned()),
                }
            })
            .collect()
    }

    fn set_post_content(&self, markup: &str) {
        self.state.borrow_mut().post_content = markup.to_string();
    }

    fn set_visible(&self, region: Region, visible: bool) {
        self.state.borrow_mut().visible.insert(region, visible);
    }

    fn set_loading(&self, loading: bool) {
        self.state.borrow_mut().loading = loading;
    }

    fn set_title(&self, title: &str) {
        self.state.borrow_mut().title = title.to_string();
    }

    fn push_history(&self, entry: HistoryEntry) {
        self.state.borrow_mut().history.push(entry);
    }

    fn scroll_to_top(&self) {
        self.state.borrow_mut().scrolls += 1;
    }

    fn highlight_code_blocks(&self) {
        let mut state = self.state.borrow_mut();
        let content = HtmlTree::parse(&state.post_content);
        state.highlighted_blocks += content.select_all(&CODE_BLOCK).len();
    }

    fn show_notification(&self, id: u64, markup: &str) {
        self.state.borrow_mut().notifications.insert(id, markup.to_string());
    }

    fn remove_notification(&self, id: u64) -> bool {
        self.state.borrow_mut().notifications.remove(&id).is_some()
    }
}
