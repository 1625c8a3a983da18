use serde::{Deserialize, Serialize};

use crate::html::{Matchable, Selector};

/// Page regions the navigator shows and hides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    /// The rendered list of post summaries.
    PostList,
    /// The region receiving the assembled article.
    PostContent,
    /// The "back to blog" control.
    BackButton,
}

/// Payload stored with a history entry, enough to replay the transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryState {
    pub post_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// `None` for the list view.
    pub state: Option<HistoryState>,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub href: String,
    pub text: String,
}

/// One summary found in the list view, as found. Text is untrimmed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrapedItem {
    pub title_link: Option<Link>,
    pub excerpt: Option<String>,
    pub meta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementDesc {
    pub tag: String,
    pub classes: Vec<String>,
    pub id: Option<String>,
    pub href: Option<String>,
}

impl Matchable for ElementDesc {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// The element a click landed on plus its ancestors, innermost first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClickTarget {
    pub target: ElementDesc,
    pub ancestors: Vec<ElementDesc>,
}

impl ClickTarget {
    pub fn path(&self) -> impl Iterator<Item=&ElementDesc> + Clone {
        std::iter::once(&self.target).chain(self.ancestors.iter())
    }

    /// Whether the target or one of its ancestors matches, as DOM `closest` does.
    pub fn within(&self, selector: &Selector) -> bool {
        let mut path = self.path();
        loop {
            if selector.matches_path(path.clone()) {
                return true;
            }
            if path.next().is_none() {
                return false;
            }
        }
    }

    /// The target's own href, else the href of the closest enclosing link.
    pub fn link_href(&self) -> Option<&str> {
        self.target.href.as_deref()
            .or_else(|| self.ancestors.iter()
                .find(|a| a.tag.eq_ignore_ascii_case("a"))
                .and_then(|a| a.href.as_deref()))
    }
}

/// Everything the navigator needs from the page it lives in.
/// Implementations own their interior mutability; the navigator only
/// ever holds a shared reference.
pub trait Document {
    /// Summaries currently rendered in the list view.
    fn list_items(&self) -> Vec<ScrapedItem>;

    fn set_post_content(&self, markup: &str);

    fn set_visible(&self, region: Region, visible: bool);

    fn set_loading(&self, loading: bool);

    fn set_title(&self, title: &str);

    fn push_history(&self, entry: HistoryEntry);

    fn scroll_to_top(&self);

    /// Marks `pre code` blocks of the post region as highlighted.
    fn highlight_code_blocks(&self);

    fn show_notification(&self, id: u64, markup: &str);

    /// Returns false when the notification was already gone.
    fn remove_notification(&self, id: u64) -> bool;
}
