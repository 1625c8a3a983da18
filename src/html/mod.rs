use std::borrow::Cow;

use lazy_static::lazy_static;
use quick_xml::escape::{resolve_html5_entity, resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::{Captures, Regex};
use spdlog::debug;

pub use selector::{Matchable, Selector, SelectorError};

pub mod selector;

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

lazy_static! {
    static ref ENTITY_REGEX: Regex = Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").unwrap();
}

struct Element {
    name: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<(String, String)>,
    parent: Option<usize>,
    outer_start: usize,
    inner_start: usize,
    inner_end: usize,
    outer_end: usize,
}

impl Matchable for Element {
    fn tag(&self) -> &str {
        &self.name
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

/// Lenient HTML document. Markup is kept as-is and elements remember their
/// byte spans, so inner and outer markup come back exactly as written.
/// Broken markup never fails the parse: whatever was read before the problem
/// is kept and open elements are closed at the end of the input.
pub struct HtmlTree {
    source: String,
    elements: Vec<Element>,
    texts: Vec<(usize, String)>,
}

/// Borrowed handle to one element of an [`HtmlTree`].
#[derive(Clone, Copy)]
pub struct Node<'a> {
    tree: &'a HtmlTree,
    index: usize,
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    resolve_predefined_entity(name).or_else(|| resolve_html5_entity(name))
}

/// Decodes character references one at a time. Unknown names stay as written.
fn decode_text(raw: &[u8]) -> String {
    let raw = String::from_utf8_lossy(raw);
    ENTITY_REGEX.replace_all(&raw, |caps: &Captures| {
        let reference = &caps[0];
        unescape_with(reference, resolve_entity)
            .map(|text| text.into_owned())
            .unwrap_or_else(|_| reference.to_string())
    }).into_owned()
}

/// Position of the `<` opening the markup event that ends at `pos`.
fn markup_start(source: &str, pos: usize) -> usize {
    let bytes = source.as_bytes();
    if bytes.get(pos) != Some(&b'<') && pos > 0 && bytes[pos - 1] == b'<' {
        pos - 1
    } else {
        pos
    }
}

fn element_name(start: &BytesStart) -> String {
    String::from_utf8_lossy(start.name().as_ref()).to_ascii_lowercase()
}

fn element_attributes(start: &BytesStart) -> Vec<(String, String)> {
    start.html_attributes()
        .with_checks(false)
        .filter_map(|attr| attr.ok())
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            (key, decode_text(&attr.value))
        })
        .collect()
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    haystack.windows(needle.len()).position(|w| w.eq_ignore_ascii_case(needle))
}

struct TreeBuilder {
    elements: Vec<Element>,
    texts: Vec<(usize, String)>,
    open: Vec<usize>,
}

impl TreeBuilder {
    fn open_element(&mut self, start: &BytesStart, outer_start: usize, inner_start: usize) -> usize {
        let attributes = element_attributes(start);
        let classes = attributes.iter()
            .find(|(k, _)| k == "class")
            .map(|(_, v)| v.split_whitespace().map(|s| s.to_string()).collect())
            .unwrap_or_default();
        let id = attributes.iter()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.clone());

        let index = self.elements.len();
        self.elements.push(Element {
            name: element_name(start),
            id,
            classes,
            attributes,
            parent: self.open.last().copied(),
            outer_start,
            inner_start,
            inner_end: inner_start,
            outer_end: inner_start,
        });
        index
    }

    fn close_element(&mut self, name: &str, end_start: usize, end_end: usize) {
        let Some(depth) = self.open.iter().rposition(|&i| self.elements[i].name == name) else {
            // Stray end tag
            return;
        };

        // Everything opened after the match is implicitly closed here
        for &index in self.open[depth + 1..].iter() {
            self.elements[index].inner_end = end_start;
            self.elements[index].outer_end = end_start;
        }
        let index = self.open[depth];
        self.elements[index].inner_end = end_start;
        self.elements[index].outer_end = end_end;
        self.open.truncate(depth);
    }

    fn finish(&mut self, len: usize) {
        for &index in self.open.iter() {
            self.elements[index].inner_end = len;
            self.elements[index].outer_end = len;
        }
        self.open.clear();
    }
}

impl HtmlTree {
    pub fn parse(source: &str) -> HtmlTree {
        let mut builder = TreeBuilder {
            elements: vec![],
            texts: vec![],
            open: vec![],
        };

        let mut offset = 0;
        'chunks: while offset < source.len() {
            let mut reader = Reader::from_str(&source[offset..]);
            let config = reader.config_mut();
            config.check_end_names = false;
            config.allow_unmatched_ends = true;
            config.check_comments = false;
            config.trim_text(false);

            loop {
                let event_start = offset + reader.buffer_position() as usize;
                let event = reader.read_event();
                let event_end = offset + reader.buffer_position() as usize;

                match event {
                    Ok(Event::Start(start)) => {
                        let event_start = markup_start(source, event_start);
                        let name = element_name(&start);
                        let index = builder.open_element(&start, event_start, event_end);
                        if VOID_ELEMENTS.contains(&name.as_str()) {
                            continue;
                        }
                        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
                            // Script and style bodies are not markup, skip them without tokenizing
                            let closing = format!("</{}", name);
                            let (inner_end, outer_end) = match find_ignore_case(&source[event_end..], &closing) {
                                Some(pos) => {
                                    let inner_end = event_end + pos;
                                    let outer_end = source[inner_end..].find('>')
                                        .map(|p| inner_end + p + 1)
                                        .unwrap_or(source.len());
                                    (inner_end, outer_end)
                                }
                                None => (source.len(), source.len()),
                            };
                            builder.elements[index].inner_end = inner_end;
                            builder.elements[index].outer_end = outer_end;
                            offset = outer_end;
                            continue 'chunks;
                        }
                        builder.open.push(index);
                    }
                    Ok(Event::Empty(start)) => {
                        let event_start = markup_start(source, event_start);
                        builder.open_element(&start, event_start, event_end);
                    }
                    Ok(Event::End(end)) => {
                        let event_start = markup_start(source, event_start);
                        let name = String::from_utf8_lossy(end.name().as_ref()).to_ascii_lowercase();
                        builder.close_element(&name, event_start, event_end);
                    }
                    Ok(Event::Text(text)) => {
                        builder.texts.push((event_start, decode_text(&text)));
                    }
                    Ok(Event::CData(data)) => {
                        builder.texts.push((event_start, String::from_utf8_lossy(&data).into_owned()));
                    }
                    Ok(Event::Eof) => break 'chunks,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Stopped parsing HTML at byte {}: {}", event_start, e);
                        break 'chunks;
                    }
                }
            }
        }
        builder.finish(source.len());

        HtmlTree {
            source: source.to_string(),
            elements: builder.elements,
            texts: builder.texts,
        }
    }

    /// First element in document order matching the selector.
    pub fn select_first(&self, selector: &Selector) -> Option<Node<'_>> {
        (0..self.elements.len())
            .map(|index| Node { tree: self, index })
            .find(|node| node.matches(selector))
    }

    pub fn select_all(&self, selector: &Selector) -> Vec<Node<'_>> {
        (0..self.elements.len())
            .map(|index| Node { tree: self, index })
            .filter(|node| node.matches(selector))
            .collect()
    }

    fn ancestry(&self, index: usize) -> impl Iterator<Item=&Element> + Clone {
        std::iter::successors(Some(index), move |&i| self.elements[i].parent)
            .map(move |i| &self.elements[i])
    }

    fn is_descendant(&self, index: usize, ancestor: usize) -> bool {
        std::iter::successors(self.elements[index].parent, |&i| self.elements[i].parent)
            .any(|i| i == ancestor)
    }
}

impl<'a> Node<'a> {
    fn element(&self) -> &'a Element {
        &self.tree.elements[self.index]
    }

    pub fn name(&self) -> &'a str {
        &self.element().name
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.element().has_class(class)
    }

    pub fn classes(&self) -> &'a [String] {
        &self.element().classes
    }

    pub fn id(&self) -> Option<&'a str> {
        self.element().id.as_deref()
    }

    pub fn parent(&self) -> Option<Node<'a>> {
        self.element().parent.map(|index| Node { tree: self.tree, index })
    }

    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element().attributes.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn matches(&self, selector: &Selector) -> bool {
        selector.matches_path(self.tree.ancestry(self.index))
    }

    pub fn inner_html(&self) -> &'a str {
        let element = self.element();
        &self.tree.source[element.inner_start..element.inner_end]
    }

    pub fn outer_html(&self) -> &'a str {
        let element = self.element();
        &self.tree.source[element.outer_start..element.outer_end]
    }

    /// Concatenated text of the element and its descendants, entities decoded.
    pub fn text_content(&self) -> Cow<'a, str> {
        let element = self.element();
        let mut parts = self.tree.texts.iter()
            .filter(|(pos, _)| *pos >= element.inner_start && *pos < element.inner_end)
            .map(|(_, text)| text.as_str());

        match (parts.next(), parts.clone().next()) {
            (None, _) => Cow::Borrowed(""),
            (Some(only), None) => Cow::Borrowed(only),
            (Some(first), Some(_)) => {
                let mut text = first.to_string();
                parts.for_each(|part| text.push_str(part));
                Cow::Owned(text)
            }
        }
    }

    /// First descendant matching the selector. The selector may reach above
    /// this node, as DOM `querySelector` does.
    pub fn select_first(&self, selector: &Selector) -> Option<Node<'a>> {
        self.descendants().find(|node| node.matches(selector))
    }

    pub fn select_all(&self, selector: &Selector) -> Vec<Node<'a>> {
        self.descendants().filter(|node| node.matches(selector)).collect()
    }

    fn descendants(&self) -> impl Iterator<Item=Node<'a>> + 'a {
        let tree = self.tree;
        let root = self.index;
        // Descendants are always stored after their ancestor
        (root + 1..tree.elements.len())
            .filter(move |&index| tree.is_descendant(index, root))
            .map(move |index| Node { tree, index })
    }
}
