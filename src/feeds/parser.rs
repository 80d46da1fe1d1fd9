//! RSS / Atom parsing into dialect-tagged entries.
//!
//! Parsing happens in two steps:
//!
//! 1. The body is read with `quick-xml` into a small element tree
//!    ([`XmlNode`]) that keeps text and child elements in document order.
//! 2. The tree is searched for an RSS `channel` or an Atom `feed`, and every
//!    `item` / `entry` below it becomes a [`FeedEntry`].
//!
//! Lists are always lists here: a channel holding a single item yields a
//! one-element vector, never a bare entry.

use crate::error::FeedError;
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};

/// One node of the parsed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlContent {
    Text(String),
    Element(XmlNode),
}

/// An element with its qualified name (`dc:date`, `link`, ...), attributes
/// and mixed content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub content: Vec<XmlContent>,
}

impl XmlNode {
    fn from_start(e: &BytesStart<'_>) -> Result<Self, FeedError> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = match attr.unescape_value() {
                Ok(v) => v.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            content: Vec::new(),
        })
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlNode> {
        self.content.iter().filter_map(|c| match c {
            XmlContent::Element(node) => Some(node),
            XmlContent::Text(_) => None,
        })
    }

    /// Child elements whose local name is `local`.
    pub fn elements_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.elements().filter(move |n| n.local_name() == local)
    }

    /// First child element whose local name is `local`.
    pub fn element(&self, local: &str) -> Option<&XmlNode> {
        self.elements().find(|n| n.local_name() == local)
    }

    /// All descendant text in document order. Element boundaries become a
    /// space so `<p>a</p><p>b</p>` does not run together.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for c in &self.content {
            match c {
                XmlContent::Text(t) => out.push_str(t),
                XmlContent::Element(node) => {
                    out.push(' ');
                    node.collect_text(out);
                    out.push(' ');
                }
            }
        }
    }

    /// Trimmed text, or `None` when there is none.
    pub fn text_value(&self) -> Option<String> {
        let text = self.text();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    fn push_text(&mut self, s: &str) {
        if let Some(XmlContent::Text(t)) = self.content.last_mut() {
            t.push_str(s);
        } else {
            self.content.push(XmlContent::Text(s.to_string()));
        }
    }
}

/// Which container layout the feed uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `channel/item` (RSS 0.9x, 2.0 and RDF-based 1.0).
    Rss,
    /// `feed/entry`.
    Atom,
}

/// A permalink-capable RSS `guid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guid {
    pub value: String,
    /// `isPermaLink` defaults to true when absent.
    pub is_permalink: bool,
}

/// Fields of an RSS `item` the extractor cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssItem {
    pub title: Option<String>,
    pub link: Option<String>,
    /// `href` of an `atom:link` inside the item.
    pub atom_link: Option<String>,
    pub guid: Option<Guid>,
    pub description: Option<String>,
    /// `content:encoded`
    pub content: Option<String>,
    pub pub_date: Option<String>,
    /// `dc:date`
    pub dc_date: Option<String>,
}

/// An Atom `link` element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomLink {
    pub href: Option<String>,
    pub rel: Option<String>,
    /// Text content, for producers that put the URL in the body.
    pub text: Option<String>,
}

/// Fields of an Atom `entry` the extractor cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomEntry {
    pub title: Option<String>,
    pub links: Vec<AtomLink>,
    pub id: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub dc_date: Option<String>,
}

/// One raw feed entry, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEntry {
    Rss(RssItem),
    Atom(AtomEntry),
}

/// The result of parsing a feed body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    pub dialect: Dialect,
    pub entries: Vec<FeedEntry>,
}

/// Parse a feed body into entries.
///
/// # Arguments
///
/// * `body` - The raw response body, UTF-8, optionally starting with a BOM
///
/// # Returns
///
/// The detected [`Dialect`] and every `item` / `entry` in document order.
/// A container with no entries yields an empty list, not an error.
///
/// # Errors
///
/// [`FeedError::Xml`] / [`FeedError::Unclosed`] on malformed documents and
/// [`FeedError::MissingRoot`] when there is no `channel` or `feed` container.
///
/// # Examples
///
/// ```ignore
/// let feed = parse_feed("<rss><channel><item><title>A &amp; B</title></item></channel></rss>")?;
/// assert_eq!(feed.dialect, Dialect::Rss);
/// assert_eq!(feed.entries.len(), 1);
/// ```
pub fn parse_feed(body: &str) -> Result<ParsedFeed, FeedError> {
    let root = parse_tree(body)?;
    let (dialect, nodes) = locate_entries(&root).ok_or(FeedError::MissingRoot)?;
    let entries = nodes
        .into_iter()
        .map(|node| match dialect {
            Dialect::Rss => FeedEntry::Rss(rss_item(node)),
            Dialect::Atom => FeedEntry::Atom(atom_entry(node)),
        })
        .collect();
    Ok(ParsedFeed { dialect, entries })
}

/// Read a document into its root element.
pub fn parse_tree(body: &str) -> Result<XmlNode, FeedError> {
    let mut reader = Reader::from_str(body.trim_start_matches('\u{feff}'));
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(XmlNode::from_start(&e)?),
            Event::Empty(e) => {
                let node = XmlNode::from_start(&e)?;
                attach(&mut stack, &mut root, node);
            }
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    attach(&mut stack, &mut root, node);
                }
            }
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    let text = e.decode().map_err(quick_xml::Error::from)?;
                    top.push_text(&text);
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    let text = e.decode().map_err(quick_xml::Error::from)?;
                    top.push_text(&text);
                }
            }
            Event::GeneralRef(e) => {
                if let Some(top) = stack.last_mut() {
                    top.push_text(&resolve_reference(&e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(FeedError::Unclosed(open.name.clone()));
    }
    root.ok_or(FeedError::MissingRoot)
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.content.push(XmlContent::Element(node)),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

/// Resolve `&name;` / `&#N;`. Feeds routinely use HTML entities that XML
/// does not define; `&nbsp;` becomes a space and anything else is kept
/// verbatim instead of failing the whole document.
fn resolve_reference(e: &BytesRef<'_>) -> String {
    let raw = String::from_utf8_lossy(e).into_owned();
    match e.resolve_char_ref() {
        Ok(Some(ch)) => return ch.to_string(),
        Ok(None) => {}
        Err(_) => return format!("&{raw};"),
    }
    if let Some(s) = resolve_predefined_entity(&raw) {
        return s.to_string();
    }
    if raw == "nbsp" {
        return " ".to_string();
    }
    format!("&{raw};")
}

fn locate_entries(root: &XmlNode) -> Option<(Dialect, Vec<&XmlNode>)> {
    match root.local_name() {
        "feed" => return Some((Dialect::Atom, root.elements_named("entry").collect())),
        "channel" => return Some((Dialect::Rss, root.elements_named("item").collect())),
        _ => {}
    }
    if let Some(feed) = root.element("feed") {
        return Some((Dialect::Atom, feed.elements_named("entry").collect()));
    }
    let channel = root.element("channel")?;
    // RSS 1.0 (RDF) keeps items as siblings of the channel.
    let items = channel
        .elements_named("item")
        .chain(root.elements_named("item"))
        .collect();
    Some((Dialect::Rss, items))
}

fn child_text(node: &XmlNode, local: &str) -> Option<String> {
    node.element(local).and_then(XmlNode::text_value)
}

fn rss_item(node: &XmlNode) -> RssItem {
    let link = node
        .elements_named("link")
        .find_map(XmlNode::text_value);
    let atom_link = node
        .elements_named("link")
        .find_map(|l| l.attr("href").map(str::to_string))
        .filter(|href| !href.trim().is_empty());
    let guid = node.element("guid").and_then(|g| {
        g.text_value().map(|value| Guid {
            value,
            is_permalink: !g
                .attr("isPermaLink")
                .is_some_and(|v| v.eq_ignore_ascii_case("false")),
        })
    });

    RssItem {
        title: child_text(node, "title"),
        link,
        atom_link,
        guid,
        description: child_text(node, "description"),
        content: child_text(node, "encoded"),
        pub_date: child_text(node, "pubDate"),
        dc_date: child_text(node, "date"),
    }
}

fn atom_entry(node: &XmlNode) -> AtomEntry {
    let links = node
        .elements_named("link")
        .map(|l| AtomLink {
            href: l.attr("href").map(str::to_string),
            rel: l.attr("rel").map(str::to_string),
            text: l.text_value(),
        })
        .collect();

    AtomEntry {
        title: child_text(node, "title"),
        links,
        id: child_text(node, "id"),
        published: child_text(node, "published"),
        updated: child_text(node, "updated"),
        summary: child_text(node, "summary"),
        content: child_text(node, "content"),
        dc_date: child_text(node, "date"),
    }
}
