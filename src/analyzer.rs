use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use once_cell::sync::Lazy;
use regex::Regex;
use std::cell::RefCell;

static TABLE_RULE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|[-\s]*\|").unwrap());
static TABLE_CELL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\|.*?\|").unwrap());
static NEWLINE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*").unwrap());
static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static ESCAPED_AMP_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)&(?:amp;|#38;|#x26;)+").unwrap());

/// Upper bound on full passes of the filter chain in [`TextCleaner::clean`].
pub const MAX_CLEAN_PASSES: usize = 32;

static DEFAULT_CLEANER: Lazy<TextCleaner> = Lazy::new(TextCleaner::default);

/// A character filter receives the text as a whole and can transform it by adding,
/// removing, or changing characters. Cleaning scraped pages is a chain of these.
pub trait CharacterFilter: Send + Sync {
    fn filter(&self, text: String) -> String;
}

/// `&amp;` -> `&`, `&#39;` -> `'`, ...
#[derive(Debug, Default)]
pub struct HtmlEntityFilter;

impl CharacterFilter for HtmlEntityFilter {
    fn filter(&self, text: String) -> String {
        if !text.contains('&') {
            return text;
        }
        // `&amp;amp;amp;` chains of any depth collapse in one go
        let collapsed = ESCAPED_AMP_RUN_RE.replace_all(&text, "&");
        html_escape::decode_html_entities(&collapsed).into_owned()
    }
}

/// Decodes literal backslash escapes left in extracted text (`\n`, `\t`, `\xHH`, `\uXXXX`, ...).
/// Unknown or malformed escapes are kept as they are.
#[derive(Debug, Default)]
pub struct BackslashEscapeFilter;

impl BackslashEscapeFilter {
    fn decode_hex(chars: &[char], start: usize, len: usize) -> Option<char> {
        let digits = chars.get(start..start + len)?;
        if !digits.iter().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let code = u32::from_str_radix(&digits.iter().collect::<String>(), 16).ok()?;
        char::from_u32(code)
    }
}

impl CharacterFilter for BackslashEscapeFilter {
    fn filter(&self, text: String) -> String {
        if !text.contains('\\') {
            return text;
        }
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        while i < chars.len() {
            if chars[i] != '\\' || i + 1 >= chars.len() {
                out.push(chars[i]);
                i += 1;
                continue;
            }
            let (decoded, consumed) = match chars[i + 1] {
                'n' => (Some('\n'), 2),
                't' => (Some('\t'), 2),
                'r' => (Some('\r'), 2),
                '\\' => (Some('\\'), 2),
                '\'' => (Some('\''), 2),
                '"' => (Some('"'), 2),
                'x' => (Self::decode_hex(&chars, i + 2, 2), 4),
                'u' => (Self::decode_hex(&chars, i + 2, 4), 6),
                _ => (None, 0),
            };
            match decoded {
                Some(c) => {
                    out.push(c);
                    i += consumed;
                }
                None => {
                    out.push('\\');
                    i += 1;
                }
            }
        }
        out
    }
}

/// Escaped apostrophes that survive escape decoding.
#[derive(Debug, Default)]
pub struct EscapedApostropheFilter;

impl CharacterFilter for EscapedApostropheFilter {
    fn filter(&self, text: String) -> String {
        if text.contains("\\'") {
            text.replace("\\'", "'")
        } else {
            text
        }
    }
}

/// Removes markdown table leftovers: `|---|` rules first, then inline `|...|` cells.
#[derive(Debug, Default)]
pub struct PipeTableFilter;

impl CharacterFilter for PipeTableFilter {
    fn filter(&self, text: String) -> String {
        let text = TABLE_RULE_RE.replace_all(&text, "");
        TABLE_CELL_RE.replace_all(&text, "").into_owned()
    }
}

/// A newline and the indentation after it become one space.
#[derive(Debug, Default)]
pub struct NewlineFilter;

impl CharacterFilter for NewlineFilter {
    fn filter(&self, text: String) -> String {
        NEWLINE_RUN_RE.replace_all(&text, " ").into_owned()
    }
}

#[derive(Debug, Default)]
pub struct WhitespaceFilter;

impl CharacterFilter for WhitespaceFilter {
    fn filter(&self, text: String) -> String {
        WHITESPACE_RUN_RE.replace_all(&text, " ").into_owned()
    }
}

#[derive(Debug, Default)]
pub struct AsciiFilter;

impl CharacterFilter for AsciiFilter {
    fn filter(&self, mut text: String) -> String {
        text.retain(|c| c.is_ascii());
        text
    }
}

/// Runs a chain of character filters over scraped text.
///
/// One pass of the default chain is not stable on its own (`&amp;lt;` needs two
/// unescapes, dropping a non-ASCII char can leave two spaces side by side), so
/// [`TextCleaner::clean`] repeats the pass until the text stops changing, so
/// `clean(clean(x)) == clean(x)`. Runs of escaped ampersands are collapsed within a
/// single pass; anything still changing after [`MAX_CLEAN_PASSES`] is returned as is.
pub struct TextCleaner {
    char_filters: Vec<Box<dyn CharacterFilter>>,
}

impl TextCleaner {
    pub fn new(char_filters: Vec<Box<dyn CharacterFilter>>) -> Self {
        Self { char_filters }
    }

    pub fn char_filter(&self, mut content: String) -> String {
        for filter in self.char_filters.iter() {
            content = filter.filter(content);
        }
        content.trim().to_string()
    }

    pub fn clean(&self, raw: &str) -> String {
        let mut current = raw.to_string();
        for _ in 0..MAX_CLEAN_PASSES {
            let next = self.char_filter(current.clone());
            if next == current {
                return next;
            }
            current = next;
        }
        current
    }
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new(vec![
            Box::new(HtmlEntityFilter),
            Box::new(BackslashEscapeFilter),
            Box::new(EscapedApostropheFilter),
            Box::new(PipeTableFilter),
            Box::new(NewlineFilter),
            Box::new(WhitespaceFilter),
            Box::new(AsciiFilter),
        ])
    }
}

/// Cleans scraped text with the default filter chain. Empty in, empty out.
pub fn clean_scraped_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    DEFAULT_CLEANER.clean(raw)
}

#[derive(Clone, Default, Debug)]
pub struct ExtractedText {
    pub title: String,
    pub body: String,
}

/// Pulls the readable text out of an html page, leaving scripts, navigation and
/// other boilerplate behind. When the page marks its main content with `<main>` or
/// `role="main"`, only that region is read; otherwise its `<article>`s are, if any.
#[derive(Debug, Default)]
pub struct HTMLTagFilter;

impl HTMLTagFilter {
    pub fn get_dom(html: &str) -> RcDom {
        parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut std::io::Cursor::new(html))
            .unwrap_or_default()
    }

    pub fn extract(html: &str) -> ExtractedText {
        let dom = Self::get_dom(html);
        let mut out = ExtractedText::default();
        Self::collect_title(&dom.document, &mut out.title);
        for region in Self::main_regions(&dom.document) {
            Self::walk_html(&region, &mut out);
        }
        out.body = out.body.trim().to_string();
        out
    }

    fn attr_value<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
        attrs
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| &*a.value)
    }

    /// True when a whole class token or the id names a page-chrome region.
    /// Compound names like `post-header` or `has-sidebar` do not count.
    pub fn has_boilerplate_class_or_id(attrs: &RefCell<Vec<Attribute>>) -> bool {
        let attrs = attrs.borrow();
        ["class", "id"]
            .iter()
            .filter_map(|name| Self::attr_value(&attrs, name))
            .flat_map(str::split_whitespace)
            .map(|token| token.to_lowercase())
            .any(|token| {
                matches!(
                    token.as_str(),
                    "nav"
                        | "navbar"
                        | "navigation"
                        | "nav-menu"
                        | "main-nav"
                        | "site-nav"
                        | "menu"
                        | "sidebar"
                        | "footer"
                        | "site-footer"
                        | "header"
                        | "site-header"
                        | "cookie-banner"
                        | "cookie-notice"
                        | "cookie-consent"
                        | "banner"
                        | "promo"
                        | "ad"
                        | "ads"
                        | "advert"
                        | "advertisement"
                        | "share-buttons"
                        | "social-share"
                        | "subscribe"
                        | "newsletter"
                )
            })
    }

    /// Elements whose whole subtree is left out of the extracted text. `html` and
    /// `body` are never pruned by their class or id.
    pub fn is_pruned(local: &LocalName, attrs: &RefCell<Vec<Attribute>>) -> bool {
        if Self::is_skipped(local) {
            return true;
        }
        !matches!(&**local, "html" | "body") && Self::has_boilerplate_class_or_id(attrs)
    }

    pub fn is_skipped(local: &LocalName) -> bool {
        matches!(
            &**local,
            "script"
                | "style"
                | "noscript"
                | "template"
                | "svg"
                | "nav"
                | "header"
                | "footer"
                | "aside"
                | "form"
                | "iframe"
                | "head"
        )
    }

    pub fn is_block_like(local: &LocalName) -> bool {
        matches!(
            &**local,
            "p" | "div"
                | "section"
                | "article"
                | "main"
                | "li"
                | "ul"
                | "ol"
                | "h1"
                | "h2"
                | "h3"
                | "h4"
                | "h5"
                | "h6"
                | "br"
                | "tr"
                | "table"
                | "blockquote"
                | "pre"
        )
    }

    fn is_main_landmark(local: &LocalName, attrs: &[Attribute]) -> bool {
        &**local == "main" || Self::attr_value(attrs, "role") == Some("main")
    }

    fn is_article(local: &LocalName, _attrs: &[Attribute]) -> bool {
        &**local == "article"
    }

    /// Collects the outermost elements matching `wanted`, without looking inside
    /// pruned subtrees.
    fn collect_regions(
        handle: &Handle,
        wanted: fn(&LocalName, &[Attribute]) -> bool,
        regions: &mut Vec<Handle>,
    ) {
        if let NodeData::Element { name, attrs, .. } = &handle.data {
            if Self::is_pruned(&name.local, attrs) {
                return;
            }
            if wanted(&name.local, &attrs.borrow()) {
                regions.push(handle.clone());
                return;
            }
        }
        for child in handle.children.borrow().iter() {
            Self::collect_regions(child, wanted, regions);
        }
    }

    /// The parts of the page to read: the first `<main>` landmark, else every
    /// top-level `<article>`, else the whole document.
    fn main_regions(document: &Handle) -> Vec<Handle> {
        let mut regions = Vec::new();
        Self::collect_regions(document, Self::is_main_landmark, &mut regions);
        if !regions.is_empty() {
            regions.truncate(1);
            return regions;
        }
        Self::collect_regions(document, Self::is_article, &mut regions);
        if regions.is_empty() {
            regions.push(document.clone());
        }
        regions
    }

    fn collect_title(handle: &Handle, title: &mut String) {
        if let NodeData::Element { name, .. } = &handle.data {
            if &*name.local == "title" {
                for child in handle.children.borrow().iter() {
                    if let NodeData::Text { contents } = &child.data {
                        let s = contents.borrow();
                        let s = s.trim();
                        if !s.is_empty() {
                            if !title.is_empty() {
                                title.push(' ');
                            }
                            title.push_str(s);
                        }
                    }
                }
                return;
            }
        }
        for child in handle.children.borrow().iter() {
            Self::collect_title(child, title);
        }
    }

    pub fn walk_html(handle: &Handle, out: &mut ExtractedText) {
        match &handle.data {
            NodeData::Text { contents } => {
                let s = contents.borrow();
                let s = s.trim();
                if s.is_empty() {
                    return;
                }
                if !out.body.is_empty() && !out.body.ends_with(' ') && !out.body.ends_with('\n') {
                    out.body.push(' ');
                }
                out.body.push_str(s);
            }
            NodeData::Element { name, attrs, .. } => {
                let local = &name.local;
                if Self::is_pruned(local, attrs) {
                    return;
                }

                let block = Self::is_block_like(local);
                if block && !out.body.is_empty() && !out.body.ends_with('\n') {
                    out.body.push('\n');
                }
                for child in handle.children.borrow().iter() {
                    Self::walk_html(child, out);
                }
                if block && !out.body.is_empty() && !out.body.ends_with('\n') {
                    out.body.push('\n');
                }
            }
            _ => {
                for child in handle.children.borrow().iter() {
                    Self::walk_html(child, out);
                }
            }
        }
    }
}

impl CharacterFilter for HTMLTagFilter {
    fn filter(&self, html: String) -> String {
        Self::extract(&html).body
    }
}
