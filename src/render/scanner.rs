//! Locate inline image references in message bodies.
//!
//! Plain-text bodies carry placeholders written by the sending client:
//!
//! - Gmail: `[image: photo.png]` or `[image: cid:ii_abc@hash]`
//! - Outlook: `[cid:image001.png@01D9]`
//!
//! HTML bodies reference images with `<img src=...>` tags.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

static GMAIL_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[image: [^\]\n]*\]").expect("valid gmail placeholder regex"));

static OUTLOOK_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[cid:[^\]\n]*\]").expect("valid outlook placeholder regex"));

/// Any `<img>` tag with a `src` attribute; group 1 is the raw attribute value.
static IMG_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img\b[^>]*?\bsrc\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))[^>]*>"#)
        .expect("valid img tag regex")
});

/// Length of the `[image: cid:` prefix of a compound Gmail reference.
const GMAIL_CID_PREFIX_LEN: usize = 12;

/// Which placeholder grammar matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSyntax {
    Gmail,
    Outlook,
}

/// What a placeholder points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageIdentifier {
    Filename(String),
    ContentId(String),
}

/// One placeholder found in a plain-text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineReference<'a> {
    pub syntax: ReferenceSyntax,
    /// The whole bracketed placeholder.
    pub raw: &'a str,
    /// Byte span of `raw` in the scanned text.
    pub span: Range<usize>,
}

impl InlineReference<'_> {
    /// Extract the identifier, or `None` when the placeholder is malformed.
    pub fn identifier(&self) -> Option<ImageIdentifier> {
        match self.syntax {
            ReferenceSyntax::Gmail => gmail_identifier(self.raw),
            ReferenceSyntax::Outlook => {
                // "[cid:" .. "]"
                let inner = self.raw.get(5..self.raw.len() - 1)?.trim();
                (!inner.is_empty()).then(|| ImageIdentifier::ContentId(inner.to_string()))
            }
        }
    }
}

fn gmail_identifier(raw: &str) -> Option<ImageIdentifier> {
    // "[image: " .. "]"
    let inner = raw.get(8..raw.len() - 1)?.trim();
    if inner.is_empty() {
        return None;
    }
    if inner.starts_with("cid:") {
        let at = raw.rfind('@')?;
        let start = raw.find("cid:")? + 4;
        let start = start.max(GMAIL_CID_PREFIX_LEN);
        let cid = raw.get(start..at)?.trim();
        return (!cid.is_empty()).then(|| ImageIdentifier::ContentId(cid.to_string()));
    }
    Some(ImageIdentifier::Filename(inner.to_string()))
}

/// Scanner over the placeholders of one plain-text body.
///
/// Each call to [`PlainTextScanner::references`] starts a new pass.
#[derive(Debug, Clone, Copy)]
pub struct PlainTextScanner<'a> {
    text: &'a str,
}

impl<'a> PlainTextScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    /// Placeholders in document order.
    pub fn references(&self) -> impl Iterator<Item = InlineReference<'a>> + 'a {
        let text = self.text;
        let gmail = GMAIL_REFERENCE.find_iter(text).map(|m| (ReferenceSyntax::Gmail, m));
        let outlook = OUTLOOK_REFERENCE
            .find_iter(text)
            .map(|m| (ReferenceSyntax::Outlook, m));
        let mut all: Vec<_> = gmail
            .chain(outlook)
            .map(|(syntax, m)| InlineReference {
                syntax,
                raw: m.as_str(),
                span: m.range(),
            })
            .collect();
        all.sort_by_key(|r| r.span.start);
        // A match starting inside an earlier one is not a separate placeholder
        let mut end = 0;
        all.retain(|r| {
            let keep = r.span.start >= end;
            if keep {
                end = r.span.end;
            }
            keep
        });
        all.into_iter()
    }
}

/// Whether a whole line is exactly one placeholder.
pub fn line_reference(line: &str) -> Option<InlineReference<'_>> {
    let trimmed = line.trim();
    let offset = line.len() - line.trim_start().len();
    let mut refs = PlainTextScanner::new(trimmed).references();
    let first = refs.next()?;
    if first.span == (0..trimmed.len()) && refs.next().is_none() {
        Some(InlineReference {
            span: first.span.start + offset..first.span.end + offset,
            ..first
        })
    } else {
        None
    }
}

/// Put every placeholder on a line of its own.
pub fn isolate_references(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for reference in PlainTextScanner::new(text).references() {
        out.push_str(&text[last..reference.span.start]);
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(reference.raw);
        if !text[reference.span.end..].starts_with('\n') {
            out.push('\n');
        }
        last = reference.span.end;
    }
    out.push_str(&text[last..]);
    out
}

/// One `<img>` tag occurrence in an HTML body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImgTag<'a> {
    /// Byte span of the full tag.
    pub span: Range<usize>,
    /// The full tag text.
    pub tag: &'a str,
    /// The raw `src` attribute value.
    pub src: &'a str,
    /// Slot shared by every identical tag string.
    pub slot: usize,
}

/// All `<img>` tags of an HTML body with their deduplicated slots.
#[derive(Debug, Clone, Default)]
pub struct ImgTagTable<'a> {
    /// Every occurrence, in document order.
    pub occurrences: Vec<ImgTag<'a>>,
    /// `src` of each distinct tag, indexed by slot.
    pub sources: Vec<&'a str>,
}

impl<'a> ImgTagTable<'a> {
    /// Scan `html` for image tags.
    ///
    /// Identical tag strings share a slot; any difference in the tag text
    /// (even an attribute order) yields a new slot.
    pub fn scan(html: &'a str) -> Self {
        let mut slots: HashMap<&'a str, usize> = HashMap::new();
        let mut table = Self::default();

        for caps in IMG_TAG.captures_iter(html) {
            let whole = caps.get(0).expect("group 0 always matches");
            let src = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            let tag = whole.as_str();
            let slot = *slots.entry(tag).or_insert_with(|| {
                table.sources.push(src);
                table.sources.len() - 1
            });
            table.occurrences.push(ImgTag {
                span: whole.range(),
                tag,
                src,
                slot,
            });
        }

        table
    }

    /// Number of distinct slots.
    pub fn slot_count(&self) -> usize {
        self.sources.len()
    }
}
