//! HTML bodies with inline images.
//!
//! The pipeline runs in fixed stages:
//!
//! 1. scan every `<img>` tag and give each distinct tag string a slot
//! 2. replace each tag with `<separator><sentinel>-<slot><separator>`
//! 3. resolve each slot in order: `cid:` from the message's attachments,
//!    `data:` by base64 decoding, anything else as a URL fetched in parallel
//! 4. split the rewritten HTML on the separator and emit literal chunks and
//!    images in document order
//! 5. offer to keep the displayed images that are not attachments
//! 6. remove the scratch HTML file
//!
//! A slot that cannot be resolved stays empty and is skipped silently.

use std::collections::HashSet;
use std::path::PathBuf;

use base64::Engine;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{MailError, Result};
use crate::model::attachment::attachment_keys;
use crate::model::Attachment;
use crate::prompt::{ask_choice, ask_save_path, ask_yes_no};

use super::classify;
use super::download::unique_path;
use super::fetch::{fetch_all, FetchJob, UrlResolver};
use super::locations::{LocationMap, ScratchFile};
use super::resolver::{self, MatchBy};
use super::scanner::ImgTagTable;
use super::RenderContext;

/// Separator and sentinel of one render pass.
///
/// Both embed a fresh UUID, so they cannot collide with message content.
#[derive(Debug, Clone)]
pub struct PlaceholderTokens {
    separator: String,
    sentinel: String,
}

impl PlaceholderTokens {
    pub fn generate() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            separator: format!("@@mailshell-split-{id}@@"),
            sentinel: format!("mailshell-img-{id}"),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// The token for `slot`, including separators.
    pub fn token(&self, slot: usize) -> String {
        format!("{sep}{}-{slot}{sep}", self.sentinel, sep = self.separator)
    }

    /// Slot number of a token chunk (the text between two separators).
    pub fn parse(&self, chunk: &str) -> Option<usize> {
        chunk
            .strip_prefix(self.sentinel.as_str())?
            .strip_prefix('-')?
            .parse()
            .ok()
    }

    /// Replace every scanned tag of `html` with its token.
    pub fn substitute(&self, html: &str, table: &ImgTagTable<'_>) -> String {
        let mut out = String::with_capacity(html.len());
        let mut last = 0;
        for tag in &table.occurrences {
            out.push_str(&html[last..tag.span.start]);
            out.push_str(&self.token(tag.slot));
            last = tag.span.end;
        }
        out.push_str(&html[last..]);
        out
    }
}

/// A piece of the rewritten HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chunk<'a> {
    Literal(&'a str),
    Image(usize),
}

/// Split rewritten HTML into literal and image chunks, in document order.
///
/// Literal chunks alternate with tokens, so even positions are HTML and odd
/// positions are tokens.
pub fn split_chunks<'a>(substituted: &'a str, tokens: &PlaceholderTokens) -> Vec<Chunk<'a>> {
    substituted
        .split(tokens.separator())
        .enumerate()
        .map(|(i, piece)| match (i % 2, tokens.parse(piece)) {
            (1, Some(slot)) => Chunk::Image(slot),
            _ => Chunk::Literal(piece),
        })
        .collect()
}

/// Resolved files for every slot of a document.
#[derive(Debug, Default)]
pub struct SlotTable {
    /// Path per slot; `None` when resolution failed.
    pub paths: Vec<Option<PathBuf>>,
    /// Location-map key per resolved slot.
    pub keys: Vec<Option<String>>,
    /// Slots that resolved to one of the message's attachments.
    pub from_attachments: HashSet<usize>,
}

/// What an HTML render pass did.
#[derive(Debug, Default)]
pub struct HtmlReport {
    /// Non-blank literal chunks handed to the HTML renderer.
    pub literal_chunks: usize,
    /// Slots displayed, once per occurrence, in document order.
    pub images_shown: Vec<usize>,
    /// Image occurrences skipped because their slot was empty or not an image.
    pub skipped: usize,
    /// Inline images the user kept, and where.
    pub saved: Vec<PathBuf>,
}

/// Location-map key of a non-attachment slot.
pub fn slot_key(slot: usize) -> String {
    format!("slot-{slot}")
}

/// Render an HTML body with its inline images.
pub fn render_html(
    html: &str,
    attachments: &[Attachment],
    ctx: &mut RenderContext<'_>,
    locations: &mut LocationMap,
) -> Result<HtmlReport> {
    let table = ImgTagTable::scan(html);
    let tokens = PlaceholderTokens::generate();
    let substituted = tokens.substitute(html, &table);
    debug!(
        tags = table.occurrences.len(),
        slots = table.slot_count(),
        "Scanned HTML body"
    );

    let slots = resolve_slots(&table, attachments, ctx, locations);

    // Removed on every exit path from here on.
    let scratch_html = ScratchFile::new(ctx.scratch.html_path());
    let (mut report, candidates) = emit(&substituted, &tokens, &slots, ctx, &scratch_html)?;
    report.saved = prompt_inline_save(&candidates, &slots, ctx, locations)?;
    drop(scratch_html);

    Ok(report)
}

/// Resolve every slot in index order.
pub fn resolve_slots(
    table: &ImgTagTable<'_>,
    attachments: &[Attachment],
    ctx: &mut RenderContext<'_>,
    locations: &mut LocationMap,
) -> SlotTable {
    let count = table.slot_count();
    let mut slots = SlotTable {
        paths: vec![None; count],
        keys: vec![None; count],
        from_attachments: HashSet::new(),
    };
    let keys = attachment_keys(attachments);
    let mut urls = UrlResolver::new();
    let mut jobs = Vec::new();

    for (slot, src) in table.sources.iter().enumerate() {
        if let Some(cid) = strip_scheme(src, "cid:") {
            let Some((idx, attachment)) = resolver::resolve(cid, attachments, MatchBy::ContentId)
            else {
                continue;
            };
            let key = &keys[idx];
            let path = match locations.get(key) {
                Some(path) => path.to_path_buf(),
                None => match resolver::materialize(attachment, ctx.scratch) {
                    Ok(path) => {
                        locations.insert(key.clone(), path.clone());
                        path
                    }
                    Err(e) => {
                        warn!(slot, error = %e, "Could not write inline attachment");
                        continue;
                    }
                },
            };
            slots.paths[slot] = Some(path);
            slots.keys[slot] = Some(key.clone());
            slots.from_attachments.insert(slot);
        } else if let Some(data) = strip_scheme(src, "data:") {
            match decode_data_uri(data).and_then(|(bytes, ext)| {
                ctx.scratch.write_unique(&bytes, ext.as_deref())
            }) {
                Ok(path) => {
                    locations.insert(slot_key(slot), path.clone());
                    slots.paths[slot] = Some(path);
                    slots.keys[slot] = Some(slot_key(slot));
                }
                Err(e) => debug!(slot, error = %e, "Skipping undecodable data URI"),
            }
        } else {
            match urls.resolve(src) {
                Some(url) => jobs.push(FetchJob { slot, url }),
                None => debug!(slot, src, "Skipping unresolvable image URL"),
            }
        }
    }

    if !jobs.is_empty() {
        debug!(count = jobs.len(), "Fetching remote images");
        let fetched = fetch_all(jobs, count, ctx.transport, ctx.scratch);
        for (slot, path) in fetched.into_iter().enumerate() {
            if let Some(path) = path {
                locations.insert(slot_key(slot), path.clone());
                slots.paths[slot] = Some(path);
                slots.keys[slot] = Some(slot_key(slot));
            }
        }
    }

    slots
}

/// Case-insensitive scheme prefix strip.
fn strip_scheme<'a>(src: &'a str, scheme: &str) -> Option<&'a str> {
    let head = src.get(..scheme.len())?;
    head.eq_ignore_ascii_case(scheme)
        .then(|| &src[scheme.len()..])
}

/// Decode the part of a `data:` URI after the scheme.
///
/// Returns the bytes and, for `image/<subtype>` media types, an extension.
fn decode_data_uri(data: &str) -> Result<(Vec<u8>, Option<String>)> {
    let (header, payload) = data
        .split_once(',')
        .ok_or_else(|| MailError::Resolution("data URI without payload".into()))?;
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let engine = base64::engine::general_purpose::STANDARD;
    let bytes = engine
        .decode(&compact)
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(&compact))
        .map_err(|e| MailError::Resolution(format!("data URI: {e}")))?;
    let ext = header
        .split(';')
        .next()
        .and_then(|mime| mime.trim().strip_prefix("image/"))
        .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(str::to_ascii_lowercase);
    Ok((bytes, ext))
}

/// Emit chunks in order. Returns the report and the save candidates.
fn emit(
    substituted: &str,
    tokens: &PlaceholderTokens,
    slots: &SlotTable,
    ctx: &mut RenderContext<'_>,
    scratch_html: &ScratchFile,
) -> Result<(HtmlReport, Vec<usize>)> {
    let mut report = HtmlReport::default();
    let mut candidates: Vec<usize> = Vec::new();
    let mut is_image: Vec<Option<bool>> = vec![None; slots.paths.len()];

    for chunk in split_chunks(substituted, tokens) {
        match chunk {
            Chunk::Literal(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                let path = scratch_html.path();
                std::fs::write(path, text).map_err(|e| MailError::io(path, e))?;
                ctx.terminal.show_html(path)?;
                report.literal_chunks += 1;
            }
            Chunk::Image(slot) => {
                let Some(path) = slots.paths.get(slot).and_then(Option::as_ref) else {
                    report.skipped += 1;
                    continue;
                };
                let displayable =
                    *is_image[slot].get_or_insert_with(|| classify::is_image_file(path));
                if !displayable {
                    report.skipped += 1;
                    continue;
                }
                ctx.terminal.show_image(path)?;
                report.images_shown.push(slot);
                if !slots.from_attachments.contains(&slot) && !candidates.contains(&slot) {
                    candidates.push(slot);
                }
            }
        }
    }

    Ok((report, candidates))
}

/// Offer each displayed non-attachment image for saving.
fn prompt_inline_save(
    candidates: &[usize],
    slots: &SlotTable,
    ctx: &mut RenderContext<'_>,
    locations: &mut LocationMap,
) -> Result<Vec<PathBuf>> {
    let mut saved = Vec::new();
    if candidates.is_empty() {
        return Ok(saved);
    }

    let keys: Vec<&str> = candidates
        .iter()
        .filter_map(|&slot| slots.keys[slot].as_deref())
        .collect();

    let question = format!(
        "This message has {} inline image(s). Do you want to save any of them?",
        keys.len()
    );
    if !ask_yes_no(ctx.prompter, &question)? {
        for key in keys {
            locations.discard(key);
        }
        return Ok(saved);
    }

    for (n, key) in keys.into_iter().enumerate() {
        let name = format!("inline-image-{}", n + 1);
        let choice = ask_choice(
            ctx.prompter,
            &format!("{name}: (S)ave or (D)iscard?"),
            &['S', 'D'],
        )?;
        if choice == 'D' {
            locations.discard(key);
            continue;
        }
        let default = ctx.settings.download_dir.join(&name);
        let dest = unique_path(&ask_save_path(ctx.prompter, "Save inline image to", &default)?);
        let kept = locations.promote(key, &dest)?;
        ctx.prompter.say(&format!("Saved {}", kept.display()));
        saved.push(kept);
    }

    Ok(saved)
}
