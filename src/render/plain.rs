//! Plain-text bodies with `[image: …]` / `[cid:…]` placeholders.

use std::path::PathBuf;

use tracing::debug;

use crate::error::Result;
use crate::model::attachment::attachment_keys;
use crate::model::Attachment;
use crate::prompt::ask_count;

use super::classify;
use super::locations::LocationMap;
use super::resolver::{self, MatchBy};
use super::scanner::{isolate_references, line_reference, ImageIdentifier, InlineReference};
use super::RenderContext;

/// What a plain-text render pass did.
#[derive(Debug, Default)]
pub struct PlainReport {
    /// Lines printed as text.
    pub lines_printed: usize,
    /// Location-map keys of the attachments shown inline, in order.
    pub images_shown: Vec<String>,
}

/// First `limit` characters of `text`.
fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Render a plain-text body, replacing placeholder lines with images.
pub fn render_plain(
    text: &str,
    attachments: &[Attachment],
    ctx: &mut RenderContext<'_>,
    locations: &mut LocationMap,
) -> Result<PlainReport> {
    let total = text.chars().count();
    let shown = if total > ctx.settings.plain_text_threshold {
        let prompt = format!(
            "This message is {total} characters long. How many characters do you want to see? (Enter for all)"
        );
        match ask_count(ctx.prompter, &prompt)? {
            Some(limit) => truncate_chars(text, limit),
            None => text,
        }
    } else {
        text
    };

    let normalized = isolate_references(shown);
    let keys = attachment_keys(attachments);
    let mut report = PlainReport::default();

    for line in normalized.lines() {
        if let Some(reference) = line_reference(line) {
            if let Some(key) = show_reference(&reference, attachments, &keys, ctx, locations)? {
                report.images_shown.push(key);
                continue;
            }
        }
        ctx.terminal.print(line);
        report.lines_printed += 1;
    }

    Ok(report)
}

/// Show the attachment a placeholder points at. Returns its key if shown.
fn show_reference(
    reference: &InlineReference<'_>,
    attachments: &[Attachment],
    keys: &[String],
    ctx: &mut RenderContext<'_>,
    locations: &mut LocationMap,
) -> Result<Option<String>> {
    let found = match reference.identifier() {
        Some(ImageIdentifier::Filename(name)) => {
            resolver::resolve(&name, attachments, MatchBy::Filename)
        }
        Some(ImageIdentifier::ContentId(cid)) => {
            resolver::resolve(&cid, attachments, MatchBy::ContentId)
        }
        None => {
            debug!(raw = reference.raw, "Malformed placeholder, using first image");
            resolver::first_image(attachments)
        }
    };
    let Some((idx, attachment)) = found else {
        return Ok(None);
    };

    let key = &keys[idx];
    let path: PathBuf = match locations.get(key) {
        Some(path) => path.to_path_buf(),
        None => {
            let path = resolver::materialize(attachment, ctx.scratch)?;
            locations.insert(key.clone(), path.clone());
            path
        }
    };

    if !classify::is_image_file(&path) {
        return Ok(None);
    }
    ctx.terminal.show_image(&path)?;
    Ok(Some(key.clone()))
}
