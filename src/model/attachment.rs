//! Message attachments.
//!
//! Unlike an index entry, an attachment carries its decoded payload: the
//! renderer may materialize it to disk at any point during a pass.

/// One attachment of a [`crate::model::Message`].
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// Filename from `Content-Disposition`/`Content-Type`, if any.
    pub filename: Option<String>,

    /// Content-ID as received, possibly wrapped in angle brackets.
    pub content_id: Option<String>,

    /// MIME content type (e.g. `"image/png"`), if declared.
    pub content_type: Option<String>,

    /// Decoded payload.
    pub payload: Vec<u8>,
}

impl Attachment {
    /// Content-ID with the enclosing `<` `>` removed.
    pub fn bare_content_id(&self) -> Option<&str> {
        self.content_id.as_deref().map(strip_angle_brackets)
    }

    /// Stable key under which this attachment is tracked during a render pass.
    ///
    /// Filename first, then content-id, then a synthetic `attachment-<index>`.
    pub fn key(&self, index: usize) -> String {
        if let Some(name) = self.filename.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        if let Some(cid) = self.bare_content_id().filter(|c| !c.is_empty()) {
            return cid.to_string();
        }
        format!("attachment-{index}")
    }

    /// Name shown to the user.
    pub fn display_name(&self, index: usize) -> String {
        self.filename
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("attachment-{}", index + 1))
    }

    /// Lower-case extension of the filename, if it looks like a real one.
    pub fn extension(&self) -> Option<String> {
        let name = self.filename.as_deref()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    /// Whether the payload looks like text rather than binary data.
    ///
    /// Text means every byte is printable, a high byte, or one of
    /// BEL, BS, TAB, LF, FF, CR, ESC.
    pub fn is_text(&self) -> bool {
        self.payload.iter().all(|&b| is_text_byte(b))
    }

    /// Human-readable payload size.
    pub fn size_display(&self) -> String {
        humansize::format_size(self.payload.len(), humansize::BINARY)
    }
}

fn is_text_byte(b: u8) -> bool {
    matches!(b, 7 | 8 | 9 | 10 | 12 | 13 | 27) || (b >= 0x20 && b != 0x7f)
}

/// Render-pass keys for every attachment of a message, in order.
///
/// Same as [`Attachment::key`], except that a key already taken by an earlier
/// attachment gets `#<index>` appended so two files never share an entry.
pub fn attachment_keys(attachments: &[Attachment]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    attachments
        .iter()
        .enumerate()
        .map(|(i, att)| {
            let base = att.key(i);
            if seen.insert(base.clone()) {
                base
            } else {
                let unique = format!("{base}#{i}");
                seen.insert(unique.clone());
                unique
            }
        })
        .collect()
}

/// Strip one pair of surrounding angle brackets: `<foo@bar>` → `foo@bar`.
pub fn strip_angle_brackets(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('<')
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(s)
}
