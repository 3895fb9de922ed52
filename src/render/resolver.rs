//! Match inline references to attachments and write them to disk.

use std::path::PathBuf;

use tracing::debug;

use crate::error::Result;
use crate::model::Attachment;

use super::classify;
use super::locations::ScratchSpace;

/// How an identifier is compared against attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchBy {
    /// Compare against the content-id, angle brackets stripped.
    ContentId,
    /// Compare against the filename.
    Filename,
}

/// First attachment whose content-id or filename equals `identifier`.
///
/// Returns the attachment together with its index in `attachments`.
pub fn resolve<'a>(
    identifier: &str,
    attachments: &'a [Attachment],
    by: MatchBy,
) -> Option<(usize, &'a Attachment)> {
    let identifier = identifier.trim();
    let found = attachments.iter().enumerate().find(|(_, att)| match by {
        MatchBy::ContentId => att.bare_content_id() == Some(identifier),
        MatchBy::Filename => att.filename.as_deref() == Some(identifier),
    });
    if found.is_none() {
        debug!(identifier, ?by, "No attachment matches inline reference");
    }
    found
}

/// First attachment that classifies as an image.
///
/// Used when a placeholder is too malformed to name its attachment.
pub fn first_image(attachments: &[Attachment]) -> Option<(usize, &Attachment)> {
    attachments
        .iter()
        .enumerate()
        .find(|(_, att)| classify::is_image(&att.payload))
}

/// Write an attachment's payload to a fresh unique temp path.
///
/// The original filename is never used as a path component; only a short
/// alphanumeric extension is carried over.
pub fn materialize(attachment: &Attachment, scratch: &ScratchSpace) -> Result<PathBuf> {
    let ext = attachment.extension();
    let path = scratch.write_unique(&attachment.payload, ext.as_deref())?;
    debug!(
        filename = attachment.filename.as_deref().unwrap_or(""),
        path = %path.display(),
        "Materialized attachment"
    );
    Ok(path)
}
