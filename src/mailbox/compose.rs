//! Outgoing messages as RFC 5322 bytes.

use std::path::Path;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;

use crate::error::{MailError, Result};

use super::OutgoingMessage;

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| MailError::Compose(format!("invalid address '{address}': {e}")))
}

fn angle(id: &str) -> String {
    format!("<{}>", id.trim_matches(['<', '>']))
}

/// Best-effort content type of a file to attach.
fn content_type_for(path: &Path) -> ContentType {
    let mime = match image::ImageFormat::from_path(path) {
        Ok(format) => format.to_mime_type(),
        Err(_) => match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("txt") => "text/plain",
            Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
            _ => "application/octet-stream",
        },
    };
    ContentType::parse(mime).unwrap_or(ContentType::TEXT_PLAIN)
}

/// Build the full message, attachments read from disk.
pub fn build_message(from: &str, outgoing: &OutgoingMessage) -> Result<Vec<u8>> {
    let mut builder = Message::builder()
        .from(mailbox(from)?)
        .subject(outgoing.subject.clone())
        .keep_bcc();

    for to in &outgoing.to {
        builder = builder.to(mailbox(to)?);
    }
    for cc in &outgoing.cc {
        builder = builder.cc(mailbox(cc)?);
    }
    for bcc in &outgoing.bcc {
        builder = builder.bcc(mailbox(bcc)?);
    }
    if let Some(id) = &outgoing.in_reply_to {
        builder = builder.in_reply_to(angle(id));
    }
    if !outgoing.references.is_empty() {
        let chain: Vec<String> = outgoing.references.iter().map(|r| angle(r)).collect();
        builder = builder.references(chain.join(" "));
    }

    let text = SinglePart::plain(outgoing.body.clone());
    let message = if outgoing.attachments.is_empty() {
        builder.singlepart(text)
    } else {
        let mut mixed = MultiPart::mixed().singlepart(text);
        for path in &outgoing.attachments {
            let data = std::fs::read(path).map_err(|e| MailError::io(path, e))?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("attachment")
                .to_string();
            mixed = mixed.singlepart(Attachment::new(name).body(data, content_type_for(path)));
        }
        builder.multipart(mixed)
    }
    .map_err(|e| MailError::Compose(e.to_string()))?;

    Ok(message.formatted())
}
