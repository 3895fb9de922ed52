//! Raw RFC 5322 bytes into a [`Message`].

use chrono::{DateTime, Utc};
use mail_parser::{Address, HeaderValue, MessageParser, MimeHeaders, PartType};
use tracing::{debug, warn};

use crate::error::{MailError, Result};
use crate::model::attachment::strip_angle_brackets;
use crate::model::{Attachment, Body, EmailAddress, Message};

/// Where a raw message came from and its flags.
#[derive(Debug, Clone, Copy)]
pub struct Origin<'a> {
    pub id: &'a str,
    pub folder: &'a str,
    pub read: bool,
    pub spam: bool,
}

/// Parse a complete raw message.
///
/// Messages `mail-parser` cannot make sense of still come back, with the
/// text after the header block as a plain-text body.
pub fn parse_message(raw: &[u8], origin: Origin<'_>) -> Result<Message> {
    let bytes = strip_preamble(raw);
    if bytes.is_empty() {
        return Err(MailError::Mime(format!("message {} is empty", origin.id)));
    }

    let Some(msg) = MessageParser::default().parse(bytes) else {
        warn!(id = origin.id, "Unparseable message, showing raw body");
        return Ok(fallback_message(bytes, origin));
    };

    let from = msg
        .from()
        .map(addresses)
        .and_then(|list| list.into_iter().next())
        .unwrap_or_else(|| EmailAddress::bare(""));

    let date = msg
        .date()
        .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0))
        .unwrap_or(DateTime::UNIX_EPOCH);

    let references = header_ids(msg.references());
    let attachments: Vec<Attachment> = msg.attachments().map(to_attachment).collect();
    debug!(id = origin.id, attachments = attachments.len(), "Parsed message");

    Ok(Message {
        id: origin.id.to_string(),
        folder: origin.folder.to_string(),
        from,
        to: msg.to().map(addresses).unwrap_or_default(),
        cc: msg.cc().map(addresses).unwrap_or_default(),
        bcc: msg.bcc().map(addresses).unwrap_or_default(),
        subject: msg.subject().unwrap_or("").to_string(),
        date,
        body: body_of(&msg),
        attachments,
        read: origin.read,
        spam: origin.spam,
        message_id: msg.message_id().map(|id| strip_angle_brackets(id).to_string()),
        references,
    })
}

/// HTML when a real `text/html` part exists, plain text otherwise.
///
/// `mail-parser` synthesizes HTML from plain text (and vice versa), so the
/// part types are checked rather than the convenience accessors.
fn body_of(msg: &mail_parser::Message<'_>) -> Body {
    let text = msg
        .text_part(0)
        .and_then(|part| match &part.body {
            PartType::Text(text) => Some(text.to_string()),
            _ => None,
        });

    match msg.html_part(0).map(|part| &part.body) {
        Some(PartType::Html(html)) => Body::Html {
            html: html.to_string(),
            text,
        },
        _ => Body::PlainText(text.unwrap_or_default()),
    }
}

fn to_attachment(part: &mail_parser::MessagePart<'_>) -> Attachment {
    let content_type = part.content_type().map(|ct| match ct.subtype() {
        Some(sub) => format!("{}/{}", ct.ctype(), sub),
        None => ct.ctype().to_string(),
    });
    Attachment {
        filename: part.attachment_name().map(String::from),
        content_id: part.content_id().map(String::from),
        content_type,
        payload: part.contents().to_vec(),
    }
}

/// Every mailbox of an address header, groups flattened.
fn addresses(address: &Address<'_>) -> Vec<EmailAddress> {
    let addrs: Vec<&mail_parser::Addr<'_>> = match address {
        Address::List(list) => list.iter().collect(),
        Address::Group(groups) => groups.iter().flat_map(|g| g.addresses.iter()).collect(),
    };
    addrs
        .into_iter()
        .filter_map(|a| {
            let addr = a.address.as_deref()?.trim();
            (!addr.is_empty()).then(|| EmailAddress::new(a.name.as_deref(), addr))
        })
        .collect()
}

/// Message-IDs of a `References`/`In-Reply-To` header.
fn header_ids(value: &HeaderValue<'_>) -> Vec<String> {
    let ids: Vec<&str> = match value {
        HeaderValue::Text(id) => vec![id.as_ref()],
        HeaderValue::TextList(ids) => ids.iter().map(|id| id.as_ref()).collect(),
        _ => Vec::new(),
    };
    ids.into_iter()
        .map(|id| strip_angle_brackets(id).to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

/// Drop a byte-order mark and an mbox `From ` line, if present.
fn strip_preamble(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

fn fallback_message(bytes: &[u8], origin: Origin<'_>) -> Message {
    let text = String::from_utf8_lossy(bytes);
    let body = text
        .split_once("\r\n\r\n")
        .or_else(|| text.split_once("\n\n"))
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    Message {
        id: origin.id.to_string(),
        folder: origin.folder.to_string(),
        from: EmailAddress::bare(""),
        to: Vec::new(),
        cc: Vec::new(),
        bcc: Vec::new(),
        subject: String::new(),
        date: DateTime::UNIX_EPOCH,
        body: Body::PlainText(body),
        attachments: Vec::new(),
        read: origin.read,
        spam: origin.spam,
        message_id: None,
        references: Vec::new(),
    }
}
