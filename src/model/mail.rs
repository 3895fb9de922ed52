//! Messages and their bodies.

use chrono::{DateTime, Utc};

use super::address::EmailAddress;
use super::attachment::Attachment;

/// A fully loaded message as yielded by a [`crate::mailbox::MailboxSession`].
///
/// The renderer only reads it; flag changes go through explicit session calls.
#[derive(Debug, Clone)]
pub struct Message {
    /// Provider-assigned identifier.
    pub id: String,

    /// Folder (label) the message was listed from.
    pub folder: String,

    /// Sender (first `From:` mailbox).
    pub from: EmailAddress,

    /// Primary recipients, in header order.
    pub to: Vec<EmailAddress>,

    /// Carbon-copy recipients, in header order.
    pub cc: Vec<EmailAddress>,

    /// Blind carbon-copy recipients (only present on sent mail).
    pub bcc: Vec<EmailAddress>,

    /// Decoded subject line.
    pub subject: String,

    /// Parsed `Date:` header, falling back to Unix epoch.
    pub date: DateTime<Utc>,

    /// Message body.
    pub body: Body,

    /// Attachments in MIME order, inline images included.
    pub attachments: Vec<Attachment>,

    /// Whether the message carries the seen flag.
    pub read: bool,

    /// Whether the message was listed from the spam folder.
    pub spam: bool,

    /// The `Message-ID` header, without angle brackets.
    pub message_id: Option<String>,

    /// Message-IDs from the `References` header.
    pub references: Vec<String>,
}

/// The displayable body of a message.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Only a `text/plain` part exists.
    PlainText(String),
    /// A real `text/html` part exists; `text` is its plain alternative, if any.
    Html { html: String, text: Option<String> },
}

impl Body {
    /// Plain text suitable for quoting in a reply.
    pub fn quotable_text(&self) -> &str {
        match self {
            Body::PlainText(text) => text,
            Body::Html { text: Some(text), .. } => text,
            Body::Html { html, .. } => html,
        }
    }
}

impl Message {
    /// Identifier of the conversation: the root of `References`, else the
    /// message's own `Message-ID`.
    pub fn thread_id(&self) -> Option<&str> {
        self.references
            .first()
            .map(String::as_str)
            .or(self.message_id.as_deref())
    }

    /// Every distinct participant, sender first, then to, cc and bcc.
    pub fn participants(&self) -> Vec<EmailAddress> {
        let mut seen: Vec<EmailAddress> = Vec::new();
        let all = std::iter::once(&self.from)
            .chain(&self.to)
            .chain(&self.cc)
            .chain(&self.bcc);
        for addr in all {
            if addr.address.is_empty() {
                continue;
            }
            if !seen.iter().any(|s| s.same_mailbox(&addr.address)) {
                seen.push(addr.clone());
            }
        }
        seen
    }

    /// Subject for a reply, adding `Re: ` once.
    pub fn reply_subject(&self) -> String {
        let trimmed = self.subject.trim();
        if trimmed.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("re:")) {
            trimmed.to_string()
        } else {
            format!("Re: {trimmed}")
        }
    }

    /// `References` for a reply: the existing chain plus this message.
    pub fn reply_references(&self) -> Vec<String> {
        let mut refs = self.references.clone();
        if let Some(id) = &self.message_id {
            if !refs.contains(id) {
                refs.push(id.clone());
            }
        }
        refs
    }
}

#[cfg(test)]
pub(crate) fn sample_message() -> Message {
    Message {
        id: "1".to_string(),
        folder: "INBOX".to_string(),
        from: EmailAddress::new(Some("Alice"), "alice@example.com"),
        to: vec![EmailAddress::bare("me@example.com")],
        cc: vec![EmailAddress::bare("ALICE@example.com"), EmailAddress::bare("carol@example.com")],
        bcc: Vec::new(),
        subject: "Lunch".to_string(),
        date: DateTime::UNIX_EPOCH,
        body: Body::PlainText("See you at noon".to_string()),
        attachments: Vec::new(),
        read: false,
        spam: false,
        message_id: Some("m2@example.com".to_string()),
        references: vec!["m1@example.com".to_string()],
    }
}
