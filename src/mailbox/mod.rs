//! Mail account access.
//!
//! The reader talks to a [`MailboxSession`]; the only shipped backend drives
//! the `himalaya` CLI. Listing returns envelopes only and each message is
//! loaded on demand, so large result sets start showing immediately.

pub mod compose;
pub mod himalaya;
pub mod mime;

use std::path::PathBuf;

use chrono::NaiveDate;

use crate::error::Result;
use crate::model::Message;

/// Which messages to list, by seen flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeenFilter {
    /// Only messages without the seen flag.
    #[default]
    Unseen,
    /// Only messages with the seen flag.
    Seen,
    /// Both.
    Any,
}

/// Listing criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFilter {
    pub seen: SeenFilter,
    /// Sender substring.
    pub from: Option<String>,
    /// Recipient substring.
    pub to: Option<String>,
    /// Subject substring.
    pub subject: Option<String>,
    /// Only messages strictly before this day.
    pub before: Option<NaiveDate>,
    /// Only messages strictly after this day.
    pub after: Option<NaiveDate>,
    /// Folder (label) to list instead of the inbox.
    pub label: Option<String>,
    /// Also list the spam and trash folders.
    pub include_spam_trash: bool,
    /// Maximum number of messages per folder.
    pub limit: usize,
}

impl Default for MessageFilter {
    fn default() -> Self {
        Self {
            seen: SeenFilter::Unseen,
            from: None,
            to: None,
            subject: None,
            before: None,
            after: None,
            label: None,
            include_spam_trash: false,
            limit: 50,
        }
    }
}

/// Listing entry; turned into a [`Message`] by [`MailboxSession::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub id: String,
    pub folder: String,
    pub subject: String,
    pub from: String,
    pub seen: bool,
}

/// A message to send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub body: String,
    /// Files to attach.
    pub attachments: Vec<PathBuf>,
    /// `Message-ID` of the message being replied to.
    pub in_reply_to: Option<String>,
    /// Thread chain for the `References` header.
    pub references: Vec<String>,
}

/// An authenticated mail account.
pub trait MailboxSession {
    /// Address mail is sent from.
    fn own_address(&self) -> &str;

    /// Envelopes matching `filter`, newest first.
    fn list_messages(&mut self, filter: &MessageFilter) -> Result<Vec<Envelope>>;

    /// Load the full message behind an envelope.
    fn fetch(&mut self, envelope: &Envelope) -> Result<Message>;

    fn send(&mut self, message: &OutgoingMessage) -> Result<()>;

    fn mark_read(&mut self, message: &Message) -> Result<()>;

    fn mark_unread(&mut self, message: &Message) -> Result<()>;

    /// Put the message into folder `label` as well.
    fn add_label(&mut self, message: &Message, label: &str) -> Result<()>;

    /// Take the message out of folder `label`, back into the inbox.
    fn remove_label(&mut self, message: &Message, label: &str) -> Result<()>;

    fn mark_spam(&mut self, message: &Message) -> Result<()>;

    fn mark_not_spam(&mut self, message: &Message) -> Result<()>;

    fn delete(&mut self, message: &Message) -> Result<()>;
}
