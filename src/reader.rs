//! Going through listed messages one by one.

use tracing::{error, info, warn};

use crate::composer::quoted_reply_body;
use crate::error::{MailError, Result};
use crate::mailbox::{Envelope, MailboxSession, MessageFilter, OutgoingMessage};
use crate::model::Message;
use crate::prompt::recipients::{
    gather_attachments, gather_recipients, require_recipients, sort_participants, Recipients,
};
use crate::prompt::{ask_choice, ask_yes_no, compose_non_blank, Prompter};
use crate::render::fetch::ImageTransport;
use crate::render::locations::ScratchSpace;
use crate::render::{MessageRenderer, RenderContext, RenderSettings};
use crate::terminal::Terminal;

/// What to do with a message after its header is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstAction {
    Read,
    MarkRead,
    Skip,
    Quit,
}

/// What to do with a message after it was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageAction {
    MarkRead,
    MarkUnread,
    Spam,
    NotSpam,
    Reply,
    Delete,
    Skip,
}

const FIRST_MENU: &str = "(R)ead, (M)ark read, (S)kip, (Q)uit:";
const ACTION_MENU: &str =
    "(M)ark read, Mark (U)nread, S(p)am, (N)ot spam, (R)eply, (D)elete, (S)kip:";

impl FirstAction {
    fn ask(prompter: &mut dyn Prompter) -> Result<Self> {
        Ok(match ask_choice(prompter, FIRST_MENU, &['R', 'M', 'S', 'Q'])? {
            'R' => FirstAction::Read,
            'M' => FirstAction::MarkRead,
            'Q' => FirstAction::Quit,
            _ => FirstAction::Skip,
        })
    }
}

impl MessageAction {
    fn ask(prompter: &mut dyn Prompter) -> Result<Self> {
        let choices = ['M', 'U', 'P', 'N', 'R', 'D', 'S'];
        Ok(match ask_choice(prompter, ACTION_MENU, &choices)? {
            'M' => MessageAction::MarkRead,
            'U' => MessageAction::MarkUnread,
            'P' => MessageAction::Spam,
            'N' => MessageAction::NotSpam,
            'R' => MessageAction::Reply,
            'D' => MessageAction::Delete,
            _ => MessageAction::Skip,
        })
    }
}

/// Counters for one reading session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReadSummary {
    pub listed: usize,
    pub read: usize,
    pub replied: usize,
    pub deleted: usize,
}

/// Interactive reader over a mailbox session.
pub struct Reader<'a> {
    pub session: &'a mut dyn MailboxSession,
    pub scratch: &'a ScratchSpace,
    pub transport: &'a dyn ImageTransport,
    pub terminal: &'a mut dyn Terminal,
    pub prompter: &'a mut dyn Prompter,
    pub settings: &'a RenderSettings,
}

impl<'a> Reader<'a> {
    fn renderer(&mut self) -> MessageRenderer<'_> {
        MessageRenderer::new(RenderContext {
            scratch: self.scratch,
            transport: self.transport,
            terminal: &mut *self.terminal,
            prompter: &mut *self.prompter,
            settings: self.settings,
        })
    }

    /// Walk every message matching `filter`.
    pub fn run(&mut self, filter: &MessageFilter) -> Result<ReadSummary> {
        let envelopes = self.session.list_messages(filter)?;
        self.run_envelopes(&envelopes)
    }

    /// Walk already listed envelopes, loading each message when reached.
    pub fn run_envelopes(&mut self, envelopes: &[Envelope]) -> Result<ReadSummary> {
        let mut summary = ReadSummary {
            listed: envelopes.len(),
            ..ReadSummary::default()
        };
        if envelopes.is_empty() {
            self.prompter.say("No messages found");
            return Ok(summary);
        }

        for envelope in envelopes {
            let message = match self.session.fetch(envelope) {
                Ok(message) => message,
                Err(e) => {
                    warn!(id = %envelope.id, error = %e, "Could not load message");
                    self.prompter
                        .say(&format!("Could not load message {}: {e}", envelope.id));
                    continue;
                }
            };

            match self.handle(&message, &mut summary) {
                Ok(true) => {}
                Ok(false) => break,
                Err(MailError::InputClosed) => return Err(MailError::InputClosed),
                Err(e) => {
                    error!(id = %message.id, error = %e, "Message handling failed");
                    self.prompter.say(&format!("Error: {e}"));
                }
            }
        }

        info!(?summary, "Reading finished");
        Ok(summary)
    }

    /// One message. Returns `false` when the user wants to stop.
    fn handle(&mut self, message: &Message, summary: &mut ReadSummary) -> Result<bool> {
        self.terminal.print("----------------------------------------");
        self.renderer().print_header(message);

        match FirstAction::ask(self.prompter)? {
            FirstAction::Quit => return Ok(false),
            FirstAction::Skip => return Ok(true),
            FirstAction::MarkRead => {
                self.session.mark_read(message)?;
                return Ok(true);
            }
            FirstAction::Read => {}
        }

        self.renderer().render_content(message)?;
        summary.read += 1;

        match MessageAction::ask(self.prompter)? {
            MessageAction::MarkRead => self.session.mark_read(message)?,
            MessageAction::MarkUnread => self.session.mark_unread(message)?,
            MessageAction::Spam => self.session.mark_spam(message)?,
            MessageAction::NotSpam => self.session.mark_not_spam(message)?,
            MessageAction::Reply => {
                self.reply(message)?;
                summary.replied += 1;
            }
            MessageAction::Delete => {
                if ask_yes_no(self.prompter, "Delete this message?")? {
                    self.session.delete(message)?;
                    summary.deleted += 1;
                }
            }
            MessageAction::Skip => {}
        }
        Ok(true)
    }

    /// Build, send and record a threaded reply.
    pub fn reply(&mut self, message: &Message) -> Result<OutgoingMessage> {
        let mut recipients = Recipients::default();
        sort_participants(self.prompter, &message.participants(), &mut recipients)?;
        gather_recipients(self.prompter, &mut recipients, true)?;
        require_recipients(self.prompter, &mut recipients, true)?;

        let typed = compose_non_blank(self.prompter, "Type your reply:")?;
        let body = quoted_reply_body(&typed, message, &self.settings.date_format);
        let attachments = gather_attachments(self.prompter)?;

        let outgoing = OutgoingMessage {
            to: recipients.to,
            cc: recipients.cc,
            bcc: recipients.bcc,
            subject: message.reply_subject(),
            body,
            attachments,
            in_reply_to: message.message_id.clone(),
            references: message.reply_references(),
        };
        self.session.send(&outgoing)?;
        self.session.mark_read(message)?;
        info!(from = self.session.own_address(), id = %message.id, "Reply sent");
        self.prompter.say("Reply sent");
        Ok(outgoing)
    }
}
