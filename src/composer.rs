//! Writing new mail and building reply bodies.

use tracing::info;

use crate::error::Result;
use crate::mailbox::{MailboxSession, OutgoingMessage};
use crate::model::Message;
use crate::prompt::recipients::{
    gather_attachments, gather_recipients, require_recipients, Recipients,
};
use crate::prompt::{ask_non_blank, compose_non_blank, Prompter};

/// Append the quoted original below a reply.
pub fn quoted_reply_body(reply: &str, original: &Message, date_format: &str) -> String {
    let mut out = reply.trim_end().to_string();
    out.push_str("\n\n");
    out.push_str(&format!(
        "On {}, {} wrote:\n",
        original.date.format(date_format),
        original.from
    ));
    for line in original.body.quotable_text().lines() {
        if line.is_empty() {
            out.push_str(">\n");
        } else {
            out.push_str("> ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Ask for subject, body, recipients and attachments, then send.
pub fn write_email(
    session: &mut dyn MailboxSession,
    prompter: &mut dyn Prompter,
) -> Result<OutgoingMessage> {
    let subject = ask_non_blank(prompter, "Subject:")?;
    prompter.read_line("Press Enter to write the email body")?;
    let body = compose_non_blank(prompter, "Body:")?;

    let mut recipients = Recipients::default();
    gather_recipients(prompter, &mut recipients, false)?;
    require_recipients(prompter, &mut recipients, false)?;
    let attachments = gather_attachments(prompter)?;

    let outgoing = OutgoingMessage {
        to: recipients.to,
        cc: recipients.cc,
        bcc: recipients.bcc,
        subject,
        body,
        attachments,
        in_reply_to: None,
        references: Vec::new(),
    };
    session.send(&outgoing)?;
    info!(from = session.own_address(), subject = %outgoing.subject, "Email written and sent");
    prompter.say("Email sent");
    Ok(outgoing)
}
