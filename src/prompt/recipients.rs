//! Recipient and attachment gathering for outgoing mail.

use std::path::PathBuf;

use crate::error::Result;
use crate::model::address::EMAIL_PATTERN;
use crate::model::EmailAddress;

use super::{ask_choice, ask_matching, Prompter};

/// Recipients of an outgoing message, split by header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

/// Header a recipient is added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientKind {
    To,
    Cc,
    Bcc,
}

impl RecipientKind {
    fn label(self, is_reply: bool) -> &'static str {
        match self {
            RecipientKind::To if is_reply => "Reply to",
            RecipientKind::To => "To",
            RecipientKind::Cc => "CC",
            RecipientKind::Bcc => "BCC",
        }
    }
}

impl Recipients {
    pub fn is_empty(&self) -> bool {
        self.to.is_empty() && self.cc.is_empty() && self.bcc.is_empty()
    }

    fn list_mut(&mut self, kind: RecipientKind) -> &mut Vec<String> {
        match kind {
            RecipientKind::To => &mut self.to,
            RecipientKind::Cc => &mut self.cc,
            RecipientKind::Bcc => &mut self.bcc,
        }
    }

    /// Add `address` unless it is already in that header. Returns whether it was added.
    pub fn add(&mut self, kind: RecipientKind, address: &str) -> bool {
        let list = self.list_mut(kind);
        if list.iter().any(|a| a.eq_ignore_ascii_case(address)) {
            return false;
        }
        list.push(address.to_string());
        true
    }
}

/// Menu text and choices for the header question.
fn kind_menu(is_reply: bool) -> (&'static str, [char; 4]) {
    if is_reply {
        ("(R)eply to, (C)c, (B)cc, (S)kip", ['R', 'C', 'B', 'S'])
    } else {
        ("(T)o, (C)c, (B)cc, (S)kip", ['T', 'C', 'B', 'S'])
    }
}

fn kind_for(choice: char) -> Option<RecipientKind> {
    match choice {
        'R' | 'T' => Some(RecipientKind::To),
        'C' => Some(RecipientKind::Cc),
        'B' => Some(RecipientKind::Bcc),
        _ => None,
    }
}

/// Ask, for each participant of the original message, where they go in the reply.
pub fn sort_participants(
    prompter: &mut dyn Prompter,
    participants: &[EmailAddress],
    recipients: &mut Recipients,
) -> Result<()> {
    let (menu, choices) = kind_menu(true);
    for person in participants {
        let choice = ask_choice(prompter, &format!("For {person}: {menu}"), &choices)?;
        if let Some(kind) = kind_for(choice) {
            recipients.add(kind, &person.address);
        }
    }
    Ok(())
}

/// Add recipients typed by the user until a blank address is entered.
pub fn gather_recipients(
    prompter: &mut dyn Prompter,
    recipients: &mut Recipients,
    is_reply: bool,
) -> Result<()> {
    let (menu, choices) = kind_menu(is_reply);
    loop {
        let Some(address) = ask_matching(
            prompter,
            "Enter an email address to add as a recipient, or press Enter",
            &EMAIL_PATTERN,
            true,
            "Email Invalid",
        )?
        else {
            return Ok(());
        };

        let Some(kind) = kind_for(ask_choice(prompter, menu, &choices)?) else {
            continue;
        };

        if !recipients.add(kind, &address) {
            prompter.say(&format!(
                "That email address is already in the list of {} email addresses",
                kind.label(is_reply)
            ));
        }
    }
}

/// Run [`gather_recipients`] until there is at least one recipient of any kind.
pub fn require_recipients(
    prompter: &mut dyn Prompter,
    recipients: &mut Recipients,
    is_reply: bool,
) -> Result<()> {
    while recipients.is_empty() {
        prompter.say("At least one recipient is required");
        gather_recipients(prompter, recipients, is_reply)?;
    }
    Ok(())
}

/// Ask for files to attach until a blank line is entered.
pub fn gather_attachments(prompter: &mut dyn Prompter) -> Result<Vec<PathBuf>> {
    let mut attachments: Vec<PathBuf> = Vec::new();
    loop {
        let answer = prompter.read_line(
            "Please enter the filename of your attachment or press Enter if you have nothing to attach",
        )?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(attachments);
        }
        let path = PathBuf::from(answer);
        if !path.is_file() {
            prompter.say("Invalid filename, failed to attach the file.");
            continue;
        }
        if attachments.contains(&path) {
            prompter.say("You already attached this file. Skipping.");
            continue;
        }
        attachments.push(path);
    }
}
