//! [`MailboxSession`] backed by the `himalaya` CLI.

use std::io::Write;
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::MailboxConfig;
use crate::error::{MailError, Result};
use crate::model::Message;

use super::compose::build_message;
use super::mime::{parse_message, Origin};
use super::{Envelope, MailboxSession, MessageFilter, OutgoingMessage, SeenFilter};

#[derive(Debug, Deserialize)]
struct RawAddress {
    name: Option<String>,
    addr: String,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    id: String,
    #[serde(default)]
    flags: Vec<String>,
    subject: Option<String>,
    from: Option<RawAddress>,
}

/// Parse `envelope list --output json` output.
pub fn parse_envelopes(json: &[u8], folder: &str) -> Result<Vec<Envelope>> {
    let raw: Vec<RawEnvelope> = serde_json::from_slice(json)
        .map_err(|e| MailError::Mailbox(format!("unexpected envelope list: {e}")))?;
    Ok(raw
        .into_iter()
        .map(|env| Envelope {
            id: env.id,
            folder: folder.to_string(),
            subject: env.subject.unwrap_or_default(),
            from: env
                .from
                .map(|a| match a.name {
                    Some(name) if !name.is_empty() => format!("{name} <{}>", a.addr),
                    _ => a.addr,
                })
                .unwrap_or_default(),
            seen: env.flags.iter().any(|f| f.eq_ignore_ascii_case("seen")),
        })
        .collect())
}

/// Quote a query value when it has spaces.
fn query_value(value: &str) -> String {
    if value.chars().any(char::is_whitespace) {
        format!("\"{}\"", value.replace('"', ""))
    } else {
        value.to_string()
    }
}

/// Search query for `envelope list`, e.g. `not flag seen and from bob order by date desc`.
pub fn build_query(filter: &MessageFilter) -> String {
    let mut terms: Vec<String> = Vec::new();
    match filter.seen {
        SeenFilter::Unseen => terms.push("not flag seen".into()),
        SeenFilter::Seen => terms.push("flag seen".into()),
        SeenFilter::Any => {}
    }
    for (key, value) in [
        ("from", &filter.from),
        ("to", &filter.to),
        ("subject", &filter.subject),
    ] {
        if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            terms.push(format!("{key} {}", query_value(v)));
        }
    }
    if let Some(day) = filter.before {
        terms.push(format!("before {}", day.format("%Y-%m-%d")));
    }
    if let Some(day) = filter.after {
        terms.push(format!("after {}", day.format("%Y-%m-%d")));
    }

    let order = "order by date desc";
    if terms.is_empty() {
        order.to_string()
    } else {
        format!("{} {order}", terms.join(" and "))
    }
}

/// Folders a filter lists, in order, without duplicates.
pub fn folders_for(filter: &MessageFilter, config: &MailboxConfig) -> Vec<String> {
    let mut folders = vec![filter
        .label
        .clone()
        .unwrap_or_else(|| config.inbox_folder.clone())];
    if filter.include_spam_trash {
        for extra in [&config.spam_folder, &config.trash_folder] {
            if !folders.contains(extra) {
                folders.push(extra.clone());
            }
        }
    }
    folders
}

/// Session driving the `himalaya` binary.
pub struct HimalayaSession {
    config: MailboxConfig,
}

impl HimalayaSession {
    pub fn new(config: MailboxConfig) -> Result<Self> {
        if config.email.trim().is_empty() {
            return Err(MailError::Config(
                "mailbox.email is not set; it is needed as the sender address".into(),
            ));
        }
        Ok(Self { config })
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.config.himalaya_bin);
        cmd.args(args);
        if let Some(account) = &self.config.account {
            cmd.args(["--account", account]);
        }
        cmd
    }

    /// Run himalaya and return stdout; non-zero exit is a mailbox error.
    fn run(&self, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<u8>> {
        debug!(?args, "Running himalaya");
        let mut cmd = self.command(args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        if stdin.is_some() {
            cmd.stdin(Stdio::piped());
        }
        let mut child = cmd
            .spawn()
            .map_err(|e| MailError::io(&self.config.himalaya_bin, e))?;
        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input)
                .map_err(|e| MailError::io(&self.config.himalaya_bin, e))?;
        }
        let output = child
            .wait_with_output()
            .map_err(|e| MailError::io(&self.config.himalaya_bin, e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MailError::Mailbox(format!(
                "himalaya {} failed: {}",
                args.first().copied().unwrap_or(""),
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }

    fn move_message(&self, message: &Message, target: &str) -> Result<()> {
        self.run(
            &["message", "move", "--folder", &message.folder, target, &message.id],
            None,
        )?;
        info!(id = %message.id, from = %message.folder, to = target, "Moved message");
        Ok(())
    }
}

impl MailboxSession for HimalayaSession {
    fn own_address(&self) -> &str {
        &self.config.email
    }

    fn list_messages(&mut self, filter: &MessageFilter) -> Result<Vec<Envelope>> {
        let query = build_query(filter);
        let limit = filter.limit.to_string();
        let mut envelopes = Vec::new();
        for folder in folders_for(filter, &self.config) {
            let mut args = vec![
                "envelope",
                "list",
                "--output",
                "json",
                "--folder",
                folder.as_str(),
                "--page-size",
                limit.as_str(),
            ];
            args.extend(query.split(' '));
            let stdout = self.run(&args, None)?;
            let found = parse_envelopes(&stdout, &folder)?;
            debug!(folder = %folder, count = found.len(), "Listed envelopes");
            envelopes.extend(found);
        }
        Ok(envelopes)
    }

    fn fetch(&mut self, envelope: &Envelope) -> Result<Message> {
        let file = tempfile::Builder::new()
            .prefix("mailshell-")
            .suffix(".eml")
            .tempfile()?;
        let dest = file.path().to_string_lossy().into_owned();
        self.run(
            &[
                "message",
                "export",
                "--full",
                "--folder",
                &envelope.folder,
                "--destination",
                &dest,
                &envelope.id,
            ],
            None,
        )?;
        let raw = std::fs::read(file.path()).map_err(|e| MailError::io(file.path(), e))?;
        parse_message(
            &raw,
            Origin {
                id: &envelope.id,
                folder: &envelope.folder,
                read: envelope.seen,
                spam: envelope.folder == self.config.spam_folder,
            },
        )
    }

    fn send(&mut self, message: &OutgoingMessage) -> Result<()> {
        let raw = build_message(&self.config.email, message)?;
        self.run(&["message", "send"], Some(&raw))?;
        info!(to = message.to.len(), subject = %message.subject, "Message sent");
        Ok(())
    }

    fn mark_read(&mut self, message: &Message) -> Result<()> {
        self.run(
            &["flag", "add", "--folder", &message.folder, &message.id, "seen"],
            None,
        )?;
        info!(id = %message.id, "Marked read");
        Ok(())
    }

    fn mark_unread(&mut self, message: &Message) -> Result<()> {
        self.run(
            &["flag", "remove", "--folder", &message.folder, &message.id, "seen"],
            None,
        )?;
        info!(id = %message.id, "Marked unread");
        Ok(())
    }

    fn add_label(&mut self, message: &Message, label: &str) -> Result<()> {
        self.run(
            &["message", "copy", "--folder", &message.folder, label, &message.id],
            None,
        )?;
        info!(id = %message.id, label, "Label added");
        Ok(())
    }

    fn remove_label(&mut self, message: &Message, label: &str) -> Result<()> {
        if message.folder != label {
            return Err(MailError::Mailbox(format!(
                "message {} was not listed from {label}",
                message.id
            )));
        }
        let inbox = self.config.inbox_folder.clone();
        self.move_message(message, &inbox)
    }

    fn mark_spam(&mut self, message: &Message) -> Result<()> {
        let spam = self.config.spam_folder.clone();
        self.move_message(message, &spam)
    }

    fn mark_not_spam(&mut self, message: &Message) -> Result<()> {
        let inbox = self.config.inbox_folder.clone();
        self.move_message(message, &inbox)
    }

    fn delete(&mut self, message: &Message) -> Result<()> {
        self.run(
            &["message", "delete", "--folder", &message.folder, &message.id],
            None,
        )?;
        info!(id = %message.id, "Deleted message");
        Ok(())
    }
}
