//! Shared test doubles: scripted prompts, a recording terminal, a stub HTTP
//! transport and an in-memory mailbox.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::DateTime;
use url::Url;

use mailshell::error::{MailError, Result};
use mailshell::mailbox::{Envelope, MailboxSession, MessageFilter, OutgoingMessage};
use mailshell::model::{Attachment, Body, EmailAddress, Message};
use mailshell::prompt::Prompter;
use mailshell::render::fetch::ImageTransport;
use mailshell::render::locations::ScratchSpace;
use mailshell::render::{RenderContext, RenderSettings};
use mailshell::terminal::Terminal;

pub struct ScriptedPrompter {
    pub answers: VecDeque<String>,
    pub prompts: Vec<String>,
    pub said: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|s| s.to_string()).collect(),
            prompts: Vec::new(),
            said: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        self.answers.pop_front().ok_or(MailError::InputClosed)
    }

    fn say(&mut self, message: &str) {
        self.said.push(message.to_string());
    }

    fn compose(&mut self, prompt: &str) -> Result<String> {
        self.read_line(prompt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Text(String),
    Notice(String),
    /// Content of the scratch HTML file when it was rendered.
    Html(String),
    /// Bytes of the image file when it was drawn.
    Image(Vec<u8>),
}

#[derive(Default)]
pub struct RecordingTerminal {
    pub shown: Vec<Shown>,
    pub image_paths: Vec<PathBuf>,
    pub html_paths: Vec<PathBuf>,
}

impl RecordingTerminal {
    pub fn images(&self) -> Vec<&Vec<u8>> {
        self.shown
            .iter()
            .filter_map(|s| match s {
                Shown::Image(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    pub fn html_chunks(&self) -> Vec<&str> {
        self.shown
            .iter()
            .filter_map(|s| match s {
                Shown::Html(html) => Some(html.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.shown
            .iter()
            .filter_map(|s| match s {
                Shown::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Terminal for RecordingTerminal {
    fn print(&mut self, text: &str) {
        self.shown.push(Shown::Text(text.to_string()));
    }

    fn notice(&mut self, text: &str) {
        self.shown.push(Shown::Notice(text.to_string()));
    }

    fn show_html(&mut self, path: &Path) -> Result<()> {
        let html = std::fs::read_to_string(path).map_err(|e| MailError::io(path, e))?;
        self.html_paths.push(path.to_path_buf());
        self.shown.push(Shown::Html(html));
        Ok(())
    }

    fn show_image(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path).map_err(|e| MailError::io(path, e))?;
        self.image_paths.push(path.to_path_buf());
        self.shown.push(Shown::Image(bytes));
        Ok(())
    }
}

/// Serves fixed bytes per URL; every other URL fails.
#[derive(Default)]
pub struct StubTransport {
    pub responses: HashMap<String, Vec<u8>>,
    pub requested: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn with(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), bytes);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        let mut urls = self.requested.lock().unwrap().clone();
        urls.sort();
        urls
    }
}

impl ImageTransport for StubTransport {
    fn get(&self, url: &Url) -> Result<Vec<u8>> {
        self.requested.lock().unwrap().push(url.to_string());
        self.responses
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| MailError::Resolution(format!("{url}: connection refused")))
    }
}

/// In-memory mailbox recording every call.
#[derive(Default)]
pub struct FakeSession {
    pub envelopes: Vec<Envelope>,
    pub messages: HashMap<String, Message>,
    pub calls: Vec<String>,
    pub sent: Vec<OutgoingMessage>,
}

impl FakeSession {
    pub fn with_message(mut self, message: Message) -> Self {
        self.envelopes.push(Envelope {
            id: message.id.clone(),
            folder: message.folder.clone(),
            subject: message.subject.clone(),
            from: message.from.to_string(),
            seen: message.read,
        });
        self.messages.insert(message.id.clone(), message);
        self
    }
}

impl MailboxSession for FakeSession {
    fn own_address(&self) -> &str {
        "me@example.com"
    }

    fn list_messages(&mut self, _filter: &MessageFilter) -> Result<Vec<Envelope>> {
        self.calls.push("list".into());
        Ok(self.envelopes.clone())
    }

    fn fetch(&mut self, envelope: &Envelope) -> Result<Message> {
        self.calls.push(format!("fetch {}", envelope.id));
        self.messages
            .get(&envelope.id)
            .cloned()
            .ok_or_else(|| MailError::Mailbox(format!("no message {}", envelope.id)))
    }

    fn send(&mut self, message: &OutgoingMessage) -> Result<()> {
        self.calls.push("send".into());
        self.sent.push(message.clone());
        Ok(())
    }

    fn mark_read(&mut self, message: &Message) -> Result<()> {
        self.calls.push(format!("read {}", message.id));
        Ok(())
    }

    fn mark_unread(&mut self, message: &Message) -> Result<()> {
        self.calls.push(format!("unread {}", message.id));
        Ok(())
    }

    fn add_label(&mut self, message: &Message, label: &str) -> Result<()> {
        self.calls.push(format!("label+ {} {label}", message.id));
        Ok(())
    }

    fn remove_label(&mut self, message: &Message, label: &str) -> Result<()> {
        self.calls.push(format!("label- {} {label}", message.id));
        Ok(())
    }

    fn mark_spam(&mut self, message: &Message) -> Result<()> {
        self.calls.push(format!("spam {}", message.id));
        Ok(())
    }

    fn mark_not_spam(&mut self, message: &Message) -> Result<()> {
        self.calls.push(format!("notspam {}", message.id));
        Ok(())
    }

    fn delete(&mut self, message: &Message) -> Result<()> {
        self.calls.push(format!("delete {}", message.id));
        Ok(())
    }
}

/// A solid-colour PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 120, 200]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

pub fn attachment(filename: Option<&str>, cid: Option<&str>, payload: Vec<u8>) -> Attachment {
    Attachment {
        filename: filename.map(String::from),
        content_id: cid.map(String::from),
        content_type: None,
        payload,
    }
}

pub fn message(id: &str, body: Body, attachments: Vec<Attachment>) -> Message {
    Message {
        id: id.to_string(),
        folder: "INBOX".to_string(),
        from: EmailAddress::new(Some("Alice"), "alice@example.com"),
        to: vec![EmailAddress::bare("me@example.com")],
        cc: vec![EmailAddress::bare("carol@example.com")],
        bcc: Vec::new(),
        subject: "Pictures".to_string(),
        date: DateTime::from_timestamp(1_704_189_600, 0).unwrap(),
        body,
        attachments,
        read: false,
        spam: false,
        message_id: Some("m1@example.com".to_string()),
        references: Vec::new(),
    }
}

/// Temp directories for one test: scratch space plus a download folder.
pub struct Fixture {
    pub root: tempfile::TempDir,
    pub scratch: ScratchSpace,
    pub settings: RenderSettings,
}

impl Fixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchSpace::new(root.path().join("scratch")).unwrap();
        let downloads = root.path().join("downloads");
        std::fs::create_dir_all(&downloads).unwrap();
        let settings = RenderSettings {
            plain_text_threshold: 3000,
            date_format: "%Y-%m-%d %H:%M UTC".to_string(),
            download_dir: downloads,
        };
        Self {
            root,
            scratch,
            settings,
        }
    }

    pub fn downloads(&self) -> &Path {
        &self.settings.download_dir
    }

    /// Files left in the scratch directory.
    pub fn leftovers(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.scratch.dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    pub fn context<'a>(
        &'a self,
        transport: &'a dyn ImageTransport,
        terminal: &'a mut dyn Terminal,
        prompter: &'a mut dyn Prompter,
    ) -> RenderContext<'a> {
        RenderContext {
            scratch: &self.scratch,
            transport,
            terminal,
            prompter,
            settings: &self.settings,
        }
    }
}
