//! One message on screen: header, body, then the attachment loop.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::address::join_display;
use crate::model::attachment::attachment_keys;
use crate::model::{Attachment, Body, Message};
use crate::prompt::{ask_save_path, ask_yes_no};

use super::classify;
use super::download::{safe_file_name, save_attachment, unique_path};
use super::html::{render_html, HtmlReport};
use super::locations::LocationMap;
use super::plain::{render_plain, PlainReport};
use super::resolver;
use super::RenderContext;

/// Which body path ran and what it did.
#[derive(Debug)]
pub enum BodyReport {
    Html(HtmlReport),
    Plain(PlainReport),
}

/// Result of a full render pass.
#[derive(Debug)]
pub struct RenderReport {
    pub body: BodyReport,
    /// Attachments the user downloaded, and where.
    pub downloaded: Vec<PathBuf>,
}

/// Renders messages to a terminal, asking the user along the way.
pub struct MessageRenderer<'a> {
    ctx: RenderContext<'a>,
}

impl<'a> MessageRenderer<'a> {
    pub fn new(ctx: RenderContext<'a>) -> Self {
        Self { ctx }
    }

    /// Header, body and attachments of `message`.
    ///
    /// Every temp file written during the pass is gone when this returns,
    /// except the ones the user saved.
    pub fn render(&mut self, message: &Message) -> Result<RenderReport> {
        self.print_header(message);
        self.render_content(message)
    }

    /// Body and attachments, without the header.
    pub fn render_content(&mut self, message: &Message) -> Result<RenderReport> {
        let mut locations = LocationMap::new();
        let body = self.render_body(message, &mut locations)?;
        let downloaded = self.attachment_loop(message, &mut locations)?;
        debug!(id = %message.id, tracked = locations.len(), "Render pass finished");
        Ok(RenderReport { body, downloaded })
    }

    pub fn print_header(&mut self, message: &Message) {
        let t = &mut *self.ctx.terminal;
        t.notice(&format!("From: {}", message.from));
        if !message.to.is_empty() {
            t.notice(&format!("To: {}", join_display(&message.to)));
        }
        if !message.cc.is_empty() {
            t.notice(&format!("CC: {}", join_display(&message.cc)));
        }
        if !message.bcc.is_empty() {
            t.notice(&format!("BCC: {}", join_display(&message.bcc)));
        }
        t.notice(&format!(
            "Date: {}",
            message.date.format(&self.ctx.settings.date_format)
        ));
        t.notice(&format!("Subject: {}", message.subject));
        if !message.attachments.is_empty() {
            t.notice(&format!("Attachments: {}", message.attachments.len()));
        }
    }

    /// Render the body through the HTML or plain-text path.
    pub fn render_body(
        &mut self,
        message: &Message,
        locations: &mut LocationMap,
    ) -> Result<BodyReport> {
        match &message.body {
            Body::Html { html, .. } => {
                render_html(html, &message.attachments, &mut self.ctx, locations)
                    .map(BodyReport::Html)
            }
            Body::PlainText(text) => {
                render_plain(text, &message.attachments, &mut self.ctx, locations)
                    .map(BodyReport::Plain)
            }
        }
    }

    /// Offer to print and then to download each attachment.
    pub fn attachment_loop(
        &mut self,
        message: &Message,
        locations: &mut LocationMap,
    ) -> Result<Vec<PathBuf>> {
        let keys = attachment_keys(&message.attachments);
        let total = message.attachments.len();
        let mut downloaded = Vec::new();

        for (idx, attachment) in message.attachments.iter().enumerate() {
            let name = attachment.display_name(idx);
            self.ctx.terminal.notice(&format!(
                "Attachment {}/{total}: {name} ({}, {})",
                idx + 1,
                attachment.content_type.as_deref().unwrap_or("unknown type"),
                attachment.size_display()
            ));

            if ask_yes_no(self.ctx.prompter, &format!("Print {name}?"))? {
                self.print_attachment(attachment, &keys[idx], locations)?;
            }

            if ask_yes_no(self.ctx.prompter, &format!("Download {name}?"))? {
                let default = unique_path(
                    &self.ctx.settings.download_dir.join(safe_file_name(&name)),
                );
                let dest = ask_save_path(self.ctx.prompter, "Save attachment to", &default)?;
                match save_attachment(attachment, &keys[idx], locations, &dest) {
                    Ok(path) => {
                        self.ctx.prompter.say(&format!("Saved {}", path.display()));
                        downloaded.push(path);
                    }
                    Err(e) => {
                        warn!(name = %name, error = %e, "Download failed");
                        self.ctx.prompter.say(&format!("Could not save {name}: {e}"));
                    }
                }
            }
        }

        if !downloaded.is_empty() {
            info!(count = downloaded.len(), "Attachments downloaded");
        }
        Ok(downloaded)
    }

    /// Show an image inline, dump text line by line, refuse anything else.
    fn print_attachment(
        &mut self,
        attachment: &Attachment,
        key: &str,
        locations: &mut LocationMap,
    ) -> Result<()> {
        if classify::is_image(&attachment.payload) {
            let path = match locations.get(key) {
                Some(path) => path.to_path_buf(),
                None => {
                    let path = resolver::materialize(attachment, self.ctx.scratch)?;
                    locations.insert(key, path.clone());
                    path
                }
            };
            return self.ctx.terminal.show_image(&path);
        }

        if attachment.is_text() {
            let text = String::from_utf8_lossy(&attachment.payload);
            for line in text.lines() {
                self.ctx.terminal.print(line);
            }
            return Ok(());
        }

        self.ctx
            .terminal
            .notice("This attachment is binary and cannot be printed");
        Ok(())
    }
}
