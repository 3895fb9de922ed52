//! Message rendering: bodies, inline images and attachments.
//!
//! A render pass shows one message. It writes temp files into a
//! [`locations::ScratchSpace`], tracks them in a [`locations::LocationMap`]
//! and deletes whatever the user did not keep when the pass ends.

pub mod classify;
pub mod download;
pub mod fetch;
pub mod html;
pub mod locations;
pub mod message;
pub mod plain;
pub mod resolver;
pub mod scanner;

use std::path::PathBuf;

use crate::config::Config;
use crate::prompt::Prompter;
use crate::terminal::Terminal;

use fetch::ImageTransport;
use locations::ScratchSpace;

pub use message::{MessageRenderer, RenderReport};

/// User-tunable knobs of a render pass.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Plain-text bodies longer than this (in characters) ask how much to show.
    pub plain_text_threshold: usize,
    /// `chrono` format string for the date header.
    pub date_format: String,
    /// Suggested folder for downloads and saved inline images.
    pub download_dir: PathBuf,
}

impl RenderSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            plain_text_threshold: config.display.plain_text_threshold,
            date_format: config.display.date_format.clone(),
            download_dir: crate::config::download_dir(config),
        }
    }
}

/// Everything a render stage needs, borrowed for one pass.
pub struct RenderContext<'a> {
    pub scratch: &'a ScratchSpace,
    pub transport: &'a dyn ImageTransport,
    pub terminal: &'a mut dyn Terminal,
    pub prompter: &'a mut dyn Prompter,
    pub settings: &'a RenderSettings,
}
