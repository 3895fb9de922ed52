//! `mailshell`: read and write email from the terminal.
//!
//! Messages come from a [`mailbox::MailboxSession`]; the [`render`] module
//! shows their bodies with inline images, offers attachments for printing
//! and download, and cleans up every temp file it wrote.

pub mod composer;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod model;
pub mod prompt;
pub mod reader;
pub mod render;
pub mod terminal;
