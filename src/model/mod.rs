//! Core data model types for messages, addresses and attachments.

pub mod address;
pub mod attachment;
pub mod mail;

pub use address::EmailAddress;
pub use attachment::Attachment;
pub use mail::{Body, Message};
