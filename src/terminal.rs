//! Terminal output: text lines and hand-off to external renderers.

use std::io::{self, Write};
use std::path::Path;
use std::process::Command;

use crossterm::style::Stylize;
use tracing::{debug, warn};

use crate::config::{DisplayConfig, RendererConfig};
use crate::error::{MailError, Result};

/// Where rendered message content goes.
pub trait Terminal {
    /// Print one line of body text.
    fn print(&mut self, text: &str);

    /// Print a highlighted line (headers, menus, notices).
    fn notice(&mut self, text: &str);

    /// Dump an HTML file as text.
    fn show_html(&mut self, path: &Path) -> Result<()>;

    /// Draw an image file.
    fn show_image(&mut self, path: &Path) -> Result<()>;
}

/// Stdout terminal backed by external programs.
pub struct CommandTerminal {
    html_command: Vec<String>,
    image_command: Vec<String>,
}

impl CommandTerminal {
    pub fn new(config: &RendererConfig) -> Result<Self> {
        if config.html_command.is_empty() {
            return Err(MailError::Config("renderers.html_command is empty".into()));
        }
        if config.image_command.is_empty() {
            return Err(MailError::Config("renderers.image_command is empty".into()));
        }
        Ok(Self {
            html_command: config.html_command.clone(),
            image_command: config.image_command.clone(),
        })
    }

    /// Resize the terminal if the configuration asks for it.
    pub fn apply_size(display: &DisplayConfig) {
        if let Some([rows, cols]) = display.terminal_size {
            if let Err(e) = crossterm::execute!(io::stdout(), crossterm::terminal::SetSize(cols, rows)) {
                debug!(error = %e, "Terminal resize not supported");
            }
        }
    }
}

/// Run `command` with `path` appended, output going straight to the terminal.
fn run_with_path(command: &[String], path: &Path) -> Result<bool> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| MailError::Config("empty renderer command".into()))?;
    // Keep our own buffered output ahead of the child's.
    let _ = io::stdout().flush();
    let status = Command::new(program)
        .args(args)
        .arg(path)
        .status()
        .map_err(|e| MailError::io(program, e))?;
    Ok(status.success())
}

impl Terminal for CommandTerminal {
    fn print(&mut self, text: &str) {
        println!("{text}");
    }

    fn notice(&mut self, text: &str) {
        println!("{}", text.black().on_white());
    }

    fn show_html(&mut self, path: &Path) -> Result<()> {
        if !run_with_path(&self.html_command, path)? {
            warn!(path = %path.display(), "HTML renderer exited with an error");
        }
        Ok(())
    }

    fn show_image(&mut self, path: &Path) -> Result<()> {
        match run_with_path(&self.image_command, path) {
            Ok(true) => {}
            Ok(false) => warn!(path = %path.display(), "Image renderer exited with an error"),
            Err(e) => warn!(path = %path.display(), error = %e, "Image renderer unavailable"),
        }
        Ok(())
    }
}
