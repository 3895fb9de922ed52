//! Interactive prompts.
//!
//! All helpers loop until the answer is valid; there is no retry limit.
//! A closed input stream ends the loop with [`MailError::InputClosed`].

pub mod recipients;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use crossterm::style::Stylize;
use regex::Regex;

use crate::error::{MailError, Result};

/// Source of user answers.
pub trait Prompter {
    /// Show `prompt` and read one line (without the trailing newline).
    fn read_line(&mut self, prompt: &str) -> Result<String>;

    /// Tell the user something (validation failures, confirmations).
    fn say(&mut self, message: &str);

    /// Let the user write free text, e.g. in `$EDITOR`.
    fn compose(&mut self, prompt: &str) -> Result<String>;
}

/// Prompter on stdin/stdout; long text is written in `$EDITOR`.
pub struct StdioPrompter {
    editor: String,
}

impl StdioPrompter {
    pub fn new() -> Self {
        let editor = std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .unwrap_or_else(|_| "vi".to_string());
        Self { editor }
    }
}

impl Default for StdioPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for StdioPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        println!("{}", prompt.black().on_white());
        io::stdout().flush()?;
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(MailError::InputClosed);
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn say(&mut self, message: &str) {
        println!("{}", message.black().on_white());
    }

    fn compose(&mut self, prompt: &str) -> Result<String> {
        println!("{}", prompt.black().on_white());
        let temp_file = tempfile::Builder::new()
            .prefix("mailshell-")
            .suffix(".txt")
            .tempfile()?;
        let path = temp_file.path().to_owned();

        let mut parts = self.editor.split_whitespace();
        let program = parts.next().unwrap_or("vi");
        let status = Command::new(program)
            .args(parts)
            .arg(&path)
            .status()
            .map_err(|e| MailError::io(program, e))?;
        if !status.success() {
            return Ok(String::new());
        }
        std::fs::read_to_string(&path).map_err(|e| MailError::io(&path, e))
    }
}

/// Ask until the answer (trimmed, upper-cased) is one of `choices`.
pub fn ask_choice(prompter: &mut dyn Prompter, prompt: &str, choices: &[char]) -> Result<char> {
    loop {
        let answer = prompter.read_line(prompt)?.trim().to_uppercase();
        let mut chars = answer.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if choices.contains(&c) {
                return Ok(c);
            }
        }
        prompter.say("Invalid input");
    }
}

/// Ask a yes/no question.
pub fn ask_yes_no(prompter: &mut dyn Prompter, prompt: &str) -> Result<bool> {
    Ok(ask_choice(prompter, &format!("{prompt} (Y)es/(N)o"), &['Y', 'N'])? == 'Y')
}

/// Ask until the trimmed answer fully matches `pattern`.
///
/// With `allow_blank`, an empty answer returns `None`.
pub fn ask_matching(
    prompter: &mut dyn Prompter,
    prompt: &str,
    pattern: &Regex,
    allow_blank: bool,
    failure: &str,
) -> Result<Option<String>> {
    loop {
        let answer = prompter.read_line(prompt)?.trim().to_string();
        if allow_blank && answer.is_empty() {
            return Ok(None);
        }
        if full_match(pattern, &answer) {
            return Ok(Some(answer));
        }
        prompter.say(failure);
    }
}

fn full_match(pattern: &Regex, text: &str) -> bool {
    pattern
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}

/// Ask until the answer is not blank.
pub fn ask_non_blank(prompter: &mut dyn Prompter, prompt: &str) -> Result<String> {
    loop {
        let answer = prompter.read_line(prompt)?.trim().to_string();
        if !answer.is_empty() {
            return Ok(answer);
        }
        prompter.say("Input cannot be blank");
    }
}

/// Ask for free text until it is not blank.
pub fn compose_non_blank(prompter: &mut dyn Prompter, prompt: &str) -> Result<String> {
    loop {
        let text = prompter.compose(prompt)?;
        if !text.trim().is_empty() {
            return Ok(text);
        }
        prompter.say("Input cannot be blank");
    }
}

/// Ask for a non-negative integer; blank returns `None`.
pub fn ask_count(prompter: &mut dyn Prompter, prompt: &str) -> Result<Option<usize>> {
    loop {
        let answer = prompter.read_line(prompt)?.trim().to_string();
        if answer.is_empty() {
            return Ok(None);
        }
        match answer.parse::<usize>() {
            Ok(n) => return Ok(Some(n)),
            Err(_) => prompter.say("Please enter a whole number"),
        }
    }
}

/// Ask where to save a file; blank picks `default`.
///
/// An existing directory gets `default`'s file name appended. The parent
/// directory must exist.
pub fn ask_save_path(prompter: &mut dyn Prompter, prompt: &str, default: &Path) -> Result<PathBuf> {
    let full_prompt = format!("{prompt} (Enter for {})", default.display());
    loop {
        let answer = prompter.read_line(&full_prompt)?.trim().to_string();
        let mut path = if answer.is_empty() {
            default.to_path_buf()
        } else {
            expand_home(&answer)
        };
        if path.is_dir() {
            if let Some(name) = default.file_name() {
                path = path.join(name);
            }
        }
        let parent_ok = match path.parent() {
            Some(p) if p.as_os_str().is_empty() => true,
            Some(p) => p.is_dir(),
            None => false,
        };
        if parent_ok && path.file_name().is_some() {
            return Ok(path);
        }
        prompter.say("Invalid path, the folder does not exist");
    }
}

fn expand_home(input: &str) -> PathBuf {
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}

/// Prompter replaying canned answers, for tests.
#[cfg(test)]
pub(crate) struct Script {
    pub answers: std::collections::VecDeque<String>,
    pub prompts: Vec<String>,
    pub said: Vec<String>,
}

#[cfg(test)]
impl Script {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|s| s.to_string()).collect(),
            prompts: Vec::new(),
            said: Vec::new(),
        }
    }
}

#[cfg(test)]
impl Prompter for Script {
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
