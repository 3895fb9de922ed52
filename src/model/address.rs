//! Email addresses and recipient validation.

use std::sync::LazyLock;

use regex::Regex;

/// Addresses accepted at the recipient prompts.
///
/// Local part: alphanumeric runs separated by single `.`, `_` or `-`.
/// Domain: one label followed by one or more alphabetic TLD parts.
pub static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9]+[._-])*[A-Za-z0-9]+@[A-Za-z0-9-]+(\.[A-Za-z]{2,})+$")
        .expect("valid email regex")
});

/// A mailbox as shown in message headers.
///
/// # Examples
/// - `Juan García <juan@ejemplo.com>` → `display_name = "Juan García"`, `address = "juan@ejemplo.com"`
/// - `user@example.com` → `display_name = ""`, `address = "user@example.com"`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct EmailAddress {
    /// Human-readable display name (may be empty).
    pub display_name: String,
    /// The bare email address (`user@domain`).
    pub address: String,
}

impl EmailAddress {
    /// Build an address from optional header parts.
    pub fn new(display_name: Option<&str>, address: &str) -> Self {
        Self {
            display_name: display_name.unwrap_or("").trim().to_string(),
            address: address.trim().to_string(),
        }
    }

    /// A bare address without a display name.
    pub fn bare(address: &str) -> Self {
        Self::new(None, address)
    }

    /// Format for display: `"Display Name <address>"` or just `"address"`.
    pub fn display(&self) -> String {
        if self.display_name.is_empty() {
            self.address.clone()
        } else {
            format!("{} <{}>", self.display_name, self.address)
        }
    }

    /// Whether this mailbox is `other`, ignoring case and display names.
    pub fn same_mailbox(&self, other: &str) -> bool {
        self.address.eq_ignore_ascii_case(other.trim())
    }
}

impl std::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Whether `input` is acceptable as a recipient address.
pub fn is_valid_address(input: &str) -> bool {
    EMAIL_PATTERN.is_match(input)
}

/// Join addresses for a header line.
pub fn join_display(addresses: &[EmailAddress]) -> String {
    addresses
        .iter()
        .map(EmailAddress::display)
        .collect::<Vec<_>>()
        .join(", ")
}
