//! Email data structures and functionality

use chrono::{DateTime, Local};

/// A message accepted by the server, ready for delivery
#[derive(Debug, Clone)]
pub struct Email {
    /// The sender's address from MAIL FROM (empty for the null sender)
    pub from: String,

    /// Recipient addresses accepted by RCPT TO
    pub to: Vec<String>,

    /// The dot-unstuffed message, every line terminated by CRLF
    pub data: String,

    /// When the message was received by the server
    pub timestamp: DateTime<Local>,
}

impl Email {
    /// Create a new email
    pub fn new(from: String, to: Vec<String>, data: String) -> Self {
        Self {
            from,
            to,
            data,
            timestamp: Local::now(),
        }
    }

    /// Check if this email was sent to a specific recipient
    pub fn has_recipient(&self, recipient: &str) -> bool {
        self.to.iter().any(|addr| addr == recipient)
    }

    /// Get the size of the email data in bytes
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Get the subject line from the email headers (if present)
    pub fn get_subject(&self) -> Option<&str> {
        for line in self.data.lines() {
            if line.is_empty() {
                // End of headers
                break;
            }
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            if name.eq_ignore_ascii_case("subject") {
                return Some(value.trim());
            }
        }
        None
    }
}
