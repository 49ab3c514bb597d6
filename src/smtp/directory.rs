//! Recipient lookup

use crate::smtp::error::SmtpError;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Answers whether a mailbox address is deliverable
pub trait Directory: Send + Sync {
    fn is_valid_recipient(&self, address: &str) -> bool;
}

impl<F> Directory for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid_recipient(&self, address: &str) -> bool {
        self(address)
    }
}

/// Accepts every address
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Directory for AcceptAll {
    fn is_valid_recipient(&self, _address: &str) -> bool {
        true
    }
}

/// Known mailboxes and domains, compared case-insensitively
#[derive(Debug, Clone, Default)]
pub struct MailboxDirectory {
    mailboxes: HashSet<String>,
    domains: HashSet<String>,
}

impl MailboxDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept this exact mailbox
    pub fn with_mailbox(mut self, mailbox: &str) -> Self {
        self.mailboxes.insert(mailbox.to_ascii_lowercase());
        self
    }

    /// Accept every mailbox at this domain
    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domains.insert(domain.to_ascii_lowercase());
        self
    }

    /// Load mailboxes from a users file.
    ///
    /// One user per line; the first whitespace-separated token is the mailbox, anything after it
    /// (such as a password column) is ignored. Blank lines and `#` comments are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SmtpError> {
        let contents = fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    fn parse(contents: &str) -> Self {
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_whitespace().next())
            .fold(Self::new(), |directory, mailbox| {
                directory.with_mailbox(mailbox)
            })
    }

    pub fn len(&self) -> usize {
        self.mailboxes.len() + self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Directory for MailboxDirectory {
    fn is_valid_recipient(&self, address: &str) -> bool {
        let address = address.to_ascii_lowercase();
        if self.mailboxes.contains(&address) {
            return true;
        }

        match address.rsplit_once('@') {
            Some((user, domain)) => !user.is_empty() && self.domains.contains(domain),
            None => false,
        }
    }
}
