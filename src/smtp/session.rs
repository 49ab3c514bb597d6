//! SMTP session state management

use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::machine::Transition;

/// Represents the current phase of an SMTP session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmtpState {
    /// Initial state - waiting for HELO/EHLO
    Unidentified,
    /// HELO received - ready for MAIL command
    Greeted,
    /// MAIL FROM received - ready for RCPT commands
    HaveSender,
    /// At least one RCPT TO accepted - ready for DATA or more RCPT commands
    HaveRecipient,
    /// DATA accepted - reading the message body
    Transferring,
}

/// Manages the state and data for a single SMTP session
#[derive(Debug)]
pub struct SmtpSession {
    /// Identity advertised by the server, fixed for the session's lifetime
    local_name: String,
    state: SmtpState,
    /// Reverse-path from MAIL FROM; empty for the null sender `<>`
    sender: Option<String>,
    /// Accepted recipients of the current transaction, without duplicates
    recipients: Vec<String>,
}

impl SmtpSession {
    /// Create a new SMTP session
    pub fn new(local_name: &str) -> Self {
        Self {
            local_name: local_name.to_owned(),
            state: SmtpState::Unidentified,
            sender: None,
            recipients: Vec::new(),
        }
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn state(&self) -> SmtpState {
        self.state
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Apply the outcome of a successful command
    pub fn apply(&mut self, transition: Transition) {
        if let Transition::Enter(state) = transition {
            self.state = state;
        }
    }

    /// Drop the current transaction and return to the post-HELO phase
    pub fn reset(&mut self) {
        self.state = SmtpState::Greeted;
        self.sender = None;
        self.recipients.clear();
    }

    /// Start a new transaction from `sender`, forgetting any previous recipients
    pub fn set_sender(&mut self, sender: String) {
        self.sender = Some(sender);
        self.recipients.clear();
    }

    /// Add an accepted recipient address
    pub fn add_recipient(&mut self, recipient: String) -> Result<(), SmtpError> {
        if self.recipients.contains(&recipient) {
            return Ok(());
        }

        if self.recipients.len() >= SmtpLimits::MAX_RECIPIENTS {
            return Err(SmtpError::TooManyRecipients {
                max: SmtpLimits::MAX_RECIPIENTS,
            });
        }

        self.recipients.push(recipient);
        Ok(())
    }

    /// Leave data transfer mode, keeping sender and recipients for another DATA
    pub fn finish_transfer(&mut self) {
        debug_assert_eq!(self.state, SmtpState::Transferring);
        self.state = SmtpState::HaveRecipient;
    }
}
