//! SMTP response handling

use crate::smtp::error::SmtpError;

/// Represents an SMTP response that can be sent to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpResponse {
    /// The three-digit SMTP reply code (e.g. 250, 354, 500)
    pub code: u16,
    /// The human-readable message
    pub message: String,
}

impl SmtpResponse {
    /// Create a new SMTP response
    pub fn new(code: u16, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }

    /// Create a success response (250)
    pub fn ok() -> Self {
        Self::new(250, "Requested mail action ok, completed")
    }

    /// Create a greeting response (220) advertising the server identity
    pub fn greeting(hostname: &str) -> Self {
        Self::new(220, &format!("{hostname} Service ready"))
    }

    /// Create a HELO/EHLO response (250)
    pub fn helo(hostname: &str) -> Self {
        Self::new(250, hostname)
    }

    /// Create a RSET response (250)
    pub fn reset() -> Self {
        Self::new(250, "State reset")
    }

    /// Create a NOOP response (250)
    pub fn noop() -> Self {
        Self::new(250, "OK (noop)")
    }

    /// Create a VRFY response (250) for a known mailbox
    pub fn user(address: &str) -> Self {
        Self::new(250, &format!("user - {address}"))
    }

    /// Create a DATA intermediate response (354)
    pub fn data_start() -> Self {
        Self::new(354, "Waiting for data, finish with <CR><LF>.<CR><LF>")
    }

    /// Create a QUIT response (221)
    pub fn quit() -> Self {
        Self::new(221, "Service closing transmission channel")
    }

    /// Format the response for sending over the wire
    pub fn format(&self) -> String {
        format!("{:03} {}\r\n", self.code, self.message)
    }

    /// Check if this is an error response (4xx or 5xx)
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.code)
    }

    /// Check if this response ends the session
    pub fn is_closing(&self) -> bool {
        self.code == 221
    }
}

impl From<&SmtpError> for SmtpResponse {
    fn from(error: &SmtpError) -> Self {
        Self {
            code: error.to_response_code(),
            message: error.to_response_message(),
        }
    }
}
