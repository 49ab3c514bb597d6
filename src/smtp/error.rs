//! Error types for the SMTP server

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid command")]
    InvalidCommand,

    #[error("Command not implemented: {0}")]
    NotImplemented(String),

    #[error("Bad sequence of commands")]
    BadSequence,

    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("No such user: {0}")]
    NoSuchUser(String),

    #[error("Line too long (max {max} bytes)")]
    LineTooLong { max: usize },

    #[error("Line contains a NUL byte")]
    NulByte,

    #[error("Too many recipients (max {max})")]
    TooManyRecipients { max: usize },

    #[error("Too much mail data (max {max} bytes)")]
    TooMuchData { max: usize },

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,
}

/// Failure reported by a [`MailStore`](crate::MailStore) while persisting a message
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mail receiver has been dropped")]
    Disconnected,
}

/// Protocol limits enforced by the server
pub struct SmtpLimits;

impl SmtpLimits {
    /// Maximum length of a line read from the client, including the line feed
    pub const MAX_LINE_LENGTH: usize = 1024;

    /// Maximum number of recipients per transaction
    pub const MAX_RECIPIENTS: usize = 100;

    /// Maximum total size of one message body
    pub const MAX_DATA_SIZE: usize = 10 * 1024 * 1024; // 10MB
}

impl SmtpError {
    /// Reply code sent to the client for this error
    pub fn to_response_code(&self) -> u16 {
        match self {
            SmtpError::Io(_) => 421,
            SmtpError::InvalidCommand => 500,
            SmtpError::NotImplemented(_) => 502,
            SmtpError::BadSequence => 503,
            SmtpError::InvalidSyntax(_) => 501,
            SmtpError::NoSuchUser(_) => 550,
            SmtpError::LineTooLong { .. } => 500,
            SmtpError::NulByte => 500,
            SmtpError::TooManyRecipients { .. } => 552,
            SmtpError::TooMuchData { .. } => 552,
            SmtpError::Delivery(_) => 451,
            SmtpError::ConnectionClosed => 421,
        }
    }

    /// Reply text sent to the client for this error
    pub fn to_response_message(&self) -> String {
        match self {
            SmtpError::Io(_) | SmtpError::ConnectionClosed => {
                "Service not available, closing transmission channel".to_string()
            }
            SmtpError::InvalidCommand | SmtpError::LineTooLong { .. } | SmtpError::NulByte => {
                "Syntax error, command unrecognized".to_string()
            }
            SmtpError::NotImplemented(_) => "Command not implemented".to_string(),
            SmtpError::BadSequence => "Bad sequence of commands".to_string(),
            SmtpError::InvalidSyntax(_) => "Syntax error in parameters or arguments".to_string(),
            SmtpError::NoSuchUser(addr) => format!("No such user - {addr}"),
            SmtpError::TooManyRecipients { max } => format!("Too many recipients (max {max})"),
            SmtpError::TooMuchData { max } => format!("Too much mail data (max {max} bytes)"),
            SmtpError::Delivery(_) => {
                "Requested action aborted: local error in processing".to_string()
            }
        }
    }

    /// Whether this error ends the session instead of producing a reply
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SmtpError::Io(_)
                | SmtpError::LineTooLong { .. }
                | SmtpError::NulByte
                | SmtpError::ConnectionClosed
        )
    }
}
