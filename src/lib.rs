//! # mysmtpd
//!
//! A small SMTP receiver. Each connection is one session, served on its own thread, that walks
//! the transaction `HELO` → `MAIL` → `RCPT`… → `DATA` and hands every accepted message to a
//! [`MailStore`]. Recipients are checked against a [`Directory`] as they are named.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mysmtpd::{MailboxDirectory, SmtpServer, SpoolStore};
//!
//! let directory = MailboxDirectory::new()
//!     .with_mailbox("alice@example.com")
//!     .with_domain("example.org");
//! let server = SmtpServer::new("mx.example.com", directory, SpoolStore::new("mail"));
//!
//! server.start("127.0.0.1:2525").unwrap();
//! ```
//!
//! Delivering to a channel instead keeps everything in memory:
//!
//! ```rust
//! use mysmtpd::{AcceptAll, Email, SmtpServer};
//! use std::io::Cursor;
//! use std::sync::mpsc;
//!
//! let (tx, rx) = mpsc::channel::<Email>();
//! let server = SmtpServer::new("test.local", AcceptAll, tx);
//!
//! let client = "HELO me\r\nMAIL FROM:<a@b>\r\nRCPT TO:<c@d>\r\nDATA\r\nhi\r\n.\r\nQUIT\r\n";
//! let mut replies = Vec::new();
//! server.run_session(Cursor::new(client), &mut replies).unwrap();
//!
//! let email = rx.recv().unwrap();
//! assert_eq!(email.data, "hi\r\n");
//! assert_eq!(email.to, vec!["c@d"]);
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `HELO` / `EHLO` - Identify the client (allowed in any phase, starts a fresh transaction)
//! - `MAIL FROM:<address>` - Start a transaction
//! - `RCPT TO:<address>` - Add a recipient (multiple recipients are supported)
//! - `DATA` - Send the message body, terminated by a line containing a single `.`
//! - `RSET` - Reset the current transaction
//! - `NOOP` - Do nothing
//! - `VRFY` - Check whether a mailbox exists
//! - `QUIT` - Close connection
//!
//! `EXPN` and `HELP` are recognized and answered with `502`.
//!
//! ## Notes
//!
//! - After a message is accepted the session keeps its recipients, so another `DATA` sends a
//!   second message to the same set. `RSET` or a new `MAIL` starts over.
//! - Lines are limited to [`SmtpLimits::MAX_LINE_LENGTH`] bytes. A longer line, or one
//!   containing a NUL byte, is answered with `500` and ends the session.
//! - SMTP authentication, TLS and ESMTP extensions are not supported.

mod smtp;

pub use smtp::{
    AcceptAll, Command, DeliveryError, Directory, Email, MailStore, MailboxDirectory,
    SmtpCommandHandler, SmtpError, SmtpLimits, SmtpResponse, SmtpServer, SmtpSession, SmtpState,
    SpoolStore, Transition, Verb,
};
