//! Message persistence

use crate::smtp::email::Email;
use crate::smtp::error::DeliveryError;

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, warn};

/// Bytes kept as they are in a mailbox directory name; everything else is `%XX`
const MAILBOX_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'+');

/// Durably records a received message for each of its recipients
pub trait MailStore: Send + Sync {
    fn deliver(&self, email: &Email) -> Result<(), DeliveryError>;
}

/// Hand the message to whoever holds the receiving end
impl MailStore for mpsc::Sender<Email> {
    fn deliver(&self, email: &Email) -> Result<(), DeliveryError> {
        self.send(email.clone())
            .map_err(|_| DeliveryError::Disconnected)
    }
}

/// Writes each message into one file per recipient under `<root>/<mailbox>/`.
///
/// File names combine the receive time, the process id and a per-store sequence number and are
/// opened with `create_new`, so concurrent sessions never write to the same file.
///
/// Delivery is all or nothing: every copy is first written under a hidden temporary name and
/// only renamed into place once all of them are on disk.
#[derive(Debug)]
pub struct SpoolStore {
    root: PathBuf,
    sequence: AtomicU64,
}

impl SpoolStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the messages of `mailbox`
    pub fn mailbox_dir(&self, mailbox: &str) -> PathBuf {
        self.root.join(mailbox_dir_name(mailbox))
    }

    fn next_file_name(&self, email: &Email) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        format!(
            "{}.{}.{seq}.eml",
            email.timestamp.format("%Y%m%d_%H%M%S%.6f"),
            std::process::id()
        )
    }

    fn stage(
        &self,
        email: &Email,
        file_name: &str,
        staged: &mut Vec<StagedCopy>,
    ) -> Result<(), DeliveryError> {
        let mut dirs = HashSet::new();

        for recipient in &email.to {
            let dir = self.mailbox_dir(recipient);
            if !dirs.insert(dir.clone()) {
                debug!(recipient = %recipient, "Mailbox already has a copy of this message");
                continue;
            }
            fs::create_dir_all(&dir)?;

            let copy = StagedCopy {
                temp: dir.join(format!(".{file_name}.tmp")),
                dest: dir.join(file_name),
            };
            let mut file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&copy.temp)?;
            staged.push(copy);

            file.write_all(email.data.as_bytes())?;
            file.sync_all()?;
        }

        Ok(())
    }
}

impl MailStore for SpoolStore {
    fn deliver(&self, email: &Email) -> Result<(), DeliveryError> {
        let file_name = self.next_file_name(email);
        let mut staged = Vec::new();

        let result = self
            .stage(email, &file_name, &mut staged)
            .and_then(|()| publish(&staged));

        if let Err(e) = result {
            discard(&staged);
            return Err(e);
        }
        Ok(())
    }
}

/// A copy written under its temporary name and the name it is published as
struct StagedCopy {
    temp: PathBuf,
    dest: PathBuf,
}

fn publish(staged: &[StagedCopy]) -> Result<(), DeliveryError> {
    for copy in staged {
        fs::rename(&copy.temp, &copy.dest)?;
    }
    Ok(())
}

/// Remove every trace of a failed delivery
fn discard(staged: &[StagedCopy]) {
    for copy in staged {
        for path in [&copy.temp, &copy.dest] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial copy"),
            }
        }
    }
}

/// Map an address onto a single path component.
///
/// Addresses are folded to lowercase, so mailboxes differing only in case share a directory.
/// Otherwise the mapping is one-to-one.
fn mailbox_dir_name(mailbox: &str) -> String {
    let name = utf8_percent_encode(&mailbox.to_ascii_lowercase(), MAILBOX_NAME).to_string();

    if name.is_empty() {
        // Never produced by the encoding
        return "%".to_string();
    }
    // No ".", ".." or hidden names
    if let Some(rest) = name.strip_prefix('.') {
        return format!("%2E{rest}");
    }
    name
}
