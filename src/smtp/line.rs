//! Bounded line reader for the client side of a connection

use crate::smtp::error::SmtpError;

use std::io::{BufRead, BufReader, Read};

/// Reads one LF-terminated line at a time, never more than `max_length` bytes
#[derive(Debug)]
pub struct LineReader<R> {
    inner: BufReader<R>,
    max_length: usize,
    buf: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    /// Wrap a byte stream, bounding every line to `max_length` bytes including the line feed
    pub fn new(inner: R, max_length: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            max_length,
            buf: Vec::with_capacity(max_length),
        }
    }

    /// Read the next line, keeping its terminator.
    ///
    /// Returns `Ok(None)` at end of stream. A line that does not fit in the bound yields
    /// [`SmtpError::LineTooLong`], a line with an embedded NUL yields [`SmtpError::NulByte`],
    /// and a partial line cut off by end of stream yields [`SmtpError::ConnectionClosed`].
    pub fn read_line(&mut self) -> Result<Option<String>, SmtpError> {
        self.buf.clear();

        let read = (&mut self.inner)
            .take(self.max_length as u64)
            .read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(None);
        }

        if self.buf.last() != Some(&b'\n') {
            if read < self.max_length {
                return Err(SmtpError::ConnectionClosed);
            }
            return Err(SmtpError::LineTooLong {
                max: self.max_length,
            });
        }

        if self.buf.contains(&0) {
            return Err(SmtpError::NulByte);
        }

        // Invalid UTF-8 is replaced rather than rejected
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}
