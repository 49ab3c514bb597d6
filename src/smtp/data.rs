//! Message body transfer after a successful DATA command

use crate::smtp::error::SmtpError;
use crate::smtp::line::LineReader;

use std::io::Read;

/// Result of inspecting one line in data mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLine<'a> {
    /// The lone `.` that ends the message
    End,
    /// A body line with transparency undone and the terminator removed
    Text(&'a str),
}

impl<'a> DataLine<'a> {
    /// Classify a raw line. Trailing whitespace is stripped first, so `".  \r\n"` still ends the
    /// message while a whitespace-only line becomes an empty body line.
    pub fn parse(raw: &'a str) -> Self {
        let line = raw.trim_end();
        if line == "." {
            return DataLine::End;
        }

        match line.strip_prefix('.') {
            Some(rest) if rest.starts_with('.') => DataLine::Text(rest),
            _ => DataLine::Text(line),
        }
    }
}

/// Read the message body up to and including the terminator line.
///
/// Each stored line gets a CRLF appended. Once the body grows past `max_size` the remaining lines
/// are still consumed up to the terminator but discarded, and [`SmtpError::TooMuchData`] is
/// returned so the client stays in step. Line faults and end of stream are fatal.
pub fn read_message<R: Read>(
    lines: &mut LineReader<R>,
    max_size: usize,
) -> Result<String, SmtpError> {
    let mut message = String::new();
    let mut overflow = false;

    loop {
        let raw = lines.read_line()?.ok_or(SmtpError::ConnectionClosed)?;

        let text = match DataLine::parse(&raw) {
            DataLine::End => break,
            DataLine::Text(text) => text,
        };

        if overflow {
            continue;
        }
        if message.len() + text.len() + 2 > max_size {
            overflow = true;
            message.clear();
            continue;
        }

        message.push_str(text);
        message.push_str("\r\n");
    }

    if overflow {
        return Err(SmtpError::TooMuchData { max: max_size });
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(input: &str, max_size: usize) -> Result<String, SmtpError> {
        let mut lines = LineReader::new(Cursor::new(input.as_bytes().to_vec()), 1024);
        read_message(&mut lines, max_size)
    }

    #[test]
    fn test_terminator() {
        assert_eq!(DataLine::parse(".\r\n"), DataLine::End);
        assert_eq!(DataLine::parse(". \t\r\n"), DataLine::End);
        assert_eq!(DataLine::parse(".\n"), DataLine::End);
    }

    #[test]
    fn test_double_dot_is_data() {
        assert_eq!(DataLine::parse("..\r\n"), DataLine::Text("."));
    }

    #[test]
    fn test_unstuffing_removes_exactly_one_dot() {
        assert_eq!(DataLine::parse("..hello\r\n"), DataLine::Text(".hello"));
        assert_eq!(DataLine::parse("...\r\n"), DataLine::Text(".."));
    }

    #[test]
    fn test_single_leading_dot_is_kept() {
        assert_eq!(DataLine::parse(".hello\r\n"), DataLine::Text(".hello"));
    }

    #[test]
    fn test_whitespace_only_line_is_empty_text() {
        assert_eq!(DataLine::parse("   \r\n"), DataLine::Text(""));
        assert_eq!(DataLine::parse("\r\n"), DataLine::Text(""));
    }

    #[test]
    fn test_trailing_whitespace_is_stripped() {
        assert_eq!(DataLine::parse("hello  \r\n"), DataLine::Text("hello"));
    }

    #[test]
    fn test_read_message() {
        let message = read("Subject: hi\r\n\r\nbody\r\n..dot\r\n.\r\n", 1024).unwrap();
        assert_eq!(message, "Subject: hi\r\n\r\nbody\r\n.dot\r\n");
    }

    #[test]
    fn test_read_empty_message() {
        assert_eq!(read(".\r\n", 1024).unwrap(), "");
    }

    #[test]
    fn test_read_stops_at_terminator() {
        let mut lines = LineReader::new(
            Cursor::new(b"hi\r\n.\r\nQUIT\r\n".to_vec()),
            1024,
        );

        assert_eq!(read_message(&mut lines, 1024).unwrap(), "hi\r\n");
        assert_eq!(lines.read_line().unwrap(), Some("QUIT\r\n".to_string()));
    }

    #[test]
    fn test_read_without_terminator() {
        assert!(matches!(
            read("hi\r\n", 1024),
            Err(SmtpError::ConnectionClosed)
        ));
    }

    #[test]
    fn test_read_oversized_message_drains_to_terminator() {
        let mut lines = LineReader::new(
            Cursor::new(b"0123456789\r\n0123456789\r\n.\r\nNOOP\r\n".to_vec()),
            1024,
        );

        let result = read_message(&mut lines, 16);
        assert!(matches!(result, Err(SmtpError::TooMuchData { max: 16 })));
        assert_eq!(lines.read_line().unwrap(), Some("NOOP\r\n".to_string()));
    }

    #[test]
    fn test_read_line_fault_is_fatal() {
        let mut lines = LineReader::new(Cursor::new(b"ok\r\nbad\0\r\n.\r\n".to_vec()), 1024);
        assert!(matches!(
            read_message(&mut lines, 1024),
            Err(SmtpError::NulByte)
        ));
    }
}
