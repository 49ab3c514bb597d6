//! Command line parsing

use crate::smtp::error::SmtpError;

use std::fmt;
use std::str::FromStr;

/// Command keywords known to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Helo,
    Ehlo,
    Mail,
    Rcpt,
    Data,
    Rset,
    Noop,
    Vrfy,
    Quit,
    Expn,
    Help,
}

impl Verb {
    pub const ALL: [Verb; 11] = [
        Verb::Helo,
        Verb::Ehlo,
        Verb::Mail,
        Verb::Rcpt,
        Verb::Data,
        Verb::Rset,
        Verb::Noop,
        Verb::Vrfy,
        Verb::Quit,
        Verb::Expn,
        Verb::Help,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Helo => "HELO",
            Verb::Ehlo => "EHLO",
            Verb::Mail => "MAIL",
            Verb::Rcpt => "RCPT",
            Verb::Data => "DATA",
            Verb::Rset => "RSET",
            Verb::Noop => "NOOP",
            Verb::Vrfy => "VRFY",
            Verb::Quit => "QUIT",
            Verb::Expn => "EXPN",
            Verb::Help => "HELP",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = SmtpError;

    fn from_str(keyword: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| keyword.eq_ignore_ascii_case(verb.as_str()))
            .ok_or(SmtpError::InvalidCommand)
    }
}

/// A command line split into its keyword and positional arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    pub verb: Verb,
    pub args: Vec<&'a str>,
}

impl<'a> Command<'a> {
    /// Parse a raw line: trailing whitespace (and the terminator) is stripped, the rest split on
    /// whitespace. An empty line or an unknown keyword is [`SmtpError::InvalidCommand`].
    pub fn parse(line: &'a str) -> Result<Self, SmtpError> {
        let mut words = line.trim_end().split_whitespace();
        let keyword = words.next().ok_or(SmtpError::InvalidCommand)?;
        let verb = keyword.parse::<Verb>()?;

        Ok(Self {
            verb,
            args: words.collect(),
        })
    }
}

/// Extract the address of a `MAIL FROM:<...>` or `RCPT TO:<...>` argument.
///
/// Exactly one argument is expected. The `marker` is matched case-sensitively anywhere in it; the
/// address is whatever lies strictly between the first `<` after the marker and the first `>` after
/// that.
pub fn parse_path(args: &[&str], marker: &str) -> Result<String, SmtpError> {
    let [arg] = args else {
        return Err(SmtpError::InvalidSyntax(format!(
            "expected a single {marker}<address> argument, got {}",
            args.len()
        )));
    };

    let Some(start) = arg.find(marker) else {
        return Err(SmtpError::InvalidSyntax(format!("missing {marker} marker")));
    };
    let rest = &arg[start + marker.len()..];

    bracketed(rest).ok_or_else(|| SmtpError::InvalidSyntax("address must be enclosed in <>".into()))
}

/// Extract a VRFY argument, accepting both `user@host` and `<user@host>`
pub fn parse_mailbox(arg: &str) -> String {
    bracketed(arg).unwrap_or_else(|| arg.to_string())
}

fn bracketed(text: &str) -> Option<String> {
    let open = text.find('<')?;
    let inner = &text[open + 1..];
    let close = inner.find('>')?;
    Some(inner[..close].to_string())
}
