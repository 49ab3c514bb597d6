//! Transition table of the session state machine
//!
//! Each verb is checked against the current phase before it has any side effect. The table
//! answers with the phase the session enters if the command then succeeds, or with the error
//! reply that rejects the command outright.

use crate::smtp::error::SmtpError;
use crate::smtp::parser::Verb;
use crate::smtp::session::SmtpState;

/// What a command does to the session phase once it has succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Phase stays as it is
    Stay,
    /// Session moves to the given phase
    Enter(SmtpState),
    /// Session terminates
    Close,
}

/// Look up `verb` in `state`.
///
/// Returns [`SmtpError::BadSequence`] when the verb is not allowed in this phase and
/// [`SmtpError::NotImplemented`] for verbs the server knows but does not support.
pub fn transition(state: SmtpState, verb: Verb) -> Result<Transition, SmtpError> {
    match (verb, state) {
        (Verb::Helo | Verb::Ehlo, _) => Ok(Transition::Enter(SmtpState::Greeted)),
        (Verb::Mail, SmtpState::Greeted) => Ok(Transition::Enter(SmtpState::HaveSender)),
        (Verb::Rcpt, SmtpState::HaveSender | SmtpState::HaveRecipient) => {
            Ok(Transition::Enter(SmtpState::HaveRecipient))
        }
        (Verb::Data, SmtpState::HaveRecipient) => Ok(Transition::Enter(SmtpState::Transferring)),
        (Verb::Rset, _) => Ok(Transition::Enter(SmtpState::Greeted)),
        (Verb::Noop | Verb::Vrfy, _) => Ok(Transition::Stay),
        (Verb::Quit, _) => Ok(Transition::Close),
        (Verb::Expn | Verb::Help, _) => Err(SmtpError::NotImplemented(verb.to_string())),
        (Verb::Mail | Verb::Rcpt | Verb::Data, _) => Err(SmtpError::BadSequence),
    }
}
