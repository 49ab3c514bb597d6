//! Implementation of SMTP commands

use crate::smtp::directory::Directory;
use crate::smtp::email::Email;
use crate::smtp::error::SmtpError;
use crate::smtp::machine;
use crate::smtp::parser::{self, Command, Verb};
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpSession;
use crate::smtp::store::MailStore;

use tracing::{debug, info, warn};

/// Handles SMTP commands and returns appropriate responses
pub struct SmtpCommandHandler<'a> {
    directory: &'a dyn Directory,
    store: &'a dyn MailStore,
}

impl<'a> SmtpCommandHandler<'a> {
    /// Create a new command handler
    pub fn new(directory: &'a dyn Directory, store: &'a dyn MailStore) -> Self {
        Self { directory, store }
    }

    /// Process a command line and return a response.
    ///
    /// Errors are replies the client should see; the phase is only changed when the command
    /// succeeds. A successful DATA leaves the session in
    /// [`Transferring`](crate::SmtpState::Transferring) for the caller to read the body.
    pub fn process_command(
        &self,
        command_line: &str,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        let command = Command::parse(command_line).inspect_err(|_| {
            debug!(line = command_line.trim_end(), "Unrecognized command");
        })?;
        debug!(verb = %command.verb, state = ?session.state(), "Executing command");

        let transition = machine::transition(session.state(), command.verb)?;

        let response = match command.verb {
            Verb::Helo | Verb::Ehlo => self.handle_helo(session),
            Verb::Mail => self.handle_mail(&command, session)?,
            Verb::Rcpt => self.handle_rcpt(&command, session)?,
            Verb::Data => SmtpResponse::data_start(),
            Verb::Rset => self.handle_rset(session),
            Verb::Noop => SmtpResponse::noop(),
            Verb::Vrfy => self.handle_vrfy(&command)?,
            Verb::Quit => SmtpResponse::quit(),
            Verb::Expn | Verb::Help => {
                return Err(SmtpError::NotImplemented(command.verb.to_string()));
            }
        };

        session.apply(transition);
        Ok(response)
    }

    /// Handle HELO/EHLO command
    fn handle_helo(&self, session: &mut SmtpSession) -> SmtpResponse {
        // A greeting always starts over with an empty transaction
        session.reset();
        SmtpResponse::helo(session.local_name())
    }

    /// Handle MAIL command
    fn handle_mail(
        &self,
        command: &Command<'_>,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        let sender = parser::parse_path(&command.args, "FROM:")?;
        session.set_sender(sender);

        Ok(SmtpResponse::ok())
    }

    /// Handle RCPT command
    fn handle_rcpt(
        &self,
        command: &Command<'_>,
        session: &mut SmtpSession,
    ) -> Result<SmtpResponse, SmtpError> {
        let recipient = parser::parse_path(&command.args, "TO:")?;

        if !self.directory.is_valid_recipient(&recipient) {
            return Err(SmtpError::NoSuchUser(recipient));
        }

        session.add_recipient(recipient)?;
        Ok(SmtpResponse::ok())
    }

    /// Handle RSET command
    fn handle_rset(&self, session: &mut SmtpSession) -> SmtpResponse {
        session.reset();
        SmtpResponse::reset()
    }

    /// Handle VRFY command
    fn handle_vrfy(&self, command: &Command<'_>) -> Result<SmtpResponse, SmtpError> {
        let Some(arg) = command.args.first() else {
            return Err(SmtpError::InvalidSyntax(
                "VRFY requires an argument".to_string(),
            ));
        };

        let mailbox = parser::parse_mailbox(arg);
        if self.directory.is_valid_recipient(&mailbox) {
            Ok(SmtpResponse::user(&mailbox))
        } else {
            Err(SmtpError::NoSuchUser(mailbox))
        }
    }

    /// Hand a received body to the store and leave data transfer mode.
    ///
    /// The session returns to [`HaveRecipient`](crate::SmtpState::HaveRecipient) whether or not
    /// delivery succeeds.
    pub fn deliver(
        &self,
        session: &mut SmtpSession,
        body: String,
    ) -> Result<SmtpResponse, SmtpError> {
        session.finish_transfer();

        let email = Email::new(
            session.sender().unwrap_or_default().to_string(),
            session.recipients().to_vec(),
            body,
        );

        match self.store.deliver(&email) {
            Ok(()) => {
                info!(
                    from = %email.from,
                    recipients = email.to.len(),
                    size = email.data_size(),
                    subject = email.get_subject().unwrap_or_default(),
                    "Message delivered"
                );
                Ok(SmtpResponse::ok())
            }
            Err(e) => {
                warn!(error = %e, "Message delivery failed");
                Err(e.into())
            }
        }
    }

    /// Leave data transfer mode after a body that could not be accepted
    pub fn abandon(&self, session: &mut SmtpSession) {
        session.finish_transfer();
    }
}
