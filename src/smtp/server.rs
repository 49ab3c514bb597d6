//! SMTP server implementation

use crate::smtp::commands::SmtpCommandHandler;
use crate::smtp::data;
use crate::smtp::directory::Directory;
use crate::smtp::error::{SmtpError, SmtpLimits};
use crate::smtp::line::LineReader;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::{SmtpSession, SmtpState};
use crate::smtp::store::MailStore;

use std::fmt;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, info_span, warn};

/// SMTP server that checks recipients against a [`Directory`] and hands accepted
/// messages to a [`MailStore`]
#[derive(Clone)]
pub struct SmtpServer {
    /// Server hostname
    hostname: String,
    directory: Arc<dyn Directory>,
    store: Arc<dyn MailStore>,
}

impl fmt::Debug for SmtpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpServer")
            .field("hostname", &self.hostname)
            .finish_non_exhaustive()
    }
}

impl SmtpServer {
    /// Create a new SMTP server
    pub fn new(
        hostname: &str,
        directory: impl Directory + 'static,
        store: impl MailStore + 'static,
    ) -> Self {
        Self {
            hostname: hostname.to_owned(),
            directory: Arc::new(directory),
            store: Arc::new(store),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Start the server on the specified address (blocking)
    pub fn start(&self, addr: &str) -> Result<(), SmtpError> {
        let listener = TcpListener::bind(addr)?;
        self.start_with_listener(listener)
    }

    /// Start the server with an existing listener (blocking).
    /// Every connection is served on its own thread.
    pub fn start_with_listener(&self, listener: TcpListener) -> Result<(), SmtpError> {
        info!(
            addr = %listener.local_addr()?,
            hostname = %self.hostname(),
            "SMTP server listening"
        );

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => self.spawn_client(stream),
                Err(e) => {
                    warn!(error = %e, "Error accepting connection");
                }
            }
        }

        Ok(())
    }

    fn spawn_client(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let server = self.clone();

        let spawned = thread::Builder::new()
            .name(format!("smtp {peer}"))
            .spawn(move || {
                let _span = info_span!("session", %peer).entered();
                info!("Connection accepted");
                match server.handle_client(stream) {
                    Ok(()) => debug!("Session finished"),
                    Err(e) => debug!(error = %e, "Session ended"),
                }
            });

        if let Err(e) = spawned {
            warn!(error = %e, "Failed to spawn session thread");
        }
    }

    /// Handle a client connection
    fn handle_client(&self, stream: TcpStream) -> Result<(), SmtpError> {
        let reader = stream.try_clone()?;
        self.run_session(reader, stream)
    }

    /// Run one session over `reader` and `writer` until QUIT, end of stream or a fatal error.
    ///
    /// The greeting is sent before anything is read. Transport failures are returned as errors
    /// after a best-effort reply; everything else is answered and the session continues.
    pub fn run_session<R: Read, W: Write>(&self, reader: R, mut writer: W) -> Result<(), SmtpError> {
        let mut lines = LineReader::new(reader, SmtpLimits::MAX_LINE_LENGTH);
        let mut session = SmtpSession::new(&self.hostname);
        let handler = SmtpCommandHandler::new(self.directory.as_ref(), self.store.as_ref());

        self.send_response(&mut writer, &SmtpResponse::greeting(session.local_name()))?;

        loop {
            let line = match lines.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("Client closed connection");
                    return Ok(());
                }
                Err(e) => return Err(self.fail(&mut writer, e)),
            };

            let response = match handler.process_command(&line, &mut session) {
                Ok(response) => response,
                Err(e) => SmtpResponse::from(&e),
            };
            self.send_response(&mut writer, &response)?;

            if response.is_closing() {
                return Ok(());
            }

            if session.state() == SmtpState::Transferring {
                let response = match data::read_message(&mut lines, SmtpLimits::MAX_DATA_SIZE) {
                    Ok(body) => handler.deliver(&mut session, body),
                    Err(e) if e.is_fatal() => return Err(self.fail(&mut writer, e)),
                    Err(e) => {
                        debug!(error = %e, "Message rejected");
                        handler.abandon(&mut session);
                        Err(e)
                    }
                };
                let response = response.unwrap_or_else(|e| SmtpResponse::from(&e));
                self.send_response(&mut writer, &response)?;
            }
        }
    }

    /// Report a fatal read error to the client if it still makes sense to, and hand it back
    fn fail<W: Write>(&self, writer: &mut W, error: SmtpError) -> SmtpError {
        if matches!(error, SmtpError::LineTooLong { .. } | SmtpError::NulByte) {
            // The session is over either way
            let _ = self.send_response(writer, &SmtpResponse::from(&error));
        }
        error
    }

    /// Send a response to the client
    fn send_response<W: Write>(
        &self,
        writer: &mut W,
        response: &SmtpResponse,
    ) -> Result<(), SmtpError> {
        if response.is_error() {
            debug!(code = response.code, message = %response.message, "Replying with error");
        }
        writer.write_all(response.format().as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
