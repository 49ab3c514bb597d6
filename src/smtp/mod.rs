//! SMTP server implementation

pub mod commands;
pub mod data;
pub mod directory;
pub mod email;
pub mod error;
pub mod line;
pub mod machine;
pub mod parser;
pub mod response;
pub mod server;
pub mod session;
pub mod store;

pub use commands::SmtpCommandHandler;
pub use directory::{AcceptAll, Directory, MailboxDirectory};
pub use email::Email;
pub use error::{DeliveryError, SmtpError, SmtpLimits};
pub use machine::Transition;
pub use parser::{Command, Verb};
pub use response::SmtpResponse;
pub use server::SmtpServer;
pub use session::{SmtpSession, SmtpState};
pub use store::{MailStore, SpoolStore};
