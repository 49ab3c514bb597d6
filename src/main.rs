use anyhow::{Context, Result};
use mysmtpd::{Directory, MailboxDirectory, SmtpServer, SpoolStore};
use std::path::PathBuf;
use structopt::StructOpt;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, StructOpt)]
#[structopt(name = "mysmtpd", about = "A minimal SMTP receiver")]
struct Opt {
    /// Port to listen on
    port: u16,

    /// Listening address
    #[structopt(short = "a", long = "address", default_value = "0.0.0.0")]
    address: String,

    /// Name announced in the greeting and HELO replies
    #[structopt(long = "hostname", env = "HOSTNAME", default_value = "localhost")]
    hostname: String,

    /// File listing valid mailboxes, one per line
    #[structopt(short = "u", long = "users", parse(from_os_str))]
    users: Option<PathBuf>,

    /// Valid mailbox (can be specified multiple times)
    #[structopt(long = "mailbox", number_of_values = 1)]
    mailboxes: Vec<String>,

    /// Accept every mailbox at this domain (can be specified multiple times)
    #[structopt(long = "domain", number_of_values = 1)]
    domains: Vec<String>,

    /// Accept mail for any recipient
    #[structopt(long = "accept-all")]
    accept_all: bool,

    /// Directory messages are written to
    #[structopt(long = "spool", default_value = "mail", parse(from_os_str))]
    spool: PathBuf,

    /// Log every command and reply
    #[structopt(short = "v", long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let default_filter = if opt.verbose {
        "mysmtpd=debug"
    } else {
        "mysmtpd=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let directory = build_directory(&opt)?;
    let accept_all = opt.accept_all;
    if !accept_all && directory.is_empty() {
        warn!("No mailboxes or domains configured, every recipient will be rejected");
    }

    let store = SpoolStore::new(&opt.spool);
    info!(spool = %store.root().display(), "Delivering to spool directory");

    let server = SmtpServer::new(
        &opt.hostname,
        move |address: &str| accept_all || directory.is_valid_recipient(address),
        store,
    );

    let addr = format!("{}:{}", opt.address, opt.port);
    server
        .start(&addr)
        .with_context(|| format!("failed to serve on {addr}"))?;

    Ok(())
}

fn build_directory(opt: &Opt) -> Result<MailboxDirectory> {
    let mut directory = match &opt.users {
        Some(path) => MailboxDirectory::from_file(path)
            .with_context(|| format!("failed to read users file {}", path.display()))?,
        None => MailboxDirectory::new(),
    };

    for mailbox in &opt.mailboxes {
        directory = directory.with_mailbox(mailbox);
    }
    for domain in &opt.domains {
        directory = directory.with_domain(domain);
    }

    info!(entries = directory.len(), "Recipient directory loaded");
    Ok(directory)
}
