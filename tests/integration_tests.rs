//! End-to-end SMTP sessions over TCP

use mysmtpd::{Email, SmtpLimits, SmtpServer, SpoolStore};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn spawn(server: SmtpServer) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    thread::spawn(move || {
        if let Err(e) = server.start_with_listener(listener) {
            eprintln!("Error starting server: {e}");
        }
    });

    addr
}

fn start_test_server() -> (String, mpsc::Receiver<Email>) {
    let (tx, rx) = mpsc::channel::<Email>();
    let directory = |address: &str| address.ends_with("@example.com");
    (spawn(SmtpServer::new("test.local", directory, tx)), rx)
}

struct Client {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl Client {
    /// Connect and consume the greeting
    fn connect(addr: &str) -> (Self, String) {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let reader = BufReader::new(stream.try_clone().unwrap());
        let mut client = Client { stream, reader };
        let greeting = client.read_reply();
        (client, greeting)
    }

    fn send(&mut self, line: &str) -> String {
        self.write_line(line);
        self.read_reply()
    }

    fn write_line(&mut self, line: &str) {
        write!(self.stream, "{line}\r\n").unwrap();
        self.stream.flush().unwrap();
    }

    fn read_reply(&mut self) -> String {
        let mut reply = String::new();
        self.reader.read_line(&mut reply).unwrap();
        reply.trim_end().to_string()
    }

    /// Send a message body, terminator included, and return the final reply
    fn send_body(&mut self, lines: &[&str]) -> String {
        for line in lines {
            write!(self.stream, "{line}\r\n").unwrap();
        }
        self.send(".")
    }

    fn at_eof(&mut self) -> bool {
        let mut rest = String::new();
        matches!(self.reader.read_line(&mut rest), Ok(0) | Err(_))
    }
}

#[test]
fn test_greeting_names_the_server() {
    let (addr, _rx) = start_test_server();
    let (mut client, greeting) = Client::connect(&addr);

    assert_eq!(greeting, "220 test.local Service ready");
    assert_eq!(client.send("QUIT"), "221 Service closing transmission channel");
    assert!(client.at_eof());
}

#[test]
fn test_commands_before_helo_are_out_of_sequence() {
    let (addr, _rx) = start_test_server();
    let (mut client, _) = Client::connect(&addr);

    assert!(client.send("MAIL FROM:<a@example.com>").starts_with("503"));
    assert!(client.send("RCPT TO:<b@example.com>").starts_with("503"));
    assert!(client.send("DATA").starts_with("503"));
    assert!(client.send("NOOP").starts_with("250"));
    assert!(client.send("HELO client.local").starts_with("250"));
    assert!(client.send("MAIL FROM:<a@example.com>").starts_with("250"));

    client.send("QUIT");
}

#[test]
fn test_unknown_recipient_is_rejected() {
    let (addr, rx) = start_test_server();
    let (mut client, _) = Client::connect(&addr);

    client.send("HELO client.local");
    client.send("MAIL FROM:<sender@elsewhere.org>");
    assert_eq!(
        client.send("RCPT TO:<someone@elsewhere.org>"),
        "550 No such user - someone@elsewhere.org"
    );
    assert!(client.send("DATA").starts_with("503"));
    assert!(client.send("RCPT TO:<known@example.com>").starts_with("250"));
    assert!(client.send("DATA").starts_with("354"));
    assert!(client.send_body(&["hi"]).starts_with("250"));
    client.send("QUIT");

    let email = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(email.from, "sender@elsewhere.org");
    assert_eq!(email.to, vec!["known@example.com"]);
}

#[test]
fn test_rset_discards_transaction() {
    let (addr, rx) = start_test_server();
    let (mut client, _) = Client::connect(&addr);

    client.send("HELO client.local");
    client.send("MAIL FROM:<first@example.com>");
    for i in 0..10 {
        client.send(&format!("RCPT TO:<user{i}@example.com>"));
    }
    assert_eq!(client.send("RSET"), "250 State reset");
    assert!(client.send("DATA").starts_with("503"));

    client.send("MAIL FROM:<second@example.com>");
    client.send("RCPT TO:<only@example.com>");
    client.send("DATA");
    assert!(client.send_body(&["Subject: After Reset", "", "body"]).starts_with("250"));
    client.send("QUIT");

    let email = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(email.from, "second@example.com");
    assert_eq!(email.to, vec!["only@example.com"]);
    assert_eq!(email.get_subject(), Some("After Reset"));
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
}

#[test]
fn test_recipient_limit() {
    let (addr, _rx) = start_test_server();
    let (mut client, _) = Client::connect(&addr);

    client.send("HELO client.local");
    client.send("MAIL FROM:<sender@example.com>");
    for i in 0..SmtpLimits::MAX_RECIPIENTS {
        assert!(client.send(&format!("RCPT TO:<user{i}@example.com>")).starts_with("250"));
    }
    assert!(client.send("RCPT TO:<extra@example.com>").starts_with("552"));
    assert!(client.send("DATA").starts_with("354"));

    client.send_body(&["hi"]);
    client.send("QUIT");
}

#[test]
fn test_overlong_command_line_ends_session() {
    let (addr, _rx) = start_test_server();
    let (mut client, _) = Client::connect(&addr);

    let long_command = "HELO ".to_string() + &"a".repeat(SmtpLimits::MAX_LINE_LENGTH);
    assert!(client.send(&long_command).starts_with("500"));
    assert!(client.at_eof());
}

#[test]
fn test_line_at_limit_is_accepted() {
    let (addr, _rx) = start_test_server();
    let (mut client, _) = Client::connect(&addr);

    // Limit counts the CR LF
    let helo = "HELO ".to_string() + &"a".repeat(SmtpLimits::MAX_LINE_LENGTH - 7);
    assert!(client.send(&helo).starts_with("250"));
    assert!(client.send("QUIT").starts_with("221"));
}

#[test]
fn test_several_messages_in_one_session() {
    let (addr, rx) = start_test_server();
    let (mut client, _) = Client::connect(&addr);

    client.send("HELO client.local");
    for n in 0..3 {
        assert_eq!(client.send("RSET"), "250 State reset");
        let reply = client.send(&format!("MAIL FROM:<sender{n}@example.com>"));
        assert!(reply.starts_with("250"));
        assert!(client.send("RCPT TO:<a@example.com>").starts_with("250"));
        assert!(client.send("RCPT TO:<b@example.com>").starts_with("250"));
        assert!(client.send("DATA").starts_with("354"));
        let reply = client.send_body(&[format!("Subject: Test Email {n}").as_str(), "", "..dotted"]);
        assert_eq!(reply, "250 Requested mail action ok, completed");
    }
    client.send("QUIT");

    for n in 0..3 {
        let email = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(email.from, format!("sender{n}@example.com"));
        assert_eq!(email.to, vec!["a@example.com", "b@example.com"]);
        assert!(email.data.ends_with("\r\n.dotted\r\n"));
    }
}

#[test]
fn test_transaction_survives_completed_message() {
    let (addr, rx) = start_test_server();
    let (mut client, _) = Client::connect(&addr);

    client.send("HELO client.local");
    client.send("MAIL FROM:<first@example.com>");
    client.send("RCPT TO:<a@example.com>");
    client.send("DATA");
    assert!(client.send_body(&["one"]).starts_with("250"));

    // Still inside the transaction, so a new MAIL is out of sequence
    assert!(client.send("MAIL FROM:<second@example.com>").starts_with("503"));
    assert!(client.send("DATA").starts_with("354"));
    assert!(client.send_body(&["two"]).starts_with("250"));
    client.send("QUIT");

    for body in ["one\r\n", "two\r\n"] {
        let email = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(email.from, "first@example.com");
        assert_eq!(email.to, vec!["a@example.com"]);
        assert_eq!(email.data, body);
    }
}

#[test]
fn test_vrfy_and_unimplemented_commands() {
    let (addr, _rx) = start_test_server();
    let (mut client, _) = Client::connect(&addr);

    assert_eq!(client.send("VRFY alice@example.com"), "250 user - alice@example.com");
    assert_eq!(
        client.send("VRFY <bob@elsewhere.org>"),
        "550 No such user - bob@elsewhere.org"
    );
    assert!(client.send("VRFY").starts_with("501"));
    assert!(client.send("EXPN staff").starts_with("502"));
    assert!(client.send("HELP").starts_with("502"));
    assert!(client.send("TURN").starts_with("500"));

    client.send("QUIT");
}

#[test]
fn test_concurrent_sessions_spool_separate_files() {
    let spool = TempDir::new().unwrap();
    let addr = spawn(SmtpServer::new(
        "test.local",
        |address: &str| address.ends_with("@example.com"),
        SpoolStore::new(spool.path()),
    ));

    let handles: Vec<_> = (0..5)
        .map(|client_id| {
            let addr = addr.clone();
            thread::spawn(move || {
                let (mut client, greeting) = Client::connect(&addr);
                assert!(greeting.starts_with("220"));

                client.send(&format!("HELO client{client_id}.local"));
                client.send(&format!("MAIL FROM:<sender{client_id}@example.com>"));
                client.send("RCPT TO:<shared@example.com>");
                client.send("DATA");
                let reply = client.send_body(&[format!("This is from client {client_id}").as_str()]);
                assert!(reply.starts_with("250"));
                client.send("QUIT");
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let mut bodies: Vec<String> = fs::read_dir(spool.path().join("shared@example.com"))
        .unwrap()
        .map(|entry| fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect();
    bodies.sort();

    let expected: Vec<String> = (0..5)
        .map(|id| format!("This is from client {id}\r\n"))
        .collect();
    assert_eq!(bodies, expected);
}
