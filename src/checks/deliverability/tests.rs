use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, BufReader, Write};
use std::net::{IpAddr, TcpListener, TcpStream};
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use super::*;
use crate::dns::stub::StubResolver;
use crate::smtp::TcpConnector;

type Transcript = Rc<RefCell<Vec<String>>>;

#[derive(Clone)]
enum Host {
    Refused,
    Script(Vec<(&'static str, SmtpReply)>),
}

/// In-memory connector: each host either refuses or plays a fixed script.
#[derive(Default)]
struct ScriptedConnector {
    hosts: HashMap<String, Host>,
    log: Transcript,
}

impl ScriptedConnector {
    fn host(mut self, name: &str, host: Host) -> Self {
        self.hosts.insert(name.to_string(), host);
        self
    }

    fn lines(&self) -> Vec<String> {
        self.log.borrow().clone()
    }
}

impl Connector for ScriptedConnector {
    type Client = ScriptedClient;

    fn connect(&self, host: &str, addrs: &[IpAddr]) -> Result<ScriptedClient, SmtpError> {
        self.log.borrow_mut().push(format!("connect {host}"));
        match self.hosts.get(host) {
            Some(Host::Script(script)) => Ok(ScriptedClient {
                replies: script.iter().cloned().collect(),
                peer: addrs.first().map(IpAddr::to_string),
                log: Rc::clone(&self.log),
            }),
            Some(Host::Refused) | None => Err(SmtpError::Connect {
                host: host.to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        }
    }
}

struct ScriptedClient {
    replies: VecDeque<(&'static str, SmtpReply)>,
    peer: Option<String>,
    log: Transcript,
}

impl ScriptedClient {
    fn next(&mut self, line: &str) -> Result<SmtpReply, SmtpError> {
        match self.replies.pop_front() {
            Some((expected, reply)) => {
                assert!(
                    line.starts_with(expected),
                    "expected command starting with '{expected}', got '{line}'"
                );
                Ok(reply)
            }
            None => Err(SmtpError::io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed",
            ))),
        }
    }
}

impl SmtpClient for ScriptedClient {
    fn read_greeting(&mut self) -> Result<SmtpReply, SmtpError> {
        self.next("")
    }

    fn command(&mut self, line: &str) -> Result<SmtpReply, SmtpError> {
        self.log.borrow_mut().push(line.to_string());
        self.next(line)
    }

    fn upgrade_tls(&mut self) -> Result<(), SmtpError> {
        self.log.borrow_mut().push("<tls>".to_string());
        Ok(())
    }

    fn peer(&self) -> Option<String> {
        self.peer.clone()
    }
}

fn reply(code: u16, text: &str) -> SmtpReply {
    SmtpReply::new(code, text)
}

fn greeting() -> (&'static str, SmtpReply) {
    ("", reply(220, "mx.example.test ESMTP"))
}

fn accepting() -> Host {
    Host::Script(vec![
        greeting(),
        ("EHLO", reply(250, "mx.example.test")),
        ("MAIL FROM:", reply(250, "2.1.0 Ok")),
        ("RCPT TO:", reply(250, "2.1.5 Ok")),
        ("QUIT", reply(221, "2.0.0 Bye")),
    ])
}

fn address() -> EmailAddress {
    EmailAddress::parse("user@example.test").expect("test address")
}

fn probe(resolver: &StubResolver, connector: &ScriptedConnector) -> ProbeReport {
    probe_with(resolver, connector, &ProbeOptions::default())
}

fn probe_with(
    resolver: &StubResolver,
    connector: &ScriptedConnector,
    options: &ProbeOptions,
) -> ProbeReport {
    probe_mailbox(&address(), resolver, connector, options, &CancelFlag::new())
}

fn single_mx() -> StubResolver {
    StubResolver::new()
        .with_exchangers("example.test", vec![MxRecord::new(10, "mx1.example.test")])
}

#[test]
fn accepted_recipient_is_deliverable() {
    let connector = ScriptedConnector::default().host("mx1.example.test", accepting());
    let report = probe(&single_mx(), &connector);

    assert!(matches!(report.status, ProbeStatus::Deliverable { .. }));
    assert_eq!(report.attempts[0].address.as_deref(), Some("192.0.2.1"));
    let result = report.to_check_result();
    assert!(result.is_valid());
    assert_eq!(result.reason(), "deliverable");
    assert_eq!(
        connector.lines(),
        vec![
            "connect mx1.example.test",
            "EHLO localhost",
            "MAIL FROM:<>",
            "RCPT TO:<user@example.test>",
            "QUIT",
        ]
    );
}

#[test]
fn rejected_recipient_stops_the_probe() {
    let resolver = StubResolver::new().with_exchangers(
        "example.test",
        vec![
            MxRecord::new(10, "mx1.example.test"),
            MxRecord::new(20, "mx2.example.test"),
        ],
    );
    let connector = ScriptedConnector::default()
        .host(
            "mx1.example.test",
            Host::Script(vec![
                greeting(),
                ("EHLO", reply(250, "mx.example.test")),
                ("MAIL FROM:", reply(250, "Ok")),
                ("RCPT TO:", reply(550, "5.1.1 User unknown")),
                ("QUIT", reply(221, "Bye")),
            ]),
        )
        .host("mx2.example.test", accepting());

    let report = probe(&resolver, &connector);
    match &report.status {
        ProbeStatus::NotDeliverable { stage, reply, .. } => {
            assert_eq!(*stage, AttemptStage::RcptTo);
            assert_eq!(reply.code, 550);
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert_eq!(report.attempts.len(), 1);
    assert!(!connector.lines().contains(&"connect mx2.example.test".to_string()));
    assert_eq!(report.to_check_result().reason(), "not deliverable");
}

#[test]
fn refused_connection_falls_through_in_preference_order() {
    let resolver = StubResolver::new().with_exchangers(
        "example.test",
        vec![
            MxRecord::new(20, "mx2.example.test"),
            MxRecord::new(10, "mx1.example.test"),
        ],
    );
    let connector = ScriptedConnector::default()
        .host("mx1.example.test", Host::Refused)
        .host("mx2.example.test", accepting());

    let report = probe(&resolver, &connector);
    assert!(matches!(report.status, ProbeStatus::Deliverable { .. }));
    let exchanges: Vec<_> = report.attempts.iter().map(|a| a.exchange.as_str()).collect();
    assert_eq!(exchanges, ["mx1.example.test", "mx2.example.test"]);
    assert!(matches!(
        report.attempts[0].outcome,
        AttemptOutcome::Unreachable {
            stage: AttemptStage::Connect,
            ..
        }
    ));
}

#[test]
fn all_servers_unreachable() {
    let resolver = StubResolver::new().with_exchangers(
        "example.test",
        vec![MxRecord::new(10, "mx1.example.test"), MxRecord::new(20, "mx2.example.test")],
    );
    let connector = ScriptedConnector::default();

    let report = probe(&resolver, &connector);
    assert_eq!(report.status, ProbeStatus::Unreachable);
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(
        report.to_check_result().reason(),
        "could not connect to any mail server"
    );
}

#[test]
fn starttls_only_when_advertised() {
    let advertised = SmtpReply {
        code: 250,
        lines: vec!["mx.example.test".to_string(), "STARTTLS".to_string()],
    };
    let connector = ScriptedConnector::default().host(
        "mx1.example.test",
        Host::Script(vec![
            greeting(),
            ("EHLO", advertised),
            ("STARTTLS", reply(220, "Ready to start TLS")),
            ("EHLO", reply(250, "mx.example.test")),
            ("MAIL FROM:", reply(250, "Ok")),
            ("RCPT TO:", reply(250, "Ok")),
            ("QUIT", reply(221, "Bye")),
        ]),
    );
    let report = probe(&single_mx(), &connector);
    assert!(matches!(report.status, ProbeStatus::Deliverable { .. }));
    let lines = connector.lines();
    assert_eq!(&lines[1..5], ["EHLO localhost", "STARTTLS", "<tls>", "EHLO localhost"]);

    let plain = ScriptedConnector::default().host("mx1.example.test", accepting());
    probe(&single_mx(), &plain);
    assert!(!plain.lines().iter().any(|line| line == "STARTTLS"));
}

#[test]
fn disabled_tls_ignores_advertisement() {
    let advertised = SmtpReply {
        code: 250,
        lines: vec!["mx.example.test".to_string(), "STARTTLS".to_string()],
    };
    let connector = ScriptedConnector::default().host(
        "mx1.example.test",
        Host::Script(vec![
            greeting(),
            ("EHLO", advertised),
            ("MAIL FROM:", reply(250, "Ok")),
            ("RCPT TO:", reply(250, "Ok")),
            ("QUIT", reply(221, "Bye")),
        ]),
    );
    let options = ProbeOptions {
        tls: TlsPolicy::Disabled,
        ..ProbeOptions::default()
    };
    let report = probe_with(&single_mx(), &connector, &options);
    assert!(matches!(report.status, ProbeStatus::Deliverable { .. }));
}

#[test]
fn required_tls_skips_servers_without_it() {
    let connector = ScriptedConnector::default().host(
        "mx1.example.test",
        Host::Script(vec![
            greeting(),
            ("EHLO", reply(250, "mx.example.test")),
            ("QUIT", reply(221, "Bye")),
        ]),
    );
    let options = ProbeOptions {
        tls: TlsPolicy::Required,
        ..ProbeOptions::default()
    };
    let report = probe_with(&single_mx(), &connector, &options);
    assert_eq!(report.status, ProbeStatus::Unreachable);
    assert!(matches!(
        report.attempts[0].outcome,
        AttemptOutcome::ProtocolError {
            stage: AttemptStage::StartTls,
            ..
        }
    ));
    assert_eq!(connector.lines().last().map(String::as_str), Some("QUIT"));
}

#[test]
fn ehlo_rejection_falls_back_to_helo() {
    let connector = ScriptedConnector::default().host(
        "mx1.example.test",
        Host::Script(vec![
            greeting(),
            ("EHLO", reply(502, "Command not implemented")),
            ("HELO", reply(250, "mx.example.test")),
            ("MAIL FROM:", reply(250, "Ok")),
            ("RCPT TO:", reply(250, "Ok")),
            ("QUIT", reply(221, "Bye")),
        ]),
    );
    let options = ProbeOptions {
        helo_domain: Some("probe.example.org".to_string()),
        envelope_sender: Some("bounce@example.org".to_string()),
        ..ProbeOptions::default()
    };
    let report = probe_with(&single_mx(), &connector, &options);
    assert!(matches!(report.status, ProbeStatus::Deliverable { .. }));
    let lines = connector.lines();
    assert!(lines.contains(&"HELO probe.example.org".to_string()));
    assert!(lines.contains(&"MAIL FROM:<bounce@example.org>".to_string()));
}

#[test]
fn sender_rejection_is_not_deliverable() {
    let connector = ScriptedConnector::default().host(
        "mx1.example.test",
        Host::Script(vec![
            greeting(),
            ("EHLO", reply(250, "mx.example.test")),
            ("MAIL FROM:", reply(553, "5.7.1 Sender rejected")),
            ("QUIT", reply(221, "Bye")),
        ]),
    );
    let report = probe(&single_mx(), &connector);
    assert!(matches!(
        report.status,
        ProbeStatus::NotDeliverable {
            stage: AttemptStage::MailFrom,
            ..
        }
    ));
}

#[test]
fn dropped_connection_moves_on_without_quit() {
    let resolver = StubResolver::new().with_exchangers(
        "example.test",
        vec![MxRecord::new(10, "mx1.example.test"), MxRecord::new(20, "mx2.example.test")],
    );
    let connector = ScriptedConnector::default()
        .host(
            "mx1.example.test",
            Host::Script(vec![greeting(), ("EHLO", reply(250, "mx.example.test"))]),
        )
        .host("mx2.example.test", accepting());

    let report = probe(&resolver, &connector);
    assert!(matches!(report.status, ProbeStatus::Deliverable { .. }));
    assert!(matches!(
        report.attempts[0].outcome,
        AttemptOutcome::Unreachable {
            stage: AttemptStage::MailFrom,
            ..
        }
    ));
    let quits = connector.lines().iter().filter(|line| *line == "QUIT").count();
    assert_eq!(quits, 1);
}

#[test]
fn null_mx_target_is_never_dialled() {
    let resolver = StubResolver::new().with_domain("example.test", vec![MxRecord::new(0, "")]);
    let connector = ScriptedConnector::default();
    let report = probe(&resolver, &connector);
    assert_eq!(report.status, ProbeStatus::Unreachable);
    assert!(connector.lines().is_empty());
}

#[test]
fn missing_or_failing_mx_lookup() {
    let connector = ScriptedConnector::default();
    let report = probe(&StubResolver::new(), &connector);
    assert_eq!(report.status, ProbeStatus::NoMailServer);
    assert_eq!(report.to_check_result().reason(), "no MX record");

    let resolver = StubResolver::new().with_mx(
        "example.test",
        Err(DnsError::unavailable("example.test", "SERVFAIL")),
    );
    let report = probe(&resolver, &connector);
    assert!(matches!(report.status, ProbeStatus::ResolverUnavailable { .. }));
    assert_eq!(report.to_check_result().rejection(), Some(Rejection::ResolverUnavailable));
}

fn numbered_exchangers(count: u16) -> StubResolver {
    let records = (1..=count)
        .map(|n| MxRecord::new(n * 10, format!("mx{n}.example.test")))
        .collect();
    StubResolver::new().with_exchangers("example.test", records)
}

#[test]
fn every_exchanger_is_tried_by_default() {
    let connector = ScriptedConnector::default().host("mx6.example.test", accepting());
    let report = probe(&numbered_exchangers(6), &connector);

    assert!(matches!(
        &report.status,
        ProbeStatus::Deliverable { exchange, .. } if exchange == "mx6.example.test"
    ));
    assert_eq!(report.attempts.len(), 6);
    assert!(connector.lines().contains(&"connect mx6.example.test".to_string()));
}

#[test]
fn max_servers_bounds_attempts() {
    let connector = ScriptedConnector::default();
    let options = ProbeOptions {
        max_servers: Some(3),
        ..ProbeOptions::default()
    };
    let report = probe_with(&numbered_exchangers(8), &connector, &options);
    assert_eq!(report.attempts.len(), 3);
    assert_eq!(report.status, ProbeStatus::Unreachable);
}

#[test]
fn exchanger_address_lookup_failures_move_on() {
    let resolver = StubResolver::new()
        .with_domain(
            "example.test",
            vec![
                MxRecord::new(10, "mx1.example.test"),
                MxRecord::new(20, "mx2.example.test"),
                MxRecord::new(30, "mx3.example.test"),
            ],
        )
        .with_a(
            "mx2.example.test",
            Err(DnsError::unavailable("mx2.example.test", "timed out")),
        )
        .with_a("mx3.example.test", Ok(vec![IpAddr::from([198, 51, 100, 7])]));
    let connector = ScriptedConnector::default()
        .host("mx1.example.test", accepting())
        .host("mx2.example.test", accepting())
        .host("mx3.example.test", accepting());

    let report = probe(&resolver, &connector);
    assert!(matches!(report.status, ProbeStatus::Deliverable { .. }));
    for attempt in &report.attempts[..2] {
        assert!(matches!(
            attempt.outcome,
            AttemptOutcome::Unreachable {
                stage: AttemptStage::Connect,
                ..
            }
        ));
    }
    assert_eq!(report.attempts[2].address.as_deref(), Some("198.51.100.7"));
    assert_eq!(resolver.a_calls.get(), 3);
    assert_eq!(connector.lines()[0], "connect mx3.example.test");
}

#[test]
fn cancelled_probe_dials_nothing() {
    let connector = ScriptedConnector::default().host("mx1.example.test", accepting());
    let cancel = CancelFlag::new();
    cancel.cancel();
    let report = probe_mailbox(
        &address(),
        &single_mx(),
        &connector,
        &ProbeOptions::default(),
        &cancel,
    );
    assert_eq!(report.status, ProbeStatus::Cancelled);
    assert!(connector.lines().is_empty());
    assert_eq!(report.to_check_result().reason(), "validation cancelled");
}

#[test]
fn check_reports_through_pipeline_interface() {
    let resolver = single_mx();
    let connector = ScriptedConnector::default().host("mx1.example.test", accepting());
    let check = DeliverabilityCheck::new(
        &resolver,
        &connector,
        ProbeOptions::default(),
        CancelFlag::new(),
    );
    assert_eq!(check.name(), "deliverability");
    assert!(check.evaluate(&address()).is_valid());
}

fn spawn_mock_server(script: Vec<(&'static str, &'static str)>) -> (u16, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let port = listener.local_addr().expect("addr").port();
    let (ready_tx, ready_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        ready_tx.send(()).ok();
        if let Ok((mut stream, _)) = listener.accept() {
            let _ = handle_session(&mut stream, script);
        }
    });
    ready_rx.recv().expect("server ready");
    (port, handle)
}

fn handle_session(
    stream: &mut TcpStream,
    script: Vec<(&'static str, &'static str)>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    stream.write_all(b"220 mock.smtp.test ESMTP\r\n")?;
    stream.flush()?;
    for (expected, response) in script {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        assert!(
            line.starts_with(expected),
            "expected command starting with '{expected}', got '{line}'"
        );
        stream.write_all(response.as_bytes())?;
        stream.flush()?;
    }
    Ok(())
}

fn loopback_probe(port: u16) -> ProbeReport {
    let resolver =
        StubResolver::new().with_domain("example.test", vec![MxRecord::new(10, "127.0.0.1")]);
    let timeout = Duration::from_secs(2);
    let connector = TcpConnector::new(port, timeout, timeout, false).expect("connector");
    probe_mailbox(
        &address(),
        &resolver,
        &connector,
        &ProbeOptions::default(),
        &CancelFlag::new(),
    )
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn delivers_via_rcpt_to_over_tcp() {
    let (port, handle) = spawn_mock_server(vec![
        ("EHLO", "250-mock.example\r\n250 SIZE 10240000\r\n"),
        ("MAIL FROM:<>", "250 2.1.0 Ok\r\n"),
        ("RCPT TO:<user@example.test>", "250 2.1.5 Ok\r\n"),
        ("QUIT", "221 2.0.0 Bye\r\n"),
    ]);
    let report = loopback_probe(port);
    assert!(matches!(report.status, ProbeStatus::Deliverable { .. }));
    assert_eq!(
        report.attempts[0].address.as_deref(),
        Some(format!("127.0.0.1:{port}").as_str())
    );
    handle.join().expect("server thread");
}

#[test]
#[ignore = "requires loopback TCP binding"]
fn rcpt_rejected_over_tcp() {
    let (port, handle) = spawn_mock_server(vec![
        ("EHLO", "250 mock.example\r\n"),
        ("MAIL FROM:", "250 2.1.0 Ok\r\n"),
        ("RCPT TO:", "550 5.1.1 User unknown\r\n"),
        ("QUIT", "221 2.0.0 Bye\r\n"),
    ]);
    let report = loopback_probe(port);
    match report.status {
        ProbeStatus::NotDeliverable { reply, .. } => assert_eq!(reply.code, 550),
        other => panic!("unexpected status: {other:?}"),
    }
    handle.join().expect("server thread");
}
