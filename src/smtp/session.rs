use std::io::{self, Read, Write};
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::time::Duration;

use native_tls::{HandshakeError, TlsConnector, TlsStream};
use tracing::debug;

use super::client::{Connector, SmtpClient};
use super::reply::{parse_line, parse_reply_lines};
use super::{SmtpError, SmtpReply};

/// Longest reply line accepted before the peer is considered broken.
const MAX_LINE: usize = 4096;
/// Upper bound on lines in one multi-line reply.
const MAX_REPLY_LINES: usize = 128;

/// Plain TCP connector with `STARTTLS` support.
///
/// Holds no per-session state, so one instance can serve every validation.
#[derive(Clone)]
pub struct TcpConnector {
    port: u16,
    connect_timeout: Duration,
    command_timeout: Duration,
    verify_peer: bool,
    tls: TlsConnector,
}

impl TcpConnector {
    /// With `verify_peer` unset the TLS upgrade accepts any certificate and
    /// host name, the usual stance for opportunistic SMTP encryption.
    pub fn new(
        port: u16,
        connect_timeout: Duration,
        command_timeout: Duration,
        verify_peer: bool,
    ) -> Result<Self, SmtpError> {
        let tls = TlsConnector::builder()
            .danger_accept_invalid_certs(!verify_peer)
            .danger_accept_invalid_hostnames(!verify_peer)
            .build()
            .map_err(|source| SmtpError::Tls { source })?;
        Ok(Self {
            port,
            connect_timeout,
            command_timeout,
            verify_peer,
            tls,
        })
    }

    /// Whether the TLS upgrade checks the certificate chain and host name.
    pub fn verifies_peer(&self) -> bool {
        self.verify_peer
    }
}

impl Connector for TcpConnector {
    type Client = TcpSession;

    fn connect(&self, host: &str, addrs: &[IpAddr]) -> Result<TcpSession, SmtpError> {
        let mut last_err = None;
        for ip in addrs {
            let addr = SocketAddr::new(*ip, self.port);
            debug!(%host, %addr, "connecting");
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(self.command_timeout))
                        .map_err(SmtpError::io)?;
                    stream
                        .set_write_timeout(Some(self.command_timeout))
                        .map_err(SmtpError::io)?;
                    return Ok(TcpSession {
                        host: host.to_string(),
                        peer: addr,
                        state: StreamState::Plain(stream),
                        buffer: Vec::new(),
                        tls: self.tls.clone(),
                    });
                }
                Err(source) => {
                    last_err = Some(SmtpError::Connect {
                        host: host.to_string(),
                        source,
                    })
                }
            }
        }
        Err(last_err.unwrap_or_else(|| SmtpError::NoAddress {
            host: host.to_string(),
        }))
    }
}

enum StreamState {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Closed,
}

/// A live SMTP conversation over TCP. Dropping it closes the socket.
pub struct TcpSession {
    host: String,
    peer: SocketAddr,
    state: StreamState,
    buffer: Vec<u8>,
    tls: TlsConnector,
}

impl TcpSession {
    fn write_line(&mut self, line: &str) -> Result<(), SmtpError> {
        let mut data = line.as_bytes().to_vec();
        data.extend_from_slice(b"\r\n");
        let result = match &mut self.state {
            StreamState::Plain(stream) => stream.write_all(&data).and_then(|_| stream.flush()),
            StreamState::Tls(stream) => stream.write_all(&data).and_then(|_| stream.flush()),
            StreamState::Closed => return Err(SmtpError::protocol("session closed")),
        };
        result.map_err(SmtpError::io)
    }

    fn read_reply(&mut self) -> Result<SmtpReply, SmtpError> {
        let mut raw = Vec::new();
        loop {
            let line = self.read_line()?;
            let parsed = parse_line(&line).map_err(SmtpError::protocol)?;
            raw.push(line);
            if !parsed.continuation {
                break;
            }
            if raw.len() >= MAX_REPLY_LINES {
                return Err(SmtpError::protocol("reply has too many lines"));
            }
        }
        let reply = parse_reply_lines(&raw).map_err(SmtpError::protocol)?;
        for line in &raw {
            debug!(host = %self.host, "S: {line}");
        }
        Ok(reply)
    }

    fn read_line(&mut self) -> Result<String, SmtpError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line = self.buffer.drain(..=pos).collect::<Vec<_>>();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return String::from_utf8(line)
                    .map_err(|err| SmtpError::protocol(format!("utf8 error: {err}")));
            }
            if self.buffer.len() > MAX_LINE {
                return Err(SmtpError::protocol("reply line too long"));
            }

            let mut buf = [0u8; 512];
            let read = match &mut self.state {
                StreamState::Plain(stream) => stream.read(&mut buf),
                StreamState::Tls(stream) => stream.read(&mut buf),
                StreamState::Closed => return Err(SmtpError::protocol("session closed")),
            };
            let read = read.map_err(SmtpError::io)?;
            if read == 0 {
                return Err(SmtpError::io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed",
                )));
            }
            self.buffer.extend_from_slice(&buf[..read]);
        }
    }
}

impl SmtpClient for TcpSession {
    fn read_greeting(&mut self) -> Result<SmtpReply, SmtpError> {
        self.read_reply()
    }

    fn command(&mut self, line: &str) -> Result<SmtpReply, SmtpError> {
        debug!(host = %self.host, "C: {line}");
        self.write_line(line)?;
        self.read_reply()
    }

    fn upgrade_tls(&mut self) -> Result<(), SmtpError> {
        let plain = match std::mem::replace(&mut self.state, StreamState::Closed) {
            StreamState::Plain(stream) => stream,
            StreamState::Tls(stream) => {
                self.state = StreamState::Tls(stream);
                return Ok(());
            }
            StreamState::Closed => return Err(SmtpError::protocol("session closed")),
        };
        // Bytes pipelined before the handshake would be a STARTTLS injection.
        if !self.buffer.is_empty() {
            return Err(SmtpError::protocol("unexpected data before TLS handshake"));
        }

        let tls = match self.tls.connect(&self.host, plain) {
            Ok(tls) => tls,
            Err(HandshakeError::Failure(err)) => {
                return Err(SmtpError::Handshake {
                    host: self.host.clone(),
                    message: err.to_string(),
                });
            }
            Err(HandshakeError::WouldBlock(_)) => {
                return Err(SmtpError::Handshake {
                    host: self.host.clone(),
                    message: "handshake timed out".to_string(),
                });
            }
        };
        debug!(host = %self.host, "TLS established");
        self.state = StreamState::Tls(Box::new(tls));
        Ok(())
    }

    fn peer(&self) -> Option<String> {
        Some(self.peer.to_string())
    }
}
