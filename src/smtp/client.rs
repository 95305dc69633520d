use std::net::IpAddr;

use super::{SmtpError, SmtpReply};

/// Opens SMTP sessions to a mail exchanger.
///
/// The caller resolves `host` beforehand; `addrs` are tried in order and
/// `host` is kept for TLS and logging.
pub trait Connector {
    type Client: SmtpClient;

    fn connect(&self, host: &str, addrs: &[IpAddr]) -> Result<Self::Client, SmtpError>;
}

impl<T: Connector + ?Sized> Connector for &T {
    type Client = T::Client;

    fn connect(&self, host: &str, addrs: &[IpAddr]) -> Result<Self::Client, SmtpError> {
        (**self).connect(host, addrs)
    }
}

/// One SMTP conversation. Implementors provide the three primitives; the
/// verbs are built on top of [`SmtpClient::command`].
pub trait SmtpClient {
    fn read_greeting(&mut self) -> Result<SmtpReply, SmtpError>;

    /// Sends one command line (without CRLF) and reads the full reply.
    fn command(&mut self, line: &str) -> Result<SmtpReply, SmtpError>;

    /// Switches the underlying stream to TLS after a 220 to `STARTTLS`.
    fn upgrade_tls(&mut self) -> Result<(), SmtpError>;

    /// Remote socket address, when there is one.
    fn peer(&self) -> Option<String> {
        None
    }

    fn ehlo(&mut self, name: &str) -> Result<SmtpReply, SmtpError> {
        self.command(&format!("EHLO {name}"))
    }

    fn helo(&mut self, name: &str) -> Result<SmtpReply, SmtpError> {
        self.command(&format!("HELO {name}"))
    }

    /// Issues `STARTTLS` and upgrades the stream when the server agrees.
    /// The reply is returned either way.
    fn starttls(&mut self) -> Result<SmtpReply, SmtpError> {
        let reply = self.command("STARTTLS")?;
        if reply.code == 220 {
            self.upgrade_tls()?;
        }
        Ok(reply)
    }

    /// An empty `sender` produces the null reverse-path `MAIL FROM:<>`.
    fn mail_from(&mut self, sender: &str) -> Result<SmtpReply, SmtpError> {
        self.command(&format!("MAIL FROM:<{sender}>"))
    }

    fn rcpt_to(&mut self, recipient: &str) -> Result<SmtpReply, SmtpError> {
        self.command(&format!("RCPT TO:<{recipient}>"))
    }

    fn quit(&mut self) -> Result<SmtpReply, SmtpError> {
        self.command("QUIT")
    }
}
