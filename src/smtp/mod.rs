//! Minimal SMTP client: just enough of RFC 5321 and RFC 3207 to ask a mail
//! exchanger whether it would accept a recipient.

mod client;
mod error;
mod reply;
mod session;

pub use client::{Connector, SmtpClient};
pub use error::SmtpError;
pub use reply::SmtpReply;
pub use session::{TcpConnector, TcpSession};
