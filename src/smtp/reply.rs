/// A complete (possibly multi-line) SMTP reply.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            lines: vec![text.into()],
        }
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// EHLO keyword lookup (`STARTTLS`, `SIZE 35882577`, ...).
    pub fn has_capability(&self, cap: &str) -> bool {
        self.lines.iter().any(|line| {
            line.split_whitespace()
                .next()
                .is_some_and(|token| token.eq_ignore_ascii_case(cap))
        })
    }

    pub fn message(&self) -> String {
        self.lines.join(" ")
    }
}

/// Parses the reply lines already stripped of CRLF. Every line must carry the
/// same three-digit code; all but the last use `-` as separator.
pub(crate) fn parse_reply_lines(raw: &[String]) -> Result<SmtpReply, String> {
    let mut code: Option<u16> = None;
    let mut lines = Vec::with_capacity(raw.len());
    for (idx, line) in raw.iter().enumerate() {
        let parsed = parse_line(line)?;
        if let Some(existing) = code {
            if existing != parsed.code {
                return Err(format!(
                    "inconsistent reply codes: {existing} vs {}",
                    parsed.code
                ));
            }
        } else {
            code = Some(parsed.code);
        }
        let is_last = idx + 1 == raw.len();
        if parsed.continuation == is_last {
            return Err(format!("misplaced continuation marker in line: {line}"));
        }
        lines.push(parsed.text);
    }
    let code = code.ok_or_else(|| "empty reply".to_string())?;
    Ok(SmtpReply { code, lines })
}

pub(crate) struct ReplyLine {
    pub code: u16,
    pub continuation: bool,
    pub text: String,
}

pub(crate) fn parse_line(line: &str) -> Result<ReplyLine, String> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(format!("invalid reply: {line}"));
    }
    let code = line[..3]
        .parse::<u16>()
        .map_err(|_| format!("invalid code in line: {line}"))?;
    if !(200..600).contains(&code) {
        return Err(format!("reply code out of range: {code}"));
    }
    let continuation = match bytes.get(3) {
        None | Some(b' ') => false,
        Some(b'-') => true,
        Some(_) => return Err(format!("invalid separator in line: {line}")),
    };
    let text = line.get(4..).unwrap_or_default().to_string();
    Ok(ReplyLine {
        code,
        continuation,
        text,
    })
}
