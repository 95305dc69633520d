use mailprobe_lib::{ProbeReport, ServerAttempt, SmtpEvent, Verdict};

/// One line of `check` output.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize))]
#[derive(Debug, Clone)]
pub struct CheckRow {
    pub email: String,
    pub is_valid: bool,
    pub message: String,
    #[cfg_attr(feature = "with-serde", serde(skip_serializing_if = "Option::is_none"))]
    pub stage: Option<String>,
}

impl CheckRow {
    pub fn from_verdict(email: &str, verdict: &Verdict) -> Self {
        Self {
            email: email.to_string(),
            is_valid: verdict.is_valid,
            message: verdict.message.clone(),
            stage: verdict.stage.map(str::to_string),
        }
    }

    pub fn invalid_syntax(email: &str, reasons: &[String]) -> Self {
        Self {
            email: email.to_string(),
            is_valid: false,
            message: format!("invalid email address: {}", reasons.join(", ")),
            stage: Some("syntax".to_string()),
        }
    }
}

pub fn human_check(row: &CheckRow) -> String {
    if row.is_valid {
        format!("[OK]    {}", row.email)
    } else {
        match &row.stage {
            Some(stage) => format!("[INVALID] {} :: {} ({stage})", row.email, row.message),
            None => format!("[INVALID] {} :: {}", row.email, row.message),
        }
    }
}

pub fn human_probe(report: &ProbeReport) -> String {
    let mut out = format!("{} :: {}", report.mailbox, report.status);
    for attempt in &report.attempts {
        out.push('\n');
        out.push_str(&human_attempt(attempt));
    }
    out
}

fn human_attempt(attempt: &ServerAttempt) -> String {
    let mut out = format!("  {} (pref {}", attempt.exchange, attempt.preference);
    if let Some(address) = &attempt.address {
        out.push_str(", ");
        out.push_str(address);
    }
    out.push_str(&format!("): {}", attempt.outcome));
    for event in &attempt.events {
        let line = match event {
            SmtpEvent::Reply { stage, reply } => {
                format!("{stage:<10} {} {}", reply.code, reply.message())
            }
            SmtpEvent::Error { stage, message } => format!("{stage:<10} error: {message}"),
        };
        out.push_str("\n    ");
        out.push_str(&line);
    }
    out
}
