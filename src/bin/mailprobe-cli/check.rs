use std::sync::Arc;

use anyhow::{Context, Result};
use mailprobe_lib::{CancelFlag, EmailValidator, SystemValidator, check_syntax};

use crate::args::{Format, PipelineArgs};
use crate::output::{CheckRow, human_check};

/// Returns whether the address passed.
pub fn run(email: &str, format: Format, args: &PipelineArgs) -> Result<bool> {
    let syntax = check_syntax(email, args.syntax_mode());
    let row = if syntax.ok {
        let blocklist = Arc::new(args.blocklist()?);
        let validator =
            SystemValidator::new(args.config(), blocklist).context("build SMTP connector")?;
        let verdict = validator.validate(email, &CancelFlag::new());
        CheckRow::from_verdict(email, &verdict)
    } else {
        CheckRow::invalid_syntax(email, &syntax.reasons)
    };

    emit(&row, format)?;
    Ok(row.is_valid)
}

fn emit(row: &CheckRow, format: Format) -> Result<()> {
    match format {
        Format::Human => println!("{}", human_check(row)),
        Format::Json => {
            #[cfg(feature = "with-serde")]
            {
                println!("{}", serde_json::to_string_pretty(row)?);
            }
            #[cfg(not(feature = "with-serde"))]
            {
                anyhow::bail!("--format json requires the 'with-serde' feature");
            }
        }
    }
    Ok(())
}
