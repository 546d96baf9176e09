use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::commands::expect_string;
use crate::error::{CommandError, RuntimeError};
use crate::runtime_value::RuntimeValue;
use crate::step::{StepRef, step_fn};

/// `parseDate [format]`: normalizes a date string to ISO 8601.
///
/// With a chrono format string the input may be a date, a date-time, or a
/// date-time with offset. Without one, RFC 3339 and RFC 2822 are accepted.
pub fn parse_date(argument: Option<String>) -> Result<StepRef, CommandError> {
    Ok(step_fn(move |_ctx, input| {
        let text = expect_string("parseDate", input)?;
        let text = text.trim();
        let parsed = match &argument {
            Some(format) => with_format(text, format),
            None => DateTime::parse_from_rfc3339(text)
                .or_else(|_| DateTime::parse_from_rfc2822(text))
                .map(|dt| dt.to_rfc3339())
                .ok(),
        };
        parsed.map(RuntimeValue::String).ok_or_else(|| {
            RuntimeError::command("parseDate", format!("cannot parse '{}' as a date", text))
        })
    }))
}

fn with_format(text: &str, format: &str) -> Option<String> {
    if let Ok(dt) = DateTime::parse_from_str(text, format) {
        return Some(dt.to_rfc3339());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
        return Some(dt.format("%Y-%m-%dT%H:%M:%S").to_string());
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}
