//! Command results.

use std::fmt;
use std::time::Duration;

/// Output of one command, with the echo and trailing prompt removed.
///
/// A command whose output contains one of the platform's failure triggers
/// still produces a `Response`; check [`Response::is_success`]. Only
/// navigation failures are errors.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command as sent.
    pub command: String,

    /// Normalized output.
    pub result: String,

    /// Everything read after the command was sent, prompt included.
    pub raw_result: String,

    /// The prompt that ended the output, trimmed.
    pub prompt: String,

    /// Privilege level the final prompt belongs to.
    pub level: Option<String>,

    /// Time from send to prompt.
    pub elapsed: Duration,

    /// First failure trigger found in `result`.
    pub failure_message: Option<String>,
}

impl Response {
    /// Build a response from captured output, checking `failures` in order.
    pub(crate) fn from_capture(
        command: &str,
        raw_result: String,
        prompt: String,
        level: Option<String>,
        elapsed: Duration,
        failures: &[String],
    ) -> Self {
        let result = normalize_output(&raw_result, command);
        let failure_message = failures
            .iter()
            .find(|trigger| !trigger.is_empty() && result.contains(trigger.as_str()))
            .cloned();

        Self {
            command: command.to_string(),
            result,
            raw_result,
            prompt,
            level,
            elapsed,
            failure_message,
        }
    }

    /// True unless a failure trigger was seen.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    /// Output lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.result)
    }
}

/// Strip the command echo and the trailing prompt from raw output.
pub(crate) fn normalize_output(raw: &str, command: &str) -> String {
    let output = raw.trim_start_matches(['\r', '\n']);
    let output = output
        .strip_prefix(command)
        .unwrap_or(output)
        .trim_start_matches(['\r', '\n']);

    match output.rfind('\n') {
        Some(pos) => output[..pos].trim_end_matches('\r').to_string(),
        None => String::new(),
    }
}
