//! Parsing of agent CLI output.
//!
//! Changed files are reported one per line as `CHANGED: <path>`. The
//! summary is the last non-empty output line. Some CLIs wrap their output
//! in a JSON envelope `{"result": "...", "is_error": bool}`, either as the
//! whole stdout or as the final line; `parse_structured_output` unwraps
//! both shapes and falls back to the raw text otherwise.

use serde_json::Value;

/// Lines of the form `CHANGED: path` from agent output, trimmed.
pub fn extract_changed_files(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("CHANGED:"))
        .map(|path| path.trim().to_string())
        .filter(|path| !path.is_empty())
        .collect()
}

/// The last non-empty line of agent output.
pub fn extract_summary(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
}

/// Agent output after unwrapping an optional JSON envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredOutput {
    pub text: String,
    pub is_error: bool,
}

/// Unwrap a `{"result": ..., "is_error": ...}` envelope from stdout.
///
/// Tries the whole trimmed stdout first and then the last non-empty line;
/// anything that does not parse as such an envelope is returned verbatim
/// with `is_error: false`.
pub fn parse_structured_output(stdout: &str) -> StructuredOutput {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return StructuredOutput {
            text: String::new(),
            is_error: false,
        };
    }

    let last_line = extract_summary(trimmed);
    let mut candidates = vec![trimmed.to_string()];
    if let Some(line) = last_line {
        if line != trimmed {
            candidates.push(line);
        }
    }

    for candidate in candidates {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&candidate) {
            let text = match map.get("result") {
                Some(Value::String(result)) => result.clone(),
                _ => trimmed.to_string(),
            };
            let is_error = map.get("is_error") == Some(&Value::Bool(true));
            return StructuredOutput { text, is_error };
        }
    }

    StructuredOutput {
        text: trimmed.to_string(),
        is_error: false,
    }
}
