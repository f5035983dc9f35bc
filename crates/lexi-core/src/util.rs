//! Small helpers shared by the config loader, the HTTP store and the sync engine.

use crate::error::{Error, Result};

/// Longest server error body echoed back in a sync error.
const MAX_EXCERPT_CHARS: usize = 180;

/// Trimmed value, or `None` when missing or blank.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Validate a remote store base URL.
///
/// The URL must use http or https. Surrounding whitespace and trailing
/// slashes are dropped so endpoint paths can be appended directly.
pub fn remote_base_url(raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/');
    if url.is_empty() {
        return Err(Error::Config("remote URL must not be empty".to_string()));
    }
    let has_scheme = ["http://", "https://"]
        .iter()
        .any(|scheme| url.len() > scheme.len() && url.starts_with(scheme));
    if !has_scheme {
        return Err(Error::Config(format!(
            "remote URL must include http:// or https:// (got '{url}')"
        )));
    }
    Ok(url.to_string())
}

/// First line of a server error body, whitespace collapsed and length capped.
pub fn error_excerpt(body: &str) -> String {
    let first_line = body.lines().map(str::trim).find(|line| !line.is_empty()).unwrap_or("");
    first_line
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_EXCERPT_CHARS)
        .collect()
}

/// Milliseconds since the Unix epoch; every entry and bookkeeping timestamp uses it.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
