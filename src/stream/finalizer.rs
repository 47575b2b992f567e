use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::error::DecodeError;

const FENCE: &str = "```";

/// Escape characters that may legally follow a backslash in JSON.
const JSON_ESCAPES: &[char] = &['"', '\\', '/', 'b', 'f', 'n', 'r', 't', 'u'];

/// How the final reply content was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    /// Decoded as-is after fence stripping.
    Parsed,
    /// Decoded after repairing stray backslashes and control characters.
    Repaired,
    /// Undecodable; kept the content already previewed during streaming.
    Partial,
    /// Undecodable and nothing previewed; the raw text is shown.
    Raw,
    /// No text arrived at all.
    Empty,
}

/// The settled content of an assistant turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalReply {
    pub message: String,
    pub suggestions: Vec<String>,
    pub source: ReplySource,
}

impl FinalReply {
    pub fn is_empty(&self) -> bool {
        self.source == ReplySource::Empty
    }
}

#[derive(Debug, Deserialize)]
struct ReplyPayload {
    message: String,
    #[serde(default)]
    suggestions: Option<Vec<String>>,
}

/// Settle a completed (or interrupted) reply buffer.
///
/// Never fails: tries a direct decode, then an escape-repaired decode, then
/// falls back to the streamed preview, then to the raw text.
pub fn finalize_reply(buffer: &str, preview: Option<&str>) -> FinalReply {
    let preview = preview.filter(|p| !p.is_empty());

    match serde_json::from_str::<ReplyPayload>(strip_code_fences(buffer)) {
        Ok(payload) => {
            debug!(chars = buffer.len(), "Reply decoded");
            return settle(payload, preview, ReplySource::Parsed);
        }
        Err(e) => warn!(error = %e, "Reply JSON parse failed, attempting escape repair"),
    }

    let repaired = repair_json_escapes(strip_code_fences(buffer));
    match serde_json::from_str::<ReplyPayload>(&repaired) {
        Ok(payload) => {
            debug!(chars = buffer.len(), "Reply decoded after escape repair");
            return settle(payload, preview, ReplySource::Repaired);
        }
        Err(e) => error!(
            error = %e,
            buffer = %buffer,
            "Reply JSON unrecoverable, falling back to streamed text"
        ),
    }

    if let Some(preview) = preview {
        return FinalReply {
            message: preview.to_string(),
            suggestions: Vec::new(),
            source: ReplySource::Partial,
        };
    }

    if buffer.trim().is_empty() {
        return FinalReply {
            message: String::new(),
            suggestions: Vec::new(),
            source: ReplySource::Empty,
        };
    }

    FinalReply {
        message: buffer.to_string(),
        suggestions: Vec::new(),
        source: ReplySource::Raw,
    }
}

fn settle(payload: ReplyPayload, preview: Option<&str>, source: ReplySource) -> FinalReply {
    // Content shown during streaming never regresses to empty.
    let message = match preview {
        Some(preview) if payload.message.is_empty() => preview.to_string(),
        _ => payload.message,
    };
    FinalReply {
        message,
        suggestions: payload.suggestions.unwrap_or_default(),
        source,
    }
}

/// Remove a surrounding Markdown code fence (with or without a language tag).
///
/// Text that already starts like a JSON document is only trimmed, so fences
/// inside string values survive.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed
            .strip_suffix(FENCE)
            .map(str::trim_end)
            .unwrap_or(trimmed);
    }

    let Some(open) = trimmed.find(FENCE) else {
        return trimmed;
    };
    let after_open = &trimmed[open + FENCE.len()..];
    let tag_len = after_open
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(after_open.len());
    let body = &after_open[tag_len..];
    let body = match body.rfind(FENCE) {
        Some(close) => &body[..close],
        None => body,
    };
    body.trim()
}

/// Make near-valid JSON decodable: inside string literals, double every
/// backslash that does not start a JSON escape and escape raw control
/// characters.
pub fn repair_json_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        rest = &rest[c.len_utf8()..];

        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        match c {
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\\' => match rest.chars().next() {
                Some(next) if is_valid_escape(next, &rest[next.len_utf8()..]) => {
                    out.push('\\');
                    out.push(next);
                    rest = &rest[next.len_utf8()..];
                }
                _ => out.push_str("\\\\"),
            },
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if u32::from(c) < 0x20 => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }

    out
}

fn is_valid_escape(next: char, after: &str) -> bool {
    if next == 'u' {
        return after.chars().take(4).filter(char::is_ascii_hexdigit).count() == 4;
    }
    JSON_ESCAPES.contains(&next)
}

/// Decode a one-shot model reply after fence stripping. No recovery.
pub fn decode_json<T: DeserializeOwned>(text: &str, context: &'static str) -> Result<T, DecodeError> {
    serde_json::from_str(strip_code_fences(text)).map_err(|source| {
        error!(context = context, response = %text, "JSON parse error");
        DecodeError::Json { context, source }
    })
}

#[cfg(test)]
#[path = "finalizer_tests.rs"]
mod finalizer_tests;
