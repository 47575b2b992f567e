use regex::Regex;
use std::sync::OnceLock;

/// Opening of the `message` field plus the string body seen so far.
///
/// The body stops at the first unescaped quote or at the end of the buffer,
/// and never ends in half an escape sequence.
fn message_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?s)"message"\s*:\s*"((?:[^"\\]|\\.)*)"#).expect("valid message pattern")
    })
}

/// Incremental preview of the `message` field of a reply that is still
/// arriving.
///
/// This is a display heuristic, not a JSON decoder: only `\\`, `\"` and `\n`
/// are unescaped, and any other field is ignored. The authoritative decode
/// happens once the stream ends (see [`finalize_reply`](super::finalize_reply)).
#[derive(Debug, Default, Clone)]
pub struct StreamingJsonExtractor {
    buffer: String,
    preview: Option<String>,
}

impl StreamingJsonExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the best current preview, if any.
    pub fn push(&mut self, chunk: &str) -> Option<&str> {
        self.buffer.push_str(chunk);
        if let Some(preview) = extract_message_preview(&self.buffer) {
            self.preview = Some(preview);
        }
        self.preview.as_deref()
    }

    /// Everything received so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Latest preview; `None` until the field's opening quote has arrived.
    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn into_parts(self) -> (String, Option<String>) {
        (self.buffer, self.preview)
    }
}

/// Best-effort value of the `message` field in a possibly incomplete document.
pub fn extract_message_preview(buffer: &str) -> Option<String> {
    let captures = message_pattern().captures(buffer)?;
    Some(unescape_preview(captures.get(1)?.as_str()))
}

/// Single left-to-right pass, so `\\n` stays a backslash followed by `n`.
fn unescape_preview(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => {}
        }
    }

    out
}
