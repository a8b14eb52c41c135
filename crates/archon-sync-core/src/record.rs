//! Line codec for the multi-value state files.
//!
//! Each line is `key<delim>value`. A backslash escapes the delimiter, a
//! literal backslash, and CR/LF, so any key or value round-trips. Lines
//! with nothing to escape look exactly like the plain format, which keeps
//! the files greppable and lets hand-written lines parse.

/// Field separator for a state file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// `:` — document and task mappings.
    Colon,
    /// `|` — sync metadata, whose values are colon-bearing timestamps.
    Pipe,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Colon => ':',
            Delimiter::Pipe => '|',
        }
    }
}

fn escape_into(out: &mut String, s: &str, delim: char) {
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
}

/// Encode one `key<delim>value` line (without the trailing newline).
pub fn encode(key: &str, value: &str, delim: Delimiter) -> String {
    let d = delim.as_char();
    let mut line = String::with_capacity(key.len() + value.len() + 1);
    escape_into(&mut line, key, d);
    line.push(d);
    escape_into(&mut line, value, d);
    line
}

/// Decode one line into `(key, value)`.
///
/// Returns `None` for a line with no unescaped delimiter, an empty key, or
/// a dangling/unknown escape sequence.
pub fn decode(line: &str, delim: Delimiter) -> Option<(String, String)> {
    let d = delim.as_char();
    let mut key = String::new();
    let mut value = String::new();
    let mut in_value = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        let target = if in_value { &mut value } else { &mut key };
        match c {
            '\\' => match chars.next()? {
                '\\' => target.push('\\'),
                'n' => target.push('\n'),
                'r' => target.push('\r'),
                e if e == d => target.push(e),
                _ => return None,
            },
            c if c == d && !in_value => in_value = true,
            c => target.push(c),
        }
    }
    if !in_value || key.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Parse file content into entries, skipping blank and malformed lines.
/// Later lines for the same key win.
pub fn parse(content: &str, delim: Delimiter) -> Vec<(String, String)> {
    let mut entries: Vec<(String, String)> = Vec::new();
    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = decode(line, delim) else {
            tracing::debug!(line, "skipping malformed state line");
            continue;
        };
        entries.retain(|(k, _)| *k != key);
        entries.push((key, value));
    }
    entries
}

/// Serialize entries back to file content, one line each, newline-terminated.
pub fn render(entries: &[(String, String)], delim: Delimiter) -> String {
    let mut out = String::new();
    for (k, v) in entries {
        out.push_str(&encode(k, v, delim));
        out.push('\n');
    }
    out
}

/// Replace or append `key`, keeping the position of other entries.
pub fn upsert(entries: &mut Vec<(String, String)>, key: &str, value: &str) {
    entries.retain(|(k, _)| k != key);
    entries.push((key.to_string(), value.to_string()));
}
