use crate::request::TaskState;
use regex::Regex;
use std::sync::OnceLock;

/// One task line from a feature's `tasks.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTask {
    pub id: String,
    pub parallel: bool,
    pub state: TaskState,
    pub story: Option<String>,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static CHECKBOX_RE: OnceLock<Regex> = OnceLock::new();
static TASK_ID_RE: OnceLock<Regex> = OnceLock::new();
static STORY_RE: OnceLock<Regex> = OnceLock::new();
static PARALLEL_RE: OnceLock<Regex> = OnceLock::new();

fn checkbox_re() -> &'static Regex {
    CHECKBOX_RE.get_or_init(|| Regex::new(r"^\s*[-*]\s+\[([ xX])\]\s*(.*)$").unwrap())
}

fn task_id_re() -> &'static Regex {
    TASK_ID_RE.get_or_init(|| Regex::new(r"\[?\b(T\d{3,})\b\]?").unwrap())
}

fn story_re() -> &'static Regex {
    STORY_RE.get_or_init(|| Regex::new(r"\[(US\d+)\]").unwrap())
}

fn parallel_re() -> &'static Regex {
    PARALLEL_RE.get_or_init(|| Regex::new(r"\[P\]").unwrap())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a single line. Returns `None` unless it is a checkbox item carrying
/// a `T###` task id.
pub fn parse_line(line: &str) -> Option<ParsedTask> {
    let caps = checkbox_re().captures(line)?;
    let state = if caps[1].trim().is_empty() {
        TaskState::Pending
    } else {
        TaskState::Done
    };
    let rest = caps.get(2).map_or("", |m| m.as_str());

    let id_match = task_id_re().captures(rest)?;
    let id = id_match[1].to_string();
    let parallel = parallel_re().is_match(rest);
    let story = story_re().captures(rest).map(|c| c[1].to_string());

    let stripped = task_id_re().replace(rest, "");
    let stripped = parallel_re().replace_all(&stripped, "");
    let stripped = story_re().replace_all(&stripped, "");
    let description = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    Some(ParsedTask {
        id,
        parallel,
        state,
        story,
        description,
    })
}

/// Parse every task line in `content`, in file order. Later lines reusing an
/// id are kept; the external agent sees the file as written.
pub fn parse_tasks(content: &str) -> Vec<ParsedTask> {
    content.lines().filter_map(parse_line).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
