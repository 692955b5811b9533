//! Fenced code block scanning and path inference.

use std::sync::LazyLock;

use regex::Regex;

static HEADER_FILE_ASSIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bfile\s*=\s*"?([^"\s]+)"?"#).expect("header file= pattern should compile")
});

static HEADER_FILE_COLON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfile:\s*(\S+)").expect("header file: pattern should compile")
});

static BODY_FILE_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?://|#)\s*file:\s*(.+)$").expect("body file hint pattern should compile")
});

/// Number of leading body lines searched for a `// file:` hint.
const HINT_LINES: usize = 3;

/// A fenced code block found in model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Lowercased language tag, if the fence carried one.
    pub language: Option<String>,
    /// The fence header after the language tag, trimmed.
    pub header: String,
    /// Everything between the fences, line endings as written.
    pub body: String,
    /// The inferred target path, relative or absolute as written.
    pub path: String,
}

/// Maps a language tag to a file extension.
pub fn extension_for(language: Option<&str>) -> String {
    let Some(language) = language.filter(|l| !l.is_empty()) else {
        return "txt".to_string();
    };
    // Every other known tag (js, ts, py, sql, ...) is already its extension.
    match language {
        "python" => "py",
        "bash" => "sh",
        other => other,
    }
    .to_string()
}

fn header_path(header: &str) -> Option<String> {
    [&*HEADER_FILE_ASSIGN, &*HEADER_FILE_COLON]
        .into_iter()
        .find_map(|re| re.captures(header))
        .map(|caps| caps[1].trim().to_string())
        .filter(|path| !path.is_empty())
}

fn body_path(body: &str) -> Option<String> {
    body.lines()
        .take(HINT_LINES)
        .find_map(|line| BODY_FILE_HINT.captures(line))
        .map(|caps| caps[1].trim().to_string())
        .filter(|path| !path.is_empty())
}

/// Fences may be indented by at most this many spaces.
const MAX_FENCE_INDENT: usize = 3;

struct Opener {
    indent: usize,
    ticks: usize,
    info: String,
    language: Option<String>,
    header: String,
}

fn backtick_run(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b'`').count()
}

fn leading_spaces(line: &str, limit: usize) -> usize {
    line.bytes().take(limit).take_while(|b| *b == b' ').count()
}

/// Splits off a fence indent, rejecting lines indented past the limit.
fn fence_indent(line: &str) -> Option<(usize, &str)> {
    let indent = leading_spaces(line, MAX_FENCE_INDENT + 1);
    (indent <= MAX_FENCE_INDENT).then(|| (indent, &line[indent..]))
}

fn parse_opener(line: &str) -> Option<Opener> {
    let (indent, line) = fence_indent(line)?;
    let ticks = backtick_run(line);
    if ticks < 3 {
        return None;
    }
    let info = &line[ticks..];
    if info.contains('`') {
        return None;
    }
    let tag_len = info
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(info.len());
    let language = Some(info[..tag_len].to_ascii_lowercase()).filter(|l| !l.is_empty());
    Some(Opener {
        indent,
        ticks,
        info: info.trim().to_string(),
        language,
        header: info[tag_len..].trim().to_string(),
    })
}

fn is_closer(line: &str, ticks: usize) -> bool {
    let Some((_, line)) = fence_indent(line) else {
        return false;
    };
    let run = backtick_run(line);
    run >= ticks && line[run..].trim().is_empty()
}

/// Extracts every terminated fenced code block from `text`, in order.
///
/// Blocks without an explicit path are named `snippet-N.<ext>`, where `N` is
/// the block's 1-based position among all blocks. Fences indented inside a
/// list item are recognized, and the opener's indentation is removed from
/// each body line. Bodies otherwise keep their bytes, `\r\n` included.
pub fn extract_blocks(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<(Opener, String)> = None;
    for raw in text.split_inclusive('\n') {
        let line = raw.trim_end_matches(['\n', '\r']);
        match open.take() {
            None => {
                open = parse_opener(line).map(|opener| (opener, String::new()));
            }
            Some((opener, body)) if is_closer(line, opener.ticks) => {
                let index = blocks.len() + 1;
                // The whole info string is searched so `file: x` works without a tag.
                let path = header_path(&opener.info)
                    .or_else(|| body_path(&body))
                    .unwrap_or_else(|| {
                        format!(
                            "snippet-{index}.{}",
                            extension_for(opener.language.as_deref())
                        )
                    });
                blocks.push(CodeBlock {
                    language: opener.language,
                    header: opener.header,
                    body,
                    path,
                });
            }
            Some((opener, mut body)) => {
                body.push_str(&raw[leading_spaces(raw, opener.indent)..]);
                open = Some((opener, body));
            }
        }
    }
    if let Some((opener, _)) = open {
        tracing::debug!(language = ?opener.language, "discarding unterminated code block");
    }
    blocks
}
