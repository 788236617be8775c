//! Lenient parsing of list-shaped LLM output.
//!
//! Models are asked to answer with a list of quoted strings but routinely
//! wrap it in a reasoning block, a fenced code block, or surrounding prose.
//! [`parse_list`] applies a fixed sequence of recovery rules and accepts
//! nothing beyond a flat list (or set) of string literals.
//!
//! Rules, in order:
//!
//! 1. Drop a leading `<think>...</think>` block when both markers exist.
//! 2. Unwrap a fenced code block (any language tag, e.g. `python`, `json`).
//! 3. Parse the remainder as a list literal.
//! 4. Otherwise locate bracket/brace-delimited substrings; parse the
//!    candidate only when there is exactly one.

use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Opening marker of a reasoning block.
const THINK_OPEN: &str = "<think>";
/// Closing marker of a reasoning block.
const THINK_CLOSE: &str = "</think>";

/// Maximum number of characters of offending text quoted in the message.
const PREVIEW_LEN: usize = 200;

static FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A\s*```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)\s*```\s*\z")
        .unwrap_or_else(|_| unreachable!("fence pattern is a valid regex"))
});

/// LLM output could not be read as a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (response preview: {preview:?})")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// The full offending text.
    pub content: String,
    preview: String,
}

impl ParseError {
    /// Creates a parse error for the given text.
    pub fn new(message: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let preview = content.chars().take(PREVIEW_LEN).collect();
        Self {
            message: message.into(),
            content,
            preview,
        }
    }
}

/// Parses an LLM response into an ordered list of strings.
///
/// # Errors
///
/// Returns [`ParseError`] when no list can be read, or when the fallback
/// scan finds more than one candidate literal.
pub fn parse_list(raw: &str) -> Result<Vec<String>, ParseError> {
    let body = strip_fence(strip_reasoning(raw).trim());

    let direct_err = match parse_literal(body) {
        Ok(items) => return Ok(items),
        Err(e) => e,
    };

    let candidates = delimited_candidates(body);
    match candidates.as_slice() {
        [] => Err(ParseError::new(
            format!("no list literal found ({direct_err})"),
            raw,
        )),
        [single] => parse_literal(single).map_err(|e| {
            ParseError::new(format!("embedded list literal is malformed: {e}"), raw)
        }),
        many => Err(ParseError::new(
            format!("ambiguous response: {} candidate list literals", many.len()),
            raw,
        )),
    }
}

/// Removes a leading reasoning block, if both of its markers are present.
#[must_use]
pub fn strip_reasoning(raw: &str) -> &str {
    match (raw.find(THINK_OPEN), raw.find(THINK_CLOSE)) {
        (Some(_), Some(end)) => &raw[end + THINK_CLOSE.len()..],
        _ => raw,
    }
}

/// Unwraps a fenced code block, returning the text unchanged otherwise.
fn strip_fence(text: &str) -> &str {
    FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str().trim())
}

/// Finds every balanced `[...]` or `{...}` substring at nesting depth zero.
///
/// An opener that never closes, or closes with the wrong bracket, is
/// skipped and the scan resumes right after it. Closers outside a
/// candidate are ignored. Quotes are only tracked inside a candidate, so
/// apostrophes in the surrounding prose do not confuse the scan.
fn delimited_candidates(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(offset) = text[pos..].find(['[', '{']) {
        let start = pos + offset;
        match balanced_len(&text[start..]) {
            Some(len) => {
                found.push(&text[start..start + len]);
                pos = start + len;
            }
            None => pos = start + 1,
        }
    }

    found
}

/// Byte length of the balanced literal `text` starts with, if any.
fn balanced_len(text: &str) -> Option<usize> {
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ']' | '}' => {
                if stack.pop() != Some(c) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i + c.len_utf8());
                }
            }
            '"' | '\'' => quote = Some(c),
            _ => {}
        }
    }

    None
}

/// Parses exactly one list/set literal of string items.
fn parse_literal(text: &str) -> Result<Vec<String>, String> {
    let mut chars = text.char_indices().peekable();
    skip_ws(&mut chars);

    let close = match chars.next() {
        Some((_, '[')) => ']',
        Some((_, '{')) => '}',
        Some((_, '(')) => ')',
        Some((i, c)) => return Err(format!("expected '[' at offset {i}, found {c:?}")),
        None => return Err("empty response".to_string()),
    };

    let mut items = Vec::new();
    loop {
        skip_ws(&mut chars);
        match chars.peek().copied() {
            Some((_, c)) if c == close => {
                chars.next();
                break;
            }
            Some((_, '"' | '\'')) => items.push(parse_string(&mut chars)?),
            Some((i, c)) => return Err(format!("expected string at offset {i}, found {c:?}")),
            None => return Err("unterminated list".to_string()),
        }

        skip_ws(&mut chars);
        match chars.next() {
            Some((_, ',')) => {}
            Some((_, c)) if c == close => break,
            Some((i, c)) => return Err(format!("expected ',' at offset {i}, found {c:?}")),
            None => return Err("unterminated list".to_string()),
        }
    }

    skip_ws(&mut chars);
    if let Some((i, _)) = chars.next() {
        return Err(format!("trailing text at offset {i}"));
    }
    Ok(items)
}

/// Parses a single- or double-quoted string literal.
fn parse_string(chars: &mut Peekable<CharIndices<'_>>) -> Result<String, String> {
    let (start, quote) = chars
        .next()
        .ok_or_else(|| "expected string".to_string())?;
    let mut out = String::new();

    while let Some((_, c)) = chars.next() {
        match c {
            c if c == quote => return Ok(out),
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, 'u')) => out.push(parse_unicode_escape(chars)?),
                Some((_, e @ ('\\' | '\'' | '"' | '/'))) => out.push(e),
                Some((_, other)) => {
                    out.push('\\');
                    out.push(other);
                }
                None => break,
            },
            other => out.push(other),
        }
    }

    Err(format!("unterminated string starting at offset {start}"))
}

fn parse_unicode_escape(chars: &mut Peekable<CharIndices<'_>>) -> Result<char, String> {
    let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid unicode escape \\u{hex}"))
}

fn skip_ws(chars: &mut Peekable<CharIndices<'_>>) {
    while chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
        chars.next();
    }
}
