//! Reply extraction from agent stdout.
//!
//! The agent prints whatever it likes (progress, tool traces, warnings) and
//! marks its answer with a line starting with the reply marker, e.g.
//! `Assistant: ...`. Everything here is pure string processing.
//!
//! Marker matching is ASCII case-insensitive.

use crate::config::Config;
use crate::error::Result;
use regex::Regex;

/// What the extractor made of the agent's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A usable reply.
    Reply(String),
    /// No marker anywhere in the output.
    NotFound,
    /// A marker was found but what follows is empty or startup boilerplate.
    Degenerate(String),
}

/// Locates and classifies the reply in captured stdout.
#[derive(Debug, Clone)]
pub struct ReplyExtractor {
    marker: String,
    degenerate: Vec<Regex>,
}

impl ReplyExtractor {
    pub fn new(marker: impl Into<String>, degenerate: Vec<Regex>) -> Self {
        Self {
            marker: marker.into().trim().to_string(),
            degenerate,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.agent.reply_marker.clone(),
            config.degenerate_regexes()?,
        ))
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn extract(&self, stdout: &str) -> Extraction {
        match find_reply(stdout, &self.marker) {
            None => Extraction::NotFound,
            Some(reply) if self.is_degenerate(&reply) => Extraction::Degenerate(reply),
            Some(reply) => Extraction::Reply(reply),
        }
    }

    fn is_degenerate(&self, reply: &str) -> bool {
        reply.is_empty() || self.degenerate.iter().any(|re| re.is_match(reply))
    }
}

/// Find the reply block in `stdout`.
///
/// The last line whose trimmed content starts with `marker` opens the block;
/// the block runs to the end of the output with only the marker stripped.
/// Without such a line, everything after the last occurrence of `marker`
/// anywhere in the text is used. Returns `None` when the marker never appears.
/// The returned text is trimmed and may be empty.
pub fn find_reply(stdout: &str, marker: &str) -> Option<String> {
    let marker = marker.trim();
    if marker.is_empty() {
        return None;
    }

    let from_line = reply_from_marker_line(stdout, marker);
    if let Some(reply) = &from_line
        && !reply.is_empty()
    {
        return from_line;
    }

    reply_after_last_occurrence(stdout, marker).or(from_line)
}

fn reply_from_marker_line(stdout: &str, marker: &str) -> Option<String> {
    let lines: Vec<&str> = stdout.lines().collect();

    let (index, first) = lines
        .iter()
        .enumerate()
        .rev()
        .find_map(|(i, line)| strip_marker(line.trim(), marker).map(|rest| (i, rest)))?;

    let mut block = vec![first.trim_start()];
    block.extend_from_slice(&lines[index + 1..]);
    Some(block.join("\n").trim().to_string())
}

fn reply_after_last_occurrence(stdout: &str, marker: &str) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with the original text.
    let haystack = stdout.to_ascii_lowercase();
    let needle = marker.to_ascii_lowercase();
    let start = haystack.rfind(&needle)? + needle.len();
    Some(stdout[start..].trim().to_string())
}

fn strip_marker<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let prefix = line.get(..marker.len())?;
    if prefix.eq_ignore_ascii_case(marker) {
        Some(&line[marker.len()..])
    } else {
        None
    }
}
