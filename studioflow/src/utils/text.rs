//! Script and model-output text helpers.

use regex::Regex;
use std::sync::OnceLock;

fn numbered_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "1. foo", "2) foo", "- foo", "* foo", "Scene 3: foo", "Prompt 4 - foo"
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:(?:scene|prompt|image)\s*\d+\s*[:.)\-]|\d+\s*[.):\-]|[-*•])\s*(.+?)\s*$")
            .unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

fn scene_heading() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*(?:\[?\s*scene\s*\d+\s*\]?|#{1,3}\s+.+)\s*:?\s*$")
            .unwrap_or_else(|_| unreachable!("static pattern"))
    })
}

/// Splits a script into scenes.
///
/// Blank lines separate scenes. Standalone headings such as `Scene 2:` or
/// `## Hook` are dropped.
#[must_use]
pub fn split_scenes(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split("\n\n")
        .flat_map(|block| {
            let lines: Vec<&str> = block
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !scene_heading().is_match(line))
                .collect();
            if lines.is_empty() {
                None
            } else {
                Some(lines.join(" "))
            }
        })
        .collect()
}

/// Extracts items from a numbered or bulleted list in model output.
///
/// Falls back to one item per non-empty line when no line carries a list
/// marker, so a model that ignores the format instruction still yields
/// usable prompts.
#[must_use]
pub fn parse_numbered_list(text: &str) -> Vec<String> {
    let marked: Vec<String> = text
        .lines()
        .filter_map(|line| numbered_line().captures(line))
        .filter_map(|caps| caps.get(1).map(|m| strip_quotes(m.as_str())))
        .filter(|item| !item.is_empty())
        .collect();

    if !marked.is_empty() {
        return marked;
    }

    text.lines()
        .map(strip_quotes)
        .filter(|line| !line.is_empty())
        .collect()
}

fn strip_quotes(s: &str) -> String {
    s.trim()
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}

/// Lowercase ASCII slug for file names inside export bundles.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_dash = true;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}
