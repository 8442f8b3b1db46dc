//! Environment marker normalization, validation and merging.

use crate::error::{RequirementError, Result};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Pipfile keys that are shorthand for a single marker comparison.
pub const ENVIRONMENT_KEYS: [&str; 11] = [
    "os_name",
    "sys_platform",
    "platform_machine",
    "platform_python_implementation",
    "platform_release",
    "platform_system",
    "platform_version",
    "python_version",
    "python_full_version",
    "implementation_name",
    "implementation_version",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Word(String),
}

fn tokenize(markers: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = markers.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '\'' | '"' => {
                chars.next();
                let mut value = String::new();
                for next in chars.by_ref() {
                    if next == c {
                        break;
                    }
                    value.push(next);
                }
                let quoted = if value.contains('\'') {
                    format!("\"{value}\"")
                } else {
                    format!("'{value}'")
                };
                tokens.push(Token::Word(quoted));
            }
            '<' | '>' | '=' | '!' | '~' => {
                let mut op = String::new();
                while let Some(&next) = chars.peek() {
                    if !matches!(next, '<' | '>' | '=' | '!' | '~') {
                        break;
                    }
                    op.push(next);
                    chars.next();
                }
                tokens.push(Token::Word(op));
            }
            _ => {
                let mut word = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace()
                        || matches!(next, '(' | ')' | '\'' | '"' | '<' | '>' | '=' | '!' | '~')
                    {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    tokens
}

fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut previous: Option<&Token> = None;
    for token in tokens {
        let needs_space = match (previous, token) {
            (None, _) | (Some(Token::Open), _) | (_, Token::Close) => false,
            _ => true,
        };
        if needs_space {
            out.push(' ');
        }
        match token {
            Token::Open => out.push('('),
            Token::Close => out.push(')'),
            Token::Word(word) => out.push_str(word),
        }
        previous = Some(token);
    }
    out
}

/// Canonical textual form of a marker expression.
///
/// Whitespace is collapsed to single spaces around every token. Strings are
/// single-quoted unless they contain an apostrophe. Two expressions that differ only in spacing or quoting
/// normalize to the same string.
///
/// # Examples
///
/// ```
/// use pipreq::markers::normalize_markers;
///
/// assert_eq!(
///     normalize_markers(r#"python_version<"3.8"  and(os_name=='nt')"#),
///     "python_version < '3.8' and (os_name == 'nt')"
/// );
/// ```
pub fn normalize_markers(markers: &str) -> String {
    render(&tokenize(markers))
}

/// Validates a marker expression as PEP 508 and returns its normalized form.
pub fn validate_markers(markers: &str) -> Result<String> {
    let normalized = normalize_markers(markers);
    if normalized.is_empty() {
        return Err(RequirementError::invalid_markers(markers, "empty expression"));
    }

    let candidate = format!("fakepkg; {normalized}");
    let parsed: std::result::Result<pep508_rs::Requirement, _> =
        pep508_rs::Requirement::from_str(&candidate);
    if let Err(e) = parsed {
        return Err(RequirementError::invalid_markers(markers, e.to_string()));
    }
    Ok(normalized)
}

/// Splits a normalized expression into its top-level `or` clauses.
fn or_clauses(normalized: &str) -> Vec<String> {
    let tokens = tokenize(normalized);
    let mut clauses = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0usize;

    for token in tokens {
        match &token {
            Token::Open => depth += 1,
            Token::Close => depth = depth.saturating_sub(1),
            Token::Word(word) if depth == 0 && word == "or" => {
                clauses.push(render(&current));
                current.clear();
                continue;
            }
            Token::Word(_) => {}
        }
        current.push(token);
    }
    if !current.is_empty() {
        clauses.push(render(&current));
    }
    clauses
}

/// Combines two marker expressions with a logical OR.
///
/// Both sides are split into their top-level `or` clauses; clauses that are
/// identical once normalized appear only once, in sorted order. The result is
/// validated as PEP 508.
///
/// # Examples
///
/// ```
/// use pipreq::markers::merge_markers;
///
/// let merged = merge_markers(Some("python_version < '3'"), r#"python_version<"3""#).unwrap();
/// assert_eq!(merged, "python_version < '3'");
///
/// let merged = merge_markers(Some("os_name == 'nt'"), "sys_platform == 'darwin'").unwrap();
/// assert_eq!(merged, "os_name == 'nt' or sys_platform == 'darwin'");
/// ```
pub fn merge_markers(existing: Option<&str>, other: &str) -> Result<String> {
    let mut clauses = BTreeSet::new();
    for expression in existing.into_iter().chain(std::iter::once(other)) {
        let normalized = normalize_markers(expression);
        clauses.extend(or_clauses(&normalized).into_iter().filter(|c| !c.is_empty()));
    }

    let merged = clauses.into_iter().collect::<Vec<_>>().join(" or ");
    validate_markers(&merged)
}

/// Builds a marker expression from Pipfile environment keys.
///
/// Each value is an operator followed by a quoted value (`"=='nt'"`); a
/// bare value is treated as `==`. Comparisons are joined with `and`.
pub fn markers_from_environment<'a, I>(pairs: I) -> Option<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let parts: Vec<String> = pairs
        .into_iter()
        .filter(|(key, _)| ENVIRONMENT_KEYS.contains(key))
        .map(|(key, value)| {
            let value = value.trim();
            if value.starts_with(['<', '>', '=', '!', '~']) || value.starts_with("in ") {
                normalize_markers(&format!("{key} {value}"))
            } else {
                let bare = value.trim_matches(['\'', '"']);
                normalize_markers(&format!("{key} == '{bare}'"))
            }
        })
        .collect();

    (!parts.is_empty()).then(|| parts.join(" and "))
}
