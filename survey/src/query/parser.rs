//! Parser for response query strings.

use std::str::FromStr;

use super::range::{EndpointKind, RangeEndpoint, RangeSelector};

/// A parsed response query: which fields to show and which responses to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseQuery {
    /// Field keys to display, in the order given. Empty = no projection.
    pub keys: Vec<String>,
    /// Slice of the response sequence to keep.
    pub range: RangeSelector,
}

/// Errors produced while parsing a response query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// A `keys` section that lists nothing.
    #[error("no keys specified")]
    NoKeysSpecified,

    /// Range payload not of the form `[start..end]`.
    #[error("range must be of the form [start..end], got {0:?}")]
    MalformedRange(String),

    /// Endpoint that is not `first`, `last` (with optional signed offset) or an index.
    #[error("invalid range endpoint {0:?}")]
    InvalidEndpoint(String),
}

/// Parse a response query string.
///
/// Sections are separated by `;` (or, when there is no `;`, by newlines):
///
/// ```text
/// keys=name,email;range=[first+1..last-2]
/// ```
///
/// Blank input yields [`ResponseQuery::all`]. Sections with an unknown
/// keyword are skipped; a repeated section replaces the earlier one.
pub fn parse_response_query(input: &str) -> Result<ResponseQuery, QueryError> {
    let mut query = ResponseQuery::default();
    let input = input.trim();

    if input.is_empty() {
        return Ok(query);
    }

    for section in split_sections(input) {
        if let Some(payload) = section_payload(section, "keys") {
            query.keys = parse_keys(payload)?;
        } else if let Some(payload) = section_payload(section, "range") {
            query.range = parse_range(payload)?;
        } else {
            tracing::debug!(section, "ignoring unrecognized response query section");
        }
    }

    Ok(query)
}

impl ResponseQuery {
    /// The query that keeps everything and projects nothing.
    pub fn all() -> Self {
        Self::default()
    }

    /// Check if this query changes nothing about a listing.
    pub fn is_match_all(&self) -> bool {
        self.keys.is_empty() && self.range.is_full()
    }

    /// Apply the range to a slice, preserving order.
    pub fn limit<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        match self.range.evaluate(items.len()) {
            Some(range) => &items[range.as_range()],
            None => &[],
        }
    }
}

impl FromStr for ResponseQuery {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_response_query(s)
    }
}

/// Split on `;`, falling back to newlines when there is no `;`.
fn split_sections(input: &str) -> Vec<&str> {
    let mut parts: Vec<&str> = input.split(';').collect();
    if parts.len() == 1 {
        parts = input.split('\n').collect();
    }
    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Return the payload of `keyword:` / `keyword=` sections.
fn section_payload<'a>(section: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = section.strip_prefix(keyword)?.trim_start();
    rest.strip_prefix(':').or_else(|| rest.strip_prefix('='))
}

fn parse_keys(payload: &str) -> Result<Vec<String>, QueryError> {
    let keys: Vec<String> = split_keys(payload)
        .into_iter()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(unquote_key)
        .filter(|k| !k.is_empty())
        .collect();

    if keys.is_empty() {
        return Err(QueryError::NoKeysSpecified);
    }
    Ok(keys)
}

/// Split a key list on commas that are not inside a quoted key.
///
/// A quote only opens at the start of a key, so apostrophes inside bare keys
/// stay literal. Inside a quote a doubled quote does not close it, and inside
/// double quotes neither does `\"`.
fn split_keys(payload: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut at_key_start = true;
    let mut chars = payload.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match quote {
            Some(q) if c == q => {
                // Doubled quote is an escape and keeps the quote open
                if chars.peek().is_some_and(|&(_, next)| next == q) {
                    chars.next();
                } else {
                    quote = None;
                }
            }
            Some('"') if c == '\\' => {
                if chars.peek().is_some_and(|&(_, next)| next == '"') {
                    chars.next();
                }
            }
            Some(_) => {}
            None if c == ',' => {
                pieces.push(&payload[start..i]);
                start = i + 1;
                at_key_start = true;
                continue;
            }
            None if at_key_start && (c == '\'' || c == '"') => quote = Some(c),
            None => {}
        }
        if !c.is_whitespace() {
            at_key_start = false;
        }
    }
    pieces.push(&payload[start..]);

    pieces
}

/// Strip matching quotes and resolve the quote's own escapes.
///
/// `'...'` uses `''` for a literal `'`; `"..."` accepts both `""` and `\"`.
/// Any other backslash sequence is kept as written.
fn unquote_key(key: &str) -> String {
    let quote = match key.chars().next() {
        Some(q @ ('\'' | '"')) if key.len() >= 2 && key.ends_with(q) => q,
        _ => return key.to_string(),
    };
    let inner = &key[1..key.len() - 1];

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        let escapes_quote = c == quote || (quote == '"' && c == '\\');
        if escapes_quote && chars.peek() == Some(&quote) {
            chars.next();
            out.push(quote);
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_range(payload: &str) -> Result<RangeSelector, QueryError> {
    let payload = payload.trim();
    let malformed = || QueryError::MalformedRange(payload.to_string());

    let inner = payload
        .strip_prefix('[')
        .and_then(|p| p.strip_suffix(']'))
        .ok_or_else(malformed)?;

    let parts: Vec<&str> = inner.split("..").map(str::trim).collect();
    let &[start, end] = parts.as_slice() else {
        return Err(malformed());
    };
    if start.is_empty() || end.is_empty() {
        return Err(malformed());
    }

    Ok(RangeSelector::new(parse_endpoint(start)?, parse_endpoint(end)?))
}

/// Parse `first`, `last`, `first+N`, `last-N` or a bare index.
fn parse_endpoint(raw: &str) -> Result<RangeEndpoint, QueryError> {
    let invalid = || QueryError::InvalidEndpoint(raw.to_string());

    for (keyword, kind) in [
        ("first", EndpointKind::FromStart),
        ("last", EndpointKind::FromEnd),
    ] {
        if let Some(rest) = raw.strip_prefix(keyword) {
            let offset = if rest.is_empty() {
                0
            } else {
                parse_signed(rest).ok_or_else(invalid)?
            };
            return Ok(RangeEndpoint {
                kind,
                offset,
                raw: raw.to_string(),
            });
        }
    }

    if is_digits(raw) {
        let index = raw.parse::<i64>().map_err(|_| invalid())?;
        return Ok(RangeEndpoint {
            kind: EndpointKind::Absolute,
            offset: index,
            raw: raw.to_string(),
        });
    }

    Err(invalid())
}

/// Parse `+N` / `-N`; the sign is mandatory.
fn parse_signed(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('+').or_else(|| s.strip_prefix('-'))?;
    if !is_digits(digits) {
        return None;
    }
    s.parse().ok()
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
