//! Manifest header entry parsing.
//!
//! Headers like `Export-Package` carry a comma-separated list of clauses.
//! Each clause names one or more subjects followed by `name=value`
//! attributes and `name:=value` directives, e.g.
//!
//! ```text
//! org.example.a;org.example.b;version="[1.0,2.0)";resolution:=optional
//! ```
//!
//! A `"` toggles quoting; separators inside quotes are inert and survive
//! verbatim in the stored value.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Errors produced while parsing a header value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderSyntaxError {
    /// A `"` was opened but never closed.
    #[error("unterminated quote in {header}: '{text}'")]
    UnterminatedQuote { header: String, text: String },

    /// A clause contained an empty subject key.
    #[error("empty key in {header}: '{text}'")]
    EmptyKey { header: String, text: String },

    /// A bare key segment appeared after attributes or directives.
    #[error("key '{segment}' follows parameters in {header}: '{text}'")]
    KeyAfterParameter {
        header: String,
        text: String,
        segment: String,
    },
}

/// One parsed clause: subject keys plus typed parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderClause {
    /// Subject keys, in declaration order. Several keys may share one set of
    /// parameters; higher layers expand such clauses to one entry per key.
    pub keys: Vec<String>,
    /// `name=value` parameters.
    pub attributes: BTreeMap<String, String>,
    /// `name:=value` behavioral parameters.
    pub directives: BTreeMap<String, String>,
}

impl HeaderClause {
    /// Convenience constructor for a single-key clause without parameters.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            keys: vec![key.into()],
            ..Self::default()
        }
    }

    /// Attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Directive lookup.
    pub fn directive(&self, name: &str) -> Option<&str> {
        self.directives.get(name).map(String::as_str)
    }
}

/// Split `text` on every `separator` that is not inside quotes.
///
/// Returns the raw pieces (quotes still present) or `None` when a quote is
/// left open at the end of the text.
fn split_unquoted(text: &str, separator: char) -> Option<Vec<&str>> {
    let mut pieces = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == separator && !in_quotes => {
                pieces.push(&text[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }

    if in_quotes {
        return None;
    }
    pieces.push(&text[start..]);
    Some(pieces)
}

/// Locate the first `=` outside quotes, if any.
fn find_unquoted_eq(segment: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (idx, ch) in segment.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '=' if !in_quotes => return Some(idx),
            _ => {}
        }
    }
    None
}

/// Strip quote characters from a parameter value, keeping what they guarded.
fn unquote(value: &str) -> String {
    value.chars().filter(|c| *c != '"').collect()
}

/// Parse a raw header value into its clause list.
///
/// `header` is the header's name, used only for error messages.
///
/// # Errors
///
/// Returns [`HeaderSyntaxError`] on an unterminated quote, an empty key, or
/// a key segment that appears after parameters.
pub fn parse_header(header: &str, value: &str) -> Result<Vec<HeaderClause>, HeaderSyntaxError> {
    let unterminated = || HeaderSyntaxError::UnterminatedQuote {
        header: header.to_string(),
        text: value.to_string(),
    };

    let mut clauses = Vec::new();
    for clause_text in split_unquoted(value, ',').ok_or_else(unterminated)? {
        let clause_text = clause_text.trim();
        if clause_text.is_empty() {
            // A trailing comma is tolerated; an empty clause carries nothing.
            continue;
        }

        let mut clause = HeaderClause::default();
        for segment in split_unquoted(clause_text, ';').ok_or_else(unterminated)? {
            let segment = segment.trim();
            match find_unquoted_eq(segment) {
                None => {
                    if segment.is_empty() {
                        return Err(HeaderSyntaxError::EmptyKey {
                            header: header.to_string(),
                            text: clause_text.to_string(),
                        });
                    }
                    if !clause.attributes.is_empty() || !clause.directives.is_empty() {
                        return Err(HeaderSyntaxError::KeyAfterParameter {
                            header: header.to_string(),
                            text: clause_text.to_string(),
                            segment: segment.to_string(),
                        });
                    }
                    clause.keys.push(segment.to_string());
                }
                Some(eq) => {
                    let value = unquote(segment[eq + 1..].trim());
                    let name = segment[..eq].trim_end();
                    if let Some(directive) = name.strip_suffix(':') {
                        clause
                            .directives
                            .insert(directive.trim_end().to_string(), value);
                    } else {
                        clause.attributes.insert(name.to_string(), value);
                    }
                }
            }
        }

        if clause.keys.is_empty() {
            return Err(HeaderSyntaxError::EmptyKey {
                header: header.to_string(),
                text: clause_text.to_string(),
            });
        }
        clauses.push(clause);
    }

    Ok(clauses)
}

/// Quote a parameter value if it contains characters the clause syntax would
/// otherwise treat as separators.
fn quote_if_needed(value: &str) -> String {
    if value.contains([',', ';', '=', ':', ' ']) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

/// Render clauses back into the textual header form.
///
/// Inverse of [`parse_header`] for values free of pathological quoting:
/// `parse_header(h, &render_header(&clauses)) == clauses`.
pub fn render_header(clauses: &[HeaderClause]) -> String {
    let mut out = String::new();
    for (idx, clause) in clauses.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&clause.keys.join(";"));
        for (name, value) in &clause.attributes {
            out.push(';');
            out.push_str(name);
            out.push('=');
            out.push_str(&quote_if_needed(value));
        }
        for (name, value) in &clause.directives {
            out.push(';');
            out.push_str(name);
            out.push_str(":=");
            out.push_str(&quote_if_needed(value));
        }
    }
    out
}

impl fmt::Display for HeaderClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_header(std::slice::from_ref(self)))
    }
}
