//! Parser for header field blocks.
//!
//! Turns the raw field lines of a response head (or of a chunked trailer section)
//! into ordered [`HeaderFields`]. The parser is deliberately lenient about line
//! endings and strict about content:
//!
//! - lines may end in CRLF or a bare LF, mixed freely
//! - a line starting with SP or HTAB continues the previous field (obs-fold);
//!   the fold is replaced by a single space
//! - same-name fields stay separate entries in arrival order
//! - names must be tokens, values must not contain NUL, CR, LF or other controls
//! - octets `>= 0x80` in values depend on [`HeaderPolicy::allow_high_byte_values`]
//!
//! Parsing stops at the first empty line, so a full head including its blank
//! terminator can be passed in directly.

use http::{HeaderName, HeaderValue};
use memchr::memchr;

use crate::ensure;
use crate::protocol::{HeaderFields, HeaderPolicy, ParseError};

/// Checks a field value against the byte rules shared by requests and responses.
///
/// Returns a short description of the first offending byte.
pub(crate) fn check_field_value(value: &[u8], allow_high_bytes: bool) -> Result<(), &'static str> {
    for &b in value {
        match b {
            b'\t' | b' '..=b'~' => {}
            0x80..=0xFF if allow_high_bytes => {}
            0x80..=0xFF => return Err("contains non-ASCII bytes"),
            b'\0' => return Err("contains NUL"),
            b'\r' | b'\n' => return Err("contains CR or LF"),
            _ => return Err("contains control characters"),
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderParser {
    allow_high_bytes: bool,
}

impl HeaderParser {
    pub fn new(policy: HeaderPolicy) -> Self {
        Self { allow_high_bytes: policy.allow_high_byte_values }
    }

    pub fn parse(&self, block: &[u8]) -> Result<HeaderFields, ParseError> {
        let mut headers = HeaderFields::new();
        let mut pending: Option<(HeaderName, Vec<u8>)> = None;

        for line in Lines::new(block) {
            if line.is_empty() {
                break;
            }
            ensure!(memchr(b'\r', line).is_none(), ParseError::malformed_header("bare CR inside header line"));

            if matches!(line[0], b' ' | b'\t') {
                let Some((_, value)) = pending.as_mut() else {
                    return Err(ParseError::malformed_header("continuation line before any header field"));
                };
                let folded = trim_ows(line);
                if folded.is_empty() {
                    continue;
                }
                if !value.is_empty() {
                    value.push(b' ');
                }
                value.extend_from_slice(folded);
                continue;
            }

            if let Some((name, value)) = pending.take() {
                self.push(&mut headers, name, &value)?;
            }

            let Some(colon) = memchr(b':', line) else {
                return Err(ParseError::malformed_header(format!(
                    "missing colon in header line {:?}",
                    String::from_utf8_lossy(line)
                )));
            };

            let name = &line[..colon];
            ensure!(!name.is_empty(), ParseError::malformed_header("empty header name"));
            let name = HeaderName::from_bytes(name).map_err(|_| {
                ParseError::malformed_header(format!("invalid header name {:?}", String::from_utf8_lossy(name)))
            })?;

            pending = Some((name, trim_ows(&line[colon + 1..]).to_vec()));
        }

        if let Some((name, value)) = pending.take() {
            self.push(&mut headers, name, &value)?;
        }

        Ok(headers)
    }

    fn push(&self, headers: &mut HeaderFields, name: HeaderName, value: &[u8]) -> Result<(), ParseError> {
        check_field_value(value, self.allow_high_bytes)
            .map_err(|reason| ParseError::malformed_header(format!("value of {name} {reason}")))?;

        let value = HeaderValue::from_bytes(value).map_err(|e| ParseError::malformed_header(format!("value of {name}: {e}")))?;
        headers.append(name, value);
        Ok(())
    }
}

/// Strips SP and HTAB from both ends; other control bytes are left for validation.
fn trim_ows(value: &[u8]) -> &[u8] {
    let start = value.iter().position(|b| !matches!(b, b' ' | b'\t')).unwrap_or(value.len());
    let end = value.iter().rposition(|b| !matches!(b, b' ' | b'\t')).map_or(start, |i| i + 1);
    &value[start..end]
}

/// Splits a block on LF, dropping one trailing CR per line.
struct Lines<'a> {
    remaining: &'a [u8],
}

impl<'a> Lines<'a> {
    fn new(block: &'a [u8]) -> Self {
        Self { remaining: block }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        let line = match memchr(b'\n', self.remaining) {
            Some(lf) => {
                let line = &self.remaining[..lf];
                self.remaining = &self.remaining[lf + 1..];
                line
            }
            None => std::mem::take(&mut self.remaining),
        };

        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}
