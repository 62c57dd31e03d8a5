//! Ordered, multi-valued header list.
//!
//! `http::HeaderMap` groups values by name, which loses the relative order of
//! interleaved fields such as `[A, B, A]`. HTTP/1.x messages are written and read
//! in wire order here, so fields live in a plain vector and lookups are linear.
//! Header blocks are small enough that this never shows up in profiles.

use std::slice;

use http::{HeaderMap, HeaderName, HeaderValue};

/// A single `name: value` field line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderField {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderField {
    pub fn new(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }

    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn value(&self) -> &HeaderValue {
        &self.value
    }

    pub fn into_parts(self) -> (HeaderName, HeaderValue) {
        (self.name, self.value)
    }
}

/// Header fields in the order they were added or received.
///
/// Duplicate names are kept as distinct entries. Name lookups are ASCII
/// case-insensitive and accept anything that reads as a `str`, including the
/// `http::header` constants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    fields: Vec<HeaderField>,
}

impl HeaderFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { fields: Vec::with_capacity(capacity) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Appends a field after all existing ones.
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.fields.push(HeaderField::new(name, value));
    }

    /// Returns the first value stored under `name`.
    pub fn get<K: AsRef<str>>(&self, name: K) -> Option<&HeaderValue> {
        self.get_all(name).next()
    }

    /// Returns every value stored under `name`, in order.
    pub fn get_all<K: AsRef<str>>(&self, name: K) -> impl Iterator<Item = &HeaderValue> {
        self.fields.iter().filter(move |field| field.name.as_str().eq_ignore_ascii_case(name.as_ref())).map(HeaderField::value)
    }

    pub fn contains<K: AsRef<str>>(&self, name: K) -> bool {
        self.get(name).is_some()
    }

    /// Removes every field named `name`, returning how many were removed.
    pub fn remove<K: AsRef<str>>(&mut self, name: K) -> usize {
        let before = self.fields.len();
        self.fields.retain(|field| !field.name.as_str().eq_ignore_ascii_case(name.as_ref()));
        before - self.fields.len()
    }

    /// Joins every value of `name` with `", "` for presentation.
    ///
    /// Values holding non UTF-8 bytes are converted lossily.
    pub fn joined<K: AsRef<str>>(&self, name: K) -> Option<String> {
        let mut values = self.get_all(name).peekable();
        values.peek()?;

        let mut joined = String::new();
        for (i, value) in values.enumerate() {
            if i > 0 {
                joined.push_str(", ");
            }
            joined.push_str(&String::from_utf8_lossy(value.as_bytes()));
        }
        Some(joined)
    }

    pub fn iter(&self) -> slice::Iter<'_, HeaderField> {
        self.fields.iter()
    }

    /// Copies the fields into a `HeaderMap`, keeping the per-name value order.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.fields.len());
        for field in &self.fields {
            map.append(field.name.clone(), field.value.clone());
        }
        map
    }

    /// Returns true when the last `Transfer-Encoding` coding is `chunked`.
    pub(crate) fn is_chunked(&self) -> bool {
        const CHUNKED: &[u8] = b"chunked";
        self.get_all(http::header::TRANSFER_ENCODING)
            .last()
            .and_then(|value| value.as_bytes().rsplit(|b| *b == b',').next())
            .is_some_and(|coding| coding.trim_ascii().eq_ignore_ascii_case(CHUNKED))
    }

    /// Returns true when any `Connection` field lists the `close` option.
    pub(crate) fn has_connection_close(&self) -> bool {
        self.get_all(http::header::CONNECTION)
            .flat_map(|value| value.as_bytes().split(|b| *b == b','))
            .any(|option| option.trim_ascii().eq_ignore_ascii_case(b"close"))
    }
}

impl<'a> IntoIterator for &'a HeaderFields {
    type Item = &'a HeaderField;
    type IntoIter = slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl IntoIterator for HeaderFields {
    type Item = HeaderField;
    type IntoIter = std::vec::IntoIter<HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for HeaderFields {
    fn from_iter<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().map(|(name, value)| HeaderField::new(name, value)).collect() }
    }
}

impl Extend<(HeaderName, HeaderValue)> for HeaderFields {
    fn extend<I: IntoIterator<Item = (HeaderName, HeaderValue)>>(&mut self, iter: I) {
        self.fields.extend(iter.into_iter().map(|(name, value)| HeaderField::new(name, value)));
    }
}
