//! Incoming response types.
//!
//! The status code is kept as the literal integer read off the wire so that
//! unassigned and out-of-range codes survive parsing; [`ResponseHead::status_code`]
//! offers the typed `http::StatusCode` view when one exists.

use http::{StatusCode, Version};

use crate::protocol::HeaderFields;

/// Status line and header fields of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    version: Version,
    status: u16,
    reason: String,
    headers: HeaderFields,
}

impl ResponseHead {
    pub fn new(version: Version, status: u16, reason: String, headers: HeaderFields) -> Self {
        Self { version, status, reason, headers }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Typed status, `None` for codes `http::StatusCode` cannot represent.
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status).ok()
    }

    /// The reason phrase as sent by the server, possibly empty.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn headers(&self) -> &HeaderFields {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderFields {
        &mut self.headers
    }

    #[inline]
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status)
    }

    /// 1xx responses other than `101 Switching Protocols` precede the final one.
    #[inline]
    pub fn is_interim(&self) -> bool {
        self.is_informational() && self.status != 101
    }

    #[inline]
    pub fn is_continue(&self) -> bool {
        self.status == 100
    }

    /// Whether the response may carry content at all, regardless of framing headers.
    pub fn may_have_body(&self) -> bool {
        !(self.is_informational() || self.status == 204 || self.status == 304)
    }
}

/// A response head together with its body.
#[derive(Debug)]
pub struct Response<B> {
    head: ResponseHead,
    body: B,
}

impl<B> Response<B> {
    pub fn from_parts(head: ResponseHead, body: B) -> Self {
        Self { head, body }
    }

    pub fn into_parts(self) -> (ResponseHead, B) {
        (self.head, self.body)
    }

    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    pub fn status(&self) -> u16 {
        self.head.status()
    }

    pub fn reason(&self) -> &str {
        self.head.reason()
    }

    pub fn version(&self) -> Version {
        self.head.version()
    }

    pub fn headers(&self) -> &HeaderFields {
        self.head.headers()
    }

    pub fn body(&self) -> &B {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut B {
        &mut self.body
    }

    pub fn into_body(self) -> B {
        self.body
    }

    pub fn map<T, F: FnOnce(B) -> T>(self, f: F) -> Response<T> {
        Response { head: self.head, body: f(self.body) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(status: u16) -> ResponseHead {
        ResponseHead::new(Version::HTTP_11, status, String::new(), HeaderFields::new())
    }

    #[test]
    fn interim_classification() {
        for status in [100, 102, 103, 150, 180, 199] {
            assert!(head(status).is_interim(), "{status}");
        }
        assert!(!head(101).is_interim());
        assert!(head(101).is_informational());
        assert!(!head(200).is_interim());
    }

    #[test]
    fn bodiless_statuses() {
        assert!(!head(204).may_have_body());
        assert!(!head(304).may_have_body());
        assert!(!head(101).may_have_body());
        assert!(head(200).may_have_body());
        assert!(head(1000).may_have_body());
    }

    #[test]
    fn status_code_view() {
        assert_eq!(head(404).status_code(), Some(StatusCode::NOT_FOUND));
        assert_eq!(head(1000).status_code(), None);
        assert_eq!(head(99).status_code(), None);
    }
}
