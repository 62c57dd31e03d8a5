//! Outgoing request types.
//!
//! A [`Request`] is a [`RequestHead`] plus a body implementing `http_body::Body`.
//! The head keeps header fields in caller order (see [`HeaderFields`]) and carries
//! the `Expect: 100-continue` intent as a flag next to the headers.
//!
//! Requests are usually assembled with [`Request::builder`], which mirrors the
//! `http::request::Builder` API and defers every error to the final
//! [`body`](RequestBuilder::body) call.

use http::header::{EXPECT, HOST};
use http::{HeaderName, HeaderValue, Method, Uri, Version};

use crate::protocol::{HeaderFields, HttpError, SendError};

/// Everything about a request except its body.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    uri: Option<Uri>,
    version: Version,
    headers: HeaderFields,
    expect_continue: bool,
}

impl Default for RequestHead {
    fn default() -> Self {
        Self { method: Method::GET, uri: None, version: Version::HTTP_11, headers: HeaderFields::new(), expect_continue: false }
    }
}

impl RequestHead {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri: Some(uri), ..Self::default() }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn method_mut(&mut self) -> &mut Method {
        &mut self.method
    }

    pub fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }

    pub fn uri_mut(&mut self) -> &mut Option<Uri> {
        &mut self.uri
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn version_mut(&mut self) -> &mut Version {
        &mut self.version
    }

    pub fn headers(&self) -> &HeaderFields {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderFields {
        &mut self.headers
    }

    /// Returns true when the body must wait for a `100 Continue`, either because
    /// the flag is set or because the caller added the `Expect` header by hand.
    pub fn expect_continue(&self) -> bool {
        self.expect_continue || self.headers.get_all(EXPECT).any(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
    }

    pub fn set_expect_continue(&mut self, expect_continue: bool) {
        self.expect_continue = expect_continue;
    }

    /// Checks that the target can be sent: it must be present, absolute and use
    /// the `http` or `https` scheme.
    pub fn target(&self) -> Result<&Uri, HttpError> {
        let uri = self.uri.as_ref().ok_or_else(|| HttpError::invalid_request_state("request has no target uri"))?;

        let Some(scheme) = uri.scheme_str() else {
            return Err(HttpError::invalid_request_state(format!("request target {uri} is not an absolute uri")));
        };

        if !(scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https")) {
            return Err(HttpError::unsupported_scheme(scheme));
        }

        if uri.host().is_none_or(str::is_empty) {
            return Err(HttpError::invalid_request_state(format!("request target {uri} has no host")));
        }

        Ok(uri)
    }

    /// The value to send in `Host` when the caller did not provide one.
    pub(crate) fn host_value(&self) -> Option<String> {
        if self.headers.contains(HOST) {
            return None;
        }
        let uri = self.uri.as_ref()?;
        let host = uri.host()?;
        Some(match uri.port_u16() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        })
    }
}

/// A request head together with its body.
#[derive(Debug)]
pub struct Request<B> {
    head: RequestHead,
    body: B,
}

impl Request<()> {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }
}

impl<B> Request<B> {
    pub fn new(method: Method, uri: Uri, body: B) -> Self {
        Self { head: RequestHead::new(method, uri), body }
    }

    pub fn from_parts(head: RequestHead, body: B) -> Self {
        Self { head, body }
    }

    pub fn into_parts(self) -> (RequestHead, B) {
        (self.head, self.body)
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn head_mut(&mut self) -> &mut RequestHead {
        &mut self.head
    }

    pub fn method(&self) -> &Method {
        self.head.method()
    }

    pub fn uri(&self) -> Option<&Uri> {
        self.head.uri()
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

    pub fn map<T, F: FnOnce(B) -> T>(self, f: F) -> Request<T> {
        Request { head: self.head, body: f(self.body) }
    }
}

/// Builder for [`Request`], keeping the first error until [`body`](Self::body).
#[derive(Debug)]
pub struct RequestBuilder {
    inner: Result<RequestHead, HttpError>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self { inner: Ok(RequestHead::default()) }
    }

    #[must_use]
    pub fn method<T>(self, method: T) -> Self
    where
        Method: TryFrom<T>,
        <Method as TryFrom<T>>::Error: Into<http::Error>,
    {
        self.and_then(move |mut head| {
            head.method = Method::try_from(method).map_err(|e| HttpError::invalid_request_state(Into::<http::Error>::into(e)))?;
            Ok(head)
        })
    }

    #[must_use]
    pub fn uri<T>(self, uri: T) -> Self
    where
        Uri: TryFrom<T>,
        <Uri as TryFrom<T>>::Error: Into<http::Error>,
    {
        self.and_then(move |mut head| {
            head.uri = Some(Uri::try_from(uri).map_err(|e| HttpError::invalid_request_state(Into::<http::Error>::into(e)))?);
            Ok(head)
        })
    }

    #[must_use]
    pub fn version(self, version: Version) -> Self {
        self.and_then(move |mut head| {
            head.version = version;
            Ok(head)
        })
    }

    /// Appends a header field; repeated names are kept in call order.
    ///
    /// Control characters (CR, LF, NUL, ...) in the value are rejected here.
    /// Octets `>= 0x80` pass the builder and are checked against the client's
    /// configuration when the request is written.
    #[must_use]
    pub fn header<K, V>(self, name: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.and_then(move |mut head| {
            let name = HeaderName::try_from(name).map_err(|e| SendError::invalid_header(Into::<http::Error>::into(e)))?;
            let value = HeaderValue::try_from(value)
                .map_err(|e| SendError::invalid_header(format!("value of {name} is not a valid ASCII header value: {}", Into::<http::Error>::into(e))))?;
            head.headers.append(name, value);
            Ok(head)
        })
    }

    #[must_use]
    pub fn expect_continue(self, expect_continue: bool) -> Self {
        self.and_then(move |mut head| {
            head.expect_continue = expect_continue;
            Ok(head)
        })
    }

    pub fn body<B>(self, body: B) -> Result<Request<B>, HttpError> {
        self.inner.map(|head| Request { head, body })
    }

    fn and_then<F>(self, func: F) -> Self
    where
        F: FnOnce(RequestHead) -> Result<RequestHead, HttpError>,
    {
        Self { inner: self.inner.and_then(func) }
    }
}
