use std::error::Error as StdError;
use std::io;
use thiserror::Error;

/// Boxed error produced by a request body source.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Coarse classification of every failure the client can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedHeader,
    MalformedChunk,
    IncompleteResponse,
    InvalidRequestState,
    UnsupportedScheme,
    Canceled,
    BodyReadFailure,
    Io,
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("response error: {source}")]
    ResponseError {
        #[from]
        source: ParseError,
    },

    #[error("request error: {source}")]
    RequestError {
        #[from]
        source: SendError,
    },

    #[error("invalid request state: {reason}")]
    InvalidRequestState { reason: String },

    #[error("unsupported uri scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("operation was canceled")]
    Canceled,

    /// The request body source failed; `source` is the error it produced.
    #[error("request body source failed: {source}")]
    BodyReadFailure { source: BoxError },

    #[error("connect error: {source}")]
    Connect { source: io::Error },
}

impl HttpError {
    pub fn invalid_request_state<S: ToString>(str: S) -> Self {
        Self::InvalidRequestState { reason: str.to_string() }
    }

    pub fn unsupported_scheme<S: ToString>(scheme: S) -> Self {
        Self::UnsupportedScheme { scheme: scheme.to_string() }
    }

    pub fn body_read_failure<E: Into<BoxError>>(e: E) -> Self {
        Self::BodyReadFailure { source: e.into() }
    }

    pub fn connect(e: io::Error) -> Self {
        Self::Connect { source: e }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HttpError::ResponseError { source } => source.kind(),
            HttpError::RequestError { source } => source.kind(),
            HttpError::InvalidRequestState { .. } => ErrorKind::InvalidRequestState,
            HttpError::UnsupportedScheme { .. } => ErrorKind::UnsupportedScheme,
            HttpError::Canceled => ErrorKind::Canceled,
            HttpError::BodyReadFailure { .. } => ErrorKind::BodyReadFailure,
            HttpError::Connect { .. } => ErrorKind::Io,
        }
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        matches!(self, HttpError::Canceled)
    }

    /// Hands back the error produced by the request body source, untouched.
    pub fn into_body_error(self) -> Option<BoxError> {
        match self {
            HttpError::BodyReadFailure { source } => Some(source),
            _ => None,
        }
    }
}

/// Errors raised while reading a response off the wire.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("malformed header: {reason}")]
    MalformedHeader { reason: String },

    #[error("invalid status line: {reason}")]
    InvalidStatusLine { reason: String },

    #[error("invalid http version: {version}")]
    InvalidVersion { version: String },

    #[error("status code {code} is out of range")]
    StatusCodeOutOfRange { code: u16 },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("malformed chunk: {reason}")]
    MalformedChunk { reason: String },

    #[error("incomplete response: {reason}")]
    IncompleteResponse { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn malformed_header<S: ToString>(str: S) -> Self {
        Self::MalformedHeader { reason: str.to_string() }
    }

    pub fn invalid_status_line<S: ToString>(str: S) -> Self {
        Self::InvalidStatusLine { reason: str.to_string() }
    }

    pub fn invalid_version(version: &[u8]) -> Self {
        Self::InvalidVersion { version: String::from_utf8_lossy(version).into_owned() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn malformed_chunk<S: ToString>(str: S) -> Self {
        Self::MalformedChunk { reason: str.to_string() }
    }

    pub fn incomplete_response<S: ToString>(str: S) -> Self {
        Self::IncompleteResponse { reason: str.to_string() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::TooLargeHeader { .. }
            | ParseError::MalformedHeader { .. }
            | ParseError::InvalidStatusLine { .. }
            | ParseError::InvalidVersion { .. }
            | ParseError::StatusCodeOutOfRange { .. }
            | ParseError::InvalidContentLength { .. } => ErrorKind::MalformedHeader,
            ParseError::MalformedChunk { .. } => ErrorKind::MalformedChunk,
            ParseError::IncompleteResponse { .. } => ErrorKind::IncompleteResponse,
            ParseError::Io { .. } => ErrorKind::Io,
        }
    }
}

/// Errors raised while writing a request.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("unsupported http version: {version}")]
    UnsupportedVersion { version: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn unsupported_version(version: http::Version) -> Self {
        Self::UnsupportedVersion { version: format!("{version:?}") }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SendError::InvalidHeader { .. } => ErrorKind::MalformedHeader,
            SendError::InvalidBody { .. } | SendError::UnsupportedVersion { .. } => ErrorKind::InvalidRequestState,
            SendError::Io { .. } => ErrorKind::Io,
        }
    }
}
