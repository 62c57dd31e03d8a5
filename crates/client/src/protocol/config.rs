//! Client configuration.
//!
//! A [`ClientConfig`] is shared by the [`Client`](crate::client::Client) and every
//! connection it opens. The header related knobs are projected into a small
//! [`HeaderPolicy`] that the codecs carry around by value.

use std::time::Duration;

/// Default time to wait for `100 Continue` before sending the body anyway.
pub const DEFAULT_EXPECT_CONTINUE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default upper bound for a response head (status line plus header fields).
pub const DEFAULT_MAX_RESPONSE_HEADER_BYTES: usize = 64 * 1024;

/// Default initial capacity of a connection's read buffer.
pub const DEFAULT_READ_BUFFER_CAPACITY: usize = 8 * 1024;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    allow_high_byte_header_values: bool,
    expect_continue_timeout: Duration,
    max_response_header_bytes: usize,
    reject_out_of_range_status_codes: bool,
    read_buffer_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            allow_high_byte_header_values: false,
            expect_continue_timeout: DEFAULT_EXPECT_CONTINUE_TIMEOUT,
            max_response_header_bytes: DEFAULT_MAX_RESPONSE_HEADER_BYTES,
            reject_out_of_range_status_codes: false,
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept octets `>= 0x80` in header values, both when writing requests and
    /// when parsing responses.
    #[must_use]
    pub fn with_allow_high_byte_header_values(mut self, allow: bool) -> Self {
        self.allow_high_byte_header_values = allow;
        self
    }

    #[must_use]
    pub fn with_expect_continue_timeout(mut self, timeout: Duration) -> Self {
        self.expect_continue_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_response_header_bytes(mut self, max_bytes: usize) -> Self {
        self.max_response_header_bytes = max_bytes;
        self
    }

    /// Fail responses whose status code lies outside `100..=999`.
    #[must_use]
    pub fn with_reject_out_of_range_status_codes(mut self, reject: bool) -> Self {
        self.reject_out_of_range_status_codes = reject;
        self
    }

    #[must_use]
    pub fn with_read_buffer_capacity(mut self, capacity: usize) -> Self {
        self.read_buffer_capacity = capacity;
        self
    }

    pub fn allow_high_byte_header_values(&self) -> bool {
        self.allow_high_byte_header_values
    }

    pub fn expect_continue_timeout(&self) -> Duration {
        self.expect_continue_timeout
    }

    pub fn max_response_header_bytes(&self) -> usize {
        self.max_response_header_bytes
    }

    pub fn reject_out_of_range_status_codes(&self) -> bool {
        self.reject_out_of_range_status_codes
    }

    pub fn read_buffer_capacity(&self) -> usize {
        self.read_buffer_capacity
    }

    pub fn header_policy(&self) -> HeaderPolicy {
        HeaderPolicy {
            allow_high_byte_values: self.allow_high_byte_header_values,
            max_header_bytes: self.max_response_header_bytes,
        }
    }
}

/// Header validation settings consumed by the codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderPolicy {
    pub allow_high_byte_values: bool,
    pub max_header_bytes: usize,
}

impl Default for HeaderPolicy {
    fn default() -> Self {
        ClientConfig::default().header_policy()
    }
}
