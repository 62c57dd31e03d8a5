//! Fixtures shared by the client benchmarks.

/// A raw response captured as it appears on the wire.
#[derive(Debug, Copy, Clone)]
pub struct ResponseFixture {
    name: &'static str,
    framing: Framing,
    content: &'static str,
}

impl ResponseFixture {
    pub const fn new(name: &'static str, framing: Framing, content: &'static str) -> Self {
        Self { name, framing, content }
    }

    pub const fn with_length(name: &'static str, content: &'static str) -> Self {
        Self::new(name, Framing::Length, content)
    }

    pub const fn chunked(name: &'static str, content: &'static str) -> Self {
        Self::new(name, Framing::Chunked, content)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn framing(&self) -> Framing {
        self.framing
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// How the fixture's body is delimited.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Framing {
    Length,
    Chunked,
}
