use std::fmt;

/// Placeholder used for list elements when index generation is disabled
pub const INDEX_PLACEHOLDER: &[u8] = b"#";

/// Error returned when a push would exceed the configured path bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathOverflow;

/// Resource path of the node currently being parsed.
///
/// Components are kept as an explicit stack of boundaries over a single
/// rendered buffer, so the rendered form (`/a/b/0`) is always available
/// without scanning for separators and popping never needs to look inside a
/// component.
#[derive(Debug, Clone)]
pub struct ResourcePath {
    rendered: Vec<u8>,
    starts: Vec<usize>,
    max_len: usize,
}

impl ResourcePath {
    pub fn new(max_len: usize) -> Self {
        Self { rendered: Vec::with_capacity(256), starts: Vec::with_capacity(32), max_len }
    }

    /// Appends `/component`, failing if the result would exceed the bound.
    pub fn push(&mut self, component: &[u8]) -> Result<(), PathOverflow> {
        if self.rendered.len() + 1 + component.len() > self.max_len {
            return Err(PathOverflow);
        }
        self.starts.push(self.rendered.len());
        self.rendered.push(b'/');
        self.rendered.extend_from_slice(component);
        Ok(())
    }

    /// Appends a list index component (`n` or `#`)
    pub fn push_index(&mut self, index: u64, generate: bool) -> Result<(), PathOverflow> {
        if generate {
            self.push(index.to_string().as_bytes())
        } else {
            self.push(INDEX_PLACEHOLDER)
        }
    }

    /// Removes the last component; a no-op on an empty path
    pub fn pop(&mut self) {
        if let Some(start) = self.starts.pop() {
            self.rendered.truncate(start);
        }
    }

    pub fn depth(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.rendered
    }

    /// Iterates over components without their leading separator
    pub fn components(&self) -> impl Iterator<Item = &[u8]> {
        self.starts.iter().enumerate().map(move |(i, &start)| {
            let end = self.starts.get(i + 1).copied().unwrap_or(self.rendered.len());
            &self.rendered[start + 1..end]
        })
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.rendered))
    }
}
