//! Streaming JSON to resource path converter.
//!
//! One input byte is consumed per step. Values are written out as soon as
//! their first byte is seen, so arbitrarily large values never need to be
//! held in memory; only the current key and the path stack are buffered.

use std::borrow::Cow;
use std::io::{BufRead, Write};
use std::path::Path;

use serde::Serialize;

use super::error::ConvertError;
use super::escape::{escape_component, unescape_component};
use super::options::{ConvertOptions, EscapeMode};
use super::path::ResourcePath;
use super::slice::SliceOutput;
use crate::utils::CancelToken;

/// Per-document counters, used for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConvertStats {
    pub value_lines: u64,
    pub terminal_lines: u64,
    pub slice_lines: u64,
    pub input_lines: u64,
}

/// Names used in error messages for the streams of one conversion
#[derive(Debug, Clone, Copy)]
pub struct Labels<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
}

#[derive(Debug, Clone, Copy)]
enum Container {
    Object { member_open: bool },
    Array { index: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    Backslash,
    Unicode { digits: u8, unit: u32, high: Option<u32> },
    LowBackslash { high: u32 },
    LowU { high: u32 },
}

struct Machine<'a> {
    options: &'a ConvertOptions,
    labels: Labels<'a>,
    file: String,
    path: ResourcePath,
    containers: Vec<Container>,
    key: Vec<u8>,
    in_quotes: bool,
    value_context: bool,
    escape: Escape,
    value_open: bool,
    value_len: usize,
    slicing: bool,
    line: u64,
    stats: ConvertStats,
}

/// Converts one JSON document into canonical `path = value` lines.
///
/// The cancel token is polled before every input byte; on cancellation the
/// function returns [`ConvertError::Interrupted`] and whatever was already
/// written to `output` is the caller's to discard.
///
/// # Errors
///
/// Returns an error on malformed structure, bad `\u` escapes, exceeded
/// limits, or I/O failure on either stream.
pub fn canonicalize<R: BufRead, W: Write>(
    mut input: R,
    output: &mut W,
    slices: &mut SliceOutput,
    options: &ConvertOptions,
    cancel: &CancelToken,
    labels: Labels<'_>,
) -> Result<ConvertStats, ConvertError> {
    let mut machine = Machine::new(options, labels);

    loop {
        let buf = input.fill_buf().map_err(|e| ConvertError::io("read", labels.input, e))?;
        if buf.is_empty() {
            break;
        }
        let len = buf.len();
        for &b in buf {
            if cancel.is_cancelled() {
                return Err(ConvertError::Interrupted { file: machine.file.clone() });
            }
            machine.step(b, output, slices)?;
        }
        input.consume(len);
    }

    machine.finish(output, slices)?;
    output.flush().map_err(|e| ConvertError::io("write", labels.output, e))?;
    Ok(machine.stats)
}

/// Converts an in-memory document, returning the canonical text and slice lines.
///
/// # Examples
///
/// ```
/// use profile_diff::canonical::{ConvertOptions, canonicalize_bytes};
///
/// let (text, _) = canonicalize_bytes(br#"{"a":[10,20]}"#, &ConvertOptions::default())?;
/// assert_eq!(String::from_utf8_lossy(&text), "/a\n/a/0 = 10\n/a/1 = 20\n");
/// # Ok::<(), profile_diff::canonical::ConvertError>(())
/// ```
pub fn canonicalize_bytes(
    document: &[u8],
    options: &ConvertOptions,
) -> Result<(Vec<u8>, Vec<u8>), ConvertError> {
    let mut out = Vec::with_capacity(document.len() * 2);
    let mut slices = SliceOutput::Memory(Vec::new());
    let labels = Labels { input: Path::new("<memory>"), output: Path::new("<memory>") };
    canonicalize(document, &mut out, &mut slices, options, &CancelToken::new(), labels)?;
    let slice_bytes = slices.finish()?.unwrap_or_default();
    Ok((out, slice_bytes))
}

impl<'a> Machine<'a> {
    fn new(options: &'a ConvertOptions, labels: Labels<'a>) -> Self {
        Self {
            options,
            labels,
            file: labels.input.display().to_string(),
            path: ResourcePath::new(options.limits.max_path_len),
            containers: Vec::new(),
            key: Vec::new(),
            in_quotes: false,
            value_context: false,
            escape: Escape::None,
            value_open: false,
            value_len: 0,
            slicing: false,
            line: 1,
            stats: ConvertStats::default(),
        }
    }

    fn step<W: Write>(
        &mut self,
        b: u8,
        out: &mut W,
        slices: &mut SliceOutput,
    ) -> Result<(), ConvertError> {
        if self.in_quotes {
            self.step_quoted(b, out, slices)
        } else {
            self.step_structural(b, out, slices)
        }
    }

    fn step_structural<W: Write>(
        &mut self,
        b: u8,
        out: &mut W,
        slices: &mut SliceOutput,
    ) -> Result<(), ConvertError> {
        match b {
            b' ' | b'\t' | b'\r' => {}
            b'\n' => self.line += 1,
            b'{' => {
                self.terminal(out)?;
                self.containers.push(Container::Object { member_open: false });
                self.value_context = false;
                self.key.clear();
            }
            b'[' => {
                self.terminal(out)?;
                self.containers.push(Container::Array { index: 0 });
                self.push_index(0)?;
                self.value_context = true;
            }
            b':' => match self.containers.last_mut() {
                Some(Container::Object { member_open }) if !*member_open => {
                    *member_open = true;
                    self.push_key()?;
                    self.value_context = true;
                }
                _ => return Err(self.format_error("unexpected ':'")),
            },
            b',' => {
                self.close_value(out, slices)?;
                match self.containers.last_mut() {
                    Some(Container::Object { member_open }) => {
                        if *member_open {
                            *member_open = false;
                            self.path.pop();
                        }
                        self.value_context = false;
                        self.key.clear();
                    }
                    Some(Container::Array { index }) => {
                        *index += 1;
                        let next = *index;
                        self.path.pop();
                        self.push_index(next)?;
                        self.value_context = true;
                    }
                    None => return Err(self.format_error("unexpected ','")),
                }
            }
            b'}' | b']' => {
                self.close_value(out, slices)?;
                match (self.containers.pop(), b) {
                    (Some(Container::Object { member_open }), b'}') => {
                        if member_open {
                            self.path.pop();
                        }
                    }
                    (Some(Container::Array { .. }), b']') => self.path.pop(),
                    (Some(_), _) => {
                        return Err(self.format_error(&format!(
                            "mismatched '{}'",
                            char::from(b)
                        )));
                    }
                    (None, _) => {
                        return Err(self.format_error(&format!(
                            "unexpected '{}'",
                            char::from(b)
                        )));
                    }
                }
                self.value_context = false;
                self.key.clear();
            }
            b'"' => {
                self.in_quotes = true;
                if self.value_context {
                    self.put_value(out, slices, b"\"")?;
                }
            }
            _ => self.put_text(out, slices, &[b])?,
        }
        Ok(())
    }

    fn step_quoted<W: Write>(
        &mut self,
        b: u8,
        out: &mut W,
        slices: &mut SliceOutput,
    ) -> Result<(), ConvertError> {
        match self.escape {
            Escape::None => match b {
                b'"' => {
                    self.in_quotes = false;
                    if self.value_context {
                        self.put_value(out, slices, b"\"")?;
                    }
                }
                b'\\' => self.escape = Escape::Backslash,
                b'\n' => {
                    self.line += 1;
                    self.put_newline(out, slices)?;
                }
                _ => self.put_text(out, slices, &[b])?,
            },
            Escape::Backslash => {
                self.escape = Escape::None;
                match b {
                    b'u' => self.escape = Escape::Unicode { digits: 0, unit: 0, high: None },
                    b'n' if self.options.multiline => self.put_newline(out, slices)?,
                    _ => self.put_text(out, slices, &[b'\\', b])?,
                }
            }
            Escape::Unicode { digits, unit, high } => {
                let nibble = match char::from(b).to_digit(16) {
                    Some(n) => n,
                    None => return Err(self.unicode_error("invalid hex digit in \\u escape")),
                };
                let unit = (unit << 4) | nibble;
                if digits < 3 {
                    self.escape = Escape::Unicode { digits: digits + 1, unit, high };
                } else {
                    self.escape = Escape::None;
                    self.put_code_unit(out, slices, unit, high)?;
                }
            }
            Escape::LowBackslash { high } => {
                if b != b'\\' {
                    return Err(self.unicode_error("unpaired high surrogate"));
                }
                self.escape = Escape::LowU { high };
            }
            Escape::LowU { high } => {
                if b != b'u' {
                    return Err(self.unicode_error("unpaired high surrogate"));
                }
                self.escape = Escape::Unicode { digits: 0, unit: 0, high: Some(high) };
            }
        }
        Ok(())
    }

    fn put_code_unit<W: Write>(
        &mut self,
        out: &mut W,
        slices: &mut SliceOutput,
        unit: u32,
        high: Option<u32>,
    ) -> Result<(), ConvertError> {
        let code_point = match high {
            Some(high) => {
                if !(0xdc00..=0xdfff).contains(&unit) {
                    return Err(self.unicode_error("high surrogate not followed by low surrogate"));
                }
                0x10000 + ((high - 0xd800) << 10) + (unit - 0xdc00)
            }
            None => match unit {
                0xd800..=0xdbff => {
                    self.escape = Escape::LowBackslash { high: unit };
                    return Ok(());
                }
                0xdc00..=0xdfff => return Err(self.unicode_error("isolated low surrogate")),
                _ => unit,
            },
        };

        let ch = char::from_u32(code_point)
            .ok_or_else(|| self.unicode_error("invalid code point"))?;
        let mut buf = [0u8; 4];
        self.put_text(out, slices, ch.encode_utf8(&mut buf).as_bytes())
    }

    /// Routes string or bare-token bytes to the value or the pending key
    fn put_text<W: Write>(
        &mut self,
        out: &mut W,
        slices: &mut SliceOutput,
        bytes: &[u8],
    ) -> Result<(), ConvertError> {
        if self.value_context {
            self.put_value(out, slices, bytes)
        } else {
            self.append_key(bytes)
        }
    }

    fn put_newline<W: Write>(
        &mut self,
        out: &mut W,
        slices: &mut SliceOutput,
    ) -> Result<(), ConvertError> {
        if !self.value_context {
            return self.append_key(b"\n");
        }
        if !self.options.multiline_prefix {
            return self.put_value(out, slices, b"\n");
        }

        // close the current line and continue the value under the same path
        self.write_out(out, b"\"\n")?;
        self.write_out(out, self.path.as_bytes())?;
        self.write_out(out, b" .= \"")?;
        if self.slicing {
            slices.write_all(b"\"\n")?;
            slices.write_all(self.path.as_bytes())?;
            slices.write_all(b" .= \"")?;
        }
        Ok(())
    }

    fn put_value<W: Write>(
        &mut self,
        out: &mut W,
        slices: &mut SliceOutput,
        bytes: &[u8],
    ) -> Result<(), ConvertError> {
        if !self.value_open {
            self.value_open = true;
            self.value_len = 0;
            self.write_out(out, self.path.as_bytes())?;
            self.write_out(out, b" = ")?;
            self.stats.value_lines += 1;

            if self.options.is_slice(self.path.as_bytes()) {
                self.slicing = true;
                self.stats.slice_lines += 1;
                slices.write_all(self.path.as_bytes())?;
                slices.write_all(b" = ")?;
            }
        }

        if let Some(limit) = self.options.limits.max_value_len
            && self.value_len + bytes.len() > limit
        {
            return Err(ConvertError::ValueTooLong { file: self.file.clone(), line: self.line, limit });
        }
        self.value_len += bytes.len();

        self.write_out(out, bytes)?;
        if self.slicing {
            slices.write_all(bytes)?;
        }
        Ok(())
    }

    fn close_value<W: Write>(
        &mut self,
        out: &mut W,
        slices: &mut SliceOutput,
    ) -> Result<(), ConvertError> {
        if !self.value_open {
            return Ok(());
        }
        self.write_out(out, b"\n")?;
        if self.slicing {
            slices.write_all(b"\n")?;
            self.slicing = false;
        }
        self.value_open = false;
        Ok(())
    }

    /// Emits the bare path of a container about to be entered
    fn terminal<W: Write>(&mut self, out: &mut W) -> Result<(), ConvertError> {
        if self.options.show_terminals && !self.path.is_empty() {
            self.write_out(out, self.path.as_bytes())?;
            self.write_out(out, b"\n")?;
            self.stats.terminal_lines += 1;
        }
        Ok(())
    }

    fn append_key(&mut self, bytes: &[u8]) -> Result<(), ConvertError> {
        let limit = self.options.limits.max_name_len;
        if self.key.len() + bytes.len() > limit {
            return Err(ConvertError::NameTooLong { file: self.file.clone(), line: self.line, limit });
        }
        self.key.extend_from_slice(bytes);
        Ok(())
    }

    fn push_key(&mut self) -> Result<(), ConvertError> {
        let component = match self.options.escape {
            EscapeMode::None => Cow::Borrowed(self.key.as_slice()),
            EscapeMode::Escape => escape_component(&self.key),
            EscapeMode::Unescape => unescape_component(&self.key),
        };
        let pushed = self.path.push(&component);
        drop(component);
        self.key.clear();
        pushed.map_err(|_| self.path_error())
    }

    fn push_index(&mut self, index: u64) -> Result<(), ConvertError> {
        self.path
            .push_index(index, self.options.generate_indices)
            .map_err(|_| self.path_error())
    }

    fn finish<W: Write>(
        &mut self,
        out: &mut W,
        slices: &mut SliceOutput,
    ) -> Result<(), ConvertError> {
        if self.in_quotes {
            return Err(self.format_error("unterminated string at end of document"));
        }
        self.close_value(out, slices)?;
        if !self.containers.is_empty() {
            return Err(self.format_error("unexpected end of document"));
        }
        self.stats.input_lines = self.line;
        Ok(())
    }

    fn write_out<W: Write>(&self, out: &mut W, bytes: &[u8]) -> Result<(), ConvertError> {
        out.write_all(bytes).map_err(|e| ConvertError::io("write", self.labels.output, e))
    }

    fn format_error(&self, message: &str) -> ConvertError {
        ConvertError::Format { file: self.file.clone(), line: self.line, message: message.to_string() }
    }

    fn unicode_error(&self, message: &str) -> ConvertError {
        ConvertError::Unicode { file: self.file.clone(), line: self.line, message: message.to_string() }
    }

    fn path_error(&self) -> ConvertError {
        ConvertError::PathTooLong {
            file: self.file.clone(),
            line: self.line,
            limit: self.options.limits.max_path_len,
        }
    }
}
