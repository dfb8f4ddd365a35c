//! Path component escaping.
//!
//! Quattor profiles encode awkward key characters as `_XX` hex sequences.
//! [`escape_component`] produces that form from raw keys and
//! [`unescape_component`] reverses it on a best-effort basis. Either way a
//! component that was rewritten is wrapped in `{ }` so it stands out in the
//! canonical text.
//!
//! Unescaping is a heuristic: a literal underscore followed by two hex digits
//! is indistinguishable from an escape. Only sequences that decode to
//! punctuation-like ASCII (the bytes a profile compiler would have had to
//! escape) are expanded; everything else is left untouched.

use std::borrow::Cow;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Printed once per run when unescaping is enabled
pub const UNESCAPE_WARNING: &str = "unescaping path components is heuristic: this tool cannot know which \
     elements were escaped and which ones were not";

fn is_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// True for bytes a `_XX` sequence is allowed to decode to
fn is_unescapable(b: u8) -> bool {
    matches!(b, 0x20..=0x40 | 0x5b..=0x60 | 0x7b..=0x7e)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Encodes every byte outside `[A-Za-z0-9_]` as `_XX` (uppercase hex).
///
/// Components that need no escaping are returned unchanged.
///
/// # Examples
///
/// ```
/// use profile_diff::canonical::escape::escape_component;
///
/// assert_eq!(escape_component(b"a:b").as_ref(), b"{a_3Ab}");
/// assert_eq!(escape_component(b"hardware").as_ref(), b"hardware");
/// ```
pub fn escape_component(raw: &[u8]) -> Cow<'_, [u8]> {
    if raw.iter().all(|&b| is_safe(b)) {
        return Cow::Borrowed(raw);
    }

    let mut out = Vec::with_capacity(raw.len() * 3 + 2);
    out.push(b'{');
    for &b in raw {
        if is_safe(b) {
            out.push(b);
        } else {
            out.push(b'_');
            out.push(HEX_UPPER[(b >> 4) as usize]);
            out.push(HEX_UPPER[(b & 0x0f) as usize]);
        }
    }
    out.push(b'}');
    Cow::Owned(out)
}

/// Decodes `_XX` sequences that land in the punctuation ranges.
///
/// # Examples
///
/// ```
/// use profile_diff::canonical::escape::unescape_component;
///
/// assert_eq!(unescape_component(b"a_3ab").as_ref(), b"{a:b}");
/// // `_41` would decode to a letter, which is never escaped
/// assert_eq!(unescape_component(b"x_41").as_ref(), b"x_41");
/// ```
pub fn unescape_component(raw: &[u8]) -> Cow<'_, [u8]> {
    if !raw.contains(&b'_') {
        return Cow::Borrowed(raw);
    }

    let mut out = Vec::with_capacity(raw.len() + 2);
    out.push(b'{');
    let mut decoded_any = false;
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'_'
            && let (Some(&hi), Some(&lo)) = (raw.get(i + 1), raw.get(i + 2))
            && let (Some(hi), Some(lo)) = (hex_value(hi), hex_value(lo))
        {
            let byte = (hi << 4) | lo;
            if is_unescapable(byte) {
                out.push(byte);
                decoded_any = true;
                i += 3;
                continue;
            }
        }
        out.push(raw[i]);
        i += 1;
    }

    if !decoded_any {
        return Cow::Borrowed(raw);
    }
    out.push(b'}');
    Cow::Owned(out)
}
