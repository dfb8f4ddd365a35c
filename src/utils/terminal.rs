//! Terminal output sanitization
//!
//! Personality names are read back from slice files, i.e. from profile
//! content. They go through [`sanitize_for_display`] before being printed so
//! a crafted value cannot inject ANSI escape sequences into the report.

/// Strips ANSI CSI sequences and control characters from a string
///
/// # Examples
///
/// ```
/// use profile_diff::utils::terminal::sanitize_for_display;
///
/// assert_eq!(sanitize_for_display("\x1b[31mprod-web\x1b[0m"), "prod-web");
/// ```
pub fn sanitize_for_display(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // CSI runs until its final letter
            for next_ch in chars.by_ref() {
                if next_ch.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }

        if ch.is_control() {
            continue;
        }

        result.push(ch);
    }

    result
}

/// Removes one pair of surrounding double quotes, if present
pub fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
