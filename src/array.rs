//! The `{a, b, c}` array literal embedded in a setting's value.
//!
//! A value is an array only when the whole trimmed text is one balanced brace group. Elements
//! are split at top-level commas; commas inside quotes or nested groups do not split. Nested
//! groups are kept verbatim (`{{1},{2}}` yields `{1}` and `{2}`), and quoted elements lose their
//! surrounding quote runs but keep their inner whitespace.

use crate::util::{is_comment_marker, unquote};

/// Split `text` into its element strings, or `None` if it is not array-shaped.
///
/// Empty elements (`{,}`, `{13,}`) make the whole value a plain string.
#[must_use]
pub fn parse_array(text: &str) -> Option<Vec<String>> {
    let text = text.trim();
    if !text.starts_with('{') || !text.ends_with('}') || text.len() < 2 {
        return None;
    }

    let mut elements = Vec::new();
    let mut within_quotes = false;
    let mut depth = 0usize;
    let mut start = 1;

    for (i, c) in text.char_indices() {
        match c {
            '"' => within_quotes = !within_quotes,
            '{' if !within_quotes => depth += 1,
            '}' if !within_quotes => {
                depth = depth.checked_sub(1)?;
                // The opening brace must be closed by the final character, not earlier.
                if depth == 0 && i != text.len() - 1 {
                    return None;
                }
            }
            ',' if !within_quotes && depth == 1 => {
                elements.push(normalize_element(&text[start..i])?);
                start = i + 1;
            }
            _ => {}
        }
    }

    if within_quotes || depth != 0 {
        return None;
    }

    let last = &text[start..text.len() - 1];
    if elements.is_empty() && last.trim().is_empty() {
        return Some(elements);
    }
    elements.push(normalize_element(last)?);

    Some(elements)
}

/// Whether `text` would be read back as an array.
#[must_use]
pub fn is_array(text: &str) -> bool {
    parse_array(text).is_some()
}

fn normalize_element(element: &str) -> Option<String> {
    let element = element.trim();
    if element.is_empty() {
        return None;
    }

    Some(unquote(element).to_owned())
}

/// Render elements as an array literal that [`parse_array`] splits back into the same strings.
#[must_use]
pub fn format_array<S: AsRef<str>>(elements: &[S]) -> String {
    let mut text = String::with_capacity(2 + elements.len() * 8);
    text.push('{');

    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            text.push_str(", ");
        }

        let element = element.as_ref();
        if needs_quotes(element) {
            text.push('"');
            text.push_str(element);
            text.push('"');
        } else {
            text.push_str(element);
        }
    }

    text.push('}');
    text
}

fn needs_quotes(element: &str) -> bool {
    if element.is_empty() || element.trim() != element {
        return true;
    }

    let special = element
        .chars()
        .any(|c| matches!(c, ',' | '"') || is_comment_marker(c));
    let braces = element.contains(['{', '}']);

    special || (braces && !is_single_group(element))
}

/// A nested `{...}` element can be written bare when it is one balanced group.
fn is_single_group(element: &str) -> bool {
    if !element.starts_with('{') || !element.ends_with('}') {
        return false;
    }

    let mut depth = 0usize;
    for (i, c) in element.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = match depth.checked_sub(1) {
                    Some(depth) => depth,
                    None => return false,
                };
                if depth == 0 && i != element.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }

    depth == 0
}
