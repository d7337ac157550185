use std::borrow::Cow;

/// Characters that start a comment, either on a line of their own or after a value.
pub const COMMENT_MARKERS: [char; 2] = ['#', ';'];

#[must_use]
pub fn is_comment_marker(c: char) -> bool {
    COMMENT_MARKERS.contains(&c)
}

/// Strip matching runs of double quotes from both ends.
///
/// `"a"` and `"""a"""` both become `a`, while `"first""second"` keeps its inner pair. Text that
/// does not start and end with a quote is returned unchanged.
#[must_use]
pub fn unquote(text: &str) -> &str {
    let leading = text.bytes().take_while(|&b| b == b'"').count();
    let trailing = text.bytes().rev().take_while(|&b| b == b'"').count();
    let strip = leading.min(trailing).min(text.len() / 2);

    &text[strip..text.len() - strip]
}

/// A line ended while a double-quoted run was still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnterminatedQuote;

/// Split a line at its first unquoted, unescaped comment marker.
///
/// Returns the content before the marker with `\#` and `\;` resolved (outside quotes only) and
/// the trimmed comment text, if any. With `keep_markers` set, markers never start a comment and
/// the content is returned verbatim.
pub fn split_inline_comment(
    line: &str,
    keep_markers: bool,
) -> Result<(Cow<'_, str>, Option<&str>), UnterminatedQuote> {
    let mut within_quotes = false;
    let mut content = None::<String>;
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => within_quotes = !within_quotes,
            '\\' if !within_quotes && !keep_markers => {
                if let Some(&(_, next)) = chars.peek().filter(|&&(_, next)| is_comment_marker(next))
                {
                    _ = chars.next();
                    content
                        .get_or_insert_with(|| line[..i].to_owned())
                        .push(next);
                    continue;
                }
            }
            c if is_comment_marker(c) && !within_quotes && !keep_markers => {
                let comment = line[i + c.len_utf8()..].trim();
                let content = content.map_or(Cow::Borrowed(&line[..i]), Cow::Owned);
                return Ok((content, Some(comment)));
            }
            _ => {}
        }

        if let Some(content) = content.as_mut() {
            content.push(c);
        }
    }

    if within_quotes {
        return Err(UnterminatedQuote);
    }

    Ok((content.map_or(Cow::Borrowed(line), Cow::Owned), None))
}

/// Inverse of the unescaping done by [`split_inline_comment`]: prefix every unquoted comment
/// marker with a backslash.
#[must_use]
pub fn escape_comment_markers(value: &str) -> Cow<'_, str> {
    let mut within_quotes = false;
    let mut escaped = None::<String>;

    for (i, c) in value.char_indices() {
        match c {
            '"' => within_quotes = !within_quotes,
            c if is_comment_marker(c) && !within_quotes => {
                escaped
                    .get_or_insert_with(|| value[..i].to_owned())
                    .push('\\');
            }
            _ => {}
        }

        if let Some(escaped) = escaped.as_mut() {
            escaped.push(c);
        }
    }

    escaped.map_or(Cow::Borrowed(value), Cow::Owned)
}
