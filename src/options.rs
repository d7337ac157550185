use crate::error::OptionsError;
use crate::util::is_comment_marker;

/// Knobs for reading and writing the text format.
///
/// The same options should be used for both directions; text written with a set of options reads
/// back to an equal document only under those options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOptions {
    comment_char: char,
    spaced_assignment: bool,
    ignore_inline_comments: bool,
    ignore_pre_comments: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            comment_char: '#',
            spaced_assignment: true,
            ignore_inline_comments: false,
            ignore_pre_comments: false,
        }
    }
}

impl TextOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marker written in front of comments. Both markers are always accepted when reading.
    ///
    /// # Errors
    ///
    /// Returns an error unless `c` is `#` or `;`.
    pub fn with_comment_char(mut self, c: char) -> Result<Self, OptionsError> {
        if !is_comment_marker(c) {
            return Err(OptionsError::InvalidCommentChar(c));
        }

        self.comment_char = c;
        Ok(self)
    }

    /// Write `name = value` when set, `name=value` otherwise.
    #[must_use]
    pub fn with_spaced_assignment(mut self, spaced: bool) -> Self {
        self.spaced_assignment = spaced;
        self
    }

    /// Treat comment markers after a value as part of the value, and write values unescaped.
    /// Inline comments are neither read nor written.
    #[must_use]
    pub fn with_ignore_inline_comments(mut self, ignore: bool) -> Self {
        self.ignore_inline_comments = ignore;
        self
    }

    /// Drop comment lines when reading and never write them.
    #[must_use]
    pub fn with_ignore_pre_comments(mut self, ignore: bool) -> Self {
        self.ignore_pre_comments = ignore;
        self
    }

    #[must_use]
    pub fn comment_char(&self) -> char {
        self.comment_char
    }

    #[must_use]
    pub fn spaced_assignment(&self) -> bool {
        self.spaced_assignment
    }

    #[must_use]
    pub fn ignore_inline_comments(&self) -> bool {
        self.ignore_inline_comments
    }

    #[must_use]
    pub fn ignore_pre_comments(&self) -> bool {
        self.ignore_pre_comments
    }

    pub(crate) fn assignment(&self) -> &'static str {
        if self.spaced_assignment { " = " } else { "=" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = TextOptions::default();

        assert_eq!(options.comment_char(), '#');
        assert!(options.spaced_assignment());
        assert!(!options.ignore_inline_comments());
        assert!(!options.ignore_pre_comments());
        assert_eq!(options.assignment(), " = ");
    }

    #[test]
    fn comment_char_must_be_a_marker() {
        let options = TextOptions::new().with_comment_char(';');
        assert_eq!(options.map(|o| o.comment_char()), Ok(';'));

        assert_eq!(
            TextOptions::new().with_comment_char('/'),
            Err(OptionsError::InvalidCommentChar('/'))
        );
    }
}
