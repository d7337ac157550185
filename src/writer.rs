use std::borrow::Cow;
use std::fmt::{self, Write};

use crate::error::WriteError;
use crate::options::TextOptions;
use crate::section::Section;
use crate::setting::{Setting, Value};
use crate::util::{escape_comment_markers, is_comment_marker};

/// Reject names and values that the [`Parser`](crate::parser::Parser) would read back differently,
/// or not at all, once written with `options`.
///
/// Section names may not contain `]`. Setting names may not be empty, contain `=` or an odd
/// number of `"`, or start with `[`. Neither may contain line breaks or edge whitespace. Scalar
/// values and array elements need an even number of `"`.
pub fn check_sections(sections: &[Section], options: &TextOptions) -> Result<(), WriteError> {
    for section in sections {
        let name = section.name();
        if name.contains(']') || !is_plain(name) {
            return Err(WriteError::InvalidSectionName {
                name: name.to_owned(),
            });
        }

        for setting in section {
            check_setting(setting, options)?;
        }
    }

    Ok(())
}

fn check_setting(setting: &Setting, options: &TextOptions) -> Result<(), WriteError> {
    let name = setting.name();

    // Unescaped, a leading marker turns the whole line into a comment.
    let bad_start = name.starts_with('[')
        || (options.ignore_inline_comments() && name.starts_with(is_comment_marker));

    if name.is_empty()
        || bad_start
        || name.contains('=')
        || has_open_quote(name)
        || !is_plain(name)
    {
        return Err(WriteError::InvalidSettingName {
            name: name.to_owned(),
        });
    }

    let balanced = match setting.value() {
        Value::Raw(text) => !has_open_quote(text),
        Value::List(elements) => elements.iter().all(|element| !has_open_quote(element)),
    };
    if !balanced {
        return Err(WriteError::UnbalancedQuotes {
            setting: name.to_owned(),
        });
    }

    Ok(())
}

/// No line breaks and no edge whitespace.
fn is_plain(name: &str) -> bool {
    !name.contains(['\n', '\r']) && name.trim() == name
}

fn has_open_quote(text: &str) -> bool {
    text.matches('"').count() % 2 == 1
}

/// Renders sections in the text format the [`Parser`](crate::parser::Parser) reads.
pub struct Writer<'a, W> {
    out: W,
    options: &'a TextOptions,
}

impl<'a, W: Write> Writer<'a, W> {
    pub fn new(out: W, options: &'a TextOptions) -> Self {
        Self { out, options }
    }

    pub fn write_sections(&mut self, sections: &[Section]) -> fmt::Result {
        for (i, section) in sections.iter().enumerate() {
            if i > 0 {
                self.out.write_char('\n')?;
            }

            self.write_section(section, i == 0)?;
        }

        Ok(())
    }

    fn write_section(&mut self, section: &Section, first: bool) -> fmt::Result {
        let pre_comment = self.pre_comment(section.pre_comment());
        let comment = self.inline_comment(section.comment());

        // A leading unnamed section reads back from bare settings, so its header can be left out.
        let headerless = first
            && section.name().is_empty()
            && pre_comment.is_none()
            && comment.is_none()
            && !section.is_empty();

        if !headerless {
            self.write_pre_comment(pre_comment)?;
            write!(self.out, "[{}]", section.name())?;
            self.write_inline_comment(comment)?;
            self.out.write_char('\n')?;
        }

        for setting in section {
            self.write_setting(setting)?;
        }

        Ok(())
    }

    fn write_setting(&mut self, setting: &Setting) -> fmt::Result {
        self.write_pre_comment(self.pre_comment(setting.pre_comment()))?;

        let name = self.escape(setting.name());
        let value = match setting.value() {
            Value::Raw(text) => self.escape(text),
            value => value.to_text(),
        };

        write!(self.out, "{name}{}{value}", self.options.assignment())?;
        self.write_inline_comment(self.inline_comment(setting.comment()))?;
        self.out.write_char('\n')
    }

    fn pre_comment<'c>(&self, comment: Option<&'c str>) -> Option<&'c str> {
        comment.filter(|_| !self.options.ignore_pre_comments())
    }

    fn inline_comment<'c>(&self, comment: Option<&'c str>) -> Option<&'c str> {
        comment.filter(|_| !self.options.ignore_inline_comments())
    }

    fn escape<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.options.ignore_inline_comments() {
            Cow::Borrowed(text)
        } else {
            escape_comment_markers(text)
        }
    }

    fn write_pre_comment(&mut self, comment: Option<&str>) -> fmt::Result {
        let Some(comment) = comment else {
            return Ok(());
        };

        let marker = self.options.comment_char();
        for line in comment.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                writeln!(self.out, "{marker}")?;
            } else {
                writeln!(self.out, "{marker} {line}")?;
            }
        }

        Ok(())
    }

    fn write_inline_comment(&mut self, comment: Option<&str>) -> fmt::Result {
        let Some(comment) = comment else {
            return Ok(());
        };

        write!(self.out, " {}", self.options.comment_char())?;
        if !comment.is_empty() {
            write!(self.out, " {comment}")?;
        }

        Ok(())
    }
}
