use std::iter::Enumerate;
use std::str::Lines;

use tracing::{debug, trace};

use crate::error::ParseError;
use crate::options::TextOptions;
use crate::section::Section;
use crate::setting::Setting;
use crate::util::{is_comment_marker, split_inline_comment};

/// Represents an on-going parse.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    lines: Enumerate<Lines<'a>>,
    options: &'a TextOptions,
    // Comment lines waiting for the section or setting they precede.
    pending: Vec<&'a str>,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(text: &'a str, options: &'a TextOptions) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        Self {
            lines: text.lines().enumerate(),
            options,
            pending: Vec::new(),
        }
    }
}

impl Parser<'_> {
    /// Consume every line, returning the sections in document order.
    pub fn into_sections(mut self) -> Result<Vec<Section>, ParseError> {
        let mut sections = Vec::<Section>::with_capacity(16);

        while let Some((index, line)) = self.lines.next() {
            let number = index + 1;
            let line = line.trim();

            match line.chars().next() {
                None => self.discard_pending(number),
                Some(c) if is_comment_marker(c) => {
                    if !self.options.ignore_pre_comments() {
                        self.pending.push(line[c.len_utf8()..].trim());
                    }
                }
                Some('[') => {
                    let mut section = self.parse_section_line(line, number)?;
                    section.set_pre_comment(self.take_pending());
                    trace!(name = section.name(), line = number, "parsed section");
                    sections.push(section);
                }
                Some(_) => {
                    let mut setting = self.parse_setting_line(line, number)?;
                    setting.set_pre_comment(self.take_pending());
                    trace!(name = setting.name(), line = number, "parsed setting");

                    // Settings above the first header belong to an unnamed section.
                    if sections.is_empty() {
                        sections.push(Section::new(""));
                    }
                    if let Some(section) = sections.last_mut() {
                        section.add(setting);
                    }
                }
            }
        }

        if !self.pending.is_empty() {
            debug!(
                lines = self.pending.len(),
                "discarding comment lines at end of input"
            );
        }

        Ok(sections)
    }

    fn take_pending(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }

        // `\n` whatever the document used; the writer emits `\n` as well.
        let comment = self.pending.join("\n");
        self.pending.clear();
        Some(comment)
    }

    fn discard_pending(&mut self, line: usize) {
        if !self.pending.is_empty() {
            trace!(
                lines = self.pending.len(),
                line,
                "discarding comment lines followed by a blank line"
            );
            self.pending.clear();
        }
    }

    /// Parse `[name]`, optionally followed by a comment.
    fn parse_section_line(&self, line: &str, number: usize) -> Result<Section, ParseError> {
        let Some(end) = line.find(']') else {
            return Err(ParseError::UnterminatedSectionName { line: number });
        };

        let mut section = Section::new(line[1..end].trim());
        let rest = line[end + 1..].trim_start();

        match rest.chars().next() {
            None => {}
            Some(c) if is_comment_marker(c) => {
                if !self.options.ignore_inline_comments() {
                    section.set_comment(Some(rest[c.len_utf8()..].trim().to_owned()));
                }
            }
            Some(c) => return Err(ParseError::UnexpectedCharacter { line: number, c }),
        }

        Ok(section)
    }

    /// Parse `name = value`, optionally followed by a comment.
    fn parse_setting_line(&self, line: &str, number: usize) -> Result<Setting, ParseError> {
        let (content, comment) = split_inline_comment(line, self.options.ignore_inline_comments())
            .map_err(|_| ParseError::UnterminatedString { line: number })?;

        let Some((name, value)) = content.split_once('=') else {
            return Err(ParseError::MissingAssignment { line: number });
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(ParseError::SettingNameEmpty { line: number });
        }

        let mut setting = Setting::with_value(name, value.trim());
        setting.set_comment(comment.map(str::to_owned));

        Ok(setting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setting::Value;

    fn parse(text: &str) -> Result<Vec<Section>, ParseError> {
        Parser::new(text, &TextOptions::default()).into_sections()
    }

    fn find<'s>(sections: &'s [Section], name: &str) -> &'s Section {
        sections
            .iter()
            .find(|section| section.name() == name)
            .unwrap_or_else(|| panic!("section {name:?} should exist"))
    }

    fn setting<'s>(section: &'s Section, name: &str) -> &'s Setting {
        section
            .get(name)
            .unwrap_or_else(|| panic!("setting {name:?} should exist"))
    }

    const COMMENTED: &str = "# Line1\r\n\
        ; Line2\r\n\
        #\r\n\
        # Line4\r\n\
        [Section] # InlineComment1\r\n\
        Setting = Value ; InlineComment2\r\n\
        \r\n\
        # Line1   \r\n\
        #Line2 \r\n\
        ## ###\r\n\
        ;Line4\r\n\
        [Section2]\r\n\
        Setting=\"Val;#ue\"# InlineComment3\r\n\
        ValidUglySetting1 = \"this is # not a comment\" # this is a comment \"with a quote\" inside\r\n\
        ValidUglySetting2 = this is \\# not a comment # this is a comment\r\n\
        ValidUglySetting3 = { first, \"second # still, second\" } # comment \"with a quote\" and a closing brace }";

    #[test]
    fn crlf_comment_lines_join_with_newline() {
        let sections = parse("# Line1\r\n# Line2\r\n[S]\r\n").expect("document is valid");
        assert_eq!(sections[0].pre_comment(), Some("Line1\nLine2"));
    }

    #[test]
    fn comments_attach_to_the_next_item() {
        let sections = parse(COMMENTED).expect("document is valid");
        assert_eq!(sections.len(), 2);

        let section = find(&sections, "Section");
        let section2 = find(&sections, "Section2");

        assert_eq!(section.pre_comment(), Some("Line1\nLine2\n\nLine4"));
        assert_eq!(section2.pre_comment(), Some("Line1\nLine2\n# ###\nLine4"));
        assert_eq!(section.comment(), Some("InlineComment1"));
        assert_eq!(section2.comment(), None);

        assert_eq!(setting(section, "Setting").comment(), Some("InlineComment2"));
        assert_eq!(setting(section2, "Setting").comment(), Some("InlineComment3"));
        assert_eq!(
            setting(section2, "ValidUglySetting1").comment(),
            Some("this is a comment \"with a quote\" inside")
        );
        assert_eq!(
            setting(section2, "ValidUglySetting2").comment(),
            Some("this is a comment")
        );
        assert_eq!(
            setting(section2, "ValidUglySetting3").comment(),
            Some("comment \"with a quote\" and a closing brace }")
        );
    }

    #[test]
    fn quoted_and_escaped_markers_are_values() {
        let sections = parse(COMMENTED).expect("document is valid");
        let section = find(&sections, "Section");
        let section2 = find(&sections, "Section2");

        assert_eq!(setting(section, "Setting").string_value().ok().as_deref(), Some("Value"));
        assert_eq!(setting(section2, "Setting").string_value().ok().as_deref(), Some("Val;#ue"));
        assert_eq!(
            setting(section2, "ValidUglySetting1").string_value().ok().as_deref(),
            Some("this is # not a comment")
        );
        assert_eq!(
            setting(section2, "ValidUglySetting2").string_value().ok().as_deref(),
            Some("this is # not a comment")
        );
        assert_eq!(
            setting(section2, "ValidUglySetting3").value(),
            &Value::List(vec!["first".into(), "second # still, second".into()])
        );
    }

    #[test]
    fn duplicate_sections_are_kept_apart() {
        let sections = parse("[A]\nx = 1\n[B]\n[A]\nx = 2\n").expect("document is valid");

        let names = sections.iter().map(Section::name).collect::<Vec<_>>();
        assert_eq!(names, ["A", "B", "A"]);
        assert_eq!(sections[2].get("x").map(|s| s.raw_value().into_owned()).as_deref(), Some("2"));
    }

    #[test]
    fn settings_before_any_header() {
        let sections = parse("a = 1\n[S]\nb = 2").expect("document is valid");

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name(), "");
        assert!(sections[0].contains("a"));
        assert!(sections[1].contains("b"));
    }

    #[test]
    fn names_and_values_are_trimmed() {
        let sections = parse("[  Spaced  ]\n  key   =   some value  \nempty =").expect("document is valid");
        let section = find(&sections, "Spaced");

        assert_eq!(setting(section, "key").raw_value(), "some value");
        assert_eq!(setting(section, "empty").raw_value(), "");
        assert_eq!(setting(section, "empty").value(), &Value::Raw(String::new()));
    }

    #[test]
    fn value_may_contain_equals() {
        let sections = parse("[S]\nexpr = a = b").expect("document is valid");
        assert_eq!(setting(&sections[0], "expr").raw_value(), "a = b");
    }

    #[test]
    fn blank_line_detaches_comments() {
        let sections = parse("# stray\n\n[S]\n# kept\nx = 1\n# trailing").expect("document is valid");

        assert_eq!(sections[0].pre_comment(), None);
        assert_eq!(setting(&sections[0], "x").pre_comment(), Some("kept"));
    }

    #[test]
    fn errors_carry_line_numbers() {
        assert!(matches!(
            parse("[S]\nx = 1\n[Broken"),
            Err(ParseError::UnterminatedSectionName { line: 3 })
        ));
        assert!(matches!(
            parse("[S] junk"),
            Err(ParseError::UnexpectedCharacter { line: 1, c: 'j' })
        ));
        assert!(matches!(
            parse("[S]\n\nx = \"open"),
            Err(ParseError::UnterminatedString { line: 3 })
        ));
        assert!(matches!(
            parse("[S]\njust words"),
            Err(ParseError::MissingAssignment { line: 2 })
        ));
        assert!(matches!(
            parse("[S]\n = 1"),
            Err(ParseError::SettingNameEmpty { line: 2 })
        ));
    }

    #[test]
    fn empty_section_name() {
        let sections = parse("[]\nx = 1").expect("document is valid");
        assert_eq!(sections[0].name(), "");
    }

    #[test]
    fn ignore_inline_comments() {
        let options = TextOptions::new().with_ignore_inline_comments(true);
        let sections = Parser::new("[S] # c\nx = a # b", &options)
            .into_sections()
            .expect("document is valid");

        assert_eq!(sections[0].comment(), None);
        let x = setting(&sections[0], "x");
        assert_eq!(x.raw_value(), "a # b");
        assert_eq!(x.comment(), None);
    }

    #[test]
    fn ignore_pre_comments() {
        let options = TextOptions::new().with_ignore_pre_comments(true);
        let sections = Parser::new("# about\n[S]\n; more\nx = 1", &options)
            .into_sections()
            .expect("document is valid");

        assert_eq!(sections[0].pre_comment(), None);
        assert_eq!(setting(&sections[0], "x").pre_comment(), None);
    }

    #[test]
    fn byte_order_mark_is_skipped() {
        let sections = parse("\u{feff}[S]\nx = 1").expect("document is valid");
        assert_eq!(sections[0].name(), "S");
    }
}
