//! Read, edit and write INI-style configuration files.
//!
//! A [`Configuration`] is an ordered list of [`Section`]s, each an ordered list of named
//! [`Setting`]s. Names may repeat at both levels; lookups by name return the first match. A
//! setting stores text, or a list of texts when its value is written as an array literal such as
//! `{1, 2, 3}`, and converts to typed values on demand.
//!
//! ```
//! use inicfg::Configuration;
//!
//! let mut config = Configuration::parse(
//!     "# Window placement\n\
//!      [Window]\n\
//!      Title = Main # shown in the task bar\n\
//!      Size = {800, 600}\n",
//! )
//! .unwrap();
//!
//! let window = config.entry("Window");
//! assert_eq!(window.get("Size").unwrap().get_value_array::<u32>().unwrap(), [800, 600]);
//!
//! window.entry("Maximized").set_value(&true).unwrap();
//! assert!(config.to_string().contains("Maximized = true"));
//! ```
//!
//! Configurations can also be stored in a compact binary form that keeps content the text format
//! cannot express, such as line breaks inside values.

#![warn(
    clippy::correctness,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::style,
    clippy::pedantic
)]

mod array;
mod binary;
mod binding;
pub mod convert;
mod error;
mod options;
mod parser;
mod section;
mod setting;
mod util;
mod writer;

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::{char, fmt, slice};

use tracing::debug;

pub use crate::array::{format_array, is_array, parse_array};
pub use crate::binding::{MemberReader, MemberWriter, SectionObject};
pub use crate::convert::{
    ConfigEnum, ConverterRegistry, SettingValue, TypeStringConverter,
    register_type_string_converter,
};
pub use crate::error::{
    BinaryError, BoxError, ErrorKind, InvalidValue, OptionsError, ParseError, SettingError,
    WriteError,
};
pub use crate::options::TextOptions;
use crate::parser::Parser;
pub use crate::section::Section;
pub use crate::setting::{Setting, Value};
use crate::writer::{Writer, check_sections};

/// Byte Order Mark (BOM) is used to signal the endianness of an encoding. The order `0xFF 0xFE`
/// strongly suggests that the encoding is using little-endian byte order.
///
/// <https://en.wikipedia.org/wiki/Byte_order_mark>
const BOM_LE: &[u8] = &[0xFF, 0xFE];

/// UTF-8 encoded BOM, written by some editors in front of otherwise plain text.
const BOM_UTF8: &[u8] = &[0xEF, 0xBB, 0xBF];

/// An ordered collection of sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    sections: Vec<Section>,
}

impl Configuration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse text with the default [`TextOptions`].
    ///
    /// # Errors
    ///
    /// Returns an error describing the first malformed line.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Self::parse_with(text, &TextOptions::default())
    }

    /// # Errors
    ///
    /// Returns an error describing the first malformed line.
    pub fn parse_with(text: &str, options: &TextOptions) -> Result<Self, ParseError> {
        let sections = Parser::new(text, options).into_sections()?;
        debug!(sections = sections.len(), "parsed text configuration");

        Ok(Self { sections })
    }

    /// Parse raw file contents, honoring a UTF-8 or UTF-16 LE byte order mark.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first malformed line.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        Self::parse(&decode_data(data))
    }

    /// # Errors
    ///
    /// Returns an error if reading fails or the text is malformed.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, ParseError> {
        let mut buffer = Vec::with_capacity(4096);
        reader
            .read_to_end(&mut buffer)
            .map_err(|source| ParseError::ReadFailure { source })?;

        Self::from_bytes(&buffer)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its text is malformed.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let data = fs::read(path).map_err(|source| ParseError::ReadFailure { source })?;
        Self::from_bytes(&data)
    }

    /// Render the text form with `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if a name or value would not read back unchanged, such as a setting
    /// named `a=b` or a value with an unmatched `"`. The binary form has no such limits.
    pub fn to_text(&self, options: &TextOptions) -> Result<String, WriteError> {
        check_sections(&self.sections, options)?;

        let mut text = String::with_capacity(64 * self.sections.len());
        // Writing into a String cannot fail.
        _ = Writer::new(&mut text, options).write_sections(&self.sections);
        Ok(text)
    }

    /// Write the text form with the default [`TextOptions`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration has no text form or writing fails.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), WriteError> {
        self.write_with(writer, &TextOptions::default())
    }

    /// # Errors
    ///
    /// Returns an error if the configuration has no text form or writing fails.
    pub fn write_with<W: Write>(&self, writer: W, options: &TextOptions) -> Result<(), WriteError> {
        let text = self.to_text(options)?;
        self.write_rendered(writer, &text)
    }

    /// # Errors
    ///
    /// Returns an error if the configuration has no text form, or the file cannot be created or
    /// written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteError> {
        self.save_to_file_with(path, &TextOptions::default())
    }

    /// # Errors
    ///
    /// Returns an error if the configuration has no text form, or the file cannot be created or
    /// written.
    pub fn save_to_file_with<P: AsRef<Path>>(
        &self,
        path: P,
        options: &TextOptions,
    ) -> Result<(), WriteError> {
        // Rendered before the file is created so a rejected configuration leaves nothing behind.
        let text = self.to_text(options)?;
        self.write_rendered(BufWriter::new(File::create(path)?), &text)
    }

    fn write_rendered<W: Write>(&self, mut writer: W, text: &str) -> Result<(), WriteError> {
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        debug!(sections = self.sections.len(), "wrote text configuration");

        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if a name, comment or value is longer than the format allows.
    pub fn to_binary_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.write_binary(&mut buffer)?;
        Ok(buffer)
    }

    /// # Errors
    ///
    /// Returns an error if writing fails or some text is longer than the format allows.
    pub fn write_binary<W: Write>(&self, mut writer: W) -> io::Result<()> {
        binary::write_sections(&mut writer, &self.sections)?;
        writer.flush()?;
        debug!(sections = self.sections.len(), "wrote binary configuration");

        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_binary_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        self.write_binary(BufWriter::new(File::create(path)?))
    }

    /// # Errors
    ///
    /// Returns an error if `data` is not exactly one well-formed binary configuration.
    pub fn from_binary_bytes(data: &[u8]) -> Result<Self, BinaryError> {
        Self::from_binary_reader(data)
    }

    /// Decode a binary configuration, consuming `reader` to its end.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or the data is malformed.
    pub fn from_binary_reader<R: Read>(mut reader: R) -> Result<Self, BinaryError> {
        let sections = binary::read_sections(&mut reader)?;
        debug!(sections = sections.len(), "read binary configuration");

        Ok(Self { sections })
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its data is malformed.
    pub fn load_from_binary_file<P: AsRef<Path>>(path: P) -> Result<Self, BinaryError> {
        Self::from_binary_reader(BufReader::new(File::open(path)?))
    }

    /// Number of sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn iter(&self) -> slice::Iter<'_, Section> {
        self.sections.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, Section> {
        self.sections.iter_mut()
    }

    #[must_use]
    pub fn section_at(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// The first section called `name`.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.name() == name)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find(|section| section.name() == name)
    }

    /// The first section called `name`, appending an empty one if there is none.
    pub fn entry(&mut self, name: &str) -> &mut Section {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        };

        &mut self.sections[index]
    }

    /// Every section called `name`, in document order.
    pub fn sections_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Section> {
        self.sections
            .iter()
            .filter(move |section| section.name() == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Whether the first section called `section` has a setting called `setting`.
    #[must_use]
    pub fn contains_setting(&self, section: &str, setting: &str) -> bool {
        self.section(section)
            .is_some_and(|section| section.contains(setting))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sections
            .iter()
            .position(|section| section.name() == name)
    }

    /// Append `section`, even if one with the same name exists.
    pub fn add(&mut self, section: Section) -> &mut Section {
        self.sections.push(section);
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    /// Remove the first section called `name`.
    pub fn remove(&mut self, name: &str) -> bool {
        self.position(name)
            .map(|index| self.sections.remove(index))
            .is_some()
    }

    /// Remove every section called `name`, returning how many were removed.
    pub fn remove_all_named(&mut self, name: &str) -> usize {
        let before = self.sections.len();
        self.sections.retain(|section| section.name() != name);
        before - self.sections.len()
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Section> {
        (index < self.sections.len()).then(|| self.sections.remove(index))
    }

    pub fn clear(&mut self) {
        self.sections.clear();
    }
}

/// Renders with the default [`TextOptions`] without checking names or quotes; use
/// [`Configuration::to_text`] to reject content the text form cannot hold.
impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Writer::new(f, &TextOptions::default()).write_sections(&self.sections)
    }
}

impl<'a> IntoIterator for &'a Configuration {
    type Item = &'a Section;
    type IntoIter = slice::Iter<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.sections.iter()
    }
}

impl<'a> IntoIterator for &'a mut Configuration {
    type Item = &'a mut Section;
    type IntoIter = slice::IterMut<'a, Section>;

    fn into_iter(self) -> Self::IntoIter {
        self.sections.iter_mut()
    }
}

impl Extend<Section> for Configuration {
    fn extend<I: IntoIterator<Item = Section>>(&mut self, iter: I) {
        self.sections.extend(iter);
    }
}

impl FromIterator<Section> for Configuration {
    fn from_iter<I: IntoIterator<Item = Section>>(iter: I) -> Self {
        Self {
            sections: iter.into_iter().collect(),
        }
    }
}

fn decode_data(data: &[u8]) -> String {
    if let Some(data) = data.strip_prefix(BOM_LE) {
        // Likely UTF-16 LE
        let utf16 = data
            .chunks_exact(2)
            .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
            .collect::<Vec<u16>>();

        char::decode_utf16(utf16)
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect::<String>()
    } else {
        let data = data.strip_prefix(BOM_UTF8).unwrap_or(data);
        String::from_utf8_lossy(data).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_le_is_decoded() {
        let mut data = BOM_LE.to_vec();
        data.extend("[S]\r\nkey = välue\r\n".encode_utf16().flat_map(u16::to_le_bytes));

        let config = Configuration::from_bytes(&data).expect("document is valid");
        let value = config.section("S").and_then(|s| s.get("key")).map(Setting::raw_value);
        assert_eq!(value.as_deref(), Some("välue"));
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let data = [BOM_UTF8, b"[S]\nkey = 1\n".as_slice()].concat();

        let config = Configuration::from_bytes(&data).expect("document is valid");
        assert!(config.contains_setting("S", "key"));
    }

    #[test]
    fn indexer_creates_sections_and_settings() {
        let mut config = Configuration::new();
        config.entry("TestSection").entry("IntSetting1").set_value(&100).expect("builtin type");
        config.entry("TestSection").entry("IntSetting2").set_value(&200).expect("builtin type");
        config
            .entry("TestSection")
            .entry("StringSetting1")
            .set_value(&"Test".to_owned())
            .expect("builtin type");

        assert_eq!(config.len(), 1);
        assert_eq!(config.entry("TestSection").len(), 3);
        assert!(config.contains_setting("TestSection", "StringSetting1"));
        assert!(!config.contains_setting("TestSection", "Missing"));
        assert!(!config.contains_setting("Missing", "IntSetting1"));
    }

    #[test]
    fn duplicate_sections() {
        let mut config = Configuration::parse("[A]\nx = 1\n[A]\nx = 2").expect("document is valid");
        config.add(Section::new("A"));

        assert_eq!(config.sections_named("A").count(), 3);
        let first = config.section("A").and_then(|s| s.get("x")).map(Setting::raw_value);
        assert_eq!(first.as_deref(), Some("1"));

        assert!(config.remove("A"));
        let first = config.section("A").and_then(|s| s.get("x")).map(Setting::raw_value);
        assert_eq!(first.as_deref(), Some("2"));

        assert_eq!(config.remove_all_named("A"), 2);
        assert!(config.is_empty());
    }

    #[test]
    fn remove_by_index() {
        let mut config = [Section::new("A"), Section::new("B")]
            .into_iter()
            .collect::<Configuration>();

        assert_eq!(config.remove_at(0).map(|s| s.name().to_owned()).as_deref(), Some("A"));
        assert!(config.remove_at(3).is_none());
        assert_eq!(config.section_at(0).map(Section::name), Some("B"));

        config.clear();
        assert!(config.is_empty());
    }

    #[test]
    fn display_uses_default_options() {
        let config = Configuration::parse("[S] ; about\nkey=value").expect("document is valid");
        assert_eq!(config.to_string(), "[S] # about\nkey = value\n");
        assert_eq!(
            config.to_text(&TextOptions::default()).expect("parsed names are valid"),
            config.to_string()
        );
    }

    #[test]
    fn text_rejects_what_binary_keeps() {
        let mut config = Configuration::new();
        config.entry("S").add(Setting::with_value("a=b", "v"));

        assert!(matches!(
            config.to_text(&TextOptions::default()),
            Err(WriteError::InvalidSettingName { name }) if name == "a=b"
        ));
        assert!(matches!(
            config.write_to(io::sink()),
            Err(WriteError::InvalidSettingName { .. })
        ));

        let bytes = config.to_binary_bytes().expect("names fit the format");
        let from_binary = Configuration::from_binary_bytes(&bytes).expect("encoded data is valid");
        assert_eq!(from_binary, config);
    }

    #[test]
    fn text_and_binary_agree() {
        let text = "# header\n[General] # inline\nName = \"quoted # value\"\nList = {1, \"a,b\", {2}}\n\n[General]\nx = y";
        let config = Configuration::parse(text).expect("document is valid");

        let bytes = config.to_binary_bytes().expect("names fit the format");
        let from_binary = Configuration::from_binary_bytes(&bytes).expect("encoded data is valid");
        let from_text = Configuration::parse(&config.to_string()).expect("written text is valid");

        assert_eq!(from_binary, config);
        assert_eq!(from_text, config);
    }
}
