//! Copying the fields of a plain struct to and from the settings of a [`Section`].
//!
//! Types opt in by implementing [`SectionObject`], listing each field once per direction. Member
//! names double as setting names.
//!
//! ```
//! use inicfg::{MemberReader, MemberWriter, Section, SectionObject, SettingError};
//!
//! #[derive(Default)]
//! struct Window {
//!     title: String,
//!     size: Vec<u32>,
//!     cached: u64,
//! }
//!
//! impl SectionObject for Window {
//!     fn ignored_members() -> &'static [&'static str] {
//!         &["cached"]
//!     }
//!
//!     fn write_members(&self, members: &mut MemberWriter<'_>) -> Result<(), SettingError> {
//!         members.value("title", &self.title)?;
//!         members.array("size", &self.size)?;
//!         members.value("cached", &self.cached)
//!     }
//!
//!     fn read_members(&mut self, members: &MemberReader<'_>) -> Result<(), SettingError> {
//!         members.value("title", &mut self.title)?;
//!         members.array("size", &mut self.size)?;
//!         members.value("cached", &mut self.cached)
//!     }
//! }
//!
//! let window = Window { title: "Main".into(), size: vec![800, 600], cached: 7 };
//! let section = Section::from_object("Window", &window).unwrap();
//! assert!(!section.contains("cached"));
//!
//! let copy: Window = section.to_object().unwrap();
//! assert_eq!(copy.size, [800, 600]);
//! assert_eq!(copy.cached, 0);
//! ```

use crate::convert::SettingValue;
use crate::error::SettingError;
use crate::section::Section;
use crate::setting::Setting;

/// A type whose fields map onto the settings of one section.
pub trait SectionObject {
    /// Members skipped in both directions.
    fn ignored_members() -> &'static [&'static str] {
        &[]
    }

    /// Hand every member to `members`.
    ///
    /// # Errors
    ///
    /// Propagates the first conversion failure.
    fn write_members(&self, members: &mut MemberWriter<'_>) -> Result<(), SettingError>;

    /// Fill members from `members`. Members without a matching setting keep their value.
    ///
    /// # Errors
    ///
    /// Propagates the first conversion failure.
    fn read_members(&mut self, members: &MemberReader<'_>) -> Result<(), SettingError>;
}

/// Stores members into a section, creating settings as needed.
#[derive(Debug)]
pub struct MemberWriter<'a> {
    section: &'a mut Section,
    ignored: &'static [&'static str],
}

impl MemberWriter<'_> {
    /// # Errors
    ///
    /// Returns an error if `value` cannot be converted to text.
    pub fn value<T: SettingValue>(&mut self, name: &str, value: &T) -> Result<(), SettingError> {
        if self.ignored.contains(&name) {
            return Ok(());
        }

        self.section.entry(name).set_value(value)
    }

    /// # Errors
    ///
    /// Returns an error if an element cannot be converted to text.
    pub fn array<T: SettingValue>(&mut self, name: &str, values: &[T]) -> Result<(), SettingError> {
        if self.ignored.contains(&name) {
            return Ok(());
        }

        self.section.entry(name).set_value_array(values)
    }
}

/// Reads members back out of a section.
#[derive(Debug)]
pub struct MemberReader<'a> {
    section: &'a Section,
    ignored: &'static [&'static str],
}

impl MemberReader<'_> {
    /// Overwrite `field` with the setting called `name`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the setting exists but cannot be converted.
    pub fn value<T: SettingValue>(&self, name: &str, field: &mut T) -> Result<(), SettingError> {
        if let Some(setting) = self.lookup(name) {
            *field = setting.get_value()?;
        }

        Ok(())
    }

    /// Overwrite `field` with the elements of the array setting called `name`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the setting exists but is not an array of `T`.
    pub fn array<T: SettingValue>(&self, name: &str, field: &mut Vec<T>) -> Result<(), SettingError> {
        if let Some(setting) = self.lookup(name) {
            *field = setting.get_value_array()?;
        }

        Ok(())
    }

    fn lookup(&self, name: &str) -> Option<&Setting> {
        if self.ignored.contains(&name) {
            return None;
        }

        self.section.get(name)
    }
}

impl Section {
    /// A new section holding one setting per member of `object`.
    ///
    /// # Errors
    ///
    /// Returns an error if a member cannot be converted to text.
    pub fn from_object<O: SectionObject>(
        name: impl Into<String>,
        object: &O,
    ) -> Result<Self, SettingError> {
        let mut section = Section::new(name);
        section.get_values_from(object)?;
        Ok(section)
    }

    /// A default `O` filled from this section.
    ///
    /// # Errors
    ///
    /// Returns an error if a matching setting cannot be converted to its member's type.
    pub fn to_object<O: SectionObject + Default>(&self) -> Result<O, SettingError> {
        let mut object = O::default();
        self.set_values_to(&mut object)?;
        Ok(object)
    }

    /// Store every member of `object`, overwriting settings with the same names.
    ///
    /// # Errors
    ///
    /// Returns an error if a member cannot be converted to text.
    pub fn get_values_from<O: SectionObject>(&mut self, object: &O) -> Result<(), SettingError> {
        object.write_members(&mut MemberWriter {
            section: self,
            ignored: O::ignored_members(),
        })
    }

    /// Copy settings into the matching members of `object`.
    ///
    /// # Errors
    ///
    /// Returns an error if a matching setting cannot be converted to its member's type.
    pub fn set_values_to<O: SectionObject>(&self, object: &mut O) -> Result<(), SettingError> {
        object.read_members(&MemberReader {
            section: self,
            ignored: O::ignored_members(),
        })
    }
}
