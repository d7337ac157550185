use std::any::{Any, type_name};
use std::borrow::Cow;
use std::fmt;

use crate::array::{format_array, parse_array};
use crate::convert::SettingValue;
use crate::error::SettingError;
use crate::util::unquote;

/// The stored form of a setting: one string, or one string per array element.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Raw(String),
    List(Vec<String>),
}

impl Value {
    /// Classify `text`: a single balanced `{...}` group becomes a [`Value::List`], anything else
    /// is kept verbatim as [`Value::Raw`].
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        match parse_array(text) {
            Some(elements) => Self::List(elements),
            None => Self::Raw(text.to_owned()),
        }
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Text form; lists are rendered as an array literal.
    #[must_use]
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Raw(text) => Cow::Borrowed(text),
            Self::List(elements) => Cow::Owned(format_array(elements)),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Raw(String::new())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Raw(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::List(value)
    }
}

/// A named value inside a [`Section`](crate::Section).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Setting {
    name: String,
    value: Value,
    comment: Option<String>,
    pre_comment: Option<String>,
}

impl Setting {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A setting whose value is classified from `text` as the parser would.
    #[must_use]
    pub fn with_value(name: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            value: Value::from_text(text),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replace the stored value without reclassifying it.
    pub fn set(&mut self, value: Value) {
        self.value = value;
    }

    #[must_use]
    pub fn raw_value(&self) -> Cow<'_, str> {
        self.value.to_text()
    }

    pub fn set_raw_value(&mut self, text: &str) {
        self.value = Value::from_text(text);
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        self.value.is_list()
    }

    /// Number of elements, or `None` if the setting holds a single value.
    #[must_use]
    pub fn array_len(&self) -> Option<usize> {
        match &self.value {
            Value::Raw(_) => None,
            Value::List(elements) => Some(elements.len()),
        }
    }

    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    #[must_use]
    pub fn pre_comment(&self) -> Option<&str> {
        self.pre_comment.as_deref()
    }

    pub fn set_pre_comment(&mut self, pre_comment: Option<String>) {
        self.pre_comment = pre_comment;
    }

    fn scalar_text(&self) -> Result<&str, SettingError> {
        match &self.value {
            Value::Raw(text) => Ok(text),
            Value::List(_) => Err(SettingError::ExpectedScalar {
                setting: self.name.clone(),
            }),
        }
    }

    /// Convert the single value to `T`.
    ///
    /// # Errors
    ///
    /// Fails with a shape mismatch if the setting holds an array or `T` is a sequence type,
    /// otherwise with the converter's error.
    pub fn get_value<T: SettingValue>(&self) -> Result<T, SettingError> {
        let text = self.scalar_text()?;
        if T::is_sequence() {
            return Err(SettingError::NestedArray {
                type_name: type_name::<T>(),
            });
        }

        T::from_setting_string(text)
    }

    /// Convert every element to `T`, in order. One failing element fails the whole call.
    ///
    /// # Errors
    ///
    /// Fails with a shape mismatch if `T` is a sequence type or the setting holds a single value,
    /// otherwise with the first element's conversion error.
    pub fn get_value_array<T: SettingValue>(&self) -> Result<Vec<T>, SettingError> {
        if T::is_sequence() {
            return Err(SettingError::NestedArray {
                type_name: type_name::<T>(),
            });
        }

        match &self.value {
            Value::List(elements) => elements
                .iter()
                .map(|element| T::from_setting_string(element))
                .collect(),
            Value::Raw(_) => Err(SettingError::ExpectedArray {
                setting: self.name.clone(),
            }),
        }
    }

    fn lookup_or_default<T: SettingValue>(&self, default: T) -> Result<(T, bool), SettingError> {
        match self.get_value::<T>() {
            Ok(mut value) => {
                let any: &mut dyn Any = &mut value;
                if let Some(text) = any.downcast_mut::<String>() {
                    *text = unquote(text).to_owned();
                }
                Ok((value, false))
            }
            Err(SettingError::Conversion { .. }) => Ok((default, true)),
            Err(err) => Err(err),
        }
    }

    /// Convert the single value to `T`, or return `default` if the text cannot be converted.
    /// Strings lose their surrounding quotes.
    ///
    /// # Errors
    ///
    /// Shape mismatches and missing converters are never replaced by the default.
    pub fn get_value_or_default<T: SettingValue>(&self, default: T) -> Result<T, SettingError> {
        self.lookup_or_default(default).map(|(value, _)| value)
    }

    /// Like [`get_value_or_default`](Self::get_value_or_default), but a value that could not be
    /// converted is overwritten with `default`.
    ///
    /// # Errors
    ///
    /// Shape mismatches and missing converters are never replaced by the default.
    pub fn get_value_or_persist_default<T: SettingValue>(
        &mut self,
        default: T,
    ) -> Result<T, SettingError> {
        let (value, defaulted) = self.lookup_or_default(default)?;
        if defaulted {
            self.set_value(&value)?;
        }

        Ok(value)
    }

    /// Store `value`. Sequences switch the setting to an array with one converted string per
    /// element; anything else is stored as text and classified like parsed input.
    ///
    /// # Errors
    ///
    /// Returns an error if no converter is registered for the value (or an element's) type.
    pub fn set_value<T: SettingValue>(&mut self, value: &T) -> Result<(), SettingError> {
        self.value = match value.to_setting_elements() {
            Some(elements) => Value::List(elements?),
            None => Value::from_text(&value.to_setting_string()?),
        };

        Ok(())
    }

    /// Store `values` as an array.
    ///
    /// # Errors
    ///
    /// Returns an error if no converter is registered for `T`.
    pub fn set_value_array<T: SettingValue>(&mut self, values: &[T]) -> Result<(), SettingError> {
        let elements = values
            .iter()
            .map(SettingValue::to_setting_string)
            .collect::<Result<Vec<_>, _>>()?;
        self.value = Value::List(elements);

        Ok(())
    }

    /// The single value with one layer of surrounding quotes removed.
    ///
    /// # Errors
    ///
    /// Fails with a shape mismatch if the setting holds an array.
    pub fn string_value(&self) -> Result<String, SettingError> {
        self.scalar_text().map(|text| unquote(text).to_owned())
    }

    pub fn set_string_value(&mut self, text: &str) {
        self.set_raw_value(text);
    }

    /// # Errors
    ///
    /// Fails with a shape mismatch if the setting holds a single value.
    pub fn string_value_array(&self) -> Result<Vec<String>, SettingError> {
        self.get_value_array::<String>()
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.raw_value())?;
        if let Some(comment) = &self.comment {
            write!(f, " # {comment}")?;
        }
        Ok(())
    }
}
