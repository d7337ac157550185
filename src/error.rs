use std::{error, io};

use thiserror::Error;

/// Boxed error returned by [`TypeStringConverter`](crate::TypeStringConverter) implementations.
pub type BoxError = Box<dyn error::Error + Send + Sync>;

/// The text form of a document could not be understood.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read data")]
    ReadFailure {
        #[source]
        source: io::Error,
    },
    #[error("line {line}: section name is not terminated by ']'")]
    UnterminatedSectionName { line: usize },
    #[error("line {line}: unexpected character {c:?} after section name")]
    UnexpectedCharacter { line: usize, c: char },
    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },
    #[error("line {line}: expected `name = value`")]
    MissingAssignment { line: usize },
    #[error("line {line}: setting name cannot be empty")]
    SettingNameEmpty { line: usize },
}

impl ParseError {
    /// Line the error was reported on, if it came from the grammar rather than I/O.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match *self {
            Self::ReadFailure { .. } => None,
            Self::UnterminatedSectionName { line }
            | Self::UnexpectedCharacter { line, .. }
            | Self::UnterminatedString { line }
            | Self::MissingAssignment { line }
            | Self::SettingNameEmpty { line } => Some(line),
        }
    }
}

/// A configuration could not be written in the text form.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("section name {name:?} cannot be written as text")]
    InvalidSectionName { name: String },
    #[error("setting name {name:?} cannot be written as text")]
    InvalidSettingName { name: String },
    #[error("setting `{setting}` has an unmatched double quote in its value")]
    UnbalancedQuotes { setting: String },
    #[error("failed to write the configuration")]
    Io(#[from] io::Error),
}

/// The binary form of a document could not be decoded.
#[derive(Debug, Error)]
pub enum BinaryError {
    #[error("failed to read binary data")]
    Io(#[from] io::Error),
    #[error("invalid magic bytes, not a binary configuration")]
    InvalidMagic,
    #[error("unsupported binary version: {0}")]
    UnsupportedVersion(u32),
    #[error("invalid value shape tag: 0x{0:02X}")]
    InvalidShape(u8),
    #[error("invalid presence flag: 0x{0:02X}")]
    InvalidFlag(u8),
    #[error("invalid UTF-8 in string")]
    InvalidUtf8,
    #[error("unexpected data after the last section")]
    TrailingBytes,
}

/// Broad category of a [`SettingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Scalar access on an array, array access on a scalar, or an array-of-array request.
    ShapeMismatch,
    /// The text could not be parsed as the requested type.
    Conversion,
    /// No converter is registered for the requested type.
    NoConverter,
}

/// Typed access to a setting failed.
#[derive(Debug, Error)]
pub enum SettingError {
    #[error("setting `{setting}` holds an array; use get_value_array instead")]
    ExpectedScalar { setting: String },
    #[error("setting `{setting}` does not hold an array")]
    ExpectedArray { setting: String },
    #[error("arrays of {type_name} are not supported; request the element type instead")]
    NestedArray { type_name: &'static str },
    #[error("cannot convert {value:?} to {type_name}")]
    Conversion {
        value: String,
        type_name: &'static str,
        #[source]
        source: BoxError,
    },
    #[error("no converter registered for {type_name}")]
    NoConverter { type_name: &'static str },
}

impl SettingError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ExpectedScalar { .. } | Self::ExpectedArray { .. } | Self::NestedArray { .. } => {
                ErrorKind::ShapeMismatch
            }
            Self::Conversion { .. } => ErrorKind::Conversion,
            Self::NoConverter { .. } => ErrorKind::NoConverter,
        }
    }
}

/// A built-in converter rejected its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{text:?} is not a valid {expected}")]
pub struct InvalidValue {
    pub text: String,
    pub expected: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("comment character must be '#' or ';', got {0:?}")]
    InvalidCommentChar(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_error_kinds() {
        let err = SettingError::ExpectedScalar {
            setting: "Ints".to_owned(),
        };
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);

        let err = SettingError::NoConverter { type_name: "Person" };
        assert_eq!(err.kind(), ErrorKind::NoConverter);
        assert_eq!(err.to_string(), "no converter registered for Person");
    }

    #[test]
    fn write_error_names_the_offender() {
        let err = WriteError::InvalidSettingName {
            name: "a=b".to_owned(),
        };
        assert_eq!(err.to_string(), "setting name \"a=b\" cannot be written as text");
    }

    #[test]
    fn parse_error_reports_line() {
        let err = ParseError::MissingAssignment { line: 7 };
        assert_eq!(err.line(), Some(7));
        assert_eq!(err.to_string(), "line 7: expected `name = value`");
    }
}
