//! Conversion between the text of a setting and typed program values.
//!
//! Every conversion goes through a [`TypeStringConverter`] looked up by the target's [`TypeId`].
//! A single process-wide [`ConverterRegistry`] backs the typed accessors on
//! [`Setting`](crate::Setting); it starts out with converters for the primitive types and can be
//! extended or overridden with [`register_type_string_converter`]. Enumerations declared with
//! [`config_enum!`](crate::config_enum) fall back to a shared name-or-number converter when no
//! exact converter is registered for them.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{BoxError, InvalidValue, SettingError};

/// Converts values of one type to and from their setting text.
pub trait TypeStringConverter: Send + Sync + 'static {
    type Value: Any + Send + Sync;

    fn convert_to_string(&self, value: &Self::Value) -> String;

    /// # Errors
    ///
    /// Returns an error if `text` is not a valid representation of [`Self::Value`].
    fn convert_from_string(&self, text: &str) -> Result<Self::Value, BoxError>;
}

/// Object-safe view of a [`TypeStringConverter`].
trait ErasedConverter: Send + Sync {
    fn type_name(&self) -> &'static str;
    fn to_text(&self, value: &dyn Any) -> Option<String>;
    fn from_text(&self, text: &str) -> Result<Box<dyn Any>, BoxError>;
}

impl<C: TypeStringConverter> ErasedConverter for C {
    fn type_name(&self) -> &'static str {
        type_name::<C::Value>()
    }

    fn to_text(&self, value: &dyn Any) -> Option<String> {
        value
            .downcast_ref::<C::Value>()
            .map(|value| self.convert_to_string(value))
    }

    fn from_text(&self, text: &str) -> Result<Box<dyn Any>, BoxError> {
        self.convert_from_string(text)
            .map(|value| Box::new(value) as Box<dyn Any>)
    }
}

fn to_text(
    converter: &dyn ErasedConverter,
    value: &dyn Any,
    type_name: &'static str,
) -> Result<String, SettingError> {
    converter
        .to_text(value)
        .ok_or(SettingError::NoConverter { type_name })
}

fn from_text<T: Any>(converter: &dyn ErasedConverter, text: &str) -> Result<T, SettingError> {
    let value = converter
        .from_text(text)
        .map_err(|source| SettingError::Conversion {
            value: text.to_owned(),
            type_name: type_name::<T>(),
            source,
        })?;

    value
        .downcast::<T>()
        .map(|value| *value)
        .map_err(|_| SettingError::NoConverter {
            type_name: type_name::<T>(),
        })
}

/// Table of converters keyed by the type they convert.
///
/// The type-driven conversions only consult registered converters, so a [`ConfigEnum`] without
/// one reports [`SettingError::NoConverter`] there. Use the `convert_enum_*` methods for the
/// shared enum fallback, or [`register_enum`](Self::register_enum) to make it a registered
/// converter.
#[derive(Clone, Default)]
pub struct ConverterRegistry {
    converters: HashMap<TypeId, Arc<dyn ErasedConverter>>,
}

static GLOBAL_REGISTRY: LazyLock<RwLock<ConverterRegistry>> =
    LazyLock::new(|| RwLock::new(ConverterRegistry::with_builtins()));

impl ConverterRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in converters.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        macro_rules! trimmed {
            ($($ty:ty),+ $(,)?) => {
                $(registry.insert(FromStrConverter::<$ty>::trimmed());)+
            };
        }

        registry.insert(BoolConverter);
        registry.insert(FromStrConverter::<char>::verbatim());
        registry.insert(FromStrConverter::<String>::verbatim());
        trimmed!(i8, i16, i32, i64, i128, isize);
        trimmed!(u8, u16, u32, u64, u128, usize);
        trimmed!(f32, f64, Decimal, NaiveDate);
        registry.insert(DateTimeConverter::<NaiveDateTime>::new());
        registry.insert(DateTimeConverter::<DateTime<Utc>>::new());
        registry.insert(DateTimeConverter::<DateTime<FixedOffset>>::new());

        registry
    }

    /// The process-wide registry used by [`Setting`](crate::Setting) accessors.
    pub fn global() -> &'static RwLock<ConverterRegistry> {
        &GLOBAL_REGISTRY
    }

    fn insert<C: TypeStringConverter>(&mut self, converter: C) -> bool {
        self.converters
            .insert(TypeId::of::<C::Value>(), Arc::new(converter))
            .is_some()
    }

    /// Register `converter` for its value type, replacing any existing converter for that exact
    /// type. Returns whether a converter was replaced.
    pub fn register<C: TypeStringConverter>(&mut self, converter: C) -> bool {
        let replaced = self.insert(converter);
        debug!(
            type_name = type_name::<C::Value>(),
            replaced, "registered type string converter"
        );
        replaced
    }

    /// Register the shared enum converter for `E`, which makes `E` convertible through
    /// [`convert_dyn_to_string`](Self::convert_dyn_to_string) as well.
    pub fn register_enum<E: ConfigEnum>(&mut self) -> bool {
        self.register(EnumConverter::<E>::new())
    }

    #[must_use]
    pub fn contains<T: Any>(&self) -> bool {
        self.converters.contains_key(&TypeId::of::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    fn lookup(&self, id: TypeId) -> Option<Arc<dyn ErasedConverter>> {
        self.converters.get(&id).cloned()
    }

    /// # Errors
    ///
    /// Returns [`SettingError::NoConverter`] if `T` has no converter.
    pub fn convert_to_string<T: Any>(&self, value: &T) -> Result<String, SettingError> {
        let type_name = type_name::<T>();
        let converter = self
            .lookup(TypeId::of::<T>())
            .ok_or(SettingError::NoConverter { type_name })?;

        to_text(&*converter, value, type_name)
    }

    /// Convert a value using the converter for its runtime type.
    ///
    /// # Errors
    ///
    /// Returns [`SettingError::NoConverter`] if the runtime type has no converter.
    pub fn convert_dyn_to_string(&self, value: &dyn Any) -> Result<String, SettingError> {
        let converter = self
            .lookup(value.type_id())
            .ok_or(SettingError::NoConverter {
                type_name: DYNAMIC_TYPE_NAME,
            })?;

        to_text(&*converter, value, converter.type_name())
    }

    /// # Errors
    ///
    /// Returns [`SettingError::NoConverter`] if `T` has no converter, or
    /// [`SettingError::Conversion`] if `text` cannot be parsed as `T`.
    pub fn convert_from_string<T: Any>(&self, text: &str) -> Result<T, SettingError> {
        let converter = self
            .lookup(TypeId::of::<T>())
            .ok_or(SettingError::NoConverter {
                type_name: type_name::<T>(),
            })?;

        from_text(&*converter, text)
    }

    /// Like [`convert_to_string`](Self::convert_to_string), falling back to the shared enum
    /// converter when `E` has no converter of its own.
    ///
    /// # Errors
    ///
    /// Propagates errors from a registered converter.
    pub fn convert_enum_to_string<E: ConfigEnum>(&self, value: &E) -> Result<String, SettingError> {
        match self.lookup(TypeId::of::<E>()) {
            Some(converter) => to_text(&*converter, value, type_name::<E>()),
            None => Ok(EnumConverter::<E>::new().convert_to_string(value)),
        }
    }

    /// Like [`convert_from_string`](Self::convert_from_string), falling back to the shared enum
    /// converter when `E` has no converter of its own.
    ///
    /// # Errors
    ///
    /// Returns [`SettingError::Conversion`] if `text` names no variant.
    pub fn convert_enum_from_string<E: ConfigEnum>(&self, text: &str) -> Result<E, SettingError> {
        match self.lookup(TypeId::of::<E>()) {
            Some(converter) => from_text(&*converter, text),
            None => shared_enum_from_string(text),
        }
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self
            .converters
            .values()
            .map(|converter| converter.type_name())
            .collect::<Vec<_>>();
        names.sort_unstable();

        f.debug_struct("ConverterRegistry")
            .field("converters", &names)
            .finish()
    }
}

const DYNAMIC_TYPE_NAME: &str = "dynamically typed value";

/// Register a converter in the process-wide registry. Affects every configuration from this
/// point on and replaces any converter for the same type, built-ins included.
pub fn register_type_string_converter<C: TypeStringConverter>(converter: C) -> bool {
    GLOBAL_REGISTRY
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(converter)
}

// The lock is released before the converter runs, so converters may use the registry.
fn global_lookup(id: TypeId) -> Option<Arc<dyn ErasedConverter>> {
    GLOBAL_REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .lookup(id)
}

fn global_to_string<T: Any>(value: &T) -> Result<String, SettingError> {
    let type_name = type_name::<T>();
    let converter =
        global_lookup(TypeId::of::<T>()).ok_or(SettingError::NoConverter { type_name })?;

    to_text(&*converter, value, type_name)
}

fn global_dyn_to_string(value: &dyn Any) -> Result<String, SettingError> {
    let converter = global_lookup(value.type_id()).ok_or(SettingError::NoConverter {
        type_name: DYNAMIC_TYPE_NAME,
    })?;

    to_text(&*converter, value, converter.type_name())
}

fn global_from_string<T: Any>(text: &str) -> Result<T, SettingError> {
    let converter = global_lookup(TypeId::of::<T>()).ok_or(SettingError::NoConverter {
        type_name: type_name::<T>(),
    })?;

    from_text(&*converter, text)
}

/// A type that can be stored in and read from a [`Setting`](crate::Setting).
///
/// The default methods convert through the process-wide registry, so a custom type only needs
/// an empty `impl SettingValue for MyType {}` plus a registered converter.
pub trait SettingValue: Any + Send + Sync + Sized {
    /// Sequence types are stored element-wise and are never valid conversion targets.
    #[must_use]
    fn is_sequence() -> bool {
        false
    }

    /// # Errors
    ///
    /// Returns an error if no converter is registered for this type.
    fn to_setting_string(&self) -> Result<String, SettingError> {
        global_to_string(self)
    }

    /// String form of each element, for sequence types.
    fn to_setting_elements(&self) -> Option<Result<Vec<String>, SettingError>> {
        None
    }

    /// # Errors
    ///
    /// Returns an error if no converter is registered for this type or `text` cannot be parsed.
    fn from_setting_string(text: &str) -> Result<Self, SettingError> {
        global_from_string(text)
    }
}

macro_rules! setting_values {
    ($($ty:ty),+ $(,)?) => {
        $(impl SettingValue for $ty {})+
    };
}

setting_values!(bool, char, String);
setting_values!(i8, i16, i32, i64, i128, isize);
setting_values!(u8, u16, u32, u64, u128, usize);
setting_values!(f32, f64, Decimal);
setting_values!(NaiveDate, NaiveDateTime, DateTime<Utc>, DateTime<FixedOffset>);

impl<T: SettingValue> SettingValue for Vec<T> {
    fn is_sequence() -> bool {
        true
    }

    fn to_setting_elements(&self) -> Option<Result<Vec<String>, SettingError>> {
        Some(self.iter().map(SettingValue::to_setting_string).collect())
    }
}

impl<T: SettingValue, const N: usize> SettingValue for [T; N] {
    fn is_sequence() -> bool {
        true
    }

    fn to_setting_elements(&self) -> Option<Result<Vec<String>, SettingError>> {
        Some(self.iter().map(SettingValue::to_setting_string).collect())
    }
}

/// Converted by the runtime type of the boxed value, which lets one sequence mix element types.
impl SettingValue for Box<dyn Any + Send + Sync> {
    fn to_setting_string(&self) -> Result<String, SettingError> {
        global_dyn_to_string(&**self)
    }

    fn from_setting_string(_text: &str) -> Result<Self, SettingError> {
        Err(SettingError::NoConverter {
            type_name: DYNAMIC_TYPE_NAME,
        })
    }
}

/// Converts any `FromStr + Display` type.
pub struct FromStrConverter<T> {
    trim: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromStrConverter<T> {
    /// Surrounding whitespace is removed before parsing.
    #[must_use]
    pub fn trimmed() -> Self {
        Self {
            trim: true,
            _marker: PhantomData,
        }
    }

    /// The text is parsed exactly as stored.
    #[must_use]
    pub fn verbatim() -> Self {
        Self {
            trim: false,
            _marker: PhantomData,
        }
    }
}

impl<T> TypeStringConverter for FromStrConverter<T>
where
    T: FromStr + Display + Any + Send + Sync,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    type Value = T;

    fn convert_to_string(&self, value: &T) -> String {
        value.to_string()
    }

    fn convert_from_string(&self, text: &str) -> Result<T, BoxError> {
        let text = if self.trim { text.trim() } else { text };
        Ok(text.parse::<T>()?)
    }
}

/// Accepts `true/false`, `yes/no`, `on/off`, `y/n` and `1/0` in any case.
pub struct BoolConverter;

impl TypeStringConverter for BoolConverter {
    type Value = bool;

    fn convert_to_string(&self, value: &bool) -> String {
        value.to_string()
    }

    fn convert_from_string(&self, text: &str) -> Result<bool, BoxError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "y" | "1" => Ok(true),
            "false" | "no" | "off" | "n" | "0" => Ok(false),
            _ => Err(InvalidValue {
                text: text.to_owned(),
                expected: "boolean",
            }
            .into()),
        }
    }
}

/// Date/time values in ISO 8601 form.
pub struct DateTimeConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> DateTimeConverter<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for DateTimeConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const NAIVE_SPACED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl TypeStringConverter for DateTimeConverter<NaiveDateTime> {
    type Value = NaiveDateTime;

    fn convert_to_string(&self, value: &NaiveDateTime) -> String {
        value.format(NAIVE_FORMAT).to_string()
    }

    fn convert_from_string(&self, text: &str) -> Result<NaiveDateTime, BoxError> {
        let text = text.trim();

        NaiveDateTime::parse_from_str(text, NAIVE_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(text, NAIVE_SPACED_FORMAT))
            .or_else(|_| text.parse::<NaiveDate>().map(|date| date.and_time(NaiveTime::MIN)))
            .map_err(Into::into)
    }
}

impl TypeStringConverter for DateTimeConverter<DateTime<Utc>> {
    type Value = DateTime<Utc>;

    fn convert_to_string(&self, value: &DateTime<Utc>) -> String {
        value.to_rfc3339()
    }

    fn convert_from_string(&self, text: &str) -> Result<DateTime<Utc>, BoxError> {
        let parsed = DateTime::parse_from_rfc3339(text.trim())?;
        Ok(parsed.with_timezone(&Utc))
    }
}

impl TypeStringConverter for DateTimeConverter<DateTime<FixedOffset>> {
    type Value = DateTime<FixedOffset>;

    fn convert_to_string(&self, value: &DateTime<FixedOffset>) -> String {
        value.to_rfc3339()
    }

    fn convert_from_string(&self, text: &str) -> Result<DateTime<FixedOffset>, BoxError> {
        Ok(DateTime::parse_from_rfc3339(text.trim())?)
    }
}

/// A field-less enum whose variants convert by name.
///
/// Usually implemented through [`config_enum!`](crate::config_enum).
pub trait ConfigEnum: SettingValue + Copy {
    /// Symbolic name of every variant.
    const VARIANTS: &'static [(&'static str, Self)];

    fn discriminant(self) -> i64;
}

/// The converter shared by every [`ConfigEnum`]: writes the variant name, reads a name
/// (case-sensitive) or the integer discriminant.
pub struct EnumConverter<E> {
    _marker: PhantomData<fn() -> E>,
}

impl<E> EnumConverter<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<E> Default for EnumConverter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ConfigEnum> TypeStringConverter for EnumConverter<E> {
    type Value = E;

    fn convert_to_string(&self, value: &E) -> String {
        let discriminant = value.discriminant();

        E::VARIANTS
            .iter()
            .find(|(_, variant)| variant.discriminant() == discriminant)
            .map_or_else(|| discriminant.to_string(), |(name, _)| (*name).to_owned())
    }

    fn convert_from_string(&self, text: &str) -> Result<E, BoxError> {
        let text = text.trim();
        let invalid = || InvalidValue {
            text: text.to_owned(),
            expected: type_name::<E>(),
        };

        if let Some(&(_, variant)) = E::VARIANTS.iter().find(|(name, _)| *name == text) {
            return Ok(variant);
        }

        let discriminant = text.parse::<i64>().map_err(|_| invalid())?;
        E::VARIANTS
            .iter()
            .find(|(_, variant)| variant.discriminant() == discriminant)
            .map(|&(_, variant)| variant)
            .ok_or_else(|| invalid().into())
    }
}

/// Enum-to-text conversion: an exact registered converter wins over the shared enum converter.
///
/// # Errors
///
/// Propagates errors from a registered converter.
pub fn enum_to_string<E: ConfigEnum>(value: &E) -> Result<String, SettingError> {
    match global_lookup(TypeId::of::<E>()) {
        Some(converter) => to_text(&*converter, value, type_name::<E>()),
        None => Ok(EnumConverter::<E>::new().convert_to_string(value)),
    }
}

/// Text-to-enum conversion: an exact registered converter wins over the shared enum converter.
///
/// # Errors
///
/// Returns [`SettingError::Conversion`] if `text` names no variant.
pub fn enum_from_string<E: ConfigEnum>(text: &str) -> Result<E, SettingError> {
    match global_lookup(TypeId::of::<E>()) {
        Some(converter) => from_text(&*converter, text),
        None => shared_enum_from_string(text),
    }
}

fn shared_enum_from_string<E: ConfigEnum>(text: &str) -> Result<E, SettingError> {
    EnumConverter::<E>::new()
        .convert_from_string(text)
        .map_err(|source| SettingError::Conversion {
            value: text.to_owned(),
            type_name: type_name::<E>(),
            source,
        })
}

/// Declare a field-less enum that can be stored in settings by variant name.
///
/// The enum must derive `Clone` and `Copy`.
///
/// ```
/// inicfg::config_enum! {
///     #[derive(Debug, Clone, Copy, PartialEq, Eq)]
///     pub enum Level {
///         Low = 1,
///         High = 10,
///     }
/// }
///
/// let mut setting = inicfg::Setting::new("Level");
/// setting.set_value(&Level::High).unwrap();
/// assert_eq!(setting.raw_value(), "High");
/// assert_eq!(setting.get_value::<Level>().unwrap(), Level::High);
/// ```
#[macro_export]
macro_rules! config_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$variant_meta:meta])* $variant:ident $(= $value:expr)?),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $($(#[$variant_meta])* $variant $(= $value)?),+
        }

        impl $crate::ConfigEnum for $name {
            const VARIANTS: &'static [(&'static str, Self)] =
                &[$((stringify!($variant), Self::$variant)),+];

            fn discriminant(self) -> i64 {
                self as i64
            }
        }

        impl $crate::SettingValue for $name {
            fn to_setting_string(
                &self,
            ) -> ::std::result::Result<::std::string::String, $crate::SettingError> {
                $crate::convert::enum_to_string(self)
            }

            fn from_setting_string(
                text: &str,
            ) -> ::std::result::Result<Self, $crate::SettingError> {
                $crate::convert::enum_from_string(text)
            }
        }
    };
}
