use crate::caseless::CaselessMap;
use std::fmt::{Display, Formatter};

/// An untyped value carried in a transport-property bag.
///
/// Transport adapters and middlewares thread values of foreign origin through
/// the dispatch without the runtime interpreting them. Extraction back into a
/// concrete type goes through [`FromPropertyValue`] and is best-effort: a
/// stored value of a different shape extracts as `None`, never as an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// An explicit absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    I64(i64),
    /// An unsigned integer.
    U64(u64),
    /// A floating-point number.
    F64(f64),
    /// A string.
    Str(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Null => f.write_str("null"),
            PropertyValue::Bool(value) => write!(f, "{}", value),
            PropertyValue::I64(value) => write!(f, "{}", value),
            PropertyValue::U64(value) => write!(f, "{}", value),
            PropertyValue::F64(value) => write!(f, "{}", value),
            PropertyValue::Str(value) => f.write_str(value),
            PropertyValue::Bytes(value) => write!(f, "{} bytes", value.len()),
        }
    }
}

/// Conversion from a concrete type into a [`PropertyValue`], used by the
/// property-bag setters.
pub trait IntoPropertyValue {
    /// Converts this value into a [`PropertyValue`].
    fn into_property(self) -> PropertyValue;
}

/// Best-effort extraction of a concrete type out of a [`PropertyValue`].
///
/// Extraction never coerces across shapes: a stored string does not extract
/// as a number, and vice versa. The only relaxation is integer width: stored
/// signed and unsigned integers extract into any integer type they fit into.
pub trait FromPropertyValue: Sized {
    /// Attempts to extract `Self` from the given value.
    fn from_property(value: &PropertyValue) -> Option<Self>;
}

const _: () = {
    impl IntoPropertyValue for PropertyValue {
        fn into_property(self) -> PropertyValue {
            self
        }
    }

    impl IntoPropertyValue for bool {
        fn into_property(self) -> PropertyValue {
            PropertyValue::Bool(self)
        }
    }

    impl IntoPropertyValue for i64 {
        fn into_property(self) -> PropertyValue {
            PropertyValue::I64(self)
        }
    }

    impl IntoPropertyValue for i32 {
        fn into_property(self) -> PropertyValue {
            PropertyValue::I64(self.into())
        }
    }

    impl IntoPropertyValue for u64 {
        fn into_property(self) -> PropertyValue {
            PropertyValue::U64(self)
        }
    }

    impl IntoPropertyValue for u32 {
        fn into_property(self) -> PropertyValue {
            PropertyValue::U64(self.into())
        }
    }

    impl IntoPropertyValue for u8 {
        fn into_property(self) -> PropertyValue {
            PropertyValue::U64(self.into())
        }
    }

    impl IntoPropertyValue for f64 {
        fn into_property(self) -> PropertyValue {
            PropertyValue::F64(self)
        }
    }

    impl IntoPropertyValue for String {
        fn into_property(self) -> PropertyValue {
            PropertyValue::Str(self)
        }
    }

    impl IntoPropertyValue for &str {
        fn into_property(self) -> PropertyValue {
            PropertyValue::Str(self.to_owned())
        }
    }

    impl IntoPropertyValue for Vec<u8> {
        fn into_property(self) -> PropertyValue {
            PropertyValue::Bytes(self)
        }
    }

    impl IntoPropertyValue for &[u8] {
        fn into_property(self) -> PropertyValue {
            PropertyValue::Bytes(self.to_vec())
        }
    }
};

const _: () = {
    impl FromPropertyValue for PropertyValue {
        fn from_property(value: &PropertyValue) -> Option<Self> {
            Some(value.clone())
        }
    }

    impl FromPropertyValue for bool {
        fn from_property(value: &PropertyValue) -> Option<Self> {
            match value {
                PropertyValue::Bool(inner) => Some(*inner),
                _ => None,
            }
        }
    }

    impl FromPropertyValue for i64 {
        fn from_property(value: &PropertyValue) -> Option<Self> {
            match value {
                PropertyValue::I64(inner) => Some(*inner),
                PropertyValue::U64(inner) => i64::try_from(*inner).ok(),
                _ => None,
            }
        }
    }

    impl FromPropertyValue for u64 {
        fn from_property(value: &PropertyValue) -> Option<Self> {
            match value {
                PropertyValue::U64(inner) => Some(*inner),
                PropertyValue::I64(inner) => u64::try_from(*inner).ok(),
                _ => None,
            }
        }
    }

    impl FromPropertyValue for u32 {
        fn from_property(value: &PropertyValue) -> Option<Self> {
            u64::from_property(value).and_then(|wide| u32::try_from(wide).ok())
        }
    }

    impl FromPropertyValue for u8 {
        fn from_property(value: &PropertyValue) -> Option<Self> {
            u64::from_property(value).and_then(|wide| u8::try_from(wide).ok())
        }
    }

    impl FromPropertyValue for i32 {
        fn from_property(value: &PropertyValue) -> Option<Self> {
            i64::from_property(value).and_then(|wide| i32::try_from(wide).ok())
        }
    }

    impl FromPropertyValue for f64 {
        fn from_property(value: &PropertyValue) -> Option<Self> {
            match value {
                PropertyValue::F64(inner) => Some(*inner),
                _ => None,
            }
        }
    }

    impl FromPropertyValue for String {
        fn from_property(value: &PropertyValue) -> Option<Self> {
            match value {
                PropertyValue::Str(inner) => Some(inner.clone()),
                _ => None,
            }
        }
    }

    impl FromPropertyValue for Vec<u8> {
        fn from_property(value: &PropertyValue) -> Option<Self> {
            match value {
                PropertyValue::Bytes(inner) => Some(inner.clone()),
                _ => None,
            }
        }
    }
};

/// A case-insensitive, insertion-ordered bag of [`PropertyValue`]s.
///
/// Two bags ride on every dispatch: the transport-property bag (values of
/// transport origin, read generically by cross-transport mappers) and the
/// out-of-band properties threaded between middlewares.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    inner: CaselessMap<PropertyValue>,
}

impl PropertyMap {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self {
            inner: CaselessMap::new(),
        }
    }

    /// Stores the given value under the given name, replacing any previous
    /// value.
    pub fn set(&mut self, name: impl Into<String>, value: impl IntoPropertyValue) {
        self.inner.insert(name, value.into_property());
    }

    /// Extracts the value stored under the given name into the requested
    /// type. Returns `None` when the name is absent or the stored value has
    /// a different shape.
    pub fn get<R: FromPropertyValue>(&self, name: &str) -> Option<R> {
        self.inner.get(name).and_then(R::from_property)
    }

    /// Returns the raw stored value under the given name.
    pub fn raw(&self, name: &str) -> Option<&PropertyValue> {
        self.inner.get(name)
    }

    /// Removes and returns the value stored under the given name.
    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        self.inner.remove(name)
    }

    /// Reports whether a value is stored under the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    /// Reports the number of stored values.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Reports whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over the stored values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.inner.iter()
    }

    /// Copies every entry of the given bag into this one, replacing values
    /// stored under matching names.
    pub fn merge_from(&mut self, other: &PropertyMap) {
        for (name, value) in other.iter() {
            self.inner.insert(name, value.clone());
        }
    }
}

impl<N: Into<String>, V: IntoPropertyValue> FromIterator<(N, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(name, value)| (name, value.into_property()))
                .collect(),
        }
    }
}
