//! Conversion between Rust values and [`DbusValue`]s.
//!
//! Each Rust type names its DBus type statically through [`DbusType`],
//! so the shape of a conversion is worked out once by the compiler
//! rather than rediscovered on every call. Conversions are exact: an
//! `i32` only comes out of an `INT32`, never out of a wider integer.
//!
//! ```
//! use dbus_wire::bind::{from_value, to_value};
//! use std::collections::HashMap;
//!
//! let mut map = HashMap::new();
//! map.insert("a".to_owned(), vec![1u32, 2]);
//! let value = to_value(map.clone())?;
//! assert_eq!(value.type_definition().signature(), "a{sau}");
//!
//! let back: HashMap<String, Vec<u32>> = from_value(value)?;
//! assert_eq!(back, map);
//! # Ok::<_, dbus_wire::error::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::primitives::{ObjectPath, Signature};
use crate::types::{BasicType, TypeDefinition};
use crate::value::{ArrayValue, BasicValue, DbusValue, DictValue, StructValue, VariantValue};

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

pub trait DbusType {
    fn dbus_type() -> TypeDefinition;
}

pub trait IntoDbus: DbusType {
    fn into_dbus(self) -> Result<DbusValue>;
}

pub trait FromDbus: DbusType + Sized {
    fn from_dbus(value: DbusValue) -> Result<Self>;
}

/// Types that can key a dict.
pub trait DbusKey: DbusType + Sized {
    const KEY_TYPE: BasicType;

    fn into_key(self) -> BasicValue;
    fn from_key(key: BasicValue) -> Result<Self>;
}

pub fn to_value<T: IntoDbus>(value: T) -> Result<DbusValue> {
    value.into_dbus()
}

pub fn from_value<T: FromDbus>(value: DbusValue) -> Result<T> {
    T::from_dbus(value)
}

fn mismatch<T: DbusType>(value: &DbusValue) -> Error {
    Error::mismatch(T::dbus_type(), value.type_definition())
}

macro_rules! basic_binding {
    ($type:ty, $variant:ident) => {
        impl DbusType for $type {
            fn dbus_type() -> TypeDefinition {
                TypeDefinition::Basic(BasicType::$variant)
            }
        }

        impl IntoDbus for $type {
            fn into_dbus(self) -> Result<DbusValue> {
                Ok(DbusValue::Basic(BasicValue::$variant(self)))
            }
        }

        impl FromDbus for $type {
            fn from_dbus(value: DbusValue) -> Result<Self> {
                match value {
                    DbusValue::Basic(BasicValue::$variant(v)) => Ok(v),
                    other => Err(mismatch::<Self>(&other)),
                }
            }
        }

        impl DbusKey for $type {
            const KEY_TYPE: BasicType = BasicType::$variant;

            fn into_key(self) -> BasicValue {
                BasicValue::$variant(self)
            }

            fn from_key(key: BasicValue) -> Result<Self> {
                match key {
                    BasicValue::$variant(v) => Ok(v),
                    other => Err(Error::mismatch(Self::KEY_TYPE, other.basic_type())),
                }
            }
        }
    };
}

basic_binding!(u8, Byte);
basic_binding!(bool, Boolean);
basic_binding!(i16, Int16);
basic_binding!(u16, UInt16);
basic_binding!(i32, Int32);
basic_binding!(u32, UInt32);
basic_binding!(i64, Int64);
basic_binding!(u64, UInt64);
basic_binding!(f64, Double);
basic_binding!(String, String);
basic_binding!(ObjectPath, ObjectPath);
basic_binding!(Signature, Signature);

/// An index into the file descriptors sent alongside a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnixFd(pub u32);

impl DbusType for UnixFd {
    fn dbus_type() -> TypeDefinition {
        TypeDefinition::Basic(BasicType::UnixFd)
    }
}

impl IntoDbus for UnixFd {
    fn into_dbus(self) -> Result<DbusValue> {
        Ok(DbusValue::Basic(BasicValue::UnixFd(self.0)))
    }
}

impl FromDbus for UnixFd {
    fn from_dbus(value: DbusValue) -> Result<Self> {
        match value {
            DbusValue::Basic(BasicValue::UnixFd(fd)) => Ok(UnixFd(fd)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

// DBus has no single-precision type; f32 travels as a DOUBLE.
impl DbusType for f32 {
    fn dbus_type() -> TypeDefinition {
        TypeDefinition::Basic(BasicType::Double)
    }
}

impl IntoDbus for f32 {
    fn into_dbus(self) -> Result<DbusValue> {
        Ok(DbusValue::Basic(BasicValue::Double(self.into())))
    }
}

impl FromDbus for f32 {
    fn from_dbus(value: DbusValue) -> Result<Self> {
        f64::from_dbus(value).map(|v| v as f32)
    }
}

impl DbusType for &str {
    fn dbus_type() -> TypeDefinition {
        TypeDefinition::Basic(BasicType::String)
    }
}

impl IntoDbus for &str {
    fn into_dbus(self) -> Result<DbusValue> {
        Ok(DbusValue::Basic(BasicValue::String(self.to_owned())))
    }
}

impl DbusType for VariantValue {
    fn dbus_type() -> TypeDefinition {
        TypeDefinition::Basic(BasicType::Variant)
    }
}

impl IntoDbus for VariantValue {
    fn into_dbus(self) -> Result<DbusValue> {
        Ok(DbusValue::Variant(self))
    }
}

impl FromDbus for VariantValue {
    fn from_dbus(value: DbusValue) -> Result<Self> {
        match value {
            DbusValue::Variant(v) => Ok(v),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: DbusType> DbusType for Vec<T> {
    fn dbus_type() -> TypeDefinition {
        TypeDefinition::array(T::dbus_type())
    }
}

impl<T: IntoDbus> IntoDbus for Vec<T> {
    fn into_dbus(self) -> Result<DbusValue> {
        let elements = self
            .into_iter()
            .map(IntoDbus::into_dbus)
            .collect::<Result<Vec<_>>>()?;
        Ok(DbusValue::Array(ArrayValue::new(T::dbus_type(), elements)?))
    }
}

impl<T: FromDbus> FromDbus for Vec<T> {
    fn from_dbus(value: DbusValue) -> Result<Self> {
        match value {
            DbusValue::Array(array) if *array.element_type() == T::dbus_type() => array
                .into_elements()
                .into_iter()
                .map(T::from_dbus)
                .collect(),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

macro_rules! map_binding {
    ($map:ident $(, $bound:path)*) => {
        impl<K: DbusKey $(+ $bound)*, V: DbusType> DbusType for $map<K, V> {
            fn dbus_type() -> TypeDefinition {
                TypeDefinition::Dict(K::KEY_TYPE, Box::new(V::dbus_type()))
            }
        }

        impl<K: DbusKey $(+ $bound)*, V: IntoDbus> IntoDbus for $map<K, V> {
            fn into_dbus(self) -> Result<DbusValue> {
                let entries = self
                    .into_iter()
                    .map(|(k, v)| Ok((k.into_key(), v.into_dbus()?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(DbusValue::Dict(DictValue::new(
                    K::KEY_TYPE,
                    V::dbus_type(),
                    entries,
                )?))
            }
        }

        impl<K: DbusKey $(+ $bound)*, V: FromDbus> FromDbus for $map<K, V> {
            fn from_dbus(value: DbusValue) -> Result<Self> {
                match value {
                    DbusValue::Dict(dict)
                        if dict.key_type() == K::KEY_TYPE
                            && *dict.value_type() == V::dbus_type() =>
                    {
                        dict.into_entries()
                            .into_iter()
                            .map(|(k, v)| Ok((K::from_key(k)?, V::from_dbus(v)?)))
                            .collect()
                    }
                    other => Err(mismatch::<Self>(&other)),
                }
            }
        }
    };
}

map_binding!(HashMap, Eq, Hash);
map_binding!(BTreeMap, Ord);

fn next_field<T: FromDbus>(fields: &mut impl Iterator<Item = DbusValue>) -> Result<T> {
    match fields.next() {
        Some(field) => T::from_dbus(field),
        None => Err(Error::mismatch(T::dbus_type(), "nothing")),
    }
}

macro_rules! tuple_binding {
    ($($name:ident $field:ident)+) => {
        impl<$($name: DbusType),+> DbusType for ($($name,)+) {
            fn dbus_type() -> TypeDefinition {
                TypeDefinition::Struct(vec![$($name::dbus_type()),+])
            }
        }

        impl<$($name: IntoDbus),+> IntoDbus for ($($name,)+) {
            fn into_dbus(self) -> Result<DbusValue> {
                let ($($field,)+) = self;
                Ok(DbusValue::Struct(StructValue::new(vec![$($field.into_dbus()?),+])?))
            }
        }

        impl<$($name: FromDbus),+> FromDbus for ($($name,)+) {
            fn from_dbus(value: DbusValue) -> Result<Self> {
                let arity = [$(stringify!($name)),+].len();
                match value {
                    DbusValue::Struct(s) if s.fields().len() == arity => {
                        let mut fields = s.into_fields().into_iter();
                        Ok(($(next_field::<$name>(&mut fields)?,)+))
                    }
                    other => Err(mismatch::<Self>(&other)),
                }
            }
        }
    };
}

tuple_binding!(A a);
tuple_binding!(A a B b);
tuple_binding!(A a B b C c);
tuple_binding!(A a B b C c D d);
tuple_binding!(A a B b C c D d E e);
tuple_binding!(A a B b C c D d E e F f);
