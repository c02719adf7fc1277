//! Decoded DBus values.
//!
//! Values are immutable once built. The container constructors check
//! that their children match the declared types, so a value tree always
//! describes itself consistently, and the codec can rely on
//! [`DbusValue::type_definition`] to recover the signature of anything
//! it is handed.

use crate::error::{Error, Result};
use crate::primitives::{ObjectPath, Signature};
use crate::types::{BasicType, TypeDefinition};

use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::mem;

#[derive(Clone, Debug, PartialEq)]
pub enum BasicValue {
    Byte(u8),
    Boolean(bool),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    /// Index into the out-of-band array of file descriptors.
    UnixFd(u32),
    String(String),
    ObjectPath(ObjectPath),
    Signature(Signature),
}

impl BasicValue {
    pub fn basic_type(&self) -> BasicType {
        match self {
            BasicValue::Byte(_) => BasicType::Byte,
            BasicValue::Boolean(_) => BasicType::Boolean,
            BasicValue::Int16(_) => BasicType::Int16,
            BasicValue::UInt16(_) => BasicType::UInt16,
            BasicValue::Int32(_) => BasicType::Int32,
            BasicValue::UInt32(_) => BasicType::UInt32,
            BasicValue::Int64(_) => BasicType::Int64,
            BasicValue::UInt64(_) => BasicType::UInt64,
            BasicValue::Double(_) => BasicType::Double,
            BasicValue::UnixFd(_) => BasicType::UnixFd,
            BasicValue::String(_) => BasicType::String,
            BasicValue::ObjectPath(_) => BasicType::ObjectPath,
            BasicValue::Signature(_) => BasicType::Signature,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            BasicValue::String(s) => Some(s),
            BasicValue::ObjectPath(path) => Some(path.as_str()),
            _ => None,
        }
    }

    // Doubles compare by bit pattern so that every key, NaN included,
    // can be found again.
    fn same_key(&self, other: &BasicValue) -> bool {
        match (self, other) {
            (BasicValue::Double(a), BasicValue::Double(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        }
    }

    // Consistent with `same_key`, not with `==`.
    fn hash_key<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);
        match self {
            BasicValue::Byte(v) => v.hash(state),
            BasicValue::Boolean(v) => v.hash(state),
            BasicValue::Int16(v) => v.hash(state),
            BasicValue::UInt16(v) => v.hash(state),
            BasicValue::Int32(v) => v.hash(state),
            BasicValue::UInt32(v) => v.hash(state),
            BasicValue::Int64(v) => v.hash(state),
            BasicValue::UInt64(v) => v.hash(state),
            BasicValue::Double(v) => v.to_bits().hash(state),
            BasicValue::UnixFd(v) => v.hash(state),
            BasicValue::String(v) => v.hash(state),
            BasicValue::ObjectPath(v) => v.hash(state),
            BasicValue::Signature(v) => v.hash(state),
        }
    }
}

macro_rules! basic_value_from {
    ($type:ty, $variant:ident) => {
        impl From<$type> for BasicValue {
            fn from(v: $type) -> Self {
                BasicValue::$variant(v)
            }
        }

        impl From<$type> for DbusValue {
            fn from(v: $type) -> Self {
                DbusValue::Basic(BasicValue::$variant(v))
            }
        }
    };
}

basic_value_from!(u8, Byte);
basic_value_from!(bool, Boolean);
basic_value_from!(i16, Int16);
basic_value_from!(u16, UInt16);
basic_value_from!(i32, Int32);
basic_value_from!(u32, UInt32);
basic_value_from!(i64, Int64);
basic_value_from!(u64, UInt64);
basic_value_from!(f64, Double);
basic_value_from!(String, String);
basic_value_from!(ObjectPath, ObjectPath);
basic_value_from!(Signature, Signature);

impl From<&str> for BasicValue {
    fn from(v: &str) -> Self {
        BasicValue::String(v.to_owned())
    }
}

impl From<&str> for DbusValue {
    fn from(v: &str) -> Self {
        DbusValue::Basic(BasicValue::String(v.to_owned()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DbusValue {
    Basic(BasicValue),
    Array(ArrayValue),
    Dict(DictValue),
    Struct(StructValue),
    Variant(VariantValue),
}

impl From<BasicValue> for DbusValue {
    fn from(v: BasicValue) -> Self {
        DbusValue::Basic(v)
    }
}

impl From<ArrayValue> for DbusValue {
    fn from(v: ArrayValue) -> Self {
        DbusValue::Array(v)
    }
}

impl From<DictValue> for DbusValue {
    fn from(v: DictValue) -> Self {
        DbusValue::Dict(v)
    }
}

impl From<StructValue> for DbusValue {
    fn from(v: StructValue) -> Self {
        DbusValue::Struct(v)
    }
}

impl From<VariantValue> for DbusValue {
    fn from(v: VariantValue) -> Self {
        DbusValue::Variant(v)
    }
}

impl DbusValue {
    pub fn type_definition(&self) -> TypeDefinition {
        match self {
            DbusValue::Basic(v) => TypeDefinition::Basic(v.basic_type()),
            DbusValue::Array(a) => TypeDefinition::Array(Box::new(a.element_type.clone())),
            DbusValue::Dict(d) => TypeDefinition::Dict(d.key_type, Box::new(d.value_type.clone())),
            DbusValue::Struct(s) => {
                TypeDefinition::Struct(s.fields.iter().map(DbusValue::type_definition).collect())
            }
            DbusValue::Variant(_) => TypeDefinition::Basic(BasicType::Variant),
        }
    }

    /// Whether this value is of type `ty`, without building its
    /// [`TypeDefinition`].
    pub fn conforms_to(&self, ty: &TypeDefinition) -> bool {
        match (self, ty) {
            (DbusValue::Basic(v), TypeDefinition::Basic(t)) => v.basic_type() == *t,
            (DbusValue::Variant(_), TypeDefinition::Basic(BasicType::Variant)) => true,
            (DbusValue::Array(a), TypeDefinition::Array(element)) => a.element_type == **element,
            (DbusValue::Dict(d), TypeDefinition::Dict(key, value)) => {
                d.key_type == *key && d.value_type == **value
            }
            (DbusValue::Struct(s), TypeDefinition::Struct(fields)) => {
                s.fields.len() == fields.len()
                    && s.fields.iter().zip(fields).all(|(v, t)| v.conforms_to(t))
            }
            _ => false,
        }
    }

    pub fn as_basic(&self) -> Option<&BasicValue> {
        match self {
            DbusValue::Basic(v) => Some(v),
            _ => None,
        }
    }

    /// Wrap this value in a variant.
    pub fn into_variant(self) -> DbusValue {
        DbusValue::Variant(VariantValue::new(self))
    }
}

fn check_conforms(ty: &TypeDefinition, value: &DbusValue) -> Result<()> {
    if value.conforms_to(ty) {
        Ok(())
    } else {
        Err(Error::mismatch(ty, value.type_definition()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArrayValue {
    element_type: TypeDefinition,
    elements: Vec<DbusValue>,
}

impl ArrayValue {
    pub fn new(element_type: TypeDefinition, elements: Vec<DbusValue>) -> Result<Self> {
        element_type.validate()?;
        for element in &elements {
            check_conforms(&element_type, element)?;
        }
        Ok(Self::from_parts(element_type, elements))
    }

    pub fn empty(element_type: TypeDefinition) -> Result<Self> {
        Self::new(element_type, Vec::new())
    }

    pub(crate) fn from_parts(element_type: TypeDefinition, elements: Vec<DbusValue>) -> Self {
        Self {
            element_type,
            elements,
        }
    }

    pub fn element_type(&self) -> &TypeDefinition {
        &self.element_type
    }

    pub fn elements(&self) -> &[DbusValue] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<DbusValue> {
        self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// A mapping from basic keys to values. Entries keep the order they were
/// inserted in, which is the order they are encoded in, but equality
/// ignores order.
#[derive(Clone)]
pub struct DictValue {
    key_type: BasicType,
    value_type: TypeDefinition,
    entries: Vec<(BasicValue, DbusValue)>,
    // Key hash to positions in `entries`. Lookups stay linear in the
    // number of colliding keys only.
    index: HashMap<u64, Vec<usize>>,
    hasher: RandomState,
}

impl DictValue {
    /// Build a dict, checking every key and value against the declared
    /// types. A repeated key replaces the earlier value.
    pub fn new(
        key_type: BasicType,
        value_type: TypeDefinition,
        entries: impl IntoIterator<Item = (BasicValue, DbusValue)>,
    ) -> Result<Self> {
        TypeDefinition::dict(key_type, value_type.clone())?.validate()?;
        let mut dict = Self::empty_unchecked(key_type, value_type);
        for (key, value) in entries {
            if key.basic_type() != key_type {
                return Err(Error::mismatch(key_type, key.basic_type()));
            }
            check_conforms(&dict.value_type, &value)?;
            dict.insert(key, value);
        }
        Ok(dict)
    }

    pub fn empty(key_type: BasicType, value_type: TypeDefinition) -> Result<Self> {
        Self::new(key_type, value_type, Vec::new())
    }

    pub(crate) fn empty_unchecked(key_type: BasicType, value_type: TypeDefinition) -> Self {
        Self {
            key_type,
            value_type,
            entries: Vec::new(),
            index: HashMap::new(),
            hasher: RandomState::new(),
        }
    }

    fn key_hash(&self, key: &BasicValue) -> u64 {
        let mut state = self.hasher.build_hasher();
        key.hash_key(&mut state);
        state.finish()
    }

    fn position(&self, key: &BasicValue) -> Option<usize> {
        self.index
            .get(&self.key_hash(key))?
            .iter()
            .copied()
            .find(|&ix| self.entries[ix].0.same_key(key))
    }

    // Last write wins.
    pub(crate) fn insert(&mut self, key: BasicValue, value: DbusValue) {
        match self.position(&key) {
            Some(ix) => self.entries[ix].1 = value,
            None => {
                let hash = self.key_hash(&key);
                self.index.entry(hash).or_default().push(self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn key_type(&self) -> BasicType {
        self.key_type
    }

    pub fn value_type(&self) -> &TypeDefinition {
        &self.value_type
    }

    pub fn get(&self, key: &BasicValue) -> Option<&DbusValue> {
        self.position(key).map(|ix| &self.entries[ix].1)
    }

    pub fn entries(&self) -> &[(BasicValue, DbusValue)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(BasicValue, DbusValue)> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for DictValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictValue")
            .field("key_type", &self.key_type)
            .field("value_type", &self.value_type)
            .field("entries", &self.entries)
            .finish()
    }
}

impl PartialEq for DictValue {
    fn eq(&self, other: &DictValue) -> bool {
        self.key_type == other.key_type
            && self.value_type == other.value_type
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k) == Some(v))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructValue {
    fields: Vec<DbusValue>,
}

impl StructValue {
    pub fn new(fields: Vec<DbusValue>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::mismatch("a struct with at least one field", "()"));
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[DbusValue] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<DbusValue> {
        self.fields
    }
}

/// A value together with its type. The two can only be put together
/// consistently, so a variant never claims a type its value doesn't have.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantValue {
    inner_type: TypeDefinition,
    value: Box<DbusValue>,
}

impl VariantValue {
    pub fn new(value: DbusValue) -> Self {
        Self {
            inner_type: value.type_definition(),
            value: Box::new(value),
        }
    }

    pub fn with_type(inner_type: TypeDefinition, value: DbusValue) -> Result<Self> {
        check_conforms(&inner_type, &value)?;
        Ok(Self::from_parts(inner_type, value))
    }

    pub(crate) fn from_parts(inner_type: TypeDefinition, value: DbusValue) -> Self {
        Self {
            inner_type,
            value: Box::new(value),
        }
    }

    pub fn inner_type(&self) -> &TypeDefinition {
        &self.inner_type
    }

    pub fn value(&self) -> &DbusValue {
        &self.value
    }

    pub fn into_inner(self) -> DbusValue {
        *self.value
    }
}
