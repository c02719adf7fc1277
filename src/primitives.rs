use crate::error::{Error, Result, ValueErrorKind};
use crate::signature::{parse_signature, serialize_signature};
use crate::types::{BasicType, TypeDefinition};

use byteorder::ByteOrder;
use std::fmt;
use std::mem::size_of;

/// A fixed-width scalar that can be read from and written to the wire
/// in either byte order.
pub trait Primitive: Copy {
    const WIDTH: usize;

    fn write<B: ByteOrder>(self, out: &mut [u8]);
    fn read<B: ByteOrder>(input: &[u8]) -> Self;
}

macro_rules! basic_primitive {
    ($type:ident, $write:ident, $read:ident) => {
        impl Primitive for $type {
            const WIDTH: usize = size_of::<$type>();

            fn write<B: ByteOrder>(self, out: &mut [u8]) {
                B::$write(out, self);
            }

            fn read<B: ByteOrder>(input: &[u8]) -> Self {
                B::$read(input)
            }
        }
    };
}

basic_primitive!(i16, write_i16, read_i16);
basic_primitive!(u16, write_u16, read_u16);
basic_primitive!(i32, write_i32, read_i32);
basic_primitive!(u32, write_u32, read_u32);
basic_primitive!(i64, write_i64, read_i64);
basic_primitive!(u64, write_u64, read_u64);
basic_primitive!(f64, write_f64, read_f64);

impl Primitive for u8 {
    const WIDTH: usize = 1;

    fn write<B: ByteOrder>(self, out: &mut [u8]) {
        out[0] = self;
    }

    fn read<B: ByteOrder>(input: &[u8]) -> Self {
        input[0]
    }
}

/// A validated object path: `/`, or `/`-separated non-empty segments of
/// `[A-Za-z0-9_]`, with no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

pub(crate) fn is_valid_object_path(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    match path.strip_prefix('/') {
        Some(rest) => rest.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_')
        }),
        None => false,
    }
}

impl ObjectPath {
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !is_valid_object_path(&path) {
            return Err(Error::malformed_value(
                0,
                ValueErrorKind::InvalidObjectPath(path),
            ));
        }
        Ok(ObjectPath(path))
    }

    pub(crate) fn new_unchecked(path: String) -> Self {
        ObjectPath(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maximum length of a signature on the wire, set by its 1-byte length.
pub const MAX_SIGNATURE_LEN: usize = 255;

/// A signature carried as a value, i.e. the `g` type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(Vec<TypeDefinition>);

impl Signature {
    pub fn new(types: Vec<TypeDefinition>) -> Result<Self> {
        for ty in &types {
            ty.validate()?;
        }
        Ok(Signature(types))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(Signature(parse_signature(text)?))
    }

    pub(crate) fn new_unchecked(types: Vec<TypeDefinition>) -> Self {
        Signature(types)
    }

    pub fn single(ty: TypeDefinition) -> Result<Self> {
        Signature::new(vec![ty])
    }

    pub fn types(&self) -> &[TypeDefinition] {
        &self.0
    }

    pub fn into_types(self) -> Vec<TypeDefinition> {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize_signature(&self.0))
    }
}

impl From<BasicType> for Signature {
    fn from(ty: BasicType) -> Self {
        Signature(vec![TypeDefinition::Basic(ty)])
    }
}
