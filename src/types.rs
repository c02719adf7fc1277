//! The DBus type model.
//!
//! Every value on the wire is described by a [`TypeDefinition`]: either a
//! [`BasicType`], written as a single signature character, or one of the
//! container shapes built out of other types. Note that [`BasicType::Variant`]
//! counts as basic here, as it is written as the single character `v`; the
//! type of the value inside a variant is only known once it is read off the
//! wire.

use crate::error::{Error, Result, SignatureErrorKind};
use crate::signature;

use std::fmt;
use std::str::FromStr;

/// Deepest permitted nesting of arrays within a signature.
pub const MAX_ARRAY_DEPTH: usize = 32;

/// Deepest permitted nesting of structs and dict entries within a signature.
pub const MAX_STRUCT_DEPTH: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicType {
    Byte,
    Boolean,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    UnixFd,
    String,
    ObjectPath,
    Signature,
    Variant,
}

/// How a basic type is laid out on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// A fixed number of bytes, aligned to that same number.
    Fixed(usize),
    /// A 4-byte length, the bytes, and a NUL terminator.
    StringLike,
    /// A 1-byte length, the bytes, and a NUL terminator.
    SignatureLike,
    /// A signature followed by a value of the type it names.
    SelfDescribing,
}

const ALL_BASIC_TYPES: [BasicType; 14] = [
    BasicType::Byte,
    BasicType::Boolean,
    BasicType::Int16,
    BasicType::UInt16,
    BasicType::Int32,
    BasicType::UInt32,
    BasicType::Int64,
    BasicType::UInt64,
    BasicType::Double,
    BasicType::UnixFd,
    BasicType::String,
    BasicType::ObjectPath,
    BasicType::Signature,
    BasicType::Variant,
];

impl BasicType {
    pub fn code(self) -> u8 {
        match self {
            BasicType::Byte => b'y',
            BasicType::Boolean => b'b',
            BasicType::Int16 => b'n',
            BasicType::UInt16 => b'q',
            BasicType::Int32 => b'i',
            BasicType::UInt32 => b'u',
            BasicType::Int64 => b'x',
            BasicType::UInt64 => b't',
            BasicType::Double => b'd',
            BasicType::UnixFd => b'h',
            BasicType::String => b's',
            BasicType::ObjectPath => b'o',
            BasicType::Signature => b'g',
            BasicType::Variant => b'v',
        }
    }

    /// Look up the basic type written as `code`. Container characters
    /// (`a`, `(`, `{`, ...) are not basic types and return `None`.
    pub fn by_code(code: u8) -> Option<BasicType> {
        ALL_BASIC_TYPES.iter().copied().find(|ty| ty.code() == code)
    }

    pub fn all() -> &'static [BasicType] {
        &ALL_BASIC_TYPES
    }

    pub fn layout(self) -> Layout {
        match self {
            BasicType::Byte => Layout::Fixed(1),
            // Booleans take up a full 32 bits on the wire.
            BasicType::Boolean => Layout::Fixed(4),
            BasicType::Int16 | BasicType::UInt16 => Layout::Fixed(2),
            BasicType::Int32 | BasicType::UInt32 | BasicType::UnixFd => Layout::Fixed(4),
            BasicType::Int64 | BasicType::UInt64 | BasicType::Double => Layout::Fixed(8),
            BasicType::String | BasicType::ObjectPath => Layout::StringLike,
            BasicType::Signature => Layout::SignatureLike,
            BasicType::Variant => Layout::SelfDescribing,
        }
    }

    pub fn alignment(self) -> usize {
        match self.layout() {
            Layout::Fixed(width) => width,
            Layout::StringLike => 4,
            Layout::SignatureLike | Layout::SelfDescribing => 1,
        }
    }

    pub fn fixed_width(self) -> Option<usize> {
        match self.layout() {
            Layout::Fixed(width) => Some(width),
            _ => None,
        }
    }

    pub fn is_string_like(self) -> bool {
        matches!(self.layout(), Layout::StringLike | Layout::SignatureLike)
    }

    pub fn is_numeric(self) -> bool {
        self.fixed_width().is_some()
    }

    pub fn is_integer(self) -> bool {
        self.is_numeric() && self != BasicType::Double
    }

    /// Whether this type may be used as the key of a dict entry.
    pub fn is_dict_key(self) -> bool {
        self != BasicType::Variant
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code() as char)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDefinition {
    Basic(BasicType),
    Array(Box<TypeDefinition>),
    /// An array of dict entries, written `a{kv}`.
    Dict(BasicType, Box<TypeDefinition>),
    Struct(Vec<TypeDefinition>),
}

impl From<BasicType> for TypeDefinition {
    fn from(ty: BasicType) -> Self {
        TypeDefinition::Basic(ty)
    }
}

impl TypeDefinition {
    pub fn array(element: impl Into<TypeDefinition>) -> Self {
        TypeDefinition::Array(Box::new(element.into()))
    }

    pub fn dict(key: BasicType, value: impl Into<TypeDefinition>) -> Result<Self> {
        if !key.is_dict_key() {
            return Err(Error::mismatch("a basic type other than variant", key));
        }
        Ok(TypeDefinition::Dict(key, Box::new(value.into())))
    }

    pub fn structure(fields: Vec<TypeDefinition>) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::mismatch("a struct with at least one field", "()"));
        }
        Ok(TypeDefinition::Struct(fields))
    }

    /// Alignment of the first byte of a value of this type.
    ///
    /// Dicts are arrays on the wire, so they start with a 4-aligned length;
    /// it is their entries that are 8-aligned. See [`element_alignment`].
    ///
    /// [`element_alignment`]: TypeDefinition::element_alignment
    pub fn alignment(&self) -> usize {
        match self {
            TypeDefinition::Basic(ty) => ty.alignment(),
            TypeDefinition::Array(_) | TypeDefinition::Dict(_, _) => 4,
            TypeDefinition::Struct(_) => 8,
        }
    }

    /// Alignment of the elements of an array or dict, padded to even when
    /// the container is empty.
    pub fn element_alignment(&self) -> Option<usize> {
        match self {
            TypeDefinition::Array(element) => Some(element.alignment()),
            TypeDefinition::Dict(_, _) => Some(8),
            _ => None,
        }
    }

    pub fn basic(&self) -> Option<BasicType> {
        match self {
            TypeDefinition::Basic(ty) => Some(*ty),
            _ => None,
        }
    }

    /// The signature fragment for this type alone.
    pub fn signature(&self) -> String {
        let mut out = String::new();
        self.write_signature(&mut out);
        out
    }

    pub(crate) fn write_signature(&self, out: &mut String) {
        match self {
            TypeDefinition::Basic(ty) => out.push(ty.code() as char),
            TypeDefinition::Array(element) => {
                out.push('a');
                element.write_signature(out);
            }
            TypeDefinition::Dict(key, value) => {
                out.push_str("a{");
                out.push(key.code() as char);
                value.write_signature(out);
                out.push('}');
            }
            TypeDefinition::Struct(fields) => {
                out.push('(');
                for field in fields {
                    field.write_signature(out);
                }
                out.push(')');
            }
        }
    }

    /// Check the rules a hand-built tree could break but a parsed one
    /// cannot: non-empty structs, basic non-variant dict keys, and the
    /// nesting limits.
    pub fn validate(&self) -> Result<()> {
        self.validate_at(0, 0, 0)?;
        Ok(())
    }

    fn validate_at(&self, position: usize, arrays: usize, structs: usize) -> Result<usize> {
        let too_deep = |position| Error::malformed_signature(position, SignatureErrorKind::TooDeep);
        match self {
            TypeDefinition::Basic(_) => Ok(position + 1),
            TypeDefinition::Array(element) => {
                if arrays >= MAX_ARRAY_DEPTH {
                    return Err(too_deep(position));
                }
                element.validate_at(position + 1, arrays + 1, structs)
            }
            TypeDefinition::Dict(key, value) => {
                if arrays >= MAX_ARRAY_DEPTH || structs >= MAX_STRUCT_DEPTH {
                    return Err(too_deep(position));
                }
                if !key.is_dict_key() {
                    return Err(Error::malformed_signature(
                        position + 2,
                        SignatureErrorKind::NonBasicDictKey,
                    ));
                }
                let end = value.validate_at(position + 3, arrays + 1, structs + 1)?;
                Ok(end + 1)
            }
            TypeDefinition::Struct(fields) => {
                if fields.is_empty() {
                    return Err(Error::malformed_signature(
                        position + 1,
                        SignatureErrorKind::EmptyStruct,
                    ));
                }
                if structs >= MAX_STRUCT_DEPTH {
                    return Err(too_deep(position));
                }
                let mut next = position + 1;
                for field in fields {
                    next = field.validate_at(next, arrays, structs + 1)?;
                }
                Ok(next + 1)
            }
        }
    }
}

impl fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

impl FromStr for TypeDefinition {
    type Err = Error;

    /// Parse a signature holding exactly one complete type.
    fn from_str(s: &str) -> Result<Self> {
        let mut types = signature::parse_signature(s)?;
        if types.len() != 1 {
            // Points just past the first type, or at the start if there is none.
            let position = types.first().map_or(0, |ty| ty.signature().len());
            return Err(Error::malformed_signature(
                position,
                SignatureErrorKind::NotSingleType(types.len()),
            ));
        }
        Ok(types.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::{BasicType, Layout, TypeDefinition};
    use crate::error::{Error, Result, SignatureErrorKind};
    use test_log::test;

    #[test]
    fn codes_are_unique() {
        for ty in BasicType::all() {
            assert_eq!(BasicType::by_code(ty.code()), Some(*ty));
        }
        let mut codes: Vec<u8> = BasicType::all().iter().map(|ty| ty.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), BasicType::all().len());
    }

    #[test]
    fn containers_are_not_basic() {
        for code in b"a(){}z" {
            assert_eq!(BasicType::by_code(*code), None);
        }
    }

    #[test]
    fn alignment_table() {
        let expected = [
            (b'y', 1),
            (b'g', 1),
            (b'v', 1),
            (b'n', 2),
            (b'q', 2),
            (b'b', 4),
            (b'i', 4),
            (b'u', 4),
            (b'h', 4),
            (b's', 4),
            (b'o', 4),
            (b'x', 8),
            (b't', 8),
            (b'd', 8),
        ];
        for (code, alignment) in expected.iter() {
            let ty = BasicType::by_code(*code).unwrap();
            assert_eq!(ty.alignment(), *alignment, "alignment of {}", ty);
        }
        assert_eq!(TypeDefinition::array(BasicType::Byte).alignment(), 4);
        assert_eq!(
            TypeDefinition::structure(vec![BasicType::Byte.into()])
                .unwrap()
                .alignment(),
            8
        );
    }

    #[test]
    fn dict_entries_align_to_eight() -> Result<()> {
        let dict = TypeDefinition::dict(BasicType::String, BasicType::Byte)?;
        assert_eq!(dict.alignment(), 4);
        assert_eq!(dict.element_alignment(), Some(8));
        Ok(())
    }

    #[test]
    fn layouts() {
        assert_eq!(BasicType::Boolean.layout(), Layout::Fixed(4));
        assert_eq!(BasicType::ObjectPath.layout(), Layout::StringLike);
        assert_eq!(BasicType::Signature.layout(), Layout::SignatureLike);
        assert_eq!(BasicType::Variant.layout(), Layout::SelfDescribing);
        assert!(BasicType::UnixFd.is_integer());
        assert!(!BasicType::Double.is_integer());
        assert!(BasicType::Double.is_numeric());
        assert!(BasicType::Signature.is_string_like());
        assert!(!BasicType::Variant.is_numeric());
    }

    #[test]
    fn signature_fragments() -> Result<()> {
        let ty = TypeDefinition::structure(vec![
            BasicType::Int32.into(),
            TypeDefinition::dict(BasicType::String, BasicType::Variant)?,
            TypeDefinition::array(TypeDefinition::array(BasicType::Byte)),
        ])?;
        assert_eq!(ty.signature(), "(ia{sv}aay)");
        assert_eq!(ty.to_string(), "(ia{sv}aay)");
        Ok(())
    }

    #[test]
    fn from_str_single() -> Result<()> {
        let ty: TypeDefinition = "a{ov}".parse()?;
        assert_eq!(
            ty,
            TypeDefinition::dict(BasicType::ObjectPath, BasicType::Variant)?
        );
        assert_eq!(
            "ii".parse::<TypeDefinition>(),
            Err(Error::MalformedSignature {
                position: 1,
                kind: SignatureErrorKind::NotSingleType(2)
            })
        );
        assert_eq!(
            "a{sv}(y)".parse::<TypeDefinition>(),
            Err(Error::MalformedSignature {
                position: 5,
                kind: SignatureErrorKind::NotSingleType(2)
            })
        );
        assert_eq!(
            "".parse::<TypeDefinition>(),
            Err(Error::MalformedSignature {
                position: 0,
                kind: SignatureErrorKind::NotSingleType(0)
            })
        );
        Ok(())
    }

    #[test]
    fn constructors_reject_invalid_shapes() {
        assert_eq!(
            TypeDefinition::dict(BasicType::Variant, BasicType::Byte),
            Err(Error::TypeMismatch {
                expected: "a basic type other than variant".to_owned(),
                actual: "v".to_owned()
            })
        );
        assert!(matches!(
            TypeDefinition::structure(vec![]),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn validate_accepts_well_formed_trees() -> Result<()> {
        let ty: TypeDefinition = "a{sa(yv)}".parse()?;
        ty.validate()?;
        TypeDefinition::Basic(BasicType::Variant).validate()
    }

    #[test]
    fn validate_catches_hand_built_trees() {
        let bad_key = TypeDefinition::Dict(BasicType::Variant, Box::new(BasicType::Byte.into()));
        assert!(bad_key.validate().is_err());

        let empty = TypeDefinition::array(TypeDefinition::Struct(vec![]));
        assert_eq!(
            empty.validate(),
            Err(Error::MalformedSignature {
                position: 2,
                kind: SignatureErrorKind::EmptyStruct
            })
        );

        let mut deep = TypeDefinition::Basic(BasicType::Byte);
        for _ in 0..33 {
            deep = TypeDefinition::array(deep);
        }
        assert_eq!(
            deep.validate(),
            Err(Error::MalformedSignature {
                position: 32,
                kind: SignatureErrorKind::TooDeep
            })
        );
    }
}
