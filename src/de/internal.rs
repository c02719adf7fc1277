use crate::cursor::AlignedCursor;
use crate::error::{Error, Result, ValueErrorKind};
use crate::primitives::{is_valid_object_path, ObjectPath, Signature};
use crate::signature::parse_signature_bytes;
use crate::types::{BasicType, TypeDefinition};
use crate::value::{ArrayValue, BasicValue, DbusValue, DictValue, StructValue, VariantValue};

use byteorder::ByteOrder;
use log::trace;
use std::cmp::Ordering;
use std::str::from_utf8;

pub(super) struct Decoder<'a, B: ByteOrder> {
    cursor: &'a mut AlignedCursor<B>,
    depth: usize,
}

impl<'a, B: ByteOrder> Decoder<'a, B> {
    pub(super) fn new(cursor: &'a mut AlignedCursor<B>) -> Self {
        Self { cursor, depth: 0 }
    }

    pub(super) fn value(&mut self, ty: &TypeDefinition) -> Result<DbusValue> {
        match ty {
            TypeDefinition::Basic(BasicType::Variant) => self.nested(Self::variant),
            TypeDefinition::Basic(basic) => Ok(DbusValue::Basic(self.basic(*basic)?)),
            TypeDefinition::Array(element) => self.nested(|de| de.array(element)),
            TypeDefinition::Dict(key, value) => self.nested(|de| de.dict(*key, value)),
            TypeDefinition::Struct(fields) => self.nested(|de| de.structure(fields)),
        }
    }

    fn offset(&self) -> usize {
        self.cursor.read_position()
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let max_depth = self.cursor.options().max_depth;
        if self.depth >= max_depth {
            return Err(Error::malformed_value(
                self.offset(),
                ValueErrorKind::NestingTooDeep(max_depth),
            ));
        }
        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }

    pub(super) fn basic(&mut self, ty: BasicType) -> Result<BasicValue> {
        self.cursor.align_read(ty.alignment())?;
        let offset = self.offset();
        trace!("Read '{}' at {}", ty, offset);
        let value = match ty {
            BasicType::Byte => BasicValue::Byte(self.cursor.read()?),
            BasicType::Boolean => match self.cursor.read::<u32>()? {
                0 => BasicValue::Boolean(false),
                1 => BasicValue::Boolean(true),
                other => {
                    return Err(Error::malformed_value(
                        offset,
                        ValueErrorKind::InvalidBoolean(other),
                    ))
                }
            },
            BasicType::Int16 => BasicValue::Int16(self.cursor.read()?),
            BasicType::UInt16 => BasicValue::UInt16(self.cursor.read()?),
            BasicType::Int32 => BasicValue::Int32(self.cursor.read()?),
            BasicType::UInt32 => BasicValue::UInt32(self.cursor.read()?),
            BasicType::Int64 => BasicValue::Int64(self.cursor.read()?),
            BasicType::UInt64 => BasicValue::UInt64(self.cursor.read()?),
            BasicType::Double => BasicValue::Double(self.cursor.read()?),
            BasicType::UnixFd => BasicValue::UnixFd(self.cursor.read()?),
            BasicType::String => BasicValue::String(self.string()?),
            BasicType::ObjectPath => {
                let path = self.string()?;
                if !is_valid_object_path(&path) {
                    return Err(Error::malformed_value(
                        offset,
                        ValueErrorKind::InvalidObjectPath(path),
                    ));
                }
                BasicValue::ObjectPath(ObjectPath::new_unchecked(path))
            }
            BasicType::Signature => BasicValue::Signature(self.signature()?),
            // Only reachable through a hand-built dict keyed by variants.
            BasicType::Variant => return Err(Error::mismatch("a basic type other than variant", ty)),
        };
        Ok(value)
    }

    fn nul_terminator(&mut self) -> Result<()> {
        let offset = self.offset();
        match self.cursor.read::<u8>()? {
            0 => Ok(()),
            other => Err(Error::malformed_value(
                offset,
                ValueErrorKind::MissingNul(other),
            )),
        }
    }

    // Already aligned
    fn string(&mut self) -> Result<String> {
        let offset = self.offset();
        let size = self.cursor.read::<u32>()? as usize;
        trace!("string size is {}", size);
        let bytes = self.cursor.read_bytes(size)?;
        if bytes.contains(&0) {
            return Err(Error::malformed_value(offset, ValueErrorKind::InteriorNul));
        }
        let string = from_utf8(bytes)
            .map_err(|_| Error::malformed_value(offset, ValueErrorKind::InvalidUtf8))?
            .to_owned();
        self.nul_terminator()?;
        Ok(string)
    }

    fn signature(&mut self) -> Result<Signature> {
        let offset = self.offset();
        let size = self.cursor.read::<u8>()? as usize;
        let bytes = self.cursor.read_bytes(size)?;
        let types = parse_signature_bytes(bytes).map_err(|e| {
            Error::malformed_value(offset, ValueErrorKind::InvalidSignature(Box::new(e)))
        })?;
        self.nul_terminator()?;
        Ok(Signature::new_unchecked(types))
    }

    fn variant(&mut self) -> Result<DbusValue> {
        let offset = self.offset();
        let mut types = self.signature()?.into_types();
        if types.len() != 1 {
            return Err(Error::malformed_value(
                offset,
                ValueErrorKind::VariantArity(types.len()),
            ));
        }
        let ty = types.remove(0);
        trace!("variant of '{}' at {}", ty, offset);
        let value = self.value(&ty)?;
        Ok(DbusValue::Variant(VariantValue::from_parts(ty, value)))
    }

    // Reads the length, the padding before the first element, then calls
    // `element` until exactly the declared number of bytes is used up.
    fn array_body(
        &mut self,
        element_alignment: usize,
        mut element: impl FnMut(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.cursor.align_read(4)?;
        let size = self.cursor.read::<u32>()?;
        let max_array_len = self.cursor.options().max_array_len;
        if size > max_array_len {
            return Err(Error::SizeLimitExceeded {
                what: "array",
                len: size as usize,
                limit: max_array_len as usize,
            });
        }
        let size = size as usize;

        // Padding to the first element is not part of the length.
        self.cursor.align_read(element_alignment)?;
        let start_ix = self.offset();
        if size > self.cursor.remaining() {
            return Err(Error::UnexpectedEndOfStream {
                offset: start_ix,
                needed: size,
                available: self.cursor.remaining(),
            });
        }
        let end_ix = start_ix + size;
        trace!("array of {} bytes at {}", size, start_ix);

        loop {
            match self.offset().cmp(&end_ix) {
                Ordering::Less => element(self)?,
                Ordering::Equal => return Ok(()),
                Ordering::Greater => {
                    return Err(Error::malformed_value(
                        start_ix,
                        ValueErrorKind::ArrayLength {
                            declared: size,
                            consumed: self.offset() - start_ix,
                        },
                    ))
                }
            }
        }
    }

    fn array(&mut self, element_type: &TypeDefinition) -> Result<DbusValue> {
        let mut elements = Vec::new();
        self.array_body(element_type.alignment(), |de| {
            elements.push(de.value(element_type)?);
            Ok(())
        })?;
        Ok(DbusValue::Array(ArrayValue::from_parts(
            element_type.clone(),
            elements,
        )))
    }

    fn dict(&mut self, key_type: BasicType, value_type: &TypeDefinition) -> Result<DbusValue> {
        let mut dict = DictValue::empty_unchecked(key_type, value_type.clone());
        self.array_body(8, |de| {
            let (key, value) = de.nested(|de| {
                de.cursor.align_read(8)?;
                let key = de.basic(key_type)?;
                let value = de.value(value_type)?;
                Ok((key, value))
            })?;
            dict.insert(key, value);
            Ok(())
        })?;
        Ok(DbusValue::Dict(dict))
    }

    fn structure(&mut self, fields: &[TypeDefinition]) -> Result<DbusValue> {
        self.cursor.align_read(8)?;
        let values = fields
            .iter()
            .map(|field| self.value(field))
            .collect::<Result<Vec<_>>>()?;
        Ok(DbusValue::Struct(StructValue::new(values)?))
    }
}
