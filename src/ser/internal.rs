use crate::cursor::AlignedCursor;
use crate::error::{Error, Result, ValueErrorKind};
use crate::primitives::MAX_SIGNATURE_LEN;
use crate::signature::serialize_signature;
use crate::types::{BasicType, TypeDefinition};
use crate::value::{BasicValue, DbusValue, DictValue, VariantValue};

use byteorder::ByteOrder;
use log::trace;
use std::slice;

pub(super) struct Encoder<'a, B: ByteOrder> {
    cursor: &'a mut AlignedCursor<B>,
    depth: usize,
}

impl<'a, B: ByteOrder> Encoder<'a, B> {
    pub(super) fn new(cursor: &'a mut AlignedCursor<B>) -> Self {
        Self { cursor, depth: 0 }
    }

    pub(super) fn value(&mut self, ty: &TypeDefinition, value: &DbusValue) -> Result<()> {
        match (ty, value) {
            (TypeDefinition::Basic(BasicType::Variant), DbusValue::Variant(variant)) => {
                self.nested(|en| en.variant(variant))
            }
            (TypeDefinition::Basic(basic), DbusValue::Basic(v)) => self.basic(*basic, v),
            (TypeDefinition::Array(element), DbusValue::Array(array))
                if array.element_type() == &**element =>
            {
                self.nested(|en| en.array(element, array.elements()))
            }
            (TypeDefinition::Dict(key, value_type), DbusValue::Dict(dict))
                if dict.key_type() == *key && dict.value_type() == &**value_type =>
            {
                self.nested(|en| en.dict(dict))
            }
            (TypeDefinition::Struct(fields), DbusValue::Struct(s))
                if fields.len() == s.fields().len() =>
            {
                self.nested(|en| en.structure(fields, s.fields()))
            }
            _ => Err(Error::mismatch(ty, value.type_definition())),
        }
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        let max_depth = self.cursor.options().max_depth;
        if self.depth >= max_depth {
            return Err(Error::malformed_value(
                self.cursor.write_position(),
                ValueErrorKind::NestingTooDeep(max_depth),
            ));
        }
        self.depth += 1;
        let res = f(self);
        self.depth -= 1;
        res
    }

    fn basic(&mut self, ty: BasicType, value: &BasicValue) -> Result<()> {
        if value.basic_type() != ty {
            return Err(Error::mismatch(ty, value.basic_type()));
        }
        self.cursor.align_write(ty.alignment());
        trace!("Write '{}' at {}", ty, self.cursor.write_position());
        match value {
            BasicValue::Byte(v) => self.cursor.write(*v),
            BasicValue::Boolean(v) => self.cursor.write(*v as u32),
            BasicValue::Int16(v) => self.cursor.write(*v),
            BasicValue::UInt16(v) => self.cursor.write(*v),
            BasicValue::Int32(v) => self.cursor.write(*v),
            BasicValue::UInt32(v) => self.cursor.write(*v),
            BasicValue::Int64(v) => self.cursor.write(*v),
            BasicValue::UInt64(v) => self.cursor.write(*v),
            BasicValue::Double(v) => self.cursor.write(*v),
            BasicValue::UnixFd(v) => self.cursor.write(*v),
            BasicValue::String(s) => self.string(s)?,
            BasicValue::ObjectPath(path) => self.string(path.as_str())?,
            BasicValue::Signature(sig) => self.signature(sig.types())?,
        }
        Ok(())
    }

    // Already aligned
    fn string(&mut self, s: &str) -> Result<()> {
        let bytes = s.as_bytes();
        if bytes.len() > u32::MAX as usize {
            return Err(Error::SizeLimitExceeded {
                what: "string",
                len: bytes.len(),
                limit: u32::MAX as usize,
            });
        }
        if bytes.contains(&0) {
            return Err(Error::malformed_value(
                self.cursor.write_position(),
                ValueErrorKind::InteriorNul,
            ));
        }
        self.cursor.write(bytes.len() as u32);
        self.cursor.write_bytes(bytes);
        self.cursor.write(0u8);
        Ok(())
    }

    // Hand-built types may break rules the signature grammar enforces, and
    // such a signature would not decode.
    fn signature(&mut self, types: &[TypeDefinition]) -> Result<()> {
        for ty in types {
            ty.validate()?;
        }
        let text = serialize_signature(types);
        if text.len() > MAX_SIGNATURE_LEN {
            return Err(Error::SizeLimitExceeded {
                what: "signature",
                len: text.len(),
                limit: MAX_SIGNATURE_LEN,
            });
        }
        self.cursor.write(text.len() as u8);
        self.cursor.write_bytes(text.as_bytes());
        self.cursor.write(0u8);
        Ok(())
    }

    fn variant(&mut self, variant: &VariantValue) -> Result<()> {
        let inner_type = variant.inner_type();
        if !variant.value().conforms_to(inner_type) {
            return Err(Error::mismatch(
                inner_type,
                variant.value().type_definition(),
            ));
        }
        self.signature(slice::from_ref(inner_type))?;
        // The value picks up its own alignment after the signature.
        self.value(inner_type, variant.value())
    }

    // Writes a placeholder length, the padding to the first element, the
    // body, then goes back to fill in the length. Nothing is filled in if
    // the body fails.
    fn array_body(
        &mut self,
        element_alignment: usize,
        body: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let slot = self.cursor.reserve_u32();
        self.cursor.align_write(element_alignment);
        let start_ix = self.cursor.write_position();
        body(self)?;
        let size = self.cursor.write_position() - start_ix;

        let max_array_len = self.cursor.options().max_array_len;
        if size > max_array_len as usize {
            return Err(Error::SizeLimitExceeded {
                what: "array",
                len: size,
                limit: max_array_len as usize,
            });
        }
        trace!("array of {} bytes at {}", size, start_ix);
        self.cursor.fill_u32(slot, size as u32);
        Ok(())
    }

    fn array(&mut self, element_type: &TypeDefinition, elements: &[DbusValue]) -> Result<()> {
        self.array_body(element_type.alignment(), |en| {
            for element in elements {
                en.value(element_type, element)?;
            }
            Ok(())
        })
    }

    fn dict(&mut self, dict: &DictValue) -> Result<()> {
        let key_type = dict.key_type();
        let value_type = dict.value_type();
        self.array_body(8, |en| {
            for (key, value) in dict.entries() {
                en.nested(|en| {
                    en.cursor.align_write(8);
                    en.basic(key_type, key)?;
                    en.value(value_type, value)
                })?;
            }
            Ok(())
        })
    }

    fn structure(&mut self, fields: &[TypeDefinition], values: &[DbusValue]) -> Result<()> {
        self.cursor.align_write(8);
        for (ty, value) in fields.iter().zip(values) {
            self.value(ty, value)?;
        }
        Ok(())
    }
}
