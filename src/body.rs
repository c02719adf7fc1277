//! A message body: the signature of its arguments together with their
//! encoded bytes. This is the unit the transport layer hands over once
//! it has split a message into header and body.

use crate::cursor::AlignedCursor;
use crate::de::decode_sequence;
use crate::error::Result;
use crate::options::CodecOptions;
use crate::ser::encode_sequence;
use crate::signature::{parse_signature, serialize_signature};
use crate::types::TypeDefinition;
use crate::value::DbusValue;

use byteorder::ByteOrder;
use log::debug;

#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub signature: Vec<TypeDefinition>,
    pub data: Vec<u8>,
}

impl Body {
    pub fn from_parts(signature: &str, data: Vec<u8>) -> Result<Self> {
        Ok(Self {
            signature: parse_signature(signature)?,
            data,
        })
    }

    pub fn encode<B: ByteOrder>(values: &[DbusValue]) -> Result<Self> {
        Self::encode_with_options::<B>(values, CodecOptions::default())
    }

    pub fn encode_with_options<B: ByteOrder>(
        values: &[DbusValue],
        options: CodecOptions,
    ) -> Result<Self> {
        let signature: Vec<TypeDefinition> =
            values.iter().map(DbusValue::type_definition).collect();
        for ty in &signature {
            ty.validate()?;
        }
        let mut cursor = AlignedCursor::<B>::with_options(options);
        encode_sequence(values, &mut cursor)?;
        let body = Self {
            signature,
            data: cursor.into_bytes(),
        };
        debug!(
            "Encoded body '{}' of {} bytes",
            body.signature_string(),
            body.data.len()
        );
        Ok(body)
    }

    /// Decode every argument, requiring the data to be used up exactly.
    pub fn decode<B: ByteOrder>(&self) -> Result<Vec<DbusValue>> {
        self.decode_with_options::<B>(CodecOptions::default())
    }

    pub fn decode_with_options<B: ByteOrder>(
        &self,
        options: CodecOptions,
    ) -> Result<Vec<DbusValue>> {
        debug!(
            "Decoding body '{}' of {} bytes",
            self.signature_string(),
            self.data.len()
        );
        let mut cursor = AlignedCursor::<B>::from_bytes_with_options(self.data.as_slice(), options);
        let values = decode_sequence(&self.signature, &mut cursor)?;
        cursor.finish()?;
        Ok(values)
    }

    pub fn signature_string(&self) -> String {
        serialize_signature(&self.signature)
    }
}
