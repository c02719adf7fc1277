//! Reading values off the wire.
//!
//! Decoding is driven entirely by a [`TypeDefinition`]: the bytes carry
//! no type information of their own except inside variants. Every
//! container is built only once all of its children have been read, so
//! a failed decode never yields a partial value. The cursor, however, is
//! left wherever the failure happened.

use crate::cursor::AlignedCursor;
use crate::error::Result;
use crate::types::TypeDefinition;
use crate::value::DbusValue;

use byteorder::ByteOrder;

mod internal;
use internal::Decoder;

/// Decode a single value of type `ty` from the current read position.
pub fn decode<B: ByteOrder>(ty: &TypeDefinition, cursor: &mut AlignedCursor<B>) -> Result<DbusValue> {
    Decoder::new(cursor).value(ty)
}

/// Decode one value per type, in order, as for the arguments of a
/// method call.
pub fn decode_sequence<B: ByteOrder>(
    types: &[TypeDefinition],
    cursor: &mut AlignedCursor<B>,
) -> Result<Vec<DbusValue>> {
    types.iter().map(|ty| decode(ty, cursor)).collect()
}
