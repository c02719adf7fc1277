//! A byte buffer that knows the DBus alignment rule.
//!
//! The same cursor is used for both directions: writes append to the
//! end of the buffer, reads consume from an independent read position.
//! Alignment is always relative to the start of the buffer, which the
//! transport is expected to place on an 8-byte boundary of the message.

use crate::align::padding;
use crate::error::{Error, Result, ValueErrorKind};
use crate::options::CodecOptions;
use crate::primitives::Primitive;

use byteorder::ByteOrder;
use log::error;
use std::marker::PhantomData;

pub struct AlignedCursor<B: ByteOrder> {
    data: Vec<u8>,
    read_ix: usize,
    options: CodecOptions,
    phantom: PhantomData<B>,
}

/// A 4-byte length reserved by [`AlignedCursor::reserve_u32`], to be
/// filled in once the length is known.
#[derive(Debug, PartialEq)]
pub struct LengthSlot(usize);

impl<B: ByteOrder> Default for AlignedCursor<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: ByteOrder> AlignedCursor<B> {
    pub fn new() -> Self {
        Self::with_options(CodecOptions::default())
    }

    pub fn with_options(options: CodecOptions) -> Self {
        Self::from_bytes_with_options(Vec::new(), options)
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::from_bytes_with_options(data, CodecOptions::default())
    }

    pub fn from_bytes_with_options(data: impl Into<Vec<u8>>, options: CodecOptions) -> Self {
        Self {
            data: data.into(),
            read_ix: 0,
            options,
            phantom: PhantomData,
        }
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    pub fn read_position(&self) -> usize {
        self.read_ix
    }

    pub fn write_position(&self) -> usize {
        self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.read_ix
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Drop everything written at or after `len`. Used to discard the
    /// output of a failed encode.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
        self.read_ix = self.read_ix.min(len);
    }

    /// Fail unless every byte has been read.
    pub fn finish(&self) -> Result<()> {
        let leftover_data = self.remaining();
        if leftover_data != 0 {
            return Err(Error::LeftoverData(leftover_data));
        }
        Ok(())
    }

    pub fn align_write(&mut self, alignment: usize) {
        let pad = padding(self.data.len(), alignment);
        self.data.resize(self.data.len() + pad, 0);
    }

    pub fn align_read(&mut self, alignment: usize) -> Result<()> {
        let start = self.read_ix;
        let pad = padding(start, alignment);
        let strict = self.options.strict_padding;
        let skipped = self.read_bytes(pad)?;
        if strict {
            if let Some(ix) = skipped.iter().position(|b| *b != 0) {
                return Err(Error::malformed_value(
                    start + ix,
                    ValueErrorKind::NonZeroPadding(skipped[ix]),
                ));
            }
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8]> {
        let old_ix = self.read_ix;
        if len > self.remaining() {
            error!("Read of {} bytes at {} runs past end of data", len, old_ix);
            return Err(Error::UnexpectedEndOfStream {
                offset: old_ix,
                needed: len,
                available: self.remaining(),
            });
        }
        self.read_ix = old_ix + len;
        Ok(&self.data[old_ix..self.read_ix])
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Read a fixed-width value at the current position. Callers align
    /// first; this does not.
    pub fn read<T: Primitive>(&mut self) -> Result<T> {
        let bytes = self.read_bytes(T::WIDTH)?;
        Ok(T::read::<B>(bytes))
    }

    pub fn write<T: Primitive>(&mut self, value: T) {
        let old_len = self.data.len();
        self.data.resize(old_len + T::WIDTH, 0);
        value.write::<B>(&mut self.data[old_len..]);
    }

    pub fn reserve_u32(&mut self) -> LengthSlot {
        self.align_write(4);
        let slot = LengthSlot(self.data.len());
        self.write(0u32);
        slot
    }

    pub fn fill_u32(&mut self, slot: LengthSlot, value: u32) {
        let LengthSlot(ix) = slot;
        value.write::<B>(&mut self.data[ix..ix + 4]);
    }
}
