//! A codec for the DBus wire format.
//!
//! This crate covers the type system and the marshalling rules of
//! [DBus]: parsing and printing signatures, and turning values into
//! aligned bytes and back in either byte order. Message headers,
//! authentication and transports are outside of its scope; it is meant
//! to sit underneath a library that does those things.
//!
//! Types are described by [`TypeDefinition`], usually obtained from
//! [`parse_signature`]. Values are the [`DbusValue`] tree. The two meet
//! in [`encode`] and [`decode`], which work against an [`AlignedCursor`]
//! so that alignment is always computed relative to the start of the
//! message body. Whole bodies, a signature together with its bytes, are
//! handled by [`Body`].
//!
//! Building [`DbusValue`] trees by hand gets verbose, so the [`bind`]
//! module maps ordinary Rust types (integers, strings, `Vec`, maps,
//! tuples) onto DBus types.
//!
//! ```
//! use byteorder::LE;
//! use dbus_wire::{decode, encode, parse_signature, AlignedCursor, DbusValue};
//!
//! let ty = &parse_signature("s")?[0];
//! let mut cursor = AlignedCursor::<LE>::new();
//! encode(&DbusValue::from("hi"), &mut cursor)?;
//! assert_eq!(cursor.as_bytes(), &[2, 0, 0, 0, b'h', b'i', 0]);
//!
//! let mut cursor = AlignedCursor::<LE>::from_bytes(cursor.into_bytes());
//! assert_eq!(decode(ty, &mut cursor)?, DbusValue::from("hi"));
//! # Ok::<_, dbus_wire::Error>(())
//! ```
//!
//! [DBus]: https://dbus.freedesktop.org/doc/dbus-specification.html
//! [`bind`]: crate::bind

mod align;
pub mod bind;
pub mod body;
pub mod cursor;
pub mod de;
pub mod error;
pub mod options;
pub mod primitives;
pub mod ser;
pub mod signature;
pub mod types;
pub mod value;

pub use body::Body;
pub use cursor::AlignedCursor;
pub use de::{decode, decode_sequence};
pub use error::{Error, Result};
pub use options::CodecOptions;
pub use primitives::{ObjectPath, Signature};
pub use ser::{encode, encode_as, encode_sequence};
pub use signature::{parse_signature, serialize_signature};
pub use types::{BasicType, TypeDefinition};
pub use value::{ArrayValue, BasicValue, DbusValue, DictValue, StructValue, VariantValue};
