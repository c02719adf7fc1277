//! Writing values to the wire.
//!
//! Encoding mirrors decoding byte for byte, and checks the value against
//! the type it is written as before anything is emitted for it: arrays
//! must be homogeneous, structs must have the declared arity, and a
//! variant's declared type must describe its contents.
//!
//! If encoding fails, the cursor is truncated back to where it was
//! before the call, so no partial value (and in particular no array
//! length that was never filled in) is left in the buffer.

use crate::cursor::AlignedCursor;
use crate::error::Result;
use crate::types::TypeDefinition;
use crate::value::DbusValue;

use byteorder::ByteOrder;
use log::debug;

mod internal;
use internal::Encoder;

/// Append `value` to the cursor, as its own type.
pub fn encode<B: ByteOrder>(value: &DbusValue, cursor: &mut AlignedCursor<B>) -> Result<()> {
    encode_as(&value.type_definition(), value, cursor)
}

/// Append `value` to the cursor, checking it against the declared type
/// `ty` as it goes.
pub fn encode_as<B: ByteOrder>(
    ty: &TypeDefinition,
    value: &DbusValue,
    cursor: &mut AlignedCursor<B>,
) -> Result<()> {
    let start = cursor.write_position();
    let res = Encoder::new(cursor).value(ty, value);
    if let Err(ref e) = res {
        debug!("Encoding '{}' failed, discarding {} bytes: {}", ty, cursor.write_position() - start, e);
        cursor.truncate(start);
    }
    res
}

/// Append each value in turn. On failure, nothing from this call is
/// left in the cursor.
pub fn encode_sequence<B: ByteOrder>(
    values: &[DbusValue],
    cursor: &mut AlignedCursor<B>,
) -> Result<()> {
    let start = cursor.write_position();
    for value in values {
        if let Err(e) = encode(value, cursor) {
            cursor.truncate(start);
            return Err(e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{encode, encode_as, encode_sequence};
    use crate::cursor::AlignedCursor;
    use crate::de::decode;
    use crate::error::{Error, Result, SignatureErrorKind};
    use crate::options::CodecOptions;
    use crate::primitives::{ObjectPath, Signature};
    use crate::signature::parse_signature;
    use crate::types::{BasicType, TypeDefinition};
    use crate::value::{ArrayValue, BasicValue, DbusValue, DictValue, StructValue, VariantValue};
    use byteorder::{BE, LE};
    use test_log::test;

    fn encode_le(value: &DbusValue) -> Result<Vec<u8>> {
        let mut cursor = AlignedCursor::<LE>::new();
        encode(value, &mut cursor)?;
        Ok(cursor.into_bytes())
    }

    fn round_trip(value: DbusValue) -> Result<()> {
        let data = encode_le(&value)?;
        let ty = value.type_definition();
        let mut cursor = AlignedCursor::<LE>::from_bytes(data.clone());
        let decoded = decode(&ty, &mut cursor)?;
        cursor.finish()?;
        assert_eq!(decoded, value);
        assert_eq!(encode_le(&decoded)?, data);
        Ok(())
    }

    fn int_array(values: &[i32]) -> Result<DbusValue> {
        let elements = values.iter().map(|v| DbusValue::from(*v)).collect();
        Ok(ArrayValue::new(BasicType::Int32.into(), elements)?.into())
    }

    #[test]
    fn serialize_int() -> Result<()> {
        assert_eq!(encode_le(&37i32.into())?, vec![37, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn serialize_variant_int() -> Result<()> {
        let value = DbusValue::from(42i32).into_variant();
        assert_eq!(encode_le(&value)?, vec![1, b'i', 0, 0, 42, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn serialize_intary() -> Result<()> {
        assert_eq!(
            encode_le(&int_array(&[1, 2, 3])?)?,
            vec![12, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0]
        );
        Ok(())
    }

    #[test]
    fn serialize_variant_farray() -> Result<()> {
        let elements = vec![1.0f64.into(), 2.0f64.into(), 3.0f64.into(), 4.0f64.into()];
        let array = ArrayValue::new(BasicType::Double.into(), elements)?;
        let value = DbusValue::from(array).into_variant();
        assert_eq!(
            encode_le(&value)?,
            vec![
                2, 97, 100, 0, // signature "ad"
                32, 0, 0, 0, // 32 bytes of array
                0, 0, 0, 0, 0, 0, 240, 63, // 1.0
                0, 0, 0, 0, 0, 0, 0, 64, // 2.0
                0, 0, 0, 0, 0, 0, 8, 64, // 3.0
                0, 0, 0, 0, 0, 0, 16, 64, // 4.0
            ]
        );
        Ok(())
    }

    #[test]
    fn serialize_struct() -> Result<()> {
        let inner = StructValue::new(vec!["Hello".into(), 8.3f64.into()])?;
        let value: DbusValue = StructValue::new(vec!["Hi".into(), 0.2f64.into(), inner.into()])?.into();
        assert_eq!(value.type_definition().signature(), "(sd(sd))");
        assert_eq!(
            encode_le(&value)?,
            vec![
                2, 0, 0, 0, 72, 105, 0, // "Hi"
                0, // padding(8)
                154, 153, 153, 153, 153, 153, 201, 63, // 0.2
                5, 0, 0, 0, 72, 101, 108, 108, 111, 0, // "Hello"
                0, 0, 0, 0, 0, 0, // padding(8)
                154, 153, 153, 153, 153, 153, 32, 64, // 8.3
            ]
        );
        Ok(())
    }

    #[test]
    fn serialize_dict() -> Result<()> {
        let dict = DictValue::new(
            BasicType::String,
            BasicType::Variant.into(),
            vec![
                ("a".into(), DbusValue::from("Hi").into_variant()),
                ("b".into(), DbusValue::from(0.2f64).into_variant()),
            ],
        )?;
        assert_eq!(
            encode_le(&dict.into())?,
            vec![
                48, 0, 0, 0, // 48 bytes of array
                0, 0, 0, 0, // pad to 8 to start kv pair
                1, 0, 0, 0, 97, 0, // "a"
                1, 115, 0, // signature "s"
                0, 0, 0, // padding(4)
                2, 0, 0, 0, 72, 105, 0, // "Hi"
                0, 0, 0, 0, 0, // pad to 8 to start kv pair
                1, 0, 0, 0, 98, 0, // "b"
                1, 100, 0, // signature "d"
                0, 0, 0, 0, 0, 0, 0, // padding(8)
                154, 153, 153, 153, 153, 153, 201, 63, // 0.2
            ]
        );
        Ok(())
    }

    #[test]
    fn serialize_string_dict() -> Result<()> {
        let dict = DictValue::new(
            BasicType::String,
            BasicType::String.into(),
            vec![("a".into(), "b".into())],
        )?;
        assert_eq!(
            encode_le(&dict.into())?,
            vec![
                14, 0, 0, 0, // 14 bytes of array
                0, 0, 0, 0, // padding(8)
                1, 0, 0, 0, 97, 0, // "a"
                0, 0, // padding(4)
                1, 0, 0, 0, 98, 0, // "b"
            ]
        );
        Ok(())
    }

    #[test]
    fn empty_array_pads_to_element() -> Result<()> {
        let mut cursor = AlignedCursor::<LE>::new();
        cursor.write(1u8);
        encode(&ArrayValue::empty(BasicType::Double.into())?.into(), &mut cursor)?;
        assert_eq!(cursor.as_bytes(), &[1, 0, 0, 0, 0, 0, 0, 0][..]);
        Ok(())
    }

    #[test]
    fn big_endian() -> Result<()> {
        let mut cursor = AlignedCursor::<BE>::new();
        encode(&int_array(&[1, 2])?, &mut cursor)?;
        assert_eq!(
            cursor.as_bytes(),
            &[0, 0, 0, 8, 0, 0, 0, 1, 0, 0, 0, 2][..]
        );
        Ok(())
    }

    #[test]
    fn encode_checks_declared_type() -> Result<()> {
        let mut cursor = AlignedCursor::<LE>::new();
        let ty: TypeDefinition = "(is)".parse()?;
        let value: DbusValue = StructValue::new(vec![1i32.into()])?.into();
        assert_eq!(
            encode_as(&ty, &value, &mut cursor),
            Err(Error::TypeMismatch {
                expected: "(is)".to_owned(),
                actual: "(i)".to_owned()
            })
        );
        assert!(encode_as(&"ai".parse()?, &int_array(&[1])?, &mut cursor).is_ok());
        assert!(encode_as(&"au".parse()?, &int_array(&[1])?, &mut cursor).is_err());
        Ok(())
    }

    #[test]
    fn failed_encode_leaves_nothing_behind() -> Result<()> {
        let mut cursor = AlignedCursor::<LE>::new();
        cursor.write(9u8);

        // The second element cannot be written, after the array length
        // and first element already have been.
        let elements = vec!["ok".into(), "bad\0".into()];
        let array: DbusValue = ArrayValue::new(BasicType::String.into(), elements)?.into();
        assert!(matches!(
            encode(&array, &mut cursor),
            Err(Error::MalformedValue { .. })
        ));
        assert_eq!(cursor.as_bytes(), &[9][..]);

        let values = vec![DbusValue::from(1u32), array];
        assert!(encode_sequence(&values, &mut cursor).is_err());
        assert_eq!(cursor.as_bytes(), &[9][..]);
        Ok(())
    }

    #[test]
    fn signature_size_limit() -> Result<()> {
        let long = "y".repeat(256);
        let value = DbusValue::from(Signature::parse(&long)?);
        assert_eq!(
            encode_le(&value),
            Err(Error::SizeLimitExceeded {
                what: "signature",
                len: 256,
                limit: 255
            })
        );
        assert!(encode_le(&DbusValue::from(Signature::parse(&long[..255])?)).is_ok());
        Ok(())
    }

    #[test]
    fn array_size_limit() -> Result<()> {
        let options = CodecOptions::default().with_max_array_len(4);
        let mut cursor = AlignedCursor::<LE>::with_options(options);
        assert!(encode(&int_array(&[1])?, &mut cursor).is_ok());
        assert_eq!(
            encode(&int_array(&[1, 2])?, &mut cursor),
            Err(Error::SizeLimitExceeded {
                what: "array",
                len: 8,
                limit: 4
            })
        );
        assert_eq!(cursor.write_position(), 8);
        Ok(())
    }

    #[test]
    fn round_trips() -> Result<()> {
        round_trip(true.into())?;
        round_trip(0x99u8.into())?;
        round_trip((-3i16).into())?;
        round_trip(0xffffu16.into())?;
        round_trip(i64::MIN.into())?;
        round_trip(0.145f64.into())?;
        round_trip(DbusValue::Basic(BasicValue::UnixFd(2)))?;
        round_trip(ObjectPath::new("/org/freedesktop/DBus")?.into())?;
        round_trip(Signature::parse("a{sv}(ii)")?.into())?;
        round_trip(int_array(&[])?)?;
        round_trip(int_array(&[5, 6, 7])?)?;

        let nested = ArrayValue::new(
            "ai".parse()?,
            vec![int_array(&[1])?, int_array(&[])?, int_array(&[2, 3])?],
        )?;
        round_trip(nested.into())?;

        let dict = DictValue::new(
            BasicType::ObjectPath,
            "a{sv}".parse()?,
            vec![(
                ObjectPath::new("/a")?.into(),
                DictValue::new(
                    BasicType::String,
                    BasicType::Variant.into(),
                    vec![
                        ("x".into(), DbusValue::from(1u8).into_variant()),
                        ("y".into(), int_array(&[4])?.into_variant()),
                    ],
                )?
                .into(),
            )],
        )?;
        round_trip(dict.into())?;

        let st = StructValue::new(vec![
            1u8.into(),
            DbusValue::from("s").into_variant().into_variant(),
            1u64.into(),
        ])?;
        round_trip(st.into())?;
        Ok(())
    }

    #[test]
    fn sequence_with_alignment() -> Result<()> {
        let values = vec![
            DbusValue::from(1u8),
            DbusValue::from(2u64),
            DbusValue::from("z"),
        ];
        let mut cursor = AlignedCursor::<LE>::new();
        encode_sequence(&values, &mut cursor)?;
        let mut expected = vec![1, 0, 0, 0, 0, 0, 0, 0];
        expected.extend_from_slice(&2u64.to_le_bytes());
        expected.extend_from_slice(&[1, 0, 0, 0, b'z', 0]);
        assert_eq!(cursor.as_bytes(), &expected[..]);

        let mut cursor = AlignedCursor::<LE>::from_bytes(cursor.into_bytes());
        let decoded = crate::de::decode_sequence(&parse_signature("yts")?, &mut cursor)?;
        assert_eq!(decoded, values);
        Ok(())
    }

    #[test]
    fn variant_type_must_fit_the_grammar() -> Result<()> {
        let mut value = DbusValue::from(1u8);
        for _ in 0..33 {
            value = StructValue::new(vec![value])?.into();
        }
        let variant = DbusValue::Variant(VariantValue::new(value.clone()));

        let mut cursor = AlignedCursor::<LE>::new();
        assert_eq!(
            encode(&variant, &mut cursor),
            Err(Error::MalformedSignature {
                position: 32,
                kind: SignatureErrorKind::TooDeep
            })
        );
        assert!(cursor.as_bytes().is_empty());

        // One struct fewer is still writable and reads back.
        let shallower = match value {
            DbusValue::Struct(s) => s.into_fields().remove(0),
            other => panic!("expected a struct, got {:?}", other),
        };
        round_trip(VariantValue::new(shallower).into())
    }

    #[test]
    fn variant_with_explicit_type() -> Result<()> {
        let variant = VariantValue::with_type("as".parse()?, ArrayValue::empty(BasicType::String.into())?.into())?;
        assert_eq!(
            encode_le(&variant.into())?,
            vec![2, b'a', b's', 0, 0, 0, 0, 0]
        );
        Ok(())
    }
}
