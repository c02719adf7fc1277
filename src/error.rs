pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("malformed signature at position {position}: {kind}")]
    MalformedSignature {
        position: usize,
        kind: SignatureErrorKind,
    },
    #[error("unexpected end of stream: needed {needed} bytes at offset {offset}, {available} available")]
    UnexpectedEndOfStream {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("malformed value at offset {offset}: {kind}")]
    MalformedValue { offset: usize, kind: ValueErrorKind },
    #[error("type mismatch: expected `{expected}`, found `{actual}`")]
    TypeMismatch { expected: String, actual: String },
    #[error("{what} is {len} bytes long, exceeding the limit of {limit}")]
    SizeLimitExceeded {
        what: &'static str,
        len: usize,
        limit: usize,
    },
    #[error("{0} bytes of data left over after decoding")]
    LeftoverData(usize),
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SignatureErrorKind {
    #[error("unknown type code {0:?}")]
    UnknownCode(char),
    #[error("signature ended inside a container")]
    UnexpectedEnd,
    #[error("structs must contain at least one type")]
    EmptyStruct,
    #[error("unmatched {0:?}")]
    UnmatchedClose(char),
    #[error("dict entry outside of an array")]
    DictEntryOutsideArray,
    #[error("dict entry key must be a basic type other than variant")]
    NonBasicDictKey,
    #[error("dict entry must contain exactly a key and a value")]
    DictEntryArity,
    #[error("containers nested too deeply")]
    TooDeep,
    #[error("non-ASCII byte 0x{0:02x}")]
    NonAscii(u8),
    #[error("expected exactly one complete type, found {0}")]
    NotSingleType(usize),
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ValueErrorKind {
    #[error("boolean must be 0 or 1, found {0}")]
    InvalidBoolean(u32),
    #[error("non-zero padding byte 0x{0:02x}")]
    NonZeroPadding(u8),
    #[error("expected NUL terminator, found 0x{0:02x}")]
    MissingNul(u8),
    #[error("string contains a NUL byte")]
    InteriorNul,
    #[error("string is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid object path {0:?}")]
    InvalidObjectPath(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(Box<Error>),
    #[error("variant signature must describe exactly one type, found {0}")]
    VariantArity(usize),
    #[error("array body declared {declared} bytes but elements consumed {consumed}")]
    ArrayLength { declared: usize, consumed: usize },
    #[error("containers nested deeper than {0}")]
    NestingTooDeep(usize),
}

impl Error {
    pub(crate) fn malformed_signature(position: usize, kind: SignatureErrorKind) -> Self {
        Error::MalformedSignature { position, kind }
    }

    pub(crate) fn malformed_value(offset: usize, kind: ValueErrorKind) -> Self {
        Error::MalformedValue { offset, kind }
    }

    pub(crate) fn mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
