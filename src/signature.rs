//! Conversion between signature strings and [`TypeDefinition`] trees.
//!
//! A signature is a sequence of zero or more complete types, e.g. the
//! argument list of a method. The grammar has exactly one spelling for
//! every tree, so parsing and [`serialize_signature`] are inverses.

use crate::error::{Error, Result, SignatureErrorKind};
use crate::types::{BasicType, TypeDefinition, MAX_ARRAY_DEPTH, MAX_STRUCT_DEPTH};

use log::trace;

pub fn parse_signature(text: &str) -> Result<Vec<TypeDefinition>> {
    parse_signature_bytes(text.as_bytes())
}

pub fn parse_signature_bytes(sig: &[u8]) -> Result<Vec<TypeDefinition>> {
    let mut parser = Parser {
        sig,
        ix: 0,
        arrays: 0,
        structs: 0,
    };
    let mut types = Vec::new();
    while parser.peek().is_some() {
        types.push(parser.complete_type()?);
    }
    trace!("parsed signature of {} types", types.len());
    Ok(types)
}

pub fn serialize_signature(types: &[TypeDefinition]) -> String {
    let mut out = String::new();
    for ty in types {
        ty.write_signature(&mut out);
    }
    out
}

struct Parser<'a> {
    sig: &'a [u8],
    ix: usize,
    arrays: usize,
    structs: usize,
}

fn fail<T>(position: usize, kind: SignatureErrorKind) -> Result<T> {
    Err(Error::malformed_signature(position, kind))
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.sig.get(self.ix).copied()
    }

    fn next(&mut self) -> Result<u8> {
        match self.peek() {
            Some(code) => {
                self.ix += 1;
                Ok(code)
            }
            None => fail(self.ix, SignatureErrorKind::UnexpectedEnd),
        }
    }

    fn complete_type(&mut self) -> Result<TypeDefinition> {
        let position = self.ix;
        let code = self.next()?;
        match code {
            b'a' => self.array(position),
            b'(' => self.structure(position),
            b'{' => fail(position, SignatureErrorKind::DictEntryOutsideArray),
            b')' | b'}' => fail(position, SignatureErrorKind::UnmatchedClose(code as char)),
            _ if !code.is_ascii() => fail(position, SignatureErrorKind::NonAscii(code)),
            _ => match BasicType::by_code(code) {
                Some(ty) => Ok(TypeDefinition::Basic(ty)),
                None => fail(position, SignatureErrorKind::UnknownCode(code as char)),
            },
        }
    }

    // 'a' already consumed
    fn array(&mut self, position: usize) -> Result<TypeDefinition> {
        if self.arrays >= MAX_ARRAY_DEPTH {
            return fail(position, SignatureErrorKind::TooDeep);
        }
        self.arrays += 1;
        let ty = if self.peek() == Some(b'{') {
            self.ix += 1;
            self.dict_entry(position + 1)?
        } else {
            TypeDefinition::array(self.complete_type()?)
        };
        self.arrays -= 1;
        Ok(ty)
    }

    // '{' already consumed
    fn dict_entry(&mut self, position: usize) -> Result<TypeDefinition> {
        if self.structs >= MAX_STRUCT_DEPTH {
            return fail(position, SignatureErrorKind::TooDeep);
        }
        self.structs += 1;

        if self.peek() == Some(b'}') {
            return fail(self.ix, SignatureErrorKind::DictEntryArity);
        }
        let key_position = self.ix;
        let key = match self.complete_type()? {
            TypeDefinition::Basic(ty) if ty.is_dict_key() => ty,
            _ => return fail(key_position, SignatureErrorKind::NonBasicDictKey),
        };

        if self.peek() == Some(b'}') {
            return fail(self.ix, SignatureErrorKind::DictEntryArity);
        }
        let value = self.complete_type()?;

        let close = self.ix;
        if self.next()? != b'}' {
            return fail(close, SignatureErrorKind::DictEntryArity);
        }

        self.structs -= 1;
        Ok(TypeDefinition::Dict(key, Box::new(value)))
    }

    // '(' already consumed
    fn structure(&mut self, position: usize) -> Result<TypeDefinition> {
        if self.structs >= MAX_STRUCT_DEPTH {
            return fail(position, SignatureErrorKind::TooDeep);
        }
        self.structs += 1;

        let mut fields = Vec::new();
        loop {
            match self.peek() {
                None => return fail(self.ix, SignatureErrorKind::UnexpectedEnd),
                Some(b')') => {
                    if fields.is_empty() {
                        return fail(self.ix, SignatureErrorKind::EmptyStruct);
                    }
                    self.ix += 1;
                    break;
                }
                Some(_) => fields.push(self.complete_type()?),
            }
        }

        self.structs -= 1;
        Ok(TypeDefinition::Struct(fields))
    }
}
