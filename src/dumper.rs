//! JSON output.

use crate::buffer::Buffer;
use crate::slice::{Slice, SliceError};
use crate::value_type::ValueType;
use std::error::Error;
use std::fmt::{self, Display, Formatter, Write as _};

/// How values without a JSON representation are handled.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum UnsupportedTypeStrategy {
    /// Skip silently where possible: object entries are dropped and
    /// array elements become `null`.
    Suppress,
    /// Raise [`DumpError::UnsupportedType`].
    Fail,
}

/// Possible errors that can arise during dumping.
#[derive(Debug)]
pub enum DumpError {
    UnsupportedType(ValueType),
    Slice(SliceError),
    Fmt(fmt::Error),
}

impl Display for DumpError {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DumpError::UnsupportedType(value_type) => {
                write!(f, "cannot convert type {} to JSON", value_type)
            }
            DumpError::Slice(e) => write!(f, "{}", e),
            DumpError::Fmt(e) => write!(f, "{}", e),
        }
    }
}

impl Error for DumpError {}

impl From<SliceError> for DumpError {
    #[inline]
    fn from(e: SliceError) -> DumpError {
        DumpError::Slice(e)
    }
}

impl From<fmt::Error> for DumpError {
    #[inline]
    fn from(e: fmt::Error) -> DumpError {
        DumpError::Fmt(e)
    }
}

pub type DumpResult<T> = std::result::Result<T, DumpError>;

/// Byte sink the dumper writes into.
pub trait Sink {
    fn append_byte(&mut self, byte: u8);
    fn append_bytes(&mut self, bytes: &[u8]);
}

impl Sink for Vec<u8> {
    #[inline]
    fn append_byte(&mut self, byte: u8) {
        self.push(byte);
    }

    #[inline]
    fn append_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

impl Sink for Buffer {
    #[inline]
    fn append_byte(&mut self, byte: u8) {
        Buffer::append_byte(self, byte);
    }

    #[inline]
    fn append_bytes(&mut self, bytes: &[u8]) {
        Buffer::append_bytes(self, bytes);
    }
}

impl Sink for String {
    #[inline]
    fn append_byte(&mut self, byte: u8) {
        // SAFETY: the dumper emits single bytes only for ASCII
        unsafe { self.as_mut_vec().push(byte) }
    }

    #[inline]
    fn append_bytes(&mut self, bytes: &[u8]) {
        // SAFETY: the dumper appends whole UTF-8 runs
        unsafe { self.as_mut_vec().extend_from_slice(bytes) }
    }
}

/// Emits the JSON representation of a [`Slice`] into a [`Sink`].
pub struct Dumper<'a, T: Sink> {
    sink: &'a mut T,
    strategy: UnsupportedTypeStrategy,
    scratch: String,
}

impl<'a, T: Sink> Dumper<'a, T> {
    #[inline]
    pub fn new(sink: &'a mut T, strategy: UnsupportedTypeStrategy) -> Dumper<'a, T> {
        Dumper {
            sink,
            strategy,
            scratch: String::new(),
        }
    }

    /// Dumps `slice`. A suppressed top-level value emits nothing.
    pub fn dump(&mut self, slice: Slice<'_>) -> DumpResult<()> {
        if self.json_representable(slice)? {
            return self.dump_value(slice);
        }
        match self.strategy {
            UnsupportedTypeStrategy::Suppress => Ok(()),
            UnsupportedTypeStrategy::Fail => Err(DumpError::UnsupportedType(slice.value_type()?)),
        }
    }

    fn json_representable(&self, slice: Slice<'_>) -> DumpResult<bool> {
        let representable = match slice.value_type()? {
            ValueType::Null
            | ValueType::Bool
            | ValueType::Array
            | ValueType::Object
            | ValueType::Int
            | ValueType::UInt
            | ValueType::SmallInt
            | ValueType::String
            | ValueType::External => true,
            ValueType::Double => slice.get_double()?.is_finite(),
            _ => false,
        };
        Ok(representable)
    }

    fn dump_value(&mut self, slice: Slice<'_>) -> DumpResult<()> {
        match slice.value_type()? {
            ValueType::Null => {
                self.sink.append_bytes(b"null");
                Ok(())
            }
            ValueType::Bool => {
                let text: &[u8] = if slice.get_bool()? { b"true" } else { b"false" };
                self.sink.append_bytes(text);
                Ok(())
            }
            ValueType::Double => self.append_display(slice.get_double()?),
            ValueType::Int => self.append_display(slice.get_int()?),
            ValueType::UInt => self.append_display(slice.get_uint()?),
            ValueType::SmallInt => self.append_display(slice.get_small_int()?),
            ValueType::String => {
                self.dump_string(slice.get_string()?);
                Ok(())
            }
            ValueType::Array => self.dump_array(slice),
            ValueType::Object => self.dump_object(slice),
            ValueType::External => {
                // SAFETY: an External value carries an in-process
                // pointer whose target the producer keeps alive
                let target = unsafe { Slice::from_external(slice.get_external()?)? };
                if self.json_representable(target)? {
                    self.dump_value(target)
                } else {
                    match self.strategy {
                        UnsupportedTypeStrategy::Suppress => {
                            self.sink.append_bytes(b"null");
                            Ok(())
                        }
                        UnsupportedTypeStrategy::Fail => {
                            Err(DumpError::UnsupportedType(target.value_type()?))
                        }
                    }
                }
            }
            value_type => Err(DumpError::UnsupportedType(value_type)),
        }
    }

    fn dump_array(&mut self, slice: Slice<'_>) -> DumpResult<()> {
        self.sink.append_byte(b'[');
        let mut first = true;
        for element in slice.array_iter()? {
            let element = element?;
            if !first {
                self.sink.append_byte(b',');
            }
            first = false;
            if self.json_representable(element)? {
                self.dump_value(element)?;
            } else {
                match self.strategy {
                    UnsupportedTypeStrategy::Suppress => self.sink.append_bytes(b"null"),
                    UnsupportedTypeStrategy::Fail => {
                        return Err(DumpError::UnsupportedType(element.value_type()?));
                    }
                }
            }
        }
        self.sink.append_byte(b']');
        Ok(())
    }

    fn dump_object(&mut self, slice: Slice<'_>) -> DumpResult<()> {
        self.sink.append_byte(b'{');
        let mut first = true;
        for entry in slice.object_iter()? {
            let (key, value) = entry?;
            let emit = key.is_string()? && self.json_representable(value)?;
            if !emit {
                match self.strategy {
                    UnsupportedTypeStrategy::Suppress => continue,
                    UnsupportedTypeStrategy::Fail => {
                        let offending = if key.is_string()? { value } else { key };
                        return Err(DumpError::UnsupportedType(offending.value_type()?));
                    }
                }
            }
            if !first {
                self.sink.append_byte(b',');
            }
            first = false;
            self.dump_string(key.get_string()?);
            self.sink.append_byte(b':');
            self.dump_value(value)?;
        }
        self.sink.append_byte(b'}');
        Ok(())
    }

    fn dump_string(&mut self, value: &str) {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        let bytes = value.as_bytes();
        self.sink.append_byte(b'"');
        let mut start = 0;
        for (i, &byte) in bytes.iter().enumerate() {
            let escape: Option<&[u8]> = match byte {
                0x08 => Some(b"\\b"),
                b'\t' => Some(b"\\t"),
                b'\n' => Some(b"\\n"),
                0x0c => Some(b"\\f"),
                b'\r' => Some(b"\\r"),
                b'"' => Some(b"\\\""),
                b'\\' => Some(b"\\\\"),
                0x00..=0x1f => None, // \u00XX below
                _ => continue,       // multi-byte sequences are copied verbatim
            };
            if start < i {
                self.sink.append_bytes(&bytes[start..i]);
            }
            match escape {
                Some(escape) => self.sink.append_bytes(escape),
                None => {
                    self.sink.append_bytes(b"\\u00");
                    self.sink.append_byte(HEX[(byte >> 4) as usize]);
                    self.sink.append_byte(HEX[(byte & 0x0f) as usize]);
                }
            }
            start = i + 1;
        }
        if start != bytes.len() {
            self.sink.append_bytes(&bytes[start..]);
        }
        self.sink.append_byte(b'"');
    }

    /// Numbers print through std's shortest round-trip formatting.
    fn append_display<V: Display>(&mut self, value: V) -> DumpResult<()> {
        self.scratch.clear();
        write!(self.scratch, "{}", value)?;
        self.sink.append_bytes(self.scratch.as_bytes());
        Ok(())
    }
}

/// Dumps `slice` to a JSON string.
#[inline]
pub fn dump_to_string(slice: Slice<'_>, strategy: UnsupportedTypeStrategy) -> DumpResult<String> {
    let mut out = String::new();
    Dumper::new(&mut out, strategy).dump(slice)?;
    Ok(out)
}
