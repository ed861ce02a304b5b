//! Zero-copy value access.

mod array;
mod object;

pub use self::array::ArrayIter;
pub use self::object::ObjectIter;

use crate::binary;
use crate::value_type::{InvalidValueType, ValueType};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::mem::size_of;

/// Possible errors that can arise during access.
#[derive(Debug, PartialEq)]
pub enum SliceError {
    IndexOutOfBounds { len: usize, index: usize },
    TypeMismatch { expected: ValueType, actual: ValueType },
    InvalidType(u8),
}

impl Display for SliceError {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SliceError::IndexOutOfBounds { len, index } => {
                write!(f, "index out of bounds: the len is {} but the index is {}", len, index)
            }
            SliceError::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch, expected {}, actual {}", expected, actual)
            }
            SliceError::InvalidType(tag) => write!(f, "invalid type tag '0x{:02x}'", tag),
        }
    }
}

impl Error for SliceError {}

impl From<InvalidValueType> for SliceError {
    #[inline]
    fn from(e: InvalidValueType) -> SliceError {
        SliceError::InvalidType(e.0)
    }
}

pub type SliceResult<T> = std::result::Result<T, SliceError>;

/// A read-only view over a byte region holding one encoded value.
///
/// The logical extent is derived from the leading tag; the region may
/// extend past the value. A `Slice` never owns its bytes and never
/// reads past the length the tag encodes.
#[derive(Clone, Copy)]
pub struct Slice<'a> {
    bytes: &'a [u8],
}

/// Layout of a decoded compound header.
pub(crate) struct CompoundInfo {
    /// Position of the first entry.
    pub head: usize,
    pub count: usize,
    /// Absolute position of the index table, if one is present.
    pub table: Option<usize>,
    pub offset_size: usize,
}

impl<'a> Slice<'a> {
    /// Creates a `Slice` over `bytes`, which must begin with a value
    /// tag.
    #[inline]
    pub fn new(bytes: &'a [u8]) -> Slice<'a> {
        Slice { bytes }
    }

    /// Reconstructs a `Slice` from a pointer previously stored in an
    /// `External` value.
    ///
    /// # Safety
    ///
    /// `ptr` must point at a well-formed encoded value that stays
    /// alive and unmodified for `'a`.
    pub unsafe fn from_external(ptr: *const u8) -> SliceResult<Slice<'a>> {
        let tag = *ptr;
        let header = match tag {
            binary::TAG_ID => {
                let first = Slice::from_external(ptr.add(1))?;
                let first_size = first.byte_size()?;
                let second = Slice::from_external(ptr.add(1 + first_size))?;
                let total = 1 + first_size + second.byte_size()?;
                return Ok(Slice::new(std::slice::from_raw_parts(ptr, total)));
            }
            binary::TAG_ARRAY..=binary::TAG_OBJECT_LARGE => {
                let short = *ptr.add(1);
                if short != 0 {
                    return Ok(Slice::new(std::slice::from_raw_parts(ptr, short as usize)));
                }
                binary::COMPOUND_HEADER_SIZE
            }
            binary::TAG_STRING_LONG => 9,
            0xc0..=0xc7 => 1 + (tag - binary::BASE_BINARY) as usize,
            _ => 1,
        };
        // every remaining tag determines its total length from this header
        let head = Slice::new(std::slice::from_raw_parts(ptr, header));
        let total = head.byte_size()?;
        Ok(Slice::new(std::slice::from_raw_parts(ptr, total)))
    }

    /// The bytes the slice was created over.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The bytes occupied by this value alone.
    #[inline]
    pub fn value_bytes(&self) -> SliceResult<&'a [u8]> {
        let size = self.byte_size()?;
        self.read_bytes(0, size)
    }

    /// The leading tag byte.
    #[inline]
    pub fn tag(&self) -> SliceResult<u8> {
        self.byte_at(0)
    }

    /// The value kind encoded by the leading tag.
    #[inline]
    pub fn value_type(&self) -> SliceResult<ValueType> {
        let tag = self.byte_at(0)?;
        Ok(ValueType::from_tag(tag)?)
    }

    /// Total number of bytes this value occupies, including its tag,
    /// length fields, payload and any trailing index table and count.
    pub fn byte_size(&self) -> SliceResult<usize> {
        let tag = self.byte_at(0)?;
        let size = match tag {
            binary::TAG_NONE
            | binary::TAG_NULL
            | binary::TAG_FALSE
            | binary::TAG_TRUE
            | binary::TAG_DB_ID => 1,
            binary::TAG_DOUBLE | binary::TAG_UTC_DATE => 9,
            binary::TAG_ARRAY..=binary::TAG_OBJECT_LARGE => {
                // a zero short length redirects to the 8-byte length
                let short = self.byte_at(1)?;
                if short != 0 {
                    short as usize
                } else {
                    self.read_u64(2)? as usize
                }
            }
            binary::TAG_EXTERNAL => 1 + size_of::<usize>(),
            binary::TAG_ID => {
                let first = self.sub(1)?;
                let first_size = first.byte_size()?;
                let second = self.sub(1 + first_size)?;
                1 + first_size + second.byte_size()?
            }
            binary::TAG_STRING_LONG => 9 + self.read_u64(1)? as usize,
            0x10..=0x17 => 1 + (tag - binary::BASE_RAW_UINT) as usize,
            0x18..=0x1f => 1 + (tag - binary::BASE_INT_POS) as usize,
            0x20..=0x27 => 1 + (tag - binary::BASE_INT_NEG) as usize,
            0x28..=0x2f => 1 + (tag - binary::BASE_UINT) as usize,
            0x30..=0x3f => 1,
            0x40..=0xbf => 1 + (tag - binary::BASE_STRING_SHORT) as usize,
            0xc0..=0xc7 => {
                let length_size = (tag - binary::BASE_BINARY) as usize;
                1 + length_size + self.read_uint(1, length_size)? as usize
            }
            tag => return Err(SliceError::InvalidType(tag)),
        };
        Ok(size)
    }

    #[inline]
    pub fn is_type(&self, expected: ValueType) -> SliceResult<bool> {
        Ok(self.value_type()? == expected)
    }

    #[inline]
    pub fn is_none(&self) -> SliceResult<bool> {
        self.is_type(ValueType::None)
    }

    #[inline]
    pub fn is_null(&self) -> SliceResult<bool> {
        self.is_type(ValueType::Null)
    }

    #[inline]
    pub fn is_bool(&self) -> SliceResult<bool> {
        self.is_type(ValueType::Bool)
    }

    #[inline]
    pub fn is_double(&self) -> SliceResult<bool> {
        self.is_type(ValueType::Double)
    }

    #[inline]
    pub fn is_array(&self) -> SliceResult<bool> {
        self.is_type(ValueType::Array)
    }

    #[inline]
    pub fn is_object(&self) -> SliceResult<bool> {
        self.is_type(ValueType::Object)
    }

    #[inline]
    pub fn is_external(&self) -> SliceResult<bool> {
        self.is_type(ValueType::External)
    }

    #[inline]
    pub fn is_utc_date(&self) -> SliceResult<bool> {
        self.is_type(ValueType::UtcDate)
    }

    #[inline]
    pub fn is_int(&self) -> SliceResult<bool> {
        self.is_type(ValueType::Int)
    }

    #[inline]
    pub fn is_uint(&self) -> SliceResult<bool> {
        self.is_type(ValueType::UInt)
    }

    #[inline]
    pub fn is_small_int(&self) -> SliceResult<bool> {
        self.is_type(ValueType::SmallInt)
    }

    #[inline]
    pub fn is_string(&self) -> SliceResult<bool> {
        self.is_type(ValueType::String)
    }

    #[inline]
    pub fn is_binary(&self) -> SliceResult<bool> {
        self.is_type(ValueType::Binary)
    }

    /// If the value is a `Bool`, returns it.
    #[inline]
    pub fn get_bool(&self) -> SliceResult<bool> {
        self.check_type(ValueType::Bool)?;
        Ok(self.byte_at(0)? == binary::TAG_TRUE)
    }

    /// If the value is a `Double`, returns it.
    #[inline]
    pub fn get_double(&self) -> SliceResult<f64> {
        self.check_type(ValueType::Double)?;
        Ok(f64::from_bits(self.read_u64(1)?))
    }

    /// If the value is an `Int`, returns it.
    #[inline]
    pub fn get_int(&self) -> SliceResult<i64> {
        self.check_type(ValueType::Int)?;
        let tag = self.byte_at(0)?;
        if tag <= 0x1f {
            let size = (tag - binary::BASE_INT_POS) as usize;
            Ok(self.read_uint(1, size)? as i64)
        } else {
            let size = (tag - binary::BASE_INT_NEG) as usize;
            Ok((self.read_uint(1, size)? as i64).wrapping_neg())
        }
    }

    /// If the value is a `UInt`, returns it.
    #[inline]
    pub fn get_uint(&self) -> SliceResult<u64> {
        self.check_type(ValueType::UInt)?;
        let tag = self.byte_at(0)?;
        let size = if tag <= 0x17 {
            (tag - binary::BASE_RAW_UINT) as usize
        } else {
            (tag - binary::BASE_UINT) as usize
        };
        self.read_uint(1, size)
    }

    /// If the value is a `SmallInt`, returns it.
    #[inline]
    pub fn get_small_int(&self) -> SliceResult<i64> {
        self.check_type(ValueType::SmallInt)?;
        let tag = self.byte_at(0)?;
        if tag < binary::BASE_SMALL_INT_NEG {
            Ok((tag - binary::BASE_SMALL_INT_POS) as i64)
        } else {
            Ok(tag as i64 - binary::BASE_SMALL_INT_NEG as i64 - 8)
        }
    }

    /// If the value is a `UTCDate`, returns the stored timestamp.
    #[inline]
    pub fn get_utc_date(&self) -> SliceResult<i64> {
        self.check_type(ValueType::UtcDate)?;
        // the payload is the two's-complement negation of the value
        Ok(self.read_u64(1)?.wrapping_neg() as i64)
    }

    /// If the value is an `External`, returns the stored pointer.
    #[inline]
    pub fn get_external(&self) -> SliceResult<*const u8> {
        self.check_type(ValueType::External)?;
        let bytes = self.read_bytes(1, size_of::<usize>())?;
        // SAFETY: the length is checked by `read_bytes`
        let word = usize::from_ne_bytes(bytes.try_into().unwrap());
        Ok(word as *const u8)
    }

    /// If the value is a `String`, returns it.
    ///
    /// The payload is not re-validated; producers guarantee that
    /// string payloads are well-formed UTF-8.
    #[inline]
    pub fn get_string(&self) -> SliceResult<&'a str> {
        self.check_type(ValueType::String)?;
        let tag = self.byte_at(0)?;
        let bytes = if tag == binary::TAG_STRING_LONG {
            let length = self.read_u64(1)? as usize;
            self.read_bytes(9, length)?
        } else {
            let length = (tag - binary::BASE_STRING_SHORT) as usize;
            self.read_bytes(1, length)?
        };
        // SAFETY: see above
        Ok(unsafe { std::str::from_utf8_unchecked(bytes) })
    }

    /// If the value is a `Binary`, returns its payload.
    #[inline]
    pub fn get_binary(&self) -> SliceResult<&'a [u8]> {
        self.check_type(ValueType::Binary)?;
        let tag = self.byte_at(0)?;
        let length_size = (tag - binary::BASE_BINARY) as usize;
        let length = self.read_uint(1, length_size)? as usize;
        self.read_bytes(1 + length_size, length)
    }

    /// If the value is an `ID`, returns its numeric and string parts.
    #[inline]
    pub fn get_id(&self) -> SliceResult<(u64, &'a str)> {
        self.check_type(ValueType::Id)?;
        let first = self.sub(1)?;
        let id = match first.value_type()? {
            ValueType::UInt => first.get_uint()?,
            ValueType::SmallInt => first.get_small_int()? as u64,
            actual => return Err(SliceError::TypeMismatch { expected: ValueType::UInt, actual }),
        };
        let second = self.sub(1 + first.byte_size()?)?;
        Ok((id, second.get_string()?))
    }

    /// Number of entries in an array or object.
    pub fn length(&self) -> SliceResult<usize> {
        let tag = self.byte_at(0)?;
        if !(binary::TAG_ARRAY..=binary::TAG_OBJECT_LARGE).contains(&tag) {
            return Err(SliceError::TypeMismatch {
                expected: ValueType::Array,
                actual: self.value_type()?,
            });
        }
        let size = self.byte_size()?;
        if size == 2 {
            // empty compound: the count byte coincides with the length
            return Ok(0);
        }
        if tag & 1 == 1 {
            Ok(self.byte_at(size - 1)? as usize)
        } else {
            let pos = size
                .checked_sub(8)
                .ok_or(SliceError::IndexOutOfBounds { len: size, index: 0 })?;
            Ok(self.read_u64(pos)? as usize)
        }
    }

    /// The element at `index` of an array, in layout order.
    #[inline]
    pub fn at(&self, index: usize) -> SliceResult<Slice<'a>> {
        self.check_type(ValueType::Array)?;
        let info = self.compound_info(false)?;
        let pos = self.entry_pos(&info, false, index)?;
        self.sub(pos)
    }

    /// The key of the entry at `index` of an object, in index-table
    /// order when a table is present.
    #[inline]
    pub fn key_at(&self, index: usize) -> SliceResult<Slice<'a>> {
        self.check_type(ValueType::Object)?;
        let info = self.compound_info(true)?;
        let pos = self.entry_pos(&info, true, index)?;
        self.sub(pos)
    }

    /// The value of the entry at `index` of an object, in index-table
    /// order when a table is present.
    #[inline]
    pub fn value_at(&self, index: usize) -> SliceResult<Slice<'a>> {
        self.check_type(ValueType::Object)?;
        let info = self.compound_info(true)?;
        let pos = self.entry_pos(&info, true, index)?;
        let key = self.sub(pos)?;
        self.sub(pos + key.byte_size()?)
    }

    /// The value stored under `key`, scanning the entries linearly.
    /// Integer-translated keys are not resolved here.
    #[inline]
    pub fn get(&self, key: &str) -> SliceResult<Option<Slice<'a>>> {
        for entry in self.object_iter()? {
            let (entry_key, value) = entry?;
            if entry_key.is_string()? && entry_key.get_string()? == key {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// An iterator over the elements of an array.
    #[inline]
    pub fn array_iter(&self) -> SliceResult<ArrayIter<'a>> {
        ArrayIter::new(*self)
    }

    /// An iterator over the entries of an object.
    #[inline]
    pub fn object_iter(&self) -> SliceResult<ObjectIter<'a>> {
        ObjectIter::new(*self)
    }
}

impl<'a> Slice<'a> {
    #[inline]
    fn byte_at(&self, index: usize) -> SliceResult<u8> {
        self.bytes.get(index).copied().ok_or(SliceError::IndexOutOfBounds {
            len: self.bytes.len(),
            index,
        })
    }

    #[inline]
    fn read_bytes(&self, from: usize, len: usize) -> SliceResult<&'a [u8]> {
        let to = from.checked_add(len).ok_or(SliceError::IndexOutOfBounds {
            len: self.bytes.len(),
            index: usize::MAX,
        })?;
        self.bytes.get(from..to).ok_or(SliceError::IndexOutOfBounds {
            len: self.bytes.len(),
            index: to,
        })
    }

    #[inline]
    fn read_u64(&self, pos: usize) -> SliceResult<u64> {
        let bytes = self.read_bytes(pos, 8)?;
        // SAFETY: the length is checked by `read_bytes`
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    #[inline]
    pub(crate) fn read_uint(&self, pos: usize, size: usize) -> SliceResult<u64> {
        Ok(binary::read_uint_le(self.read_bytes(pos, size)?))
    }

    /// A slice over the remainder of the region starting at `pos`.
    #[inline]
    pub(crate) fn sub(&self, pos: usize) -> SliceResult<Slice<'a>> {
        let bytes = self.bytes.get(pos..).ok_or(SliceError::IndexOutOfBounds {
            len: self.bytes.len(),
            index: pos,
        })?;
        Ok(Slice::new(bytes))
    }

    #[inline]
    pub(crate) fn check_type(&self, expected: ValueType) -> SliceResult<()> {
        let actual = self.value_type()?;
        if actual != expected {
            return Err(SliceError::TypeMismatch { expected, actual });
        }
        Ok(())
    }

    /// Decodes the header of an array or object: entry count, first
    /// entry position and the location of the index table if the
    /// compound carries one.
    pub(crate) fn compound_info(&self, is_object: bool) -> SliceResult<CompoundInfo> {
        let tag = self.byte_at(0)?;
        debug_assert!((binary::TAG_ARRAY..=binary::TAG_OBJECT_LARGE).contains(&tag));
        let size = self.byte_size()?;
        let count = self.length()?;
        let (offset_size, count_size) = if tag & 1 == 1 { (2, 1) } else { (8, 8) };
        let head = if self.byte_at(1)? != 0 {
            2
        } else {
            binary::COMPOUND_HEADER_SIZE
        };
        if count == 0 {
            return Ok(CompoundInfo { head, count, table: None, offset_size });
        }

        let table_bytes = count
            .checked_mul(offset_size)
            .and_then(|bytes| bytes.checked_add(count_size))
            .ok_or(SliceError::IndexOutOfBounds { len: size, index: usize::MAX })?;
        let min_entry = if is_object { 2 } else { 1 };
        let table_pos = match size.checked_sub(table_bytes) {
            // a table needs room for at least one byte per entry (two
            // for an object pair) in front of it
            Some(pos) if pos >= head + count * min_entry => pos,
            _ => {
                return Ok(CompoundInfo { head, count, table: None, offset_size });
            }
        };

        // walk the entries once; the payload end tells the layouts apart
        let mut pos = head;
        for _ in 0..count {
            let entry = self.sub(pos)?;
            let mut advance = entry.byte_size()?;
            if is_object {
                advance += self.sub(pos + advance)?.byte_size()?;
            }
            pos += advance;
            if pos > size {
                return Err(SliceError::IndexOutOfBounds { len: size, index: pos });
            }
        }
        if pos == table_pos {
            Ok(CompoundInfo { head, count, table: Some(table_pos), offset_size })
        } else if pos == size - count_size {
            Ok(CompoundInfo { head, count, table: None, offset_size })
        } else {
            Err(SliceError::IndexOutOfBounds { len: size, index: pos })
        }
    }

    /// Absolute position of the entry at `index`.
    pub(crate) fn entry_pos(&self, info: &CompoundInfo, is_object: bool, index: usize) -> SliceResult<usize> {
        if index >= info.count {
            return Err(SliceError::IndexOutOfBounds { len: info.count, index });
        }
        match info.table {
            Some(table) => {
                let offset = self.read_uint(table + index * info.offset_size, info.offset_size)?;
                Ok(offset as usize)
            }
            None => {
                let mut pos = info.head;
                for _ in 0..index {
                    let entry = self.sub(pos)?;
                    let mut advance = entry.byte_size()?;
                    if is_object {
                        advance += self.sub(pos + advance)?.byte_size()?;
                    }
                    pos += advance;
                }
                Ok(pos)
            }
        }
    }
}

impl Debug for Slice<'_> {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.value_type() {
            Ok(value_type) => write!(f, "Slice({})", value_type),
            Err(_) => write!(f, "Slice(invalid)"),
        }
    }
}
