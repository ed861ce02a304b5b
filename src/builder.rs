//! Incremental value builder.

use crate::binary::{self, uint_length};
use crate::buffer::Buffer;
use crate::options::Options;
use crate::slice::{Slice, SliceError};
use crate::translator::AttributeTranslator;
use smallvec::CollectionAllocErr;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::mem::size_of;

/// Possible errors that can arise during building.
#[derive(Debug)]
pub enum BuildError {
    /// The operation does not fit the current builder state.
    WrongContext(&'static str),
    /// An object key must be a string.
    BadKey,
    /// The number does not fit the requested encoding.
    NumberOutOfRange(i64),
    /// An object contains the same key twice.
    DuplicateAttribute(String),
    /// The attribute sort met a key tag it cannot resolve.
    UnsupportedKeyTag(u8),
    /// The allocator refused to grow the buffer.
    OutOfMemory,
    /// Self-inspection of the built bytes failed.
    Slice(SliceError),
}

impl Display for BuildError {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::WrongContext(message) => write!(f, "{}", message),
            BuildError::BadKey => write!(f, "object key must be a string"),
            BuildError::NumberOutOfRange(value) => write!(f, "number {} out of range", value),
            BuildError::DuplicateAttribute(key) => write!(f, "duplicate attribute name '{}'", key),
            BuildError::UnsupportedKeyTag(tag) => write!(f, "unsupported key tag '0x{:02x}'", tag),
            BuildError::OutOfMemory => write!(f, "out of memory"),
            BuildError::Slice(e) => write!(f, "{}", e),
        }
    }
}

impl Error for BuildError {}

impl From<SliceError> for BuildError {
    #[inline]
    fn from(e: SliceError) -> BuildError {
        BuildError::Slice(e)
    }
}

impl From<CollectionAllocErr> for BuildError {
    #[inline]
    fn from(_: CollectionAllocErr) -> BuildError {
        BuildError::OutOfMemory
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// One value handed to [`Builder::add`].
///
/// `Array` and `Object` open a container that is sealed by
/// [`Builder::close`]; everything else is emitted in place.
#[derive(Clone, Copy, Debug)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    Double(f64),
    Int(i64),
    UInt(u64),
    SmallInt(i8),
    String(&'a str),
    Binary(&'a [u8]),
    UtcDate(i64),
    /// An in-process pointer to another encoded value. Not portable
    /// across processes.
    External(*const u8),
    Id(u64, &'a str),
    DbId,
    Array,
    Object,
}

/// Assembles an encoded value incrementally.
///
/// Scalars are appended in their final form; arrays and objects are
/// emitted with a reserved header and compacted when they are closed.
/// While containers remain open the builder tracks their start
/// positions on a stack and the offsets of their entries per depth.
#[derive(Debug)]
pub struct Builder {
    buffer: Buffer,
    stack: Vec<usize>,
    index: Vec<Vec<usize>>,
    /// Whether an object expects a value next.
    attr_written: bool,
    options: Options,
}

impl Default for Builder {
    #[inline]
    fn default() -> Builder {
        Builder::new()
    }
}

impl Builder {
    #[inline]
    pub fn new() -> Builder {
        Builder::with_options(Options::default())
    }

    #[inline]
    pub fn with_options(options: Options) -> Builder {
        Builder {
            buffer: Buffer::new(),
            stack: Vec::new(),
            index: Vec::new(),
            attr_written: false,
            options,
        }
    }

    #[inline]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Discards all content, keeping allocations for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.buffer.reset();
        self.stack.clear();
        self.attr_written = false;
        // the per-depth offset lists keep their allocations
    }

    /// True when no container remains open.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.stack.is_empty()
    }

    /// Byte length of the built content; defined only once every
    /// container is closed.
    #[inline]
    pub fn size(&self) -> BuildResult<usize> {
        if !self.stack.is_empty() {
            return Err(BuildError::WrongContext("value is not sealed"));
        }
        Ok(self.buffer.len())
    }

    /// A [`Slice`] over the sealed value.
    #[inline]
    pub fn slice(&self) -> BuildResult<Slice<'_>> {
        if !self.stack.is_empty() {
            return Err(BuildError::WrongContext("value is not sealed"));
        }
        Ok(Slice::new(self.buffer.data()))
    }

    /// Consumes the builder and hands out the backing buffer.
    #[inline]
    pub fn into_buffer(self) -> BuildResult<Buffer> {
        if !self.stack.is_empty() {
            return Err(BuildError::WrongContext("value is not sealed"));
        }
        Ok(self.buffer)
    }

    /// Opens an array; elements follow with [`add`](Builder::add).
    #[inline]
    pub fn open_array(&mut self) -> BuildResult<()> {
        self.add(Value::Array)
    }

    /// Opens an object; keys and values alternate with
    /// [`add`](Builder::add).
    #[inline]
    pub fn open_object(&mut self) -> BuildResult<()> {
        self.add(Value::Object)
    }

    /// Appends `value` to the innermost open container, or as a
    /// top-level value when none is open. Inside an object the calls
    /// alternate between key (a string) and value; string keys are
    /// stored as integer ids when a sealed attribute translator knows
    /// them.
    pub fn add(&mut self, value: Value<'_>) -> BuildResult<()> {
        let mut key = None;
        if let Some(&tos) = self.stack.last() {
            let tag = self.buffer.data()[tos];
            if !(binary::TAG_ARRAY..=binary::TAG_OBJECT_LARGE).contains(&tag) {
                return Err(BuildError::WrongContext("need an open array or object for this call"));
            }
            if tag >= binary::TAG_OBJECT {
                if !self.attr_written {
                    match value {
                        Value::String(name) => key = Some(name),
                        _ => return Err(BuildError::BadKey),
                    }
                    self.report_add(tos);
                }
                self.attr_written = !self.attr_written;
            } else {
                self.report_add(tos);
            }
        }
        match key {
            Some(name) => self.set_key(name),
            None => self.set(value),
        }
    }

    /// Appends the pair `key`/`value` to the innermost open object.
    pub fn add_entry(&mut self, key: &str, value: Value<'_>) -> BuildResult<()> {
        if self.attr_written {
            return Err(BuildError::WrongContext("attribute value expected"));
        }
        let tos = match self.stack.last() {
            Some(&tos) if self.buffer.data()[tos] >= binary::TAG_OBJECT => tos,
            _ => return Err(BuildError::WrongContext("need an open object for this call")),
        };
        self.report_add(tos);
        self.set_key(key)?;
        self.set(value)
    }

    /// Seals the innermost open array or object: picks the byte
    /// length and index-table representation, lays down the trailer
    /// and rewrites the header.
    pub fn close(&mut self) -> BuildResult<()> {
        let tos = match self.stack.last() {
            Some(&tos) => tos,
            None => return Err(BuildError::WrongContext("need an open array or object for this call")),
        };
        let depth = self.stack.len() - 1;
        let mut offsets = std::mem::take(&mut self.index[depth]);
        let result = self.close_compound(tos, &mut offsets);
        // keep the allocation for future containers at this depth
        self.index[depth] = offsets;
        if result.is_ok() {
            self.stack.pop();
        }
        result
    }
}

impl Builder {
    fn close_compound(&mut self, tos: usize, offsets: &mut Vec<usize>) -> BuildResult<()> {
        let tag = self.buffer.data()[tos];
        let is_object = tag >= binary::TAG_OBJECT;
        let unindexed = if is_object {
            self.options.build_unindexed_objects
        } else {
            self.options.build_unindexed_arrays
        };
        let n = offsets.len();
        let table_size = if unindexed { 0 } else { 2 * n };

        let mut pos = self.buffer.len();
        let small = n < 0x100 && pos - tos - 8 + 1 + table_size < 0x100;
        let small_table;
        if small {
            // reclaim the unused long-length slot
            if pos > tos + binary::COMPOUND_HEADER_SIZE {
                self.buffer.copy_within(tos + binary::COMPOUND_HEADER_SIZE..pos, tos + 2);
            }
            pos -= 8;
            self.buffer.truncate(pos);
            for offset in offsets.iter_mut() {
                *offset -= 8;
            }
            small_table = true;
        } else {
            small_table = n < 0x100 && (n == 0 || offsets[n - 1] < 0x10000);
        }
        // tag parity selects the offset and count width
        if small_table {
            if tag & 1 == 0 {
                self.buffer.set_byte(tos, tag - 1);
            }
        } else if tag & 1 == 1 {
            self.buffer.set_byte(tos, tag + 1);
        }

        if is_object && !unindexed && n >= 2 && self.options.sort_attribute_names {
            self.sort_object_index(tos, offsets)?;
        }

        if small_table {
            if n > 0 {
                self.reserve(table_size + 1)?;
                if !unindexed {
                    for &offset in offsets.iter() {
                        self.buffer.push_uint_le(offset as u64, 2);
                    }
                }
                self.buffer.push_u8(n as u8);
            }
            // an empty compound stores no count; a byte length of 2 implies it
        } else {
            self.reserve(if unindexed { 8 } else { 8 * n + 8 })?;
            if !unindexed {
                for &offset in offsets.iter() {
                    self.buffer.push_u64_le(offset as u64);
                }
            }
            self.buffer.push_u64_le(n as u64);
        }

        let total = self.buffer.len() - tos;
        if small {
            self.buffer.set_byte(tos + 1, total as u8);
        } else {
            self.buffer.set_byte(tos + 1, 0);
            self.buffer.write_bytes_at(tos + 2, &(total as u64).to_le_bytes());
        }

        if self.options.check_attribute_uniqueness && n > 1 && is_object {
            let sorted = self.options.sort_attribute_names && !unindexed;
            check_object_keys(Slice::new(&self.buffer.data()[tos..]), sorted)?;
        }
        Ok(())
    }

    /// Sorts the entry offsets of an object by the UTF-8 bytes of
    /// their keys, shorter key first on a tie.
    fn sort_object_index(&self, tos: usize, offsets: &mut [usize]) -> BuildResult<()> {
        let bytes = self.buffer.data();
        let translator = self.options.attribute_translator.as_deref();
        // resolve the key bytes up front; the scratch lives per call
        let mut entries = Vec::with_capacity(offsets.len());
        for &offset in offsets.iter() {
            let name = find_attr_name(Slice::new(&bytes[tos + offset..]), translator)?;
            entries.push((name, offset));
        }
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (slot, entry) in offsets.iter_mut().zip(entries) {
            *slot = entry.1;
        }
        Ok(())
    }

    #[inline]
    fn report_add(&mut self, base: usize) {
        let depth = self.stack.len() - 1;
        let pos = self.buffer.len();
        self.index[depth].push(pos - base);
    }

    #[inline]
    fn reserve(&mut self, additional: usize) -> BuildResult<()> {
        self.buffer.reserve(additional)?;
        Ok(())
    }

    fn set_key(&mut self, key: &str) -> BuildResult<()> {
        let id = match &self.options.attribute_translator {
            Some(translator) if translator.is_sealed() => translator.lookup_name(key),
            _ => None,
        };
        match id {
            Some(id) => self.set_uint(id),
            None => self.set_string(key),
        }
    }

    /// Writes one value at the current append position.
    fn set(&mut self, value: Value<'_>) -> BuildResult<()> {
        match value {
            Value::Null => self.append_tag(binary::TAG_NULL),
            Value::Bool(v) => {
                self.append_tag(if v { binary::TAG_TRUE } else { binary::TAG_FALSE })
            }
            Value::Double(v) => {
                self.reserve(9)?;
                self.buffer.push_u8(binary::TAG_DOUBLE);
                self.buffer.push_u64_le(v.to_bits());
                Ok(())
            }
            Value::Int(v) => self.set_int(v),
            Value::UInt(v) => self.set_uint(v),
            Value::SmallInt(v) => self.set_small_int(v as i64),
            Value::String(v) => self.set_string(v),
            Value::Binary(v) => {
                let length = v.len() as u64;
                let length_size = uint_length(length);
                self.reserve(1 + length_size + v.len())?;
                self.buffer.push_u8(binary::BASE_BINARY + length_size as u8);
                self.buffer.push_uint_le(length, length_size);
                self.buffer.push_bytes(v);
                Ok(())
            }
            Value::UtcDate(v) => {
                self.reserve(9)?;
                self.buffer.push_u8(binary::TAG_UTC_DATE);
                // stored as the two's-complement negation
                self.buffer.push_u64_le((v as u64).wrapping_neg());
                Ok(())
            }
            Value::External(v) => {
                self.reserve(1 + size_of::<usize>())?;
                self.buffer.push_u8(binary::TAG_EXTERNAL);
                self.buffer.push_bytes(&(v as usize).to_ne_bytes());
                Ok(())
            }
            Value::Id(id, name) => {
                self.append_tag(binary::TAG_ID)?;
                self.set_uint(id)?;
                self.set_string(name)
            }
            Value::DbId => self.append_tag(binary::TAG_DB_ID),
            Value::Array => self.open_compound(binary::TAG_ARRAY),
            Value::Object => self.open_compound(binary::TAG_OBJECT),
        }
    }

    #[inline]
    fn append_tag(&mut self, tag: u8) -> BuildResult<()> {
        self.reserve(1)?;
        self.buffer.push_u8(tag);
        Ok(())
    }

    fn set_int(&mut self, value: i64) -> BuildResult<()> {
        if (-8..=7).contains(&value) {
            return self.set_small_int(value);
        }
        if value >= 0 {
            self.append_uint(value as u64, binary::BASE_INT_POS)
        } else {
            self.append_uint(value.unsigned_abs(), binary::BASE_INT_NEG)
        }
    }

    fn set_uint(&mut self, value: u64) -> BuildResult<()> {
        if value < 8 {
            return self.set_small_int(value as i64);
        }
        self.append_uint(value, binary::BASE_UINT)
    }

    fn set_small_int(&mut self, value: i64) -> BuildResult<()> {
        if !(-8..=7).contains(&value) {
            return Err(BuildError::NumberOutOfRange(value));
        }
        self.reserve(1)?;
        let tag = if value >= 0 {
            binary::BASE_SMALL_INT_POS + value as u8
        } else {
            binary::BASE_SMALL_INT_NEG + (value + 8) as u8
        };
        self.buffer.push_u8(tag);
        Ok(())
    }

    fn set_string(&mut self, value: &str) -> BuildResult<()> {
        let length = value.len();
        if length <= binary::MAX_SHORT_STRING {
            self.reserve(1 + length)?;
            self.buffer.push_u8(binary::BASE_STRING_SHORT + length as u8);
        } else {
            self.reserve(9 + length)?;
            self.buffer.push_u8(binary::TAG_STRING_LONG);
            self.buffer.push_u64_le(length as u64);
        }
        self.buffer.push_bytes(value.as_bytes());
        Ok(())
    }

    /// Appends `value` with the smallest width, tagged `base + width`.
    fn append_uint(&mut self, value: u64, base: u8) -> BuildResult<()> {
        let size = uint_length(value);
        self.reserve(1 + size)?;
        self.buffer.push_u8(base + size as u8);
        self.buffer.push_uint_le(value, size);
        Ok(())
    }

    fn open_compound(&mut self, tag: u8) -> BuildResult<()> {
        self.reserve(binary::COMPOUND_HEADER_SIZE)?;
        let pos = self.buffer.len();
        self.stack.push(pos);
        while self.index.len() < self.stack.len() {
            self.index.push(Vec::new());
        }
        self.index[self.stack.len() - 1].clear();
        self.buffer.push_u8(tag);
        self.buffer.push_u8(0); // short byte length, filled on close
        self.buffer.push_bytes(&[0u8; 8]); // slot for the long byte length
        Ok(())
    }
}

/// Resolves the UTF-8 bytes of an object key. Integer keys are
/// resolved through the attribute translator when one is attached.
fn find_attr_name<'a>(
    key: Slice<'a>,
    translator: Option<&'a AttributeTranslator>,
) -> BuildResult<&'a [u8]> {
    let tag = key.tag()?;
    match tag {
        0x40..=0xbf | binary::TAG_STRING_LONG => Ok(key.get_string()?.as_bytes()),
        0x28..=0x2f | 0x30..=0x37 => {
            if let Some(translator) = translator {
                let id = if tag >= binary::BASE_SMALL_INT_POS {
                    key.get_small_int()? as u64
                } else {
                    key.get_uint()?
                };
                if let Some(name) = translator.lookup_id(id) {
                    return Ok(name.as_bytes());
                }
            }
            Err(BuildError::UnsupportedKeyTag(tag))
        }
        _ => Err(BuildError::UnsupportedKeyTag(tag)),
    }
}

/// Rejects objects that store the same key twice, recursing into
/// object values. Non-string keys end the check.
fn check_object_keys(object: Slice<'_>, sorted: bool) -> BuildResult<()> {
    let n = object.length()?;
    if sorted {
        // a sorted table makes duplicates adjacent
        let mut previous: Option<&[u8]> = None;
        for i in 0..n {
            let key = object.key_at(i)?;
            if !key.is_string()? {
                return Ok(());
            }
            let bytes = key.get_string()?.as_bytes();
            if previous == Some(bytes) {
                return Err(BuildError::DuplicateAttribute(
                    String::from_utf8_lossy(bytes).into_owned(),
                ));
            }
            previous = Some(bytes);
            let value = object.value_at(i)?;
            if value.is_object()? {
                check_object_keys(value, sorted)?;
            }
        }
    } else {
        let mut seen: HashSet<&[u8]> = HashSet::with_capacity(n);
        for i in 0..n {
            let key = object.key_at(i)?;
            if !key.is_string()? {
                return Ok(());
            }
            let bytes = key.get_string()?.as_bytes();
            if !seen.insert(bytes) {
                return Err(BuildError::DuplicateAttribute(
                    String::from_utf8_lossy(bytes).into_owned(),
                ));
            }
            let value = object.value_at(i)?;
            if value.is_object()? {
                check_object_keys(value, sorted)?;
            }
        }
    }
    Ok(())
}
