//! Object access.

use crate::slice::{CompoundInfo, Slice, SliceResult};
use crate::value_type::ValueType;

/// An iterator over an object's entries, in index-table order when a
/// table is present and in layout order otherwise.
pub struct ObjectIter<'a> {
    slice: Slice<'a>,
    info: CompoundInfo,
    index: usize,
    /// Position of the next pair when no index table is present.
    pos: usize,
}

impl<'a> ObjectIter<'a> {
    #[inline]
    pub(crate) fn new(slice: Slice<'a>) -> SliceResult<ObjectIter<'a>> {
        slice.check_type(ValueType::Object)?;
        let info = slice.compound_info(true)?;
        Ok(ObjectIter {
            slice,
            pos: info.head,
            info,
            index: 0,
        })
    }

    #[inline]
    fn read_next(&mut self) -> SliceResult<(Slice<'a>, Slice<'a>)> {
        let (key, value) = match self.info.table {
            Some(table) => {
                let offset = self
                    .slice
                    .read_uint(table + self.index * self.info.offset_size, self.info.offset_size)?;
                let key = self.slice.sub(offset as usize)?;
                let value = self.slice.sub(offset as usize + key.byte_size()?)?;
                (key, value)
            }
            None => {
                let key = self.slice.sub(self.pos)?;
                let key_size = key.byte_size()?;
                let value = self.slice.sub(self.pos + key_size)?;
                self.pos += key_size + value.byte_size()?;
                (key, value)
            }
        };
        self.index += 1;
        Ok((key, value))
    }
}

impl<'a> Iterator for ObjectIter<'a> {
    type Item = SliceResult<(Slice<'a>, Slice<'a>)>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.info.count {
            Some(self.read_next())
        } else {
            None
        }
    }
}
