//! Array access.

use crate::slice::{CompoundInfo, Slice, SliceResult};
use crate::value_type::ValueType;

/// An iterator over an array's elements, in layout order.
pub struct ArrayIter<'a> {
    slice: Slice<'a>,
    info: CompoundInfo,
    index: usize,
    /// Position of the next entry when no index table is present.
    pos: usize,
}

impl<'a> ArrayIter<'a> {
    #[inline]
    pub(crate) fn new(slice: Slice<'a>) -> SliceResult<ArrayIter<'a>> {
        slice.check_type(ValueType::Array)?;
        let info = slice.compound_info(false)?;
        Ok(ArrayIter {
            slice,
            pos: info.head,
            info,
            index: 0,
        })
    }

    #[inline]
    fn read_next(&mut self) -> SliceResult<Slice<'a>> {
        let entry = match self.info.table {
            Some(table) => {
                let offset = self
                    .slice
                    .read_uint(table + self.index * self.info.offset_size, self.info.offset_size)?;
                self.slice.sub(offset as usize)?
            }
            None => {
                let entry = self.slice.sub(self.pos)?;
                self.pos += entry.byte_size()?;
                entry
            }
        };
        self.index += 1;
        Ok(entry)
    }
}

impl<'a> Iterator for ArrayIter<'a> {
    type Item = SliceResult<Slice<'a>>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.info.count {
            Some(self.read_next())
        } else {
            None
        }
    }
}
