//! Recursive traversal.

use crate::binary;
use crate::slice::{Slice, SliceResult};
use crate::value_type::ValueType;

/// Visit order for [`visit_recursive`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TraversalOrder {
    PreOrder,
    PostOrder,
}

static NULL_BYTES: [u8; 1] = [binary::TAG_NULL];

/// Walks `slice` recursively, invoking `visitor(key, value)` for
/// every object entry and array element; array elements get a Null
/// slice as their key. In pre-order, returning `false` prunes the
/// subtree below `value`; in post-order the result is ignored.
#[inline]
pub fn visit_recursive<F>(slice: Slice<'_>, order: TraversalOrder, visitor: &mut F) -> SliceResult<()>
where
    F: FnMut(Slice<'_>, Slice<'_>) -> bool,
{
    match slice.value_type()? {
        ValueType::Array => {
            for element in slice.array_iter()? {
                visit_entry(Slice::new(&NULL_BYTES), element?, order, visitor)?;
            }
        }
        ValueType::Object => {
            for entry in slice.object_iter()? {
                let (key, value) = entry?;
                visit_entry(key, value, order, visitor)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn visit_entry<F>(
    key: Slice<'_>,
    value: Slice<'_>,
    order: TraversalOrder,
    visitor: &mut F,
) -> SliceResult<()>
where
    F: FnMut(Slice<'_>, Slice<'_>) -> bool,
{
    let recurse = match order {
        TraversalOrder::PreOrder => visitor(key, value),
        TraversalOrder::PostOrder => true,
    };
    if recurse && matches!(value.value_type()?, ValueType::Array | ValueType::Object) {
        visit_recursive(value, order, visitor)?;
    }
    if order == TraversalOrder::PostOrder {
        visitor(key, value);
    }
    Ok(())
}
