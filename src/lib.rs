//! Encoding and decoding support for VelocyPack (VPack), a compact,
//! self-describing, schema-free binary format for JSON-like values.
//!
//! The crate pairs a streaming [`Builder`] that assembles well-formed
//! values incrementally with a zero-copy [`Slice`] reader that
//! interprets any byte region in place, plus a JSON [`Parser`] that
//! drives the builder and a [`Dumper`] that re-emits JSON text.
//!
//! ## Binary format
//!
//! Every value is a single byte region beginning with a one-byte tag
//! that determines the total length, either directly or through an
//! embedded byte length:
//!
//! ```text
//! 0x01        null
//! 0x02 0x03   false, true
//! 0x04        double, 8 little-endian IEEE-754 bytes
//! 0x05/0x06   array  (2-byte / 8-byte index table offsets)
//! 0x07/0x08   object (2-byte / 8-byte index table offsets)
//! 0x09        external, an in-process pointer (not portable)
//! 0x0a        id, an integer value followed by a string
//! 0x0b        reserved id placeholder
//! 0x0c        long string, 8-byte little-endian length
//! 0x0d        UTC date, negated int64, little-endian
//! 0x10+n      raw unsigned integer, n payload bytes (internal)
//! 0x18+n      positive integer, n payload bytes, n in [1..8]
//! 0x20+n      negative integer magnitude, n payload bytes
//! 0x28+n      unsigned integer, n payload bytes
//! 0x30..0x37  small integers 0..7
//! 0x38..0x3f  small integers -8..-1
//! 0x40+k      short string, k payload bytes, k in [0..127]
//! 0xc0+n      binary, n-byte length prefix
//! ```
//!
//! Arrays and objects carry their total byte length right behind the
//! tag: a nonzero byte is the length itself, a zero byte redirects to
//! an 8-byte little-endian length. Entries follow; an index table of
//! offsets (2-byte for tags 0x05/0x07, 8-byte for 0x06/0x08) and the
//! entry count trail the value. Object index tables are sorted by key
//! bytes by default, so readers can binary-search; arrays keep layout
//! order. Containers built without index tables store only entries
//! and the trailing count.
//!
//! ## Usage
//!
//! ```rust
//! use vpack::{dump_to_string, Builder, Parser, UnsupportedTypeStrategy, Value};
//!
//! let mut builder = Builder::new();
//! builder.open_object().unwrap();
//! builder.add_entry("a", Value::Int(1)).unwrap();
//! builder.add_entry("b", Value::String("two")).unwrap();
//! builder.close().unwrap();
//! let slice = builder.slice().unwrap();
//! assert_eq!(slice.length().unwrap(), 2);
//! assert_eq!(slice.key_at(0).unwrap().get_string().unwrap(), "a");
//!
//! let parsed = Parser::new().parse(r#"[1, 2.5, "three"]"#).unwrap();
//! let json = dump_to_string(parsed.slice().unwrap(), UnsupportedTypeStrategy::Fail).unwrap();
//! assert_eq!(json, r#"[1,2.5,"three"]"#);
//! ```

mod binary;
mod buffer;
mod builder;
mod collection;
mod dumper;
mod options;
mod parser;
mod slice;
mod translator;
mod util;
mod value_type;

pub use self::{
    buffer::Buffer,
    builder::{BuildError, BuildResult, Builder, Value},
    collection::{visit_recursive, TraversalOrder},
    dumper::{dump_to_string, DumpError, DumpResult, Dumper, Sink, UnsupportedTypeStrategy},
    options::Options,
    parser::{ParseError, ParseErrorKind, ParseResult, Parser},
    slice::{ArrayIter, ObjectIter, Slice, SliceError, SliceResult},
    translator::AttributeTranslator,
    util::validate_utf8,
    value_type::{InvalidValueType, ValueType},
};
