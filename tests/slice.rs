//! Slice tests.

use vpack::{Builder, Options, Slice, SliceError, Value, ValueType};

fn sealed(values: &[Value]) -> Builder {
    let mut builder = Builder::new();
    builder.open_array().unwrap();
    for value in values {
        builder.add(*value).unwrap();
    }
    builder.close().unwrap();
    builder
}

fn assert_byte_size_closure(builder: &Builder) {
    let slice = builder.slice().unwrap();
    assert_eq!(slice.byte_size().unwrap(), builder.size().unwrap());
}

#[test]
fn test_byte_size_closure() {
    let scalars = [
        Value::Null,
        Value::Bool(true),
        Value::Double(3.25),
        Value::Int(5),
        Value::Int(1 << 40),
        Value::Int(-(1 << 40)),
        Value::UInt(u64::MAX),
        Value::String("short"),
        Value::Binary(&[1, 2, 3]),
        Value::UtcDate(-12345),
        Value::DbId,
        Value::Id(7, "x/y"),
    ];
    for value in scalars {
        let mut builder = Builder::new();
        builder.add(value).unwrap();
        assert_byte_size_closure(&builder);
    }

    assert_byte_size_closure(&sealed(&scalars));

    let mut builder = Builder::new();
    builder.open_object().unwrap();
    builder.add_entry("a", Value::String(&"x".repeat(1000))).unwrap();
    builder.add_entry("b", Value::Int(2)).unwrap();
    builder.close().unwrap();
    assert_byte_size_closure(&builder);
}

#[test]
fn test_type_predicates() {
    let mut builder = Builder::new();
    builder.add(Value::Double(1.0)).unwrap();
    let slice = builder.slice().unwrap();
    assert!(slice.is_double().unwrap());
    assert!(!slice.is_null().unwrap());
    assert!(!slice.is_array().unwrap());
    assert_eq!(slice.value_type().unwrap(), ValueType::Double);
    assert_eq!(slice.tag().unwrap(), 0x04);
}

#[test]
fn test_scalar_accessors() {
    let mut builder = Builder::new();
    builder.add(Value::Double(-2.5)).unwrap();
    assert_eq!(builder.slice().unwrap().get_double().unwrap(), -2.5);

    let mut builder = Builder::new();
    builder.add(Value::Int(-123456)).unwrap();
    assert_eq!(builder.slice().unwrap().get_int().unwrap(), -123456);

    let mut builder = Builder::new();
    builder.add(Value::UInt(1 << 60)).unwrap();
    assert_eq!(builder.slice().unwrap().get_uint().unwrap(), 1 << 60);

    let mut builder = Builder::new();
    builder.add(Value::SmallInt(-8)).unwrap();
    assert_eq!(builder.slice().unwrap().get_small_int().unwrap(), -8);

    let mut builder = Builder::new();
    builder.add(Value::UtcDate(-1234567890)).unwrap();
    assert_eq!(builder.slice().unwrap().get_utc_date().unwrap(), -1234567890);

    let mut builder = Builder::new();
    builder.add(Value::String("grün")).unwrap();
    assert_eq!(builder.slice().unwrap().get_string().unwrap(), "grün");

    let mut builder = Builder::new();
    builder.add(Value::Binary(&[0, 1, 2])).unwrap();
    assert_eq!(builder.slice().unwrap().get_binary().unwrap(), &[0, 1, 2]);

    let mut builder = Builder::new();
    builder.add(Value::Bool(true)).unwrap();
    assert!(builder.slice().unwrap().get_bool().unwrap());
}

#[test]
fn test_type_mismatch() {
    let mut builder = Builder::new();
    builder.add(Value::Int(300)).unwrap();
    let slice = builder.slice().unwrap();
    let err = slice.get_string().unwrap_err();
    assert_eq!(
        err,
        SliceError::TypeMismatch {
            expected: ValueType::String,
            actual: ValueType::Int,
        }
    );
    assert!(slice.get_bool().is_err());
    assert!(slice.at(0).is_err());
    assert!(slice.length().is_err());
}

#[test]
fn test_out_of_bounds_index() {
    let builder = sealed(&[Value::Int(1), Value::Int(2), Value::Int(3)]);
    let slice = builder.slice().unwrap();
    let err = slice.at(3).unwrap_err();
    assert_eq!(err, SliceError::IndexOutOfBounds { len: 3, index: 3 });
}

#[test]
fn test_invalid_tag() {
    let bytes = [0x0e];
    let slice = Slice::new(&bytes);
    assert!(matches!(slice.value_type(), Err(SliceError::InvalidType(0x0e))));
    assert!(matches!(slice.byte_size(), Err(SliceError::InvalidType(0x0e))));
}

#[test]
fn test_truncated_region() {
    // a long-string tag with no length behind it
    let bytes = [0x0c];
    let slice = Slice::new(&bytes);
    assert!(matches!(slice.byte_size(), Err(SliceError::IndexOutOfBounds { .. })));
}

#[test]
fn test_random_access_agrees_with_iteration() {
    for unindexed in [false, true] {
        let options = Options {
            build_unindexed_arrays: unindexed,
            ..Options::default()
        };
        let mut builder = Builder::with_options(options);
        builder.open_array().unwrap();
        builder.add(Value::Int(1)).unwrap();
        builder.add(Value::String("two")).unwrap();
        builder.add(Value::Double(3.0)).unwrap();
        builder.add(Value::Null).unwrap();
        builder.close().unwrap();

        let slice = builder.slice().unwrap();
        assert_eq!(slice.length().unwrap(), 4);
        for (i, element) in slice.array_iter().unwrap().enumerate() {
            let element = element.unwrap();
            let direct = slice.at(i).unwrap();
            assert_eq!(
                element.value_bytes().unwrap(),
                direct.value_bytes().unwrap(),
                "unindexed {} index {}",
                unindexed,
                i
            );
        }
    }
}

#[test]
fn test_object_iteration_matches_key_at() {
    for unindexed in [false, true] {
        let options = Options {
            build_unindexed_objects: unindexed,
            ..Options::default()
        };
        let mut builder = Builder::with_options(options);
        builder.open_object().unwrap();
        builder.add_entry("c", Value::Int(3)).unwrap();
        builder.add_entry("a", Value::Int(1)).unwrap();
        builder.add_entry("b", Value::Int(2)).unwrap();
        builder.close().unwrap();

        let slice = builder.slice().unwrap();
        assert_eq!(slice.length().unwrap(), 3);
        for (i, entry) in slice.object_iter().unwrap().enumerate() {
            let (key, value) = entry.unwrap();
            assert_eq!(
                key.value_bytes().unwrap(),
                slice.key_at(i).unwrap().value_bytes().unwrap()
            );
            assert_eq!(
                value.value_bytes().unwrap(),
                slice.value_at(i).unwrap().value_bytes().unwrap()
            );
        }
        // without a table the entries stay in insertion order
        let first = slice.key_at(0).unwrap().get_string().unwrap();
        assert_eq!(first, if unindexed { "c" } else { "a" });
    }
}

#[test]
fn test_unindexed_object_lookup() {
    let options = Options {
        build_unindexed_objects: true,
        ..Options::default()
    };
    let mut builder = Builder::with_options(options);
    builder.open_object().unwrap();
    builder.add_entry("key", Value::String("value")).unwrap();
    builder.add_entry("next", Value::Int(2)).unwrap();
    builder.close().unwrap();

    let slice = builder.slice().unwrap();
    assert_eq!(
        slice.get("key").unwrap().unwrap().get_string().unwrap(),
        "value"
    );
    assert_eq!(slice.get("next").unwrap().unwrap().get_small_int().unwrap(), 2);
    assert!(slice.get("gone").unwrap().is_none());
}

#[test]
fn test_external_round_trip() {
    let mut target = Builder::new();
    target.add(Value::String("payload")).unwrap();
    let target_bytes = target.slice().unwrap().value_bytes().unwrap();

    let mut builder = Builder::new();
    builder.add(Value::External(target_bytes.as_ptr())).unwrap();
    let slice = builder.slice().unwrap();
    assert_eq!(slice.value_type().unwrap(), ValueType::External);
    assert_eq!(
        slice.byte_size().unwrap(),
        1 + std::mem::size_of::<usize>()
    );

    let ptr = slice.get_external().unwrap();
    assert_eq!(ptr, target_bytes.as_ptr());
    // SAFETY: target stays alive for the duration of the test
    let external = unsafe { Slice::from_external(ptr).unwrap() };
    assert_eq!(external.get_string().unwrap(), "payload");
    assert_eq!(external.byte_size().unwrap(), target_bytes.len());
}

#[test]
fn test_slice_over_larger_region() {
    // a slice only spans the value its tag encodes
    let mut bytes = Vec::new();
    let mut builder = Builder::new();
    builder.add(Value::Int(5)).unwrap();
    bytes.extend_from_slice(builder.slice().unwrap().value_bytes().unwrap());
    bytes.extend_from_slice(&[0xaa, 0xbb, 0xcc]);

    let slice = Slice::new(&bytes);
    assert_eq!(slice.byte_size().unwrap(), 1);
    assert_eq!(slice.value_bytes().unwrap(), &[0x35]);
}
