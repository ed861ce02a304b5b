//! Parser tests.

use vpack::{BuildError, Builder, Options, ParseError, ParseErrorKind, Parser, ValueType};

fn parse(json: &str) -> Builder {
    Parser::new().parse(json).unwrap()
}

fn parse_err(json: &str) -> ParseError {
    Parser::new().parse(json).unwrap_err()
}

fn assert_type(json: &str, expected: ValueType) {
    let builder = parse(json);
    assert_eq!(builder.slice().unwrap().value_type().unwrap(), expected);
}

#[test]
fn test_scalars() {
    let builder = parse("null");
    assert!(builder.slice().unwrap().is_null().unwrap());

    let builder = parse("true");
    assert!(builder.slice().unwrap().get_bool().unwrap());

    let builder = parse("false");
    assert!(!builder.slice().unwrap().get_bool().unwrap());

    let builder = parse(r#""hello""#);
    assert_eq!(builder.slice().unwrap().get_string().unwrap(), "hello");
}

#[test]
fn test_number_classification() {
    // small integers collapse to one byte
    assert_type("5", ValueType::SmallInt);
    assert_type("-8", ValueType::SmallInt);
    assert_type("0", ValueType::SmallInt);

    assert_type("42", ValueType::Int);
    assert_type("-42", ValueType::Int);
    assert_type("-9223372036854775808", ValueType::Int);
    assert_type("9223372036854775807", ValueType::Int);

    // fits unsigned 64-bit but not signed
    assert_type("9223372036854775808", ValueType::UInt);
    assert_type("18446744073709551615", ValueType::UInt);

    assert_type("3.25", ValueType::Double);
    assert_type("1e3", ValueType::Double);
    assert_type("-0.5", ValueType::Double);
    // integral but beyond unsigned 64-bit
    assert_type("123456789012345678901234567890", ValueType::Double);

    let builder = parse("42");
    assert_eq!(builder.slice().unwrap().get_int().unwrap(), 42);
    let builder = parse("18446744073709551615");
    assert_eq!(builder.slice().unwrap().get_uint().unwrap(), u64::MAX);
    let builder = parse("3.25");
    assert_eq!(builder.slice().unwrap().get_double().unwrap(), 3.25);
    let builder = parse("1e3");
    assert_eq!(builder.slice().unwrap().get_double().unwrap(), 1000.0);
}

#[test]
fn test_string_escapes() {
    let cases: &[(&str, &str)] = &[
        (r#""a\nb""#, "a\nb"),
        (r#""a\tb""#, "a\tb"),
        (r#""a\rb""#, "a\rb"),
        (r#""a\bb""#, "a\u{8}b"),
        (r#""a\fb""#, "a\u{c}b"),
        (r#""a\"b""#, "a\"b"),
        (r#""a\\b""#, "a\\b"),
        (r#""a\/b""#, "a/b"),
        (r#""A""#, "A"),
        (r#""é""#, "é"),
        (r#""中""#, "中"),
        (r#""😀""#, "😀"),
        (r#""grün""#, "grün"),
        (r#""""#, ""),
    ];
    for (json, expected) in cases {
        let builder = parse(json);
        assert_eq!(builder.slice().unwrap().get_string().unwrap(), *expected, "{}", json);
    }
}

#[test]
fn test_containers() {
    let builder = parse("[]");
    assert_eq!(builder.slice().unwrap().length().unwrap(), 0);

    let builder = parse("{}");
    assert_eq!(builder.slice().unwrap().length().unwrap(), 0);
    assert_eq!(builder.slice().unwrap().value_bytes().unwrap(), &[0x07, 0x02]);

    let builder = parse(r#" [ 1 , [ true , null ] , { "a" : "b" } ] "#);
    let slice = builder.slice().unwrap();
    assert_eq!(slice.length().unwrap(), 3);
    assert_eq!(slice.at(0).unwrap().get_small_int().unwrap(), 1);
    let inner = slice.at(1).unwrap();
    assert!(inner.at(0).unwrap().get_bool().unwrap());
    assert!(inner.at(1).unwrap().is_null().unwrap());
    let object = slice.at(2).unwrap();
    assert_eq!(object.get("a").unwrap().unwrap().get_string().unwrap(), "b");
}

#[test]
fn test_error_positions() {
    let err = parse_err("");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedEnd));
    assert_eq!(err.pos, 0);

    let err = parse_err("[1,2,,3]");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedCharacter(b',')));
    assert_eq!(err.pos, 5);

    let err = parse_err("1 2");
    assert!(matches!(err.kind, ParseErrorKind::TrailingData));
    assert_eq!(err.pos, 2);

    let err = parse_err(r#""abc"#);
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedEnd));
    assert_eq!(err.pos, 4);

    let err = parse_err("[1");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedEnd));
    assert_eq!(err.pos, 2);

    let err = parse_err("{\"a\":1");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedEnd));

    let err = parse_err("tru");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedEnd));
    assert_eq!(err.pos, 3);

    let err = parse_err("nul!");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedCharacter(b'n')));

    let err = parse_err("{\"a\"1}");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedCharacter(b'1')));
    assert_eq!(err.pos, 4);

    let err = parse_err("{1:2}");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedCharacter(b'1')));
    assert_eq!(err.pos, 1);
}

#[test]
fn test_number_errors() {
    let err = parse_err("1e999");
    assert!(matches!(err.kind, ParseErrorKind::NumberOverflow));
    assert_eq!(err.pos, 0);

    let err = parse_err("-");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedEnd));

    let err = parse_err("1.");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedEnd));

    let err = parse_err("1.5e");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedEnd));

    // leading zeros stop the number early
    assert!(Parser::new().parse("01").is_err());
}

#[test]
fn test_escape_errors() {
    let err = parse_err(r#""\q""#);
    assert!(matches!(err.kind, ParseErrorKind::BadEscape));
    assert_eq!(err.pos, 1);

    let err = parse_err(r#""\u12""#);
    assert!(matches!(err.kind, ParseErrorKind::BadEscape));

    // a lone high surrogate
    let err = parse_err(r#""\ud800x""#);
    assert!(matches!(err.kind, ParseErrorKind::BadEscape));

    // a lone low surrogate
    let err = parse_err(r#""\udc00""#);
    assert!(matches!(err.kind, ParseErrorKind::BadEscape));

    // an unescaped control character
    let err = parse_err("\"a\u{1}b\"");
    assert!(matches!(err.kind, ParseErrorKind::UnexpectedCharacter(0x01)));
}

#[test]
fn test_invalid_utf8() {
    let err = Parser::new().parse(&[b'"', 0xff, b'"'][..]).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::InvalidUtf8));
    assert_eq!(err.pos, 0);

    // a truncated two-byte sequence
    let err = Parser::new().parse(&[b'"', 0xc3, b'"'][..]).unwrap_err();
    assert!(matches!(err.kind, ParseErrorKind::InvalidUtf8));
}

#[test]
fn test_duplicate_key_detection() {
    let options = Options {
        check_attribute_uniqueness: true,
        ..Options::default()
    };
    let err = Parser::with_options(options.clone())
        .parse(r#"{"x":1,"x":2}"#)
        .unwrap_err();
    assert!(matches!(
        err.kind,
        ParseErrorKind::Builder(BuildError::DuplicateAttribute(_))
    ));
    assert_eq!(err.pos, 12); // the closing brace

    // distinct keys pass
    assert!(Parser::with_options(options).parse(r#"{"x":1,"y":2}"#).is_ok());
}

#[test]
fn test_unindexed_options() {
    let options = Options {
        build_unindexed_arrays: true,
        build_unindexed_objects: true,
        ..Options::default()
    };
    let builder = Parser::with_options(options).parse(r#"{"a":[1,2,3]}"#).unwrap();
    let slice = builder.slice().unwrap();
    let array = slice.get("a").unwrap().unwrap();
    assert_eq!(array.length().unwrap(), 3);
    assert_eq!(array.at(1).unwrap().get_small_int().unwrap(), 2);

    let builder = Parser::with_options(Options {
        build_unindexed_arrays: true,
        ..Options::default()
    })
    .parse("[1,2,3]")
    .unwrap();
    assert_eq!(
        builder.slice().unwrap().value_bytes().unwrap(),
        &[0x05, 0x06, 0x31, 0x32, 0x33, 0x03]
    );
}

#[test]
fn test_whitespace() {
    let builder = Parser::new().parse("\t\r\n [ 1 ,\n 2 ] \t").unwrap();
    assert_eq!(builder.slice().unwrap().length().unwrap(), 2);
}
