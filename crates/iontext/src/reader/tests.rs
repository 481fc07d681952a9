use rstest::rstest;

use super::*;

fn reader(text: &str) -> TextReader<&[u8]> {
    TextReader::from_text(text)
}

/// Reads a single top-level value, runs `check`, and asserts the stream ends
/// cleanly afterwards.
#[track_caller]
fn single(text: &str, expected: IonType, check: impl FnOnce(&TextReader<&[u8]>)) {
    let mut r = reader(text);
    assert!(r.next(), "no value in {text:?}: {:?}", r.err());
    assert_eq!(r.ion_type(), Some(expected));
    check(&r);
    assert!(!r.next());
    assert!(r.err().is_none(), "{:?}", r.err());
}

#[track_caller]
fn syntax_error(text: &str) -> SyntaxError {
    let mut r = reader(text);
    while r.next() {}
    match r.err() {
        Some(Error::Syntax { source, .. }) => source.clone(),
        other => panic!("expected a syntax error for {text:?}, got {other:?}"),
    }
}

#[test]
fn null_int_reads_as_zero() {
    single("null.int", IonType::Int, |r| {
        assert!(r.is_null());
        assert_eq!(r.int_value().unwrap(), 0);
        assert_eq!(r.int64_value().unwrap(), 0);
        assert_eq!(r.big_int_value().unwrap(), None);
    });
}

#[rstest]
#[case("0", 0)]
#[case("12345", 12345)]
#[case("-12345", -12345)]
#[case("0b000101", 5)]
#[case("-0b000101", -5)]
#[case("0x01020e0F", 0x0102_0e0f)]
#[case("-0x01020e0F", -0x0102_0e0f)]
#[case("1_000", 1000)]
fn ints(#[case] text: &str, #[case] expected: i32) {
    single(text, IonType::Int, |r| {
        assert!(!r.is_null());
        assert_eq!(r.int_value().unwrap(), expected);
    });
}

#[rstest]
#[case("0x123FFFFFFFF", 0x123_FFFF_FFFF)]
#[case("-0x123FFFFFFFF", -0x123_FFFF_FFFF)]
fn int64s(#[case] text: &str, #[case] expected: i64) {
    single(text, IonType::Int, |r| {
        assert_eq!(r.int64_value().unwrap(), expected);
        assert!(matches!(r.int_value(), Err(Error::Overflow { target: "i32" })));
    });
}

#[rstest]
#[case("0xEFFFFFFFFFFFFFFF", "17293822569102704639")]
#[case("0xFFFFFFFFFFFFFFFF", "18446744073709551615")]
#[case("-0x1FFFFFFFFFFFFFFFF", "-36893488147419103231")]
fn big_ints(#[case] text: &str, #[case] expected: &str) {
    single(text, IonType::Int, |r| {
        let value = r.big_int_value().unwrap().unwrap();
        assert_eq!(value.to_string(), expected);
        assert!(matches!(r.int64_value(), Err(Error::Overflow { target: "i64" })));
    });
}

#[test]
fn strings_with_annotations_and_long_forms() {
    let mut r = reader(r#"foo::"bar" "baz" 'a'::'b'::'''beep''' '''boop''' null.string"#);
    let expected: [(&[&str], Option<&str>); 4] = [
        (&["foo"], Some("bar")),
        (&[], Some("baz")),
        (&["a", "b"], Some("beepboop")),
        (&[], None),
    ];
    for (annotations, value) in expected {
        assert!(r.next());
        assert_eq!(r.ion_type(), Some(IonType::String));
        assert_eq!(r.annotations(), annotations);
        assert_eq!(r.string_value().unwrap().as_deref(), value);
    }
    assert!(!r.next());
    assert!(r.err().is_none());
}

#[test]
fn symbols_with_quoted_keyword_annotation() {
    let mut r = reader("'null'::foo bar a::b::'baz' null.symbol");
    let expected: [(&[&str], Option<&str>); 4] = [
        (&["null"], Some("foo")),
        (&[], Some("bar")),
        (&["a", "b"], Some("baz")),
        (&[], None),
    ];
    for (annotations, value) in expected {
        assert!(r.next());
        assert_eq!(r.ion_type(), Some(IonType::Symbol));
        assert_eq!(r.annotations(), annotations);
        assert_eq!(r.string_value().unwrap().as_deref(), value);
    }
    assert!(!r.next());
    assert!(r.err().is_none());
}

#[test]
fn special_bare_words() {
    let mut r = reader("null\nnull.struct\ntrue\nfalse\nnan");

    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Null));
    assert!(r.is_null());

    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Struct));
    assert!(r.is_null());

    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Bool));
    assert!(r.bool_value().unwrap());

    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Bool));
    assert!(!r.bool_value().unwrap());

    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Float));
    assert!(r.float_value().unwrap().is_nan());

    assert!(!r.next());
    assert!(r.err().is_none());
}

#[rstest]
#[case("'true'")]
#[case("'false'")]
#[case("'nan'")]
#[case("'null'")]
#[case("'null.int'")]
fn quoted_keywords_are_symbols(#[case] text: &str) {
    single(text, IonType::Symbol, |r| {
        assert!(!r.is_null());
        assert_eq!(
            r.string_value().unwrap().as_deref(),
            Some(text.trim_matches('\''))
        );
    });
}

#[rstest]
#[case("null.null", IonType::Null)]
#[case("null.bool", IonType::Bool)]
#[case("null.float", IonType::Float)]
#[case("null.decimal", IonType::Decimal)]
#[case("null.timestamp", IonType::Timestamp)]
#[case("null.clob", IonType::Clob)]
#[case("null.blob", IonType::Blob)]
#[case("null.list", IonType::List)]
#[case("null.sexp", IonType::Sexp)]
fn typed_nulls(#[case] text: &str, #[case] expected: IonType) {
    single(text, expected, |r| assert!(r.is_null()));
}

#[test]
fn typed_null_accessors_default() {
    let mut r = reader("null.bool null.float null.decimal null.timestamp null.blob");
    assert!(r.next());
    assert!(!r.bool_value().unwrap());
    assert!(r.next());
    assert!(r.float_value().unwrap().abs() < f64::EPSILON);
    assert!(r.next());
    assert_eq!(r.decimal_value().unwrap(), None);
    assert!(r.next());
    assert_eq!(r.timestamp_text().unwrap(), None);
    assert!(r.next());
    assert_eq!(r.lob_value().unwrap(), None);
}

#[test]
fn unknown_typed_null_is_an_error() {
    assert_eq!(
        syntax_error("null.widget"),
        SyntaxError::InvalidTypedNull("widget".to_owned())
    );
}

#[test]
fn floats_and_infinities() {
    let mut r = reader("1.5e3 -2E-1 +inf -inf");
    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Float));
    assert!((r.float_value().unwrap() - 1500.0).abs() < f64::EPSILON);
    assert!(r.next());
    assert!((r.float_value().unwrap() + 0.2).abs() < f64::EPSILON);
    assert!(r.next());
    assert_eq!(r.float_value().unwrap(), f64::INFINITY);
    assert!(r.next());
    assert_eq!(r.float_value().unwrap(), f64::NEG_INFINITY);
    assert!(!r.next());
    assert!(r.err().is_none());
}

#[test]
fn decimals() {
    single("1.23d-2", IonType::Decimal, |r| {
        let decimal = r.decimal_value().unwrap().unwrap();
        assert_eq!(decimal.coefficient, BigInt::from(123));
        assert_eq!(decimal.exponent, -4);
    });
    single("-0.50", IonType::Decimal, |r| {
        let decimal = r.decimal_value().unwrap().unwrap();
        assert_eq!(decimal.coefficient, BigInt::from(-50));
        assert_eq!(decimal.exponent, -2);
    });
}

#[test]
fn timestamps_are_returned_as_text() {
    single("2007-02-23T12:14:33.079-08:00", IonType::Timestamp, |r| {
        assert_eq!(
            r.timestamp_text().unwrap(),
            Some("2007-02-23T12:14:33.079-08:00")
        );
    });
}

#[test]
fn string_escapes_are_resolved() {
    single(r#""tab\tquote\" é\U0001F600""#, IonType::String, |r| {
        assert_eq!(
            r.string_value().unwrap().as_deref(),
            Some("tab\tquote\" \u{e9}\u{1F600}")
        );
    });
}

#[test]
fn long_strings_concatenate_across_comments() {
    single("'''a''' // one\n/* two */ '''b''' '''c'''", IonType::String, |r| {
        assert_eq!(r.string_value().unwrap().as_deref(), Some("abc"));
    });
}

#[test]
fn symbol_ids_are_plain_symbols() {
    let mut r = reader("$ion_1_0 $10");
    assert!(r.next());
    assert_eq!(r.string_value().unwrap().as_deref(), Some("$ion_1_0"));
    assert!(r.next());
    assert_eq!(r.string_value().unwrap().as_deref(), Some("$10"));
    assert!(!r.next());
}

#[test]
fn lobs_decode_to_bytes() {
    let mut r = reader(r#"{{ aGVsbG8= }} {{ "hi" }} {{ '''a''' '''\x62''' }}"#);
    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Blob));
    assert_eq!(r.lob_value().unwrap(), Some(&b"hello"[..]));
    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Clob));
    assert_eq!(r.lob_value().unwrap(), Some(&b"hi"[..]));
    assert!(r.next());
    assert_eq!(r.lob_value().unwrap(), Some(&b"ab"[..]));
    assert!(!r.next());
    assert!(r.err().is_none());
}

#[test]
fn struct_fields_expose_names() {
    let mut r = reader(r#"{ a: 1, 'b c': two, "d": x::3, '''e''': [], }"#);
    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Struct));
    r.step_in().unwrap();
    assert_eq!(r.depth(), 1);

    assert!(r.next());
    assert_eq!(r.field_name(), Some("a"));
    assert_eq!(r.int_value().unwrap(), 1);

    assert!(r.next());
    assert_eq!(r.field_name(), Some("b c"));
    assert_eq!(r.ion_type(), Some(IonType::Symbol));

    assert!(r.next());
    assert_eq!(r.field_name(), Some("d"));
    assert_eq!(r.annotations(), ["x"]);
    assert_eq!(r.int_value().unwrap(), 3);

    assert!(r.next());
    assert_eq!(r.field_name(), Some("e"));
    assert_eq!(r.ion_type(), Some(IonType::List));

    assert!(!r.next());
    r.step_out().unwrap();
    assert_eq!(r.depth(), 0);
    assert!(!r.next());
    assert!(r.err().is_none());
}

#[test]
fn step_out_skips_to_next_sibling() {
    let mut r = reader("[1, [2, 3], (a b)] after");
    assert!(r.next());
    r.step_in().unwrap();
    assert!(r.next());
    assert_eq!(r.int_value().unwrap(), 1);
    r.step_out().unwrap();

    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Symbol));
    assert_eq!(r.field_name(), None);
    assert_eq!(r.string_value().unwrap().as_deref(), Some("after"));
    assert!(!r.next());
}

#[test]
fn unvisited_containers_are_skipped() {
    let mut r = reader("{a: [1, {b: \"]\"}]} (x) 42");
    assert!(r.next());
    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Sexp));
    assert!(r.next());
    assert_eq!(r.int_value().unwrap(), 42);
    assert!(!r.next());
    assert!(r.err().is_none());
}

#[test]
fn sexp_allows_operators_and_infinities() {
    let mut r = reader("(a + -1 - +inf <= 'q')");
    assert!(r.next());
    r.step_in().unwrap();

    let mut seen = Vec::new();
    while r.next() {
        let text = match r.ion_type() {
            Some(IonType::Symbol) => r.string_value().unwrap().unwrap_or_default(),
            Some(IonType::Int) => r.int_value().unwrap().to_string(),
            Some(IonType::Float) => r.float_value().unwrap().to_string(),
            other => panic!("unexpected {other:?}"),
        };
        seen.push(text);
    }
    assert_eq!(seen, ["a", "+", "-1", "-", "inf", "<=", "q"]);
    r.step_out().unwrap();
    assert!(r.err().is_none());
}

#[rstest]
#[case("+ 1")]
#[case("[a, <]")]
fn operators_outside_sexp_are_errors(#[case] text: &str) {
    let mut r = reader(text);
    if r.next() {
        r.step_in().unwrap();
        while r.next() {}
    }
    assert!(matches!(
        r.err(),
        Some(Error::Syntax {
            source: SyntaxError::UnexpectedToken(_),
            ..
        })
    ));
}

#[rstest]
#[case("[1 2]")]
#[case("{a: 1 b: 2}")]
#[case("[1,,2]")]
#[case("{a 1}")]
#[case(", 1")]
fn separator_rules(#[case] text: &str) {
    let mut r = reader(text);
    if r.next() && r.ion_type().is_some_and(IonType::is_container) {
        r.step_in().unwrap();
        while r.next() {}
    }
    assert!(r.err().is_some_and(Error::is_fatal), "{text:?} was accepted");
}

#[rstest]
#[case("a::", SyntaxError::MissingValue)]
#[case("[a::]", SyntaxError::MissingValue)]
#[case("{a:}", SyntaxError::MissingValue)]
#[case("[1,", SyntaxError::UnexpectedEndOfInput)]
#[case("null::a", SyntaxError::UnexpectedToken("keyword used as an annotation"))]
fn incomplete_values(#[case] text: &str, #[case] expected: SyntaxError) {
    let mut r = reader(text);
    if r.next() && r.ion_type().is_some_and(IonType::is_container) {
        r.step_in().unwrap();
        while r.next() {}
    }
    match r.err() {
        Some(Error::Syntax { source, .. }) => assert_eq!(source, &expected),
        other => panic!("expected {expected:?}, got {other:?}"),
    }
}

#[test]
fn errors_latch() {
    let mut r = reader("1 \"unterminated");
    assert!(r.next());
    assert!(!r.next());
    let err = r.err().cloned().unwrap();
    assert!(err.is_fatal());
    assert!(matches!(
        err,
        Error::Syntax {
            source: SyntaxError::UnterminatedString,
            ..
        }
    ));
    assert_eq!(r.ion_type(), None);

    assert!(!r.next());
    assert!(r.err().is_some());
}

#[test]
fn step_out_reports_latched_error() {
    let mut r = reader("[1, 2 /* never closed");
    assert!(r.next());
    r.step_in().unwrap();
    let err = r.step_out().unwrap_err();
    assert!(err.is_fatal());
    assert!(r.err().is_some());
}

#[test]
fn type_mismatch_does_not_latch() {
    let mut r = reader("\"text\" 5");
    assert!(r.next());
    let err = r.int_value().unwrap_err();
    assert!(!err.is_fatal());
    assert_eq!(err.to_string(), "cannot read i32 from string");
    assert!(matches!(
        r.float_value(),
        Err(Error::TypeMismatch {
            requested: "float",
            actual: Some(IonType::String),
        })
    ));
    assert_eq!(r.string_value().unwrap().as_deref(), Some("text"));

    assert!(r.next());
    assert!(r.float_value().is_err());
    assert_eq!(r.int_value().unwrap(), 5);
    assert!(r.err().is_none());
}

#[test]
fn undecodable_decimal_does_not_latch() {
    let mut r = reader("1d99999999999999999999 2");
    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::Decimal));
    let err = r.decimal_value().unwrap_err();
    assert!(!err.is_fatal());
    assert!(matches!(
        err,
        Error::InvalidValue {
            source: SyntaxError::InvalidNumeric(_),
            line: 1,
            ..
        }
    ));
    assert!(r.err().is_none());

    assert!(r.next());
    assert_eq!(r.int_value().unwrap(), 2);
    assert!(!r.next());
    assert!(r.err().is_none());
}

#[test]
fn accessors_without_a_value_mismatch() {
    let r = reader("1");
    assert!(matches!(
        r.bool_value(),
        Err(Error::TypeMismatch { actual: None, .. })
    ));
}

#[test]
fn step_misuse_is_recoverable() {
    let mut r = reader("1 null.list [2]");
    assert!(matches!(r.step_out(), Err(Error::InvalidState(_))));
    assert!(matches!(r.step_in(), Err(Error::InvalidState(_))));

    assert!(r.next());
    assert!(matches!(r.step_in(), Err(Error::InvalidState(_))));
    assert!(r.next());
    assert!(matches!(r.step_in(), Err(Error::InvalidState(_))));

    assert!(r.next());
    r.step_in().unwrap();
    assert!(r.next());
    assert_eq!(r.int_value().unwrap(), 2);
    r.step_out().unwrap();
    assert!(r.err().is_none());
}

#[test]
fn depth_limit_applies_to_step_in_only() {
    let options = ReaderOptions {
        max_container_depth: Some(1),
    };
    let mut r = TextReader::with_options("[[[1]]] [[2]]".as_bytes(), options);
    assert!(r.next());
    r.step_in().unwrap();
    assert!(r.next());
    assert!(matches!(r.step_in(), Err(Error::DepthLimitExceeded(1))));
    r.step_out().unwrap();

    assert!(r.next());
    assert_eq!(r.ion_type(), Some(IonType::List));
    assert!(!r.next());
    assert!(r.err().is_none());
}

#[test]
fn works_through_trait_objects() {
    let mut text = reader("x::y");
    let r: &mut dyn Reader = &mut text;
    assert!(r.next());
    assert_eq!(r.annotations(), ["x"]);
    assert_eq!(r.string_value().unwrap().as_deref(), Some("y"));
}
