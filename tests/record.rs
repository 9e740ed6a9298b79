use loqum_rs::error::ParseError;
use loqum_rs::record::{self, AlignmentRecord, FieldValue, OptionalField};

const MAPPED: &str = "r1:READ_POS=100\t0\tchr1\t100\t60\t5M\t*\t0\t0\tACGTN\tIIIII";

#[test]
fn parses_mandatory_fields() {
    let rec = AlignmentRecord::parse(MAPPED).unwrap();
    assert_eq!(rec.qname, "r1:READ_POS=100");
    assert_eq!(rec.flag, 0);
    assert_eq!(rec.rname, "chr1");
    assert_eq!(rec.pos, 100);
    assert_eq!(rec.mapq, 60);
    assert_eq!(rec.cigar, "5M");
    assert_eq!(rec.rnext, "*");
    assert_eq!(rec.pnext, 0);
    assert_eq!(rec.tlen, 0);
    assert_eq!(rec.seq, "ACGTN");
    assert_eq!(rec.qual, "IIIII");
    assert!(rec.optional.is_empty());
    assert!(!rec.is_unmapped());
}

#[test]
fn trailing_newline_is_ignored() {
    let with_newline = format!("{MAPPED}\n");
    assert_eq!(
        AlignmentRecord::parse(&with_newline).unwrap(),
        AlignmentRecord::parse(MAPPED).unwrap()
    );
    let with_crlf = format!("{MAPPED}\r\n");
    assert_eq!(
        AlignmentRecord::parse(&with_crlf).unwrap(),
        AlignmentRecord::parse(MAPPED).unwrap()
    );
}

#[test]
fn unmapped_bit_is_detected() {
    let rec = AlignmentRecord::parse("r2\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\tIIII").unwrap();
    assert!(rec.is_unmapped());
}

/// Header lines do not have eleven columns; parsing them must fail rather
/// than produce a bogus record.
#[test]
fn too_few_fields_is_a_parse_error() {
    let err = AlignmentRecord::parse("@HD\tVN:1.6\tSO:unsorted").unwrap_err();
    assert_eq!(err, ParseError::TooFewFields { found: 3, expected: 11 });
    assert!(record::is_header("@HD\tVN:1.6"));
    assert!(!record::is_header(MAPPED));
}

#[test]
fn non_numeric_flag_is_a_parse_error() {
    let err = AlignmentRecord::parse("r\tx\tchr1\t1\t60\t4M\t*\t0\t0\tACGT\tIIII").unwrap_err();
    assert!(matches!(err, ParseError::InvalidField { field: "FLAG", .. }));
}

#[test]
fn sequence_quality_length_mismatch_is_rejected() {
    let err = AlignmentRecord::parse("r\t0\tchr1\t1\t60\t4M\t*\t0\t0\tACGT\tIII").unwrap_err();
    assert_eq!(err, ParseError::LengthMismatch { sequence: 4, quality: 3 });
    // A missing quality string is allowed.
    assert!(AlignmentRecord::parse("r\t0\tchr1\t1\t60\t4M\t*\t0\t0\tACGT\t*").is_ok());
}

#[test]
fn optional_fields_are_typed() {
    let line = format!(
        "{MAPPED}\tNM:i:-2\tXA:A:x\tMD:Z:chr1:5,3\tZF:f:1.50\tXH:H:1AE3\tXB:B:c,1,-2,3"
    );
    let rec = AlignmentRecord::parse(&line).unwrap();
    assert_eq!(rec.optional.len(), 6);
    assert_eq!(rec.optional_field("NM"), Some(&FieldValue::Integer(-2)));
    assert_eq!(rec.optional_field("XA"), Some(&FieldValue::Text("x".into())));
    // Text values may contain the ':' separator.
    assert_eq!(rec.optional_field("MD"), Some(&FieldValue::Text("chr1:5,3".into())));
    assert_eq!(rec.optional_field("ZF"), Some(&FieldValue::Float(1.5)));
    assert_eq!(rec.optional_field("XH"), Some(&FieldValue::Bytes(vec![0x1A, 0xE3])));
    assert_eq!(
        rec.optional_field("XB"),
        Some(&FieldValue::NumericArray { subtype: 'c', values: vec![1.0, -2.0, 3.0] })
    );
    assert_eq!(rec.optional_field("XX"), None);
}

#[test]
fn unknown_type_tag_is_a_parse_error() {
    let line = format!("{MAPPED}\tXY:Q:7");
    let err = AlignmentRecord::parse(&line).unwrap_err();
    assert!(matches!(err, ParseError::UnknownFieldType { .. }), "{err:?}");
}

#[test]
fn bad_optional_values_are_parse_errors() {
    for field in ["NM:i:two", "XH:H:1AE", "XB:B:1,2", "NM:i"] {
        let line = format!("{MAPPED}\t{field}");
        assert!(AlignmentRecord::parse(&line).is_err(), "accepted {field}");
    }
}

/// Serialization reproduces the input byte for byte, including optional
/// values whose decoded form would print differently (`1.50`, lowercase hex).
#[test]
fn serialize_is_inverse_of_parse() {
    let line = format!("{MAPPED}\tZF:f:1.50\tXH:H:1ae3\tXB:B:f,0.50,2\tRG:Z:grp:1");
    let rec = AlignmentRecord::parse(&line).unwrap();
    assert_eq!(rec.to_line(), line);

    let reparsed = AlignmentRecord::parse(&rec.to_line()).unwrap();
    assert_eq!(reparsed, rec);
}

#[test]
fn constructed_optional_field_renders_its_value() {
    let mut rec = AlignmentRecord::parse(MAPPED).unwrap();
    rec.optional.push(OptionalField::new("NH", 'i', FieldValue::Integer(3)));
    rec.optional.push(OptionalField::new("XH", 'H', FieldValue::Bytes(vec![0x0F, 0xA0])));
    assert_eq!(rec.to_line(), format!("{MAPPED}\tNH:i:3\tXH:H:0FA0"));
    assert_eq!(AlignmentRecord::parse(&rec.to_line()).unwrap(), rec);
}
