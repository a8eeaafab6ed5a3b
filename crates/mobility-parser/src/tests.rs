use std::fs;
use std::path::PathBuf;

use crate::errors::ParserError;
use crate::model::{RawRow, Scalar};
use crate::{infer_scalar, parse_csv};

fn fixture(path: &str) -> Vec<u8> {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

#[test]
fn parses_gender_export() {
    let dataset = parse_csv(&fixture("202406_GENDER_MONTHLY.csv")).expect("gender parse failed");

    assert_eq!(
        dataset.column_names(),
        ["MONTH", "POLYGON_L8", "GENDER", "USER_REACH"]
    );
    assert_eq!(dataset.len(), 5);
    assert_eq!(dataset.content_hash.len(), 64);

    let first = &dataset.rows()[0];
    assert_eq!(first.get("MONTH"), &Scalar::Text("2024-06-01".into()));
    assert_eq!(first.get("USER_REACH"), &Scalar::Int(10));

    assert!(dataset.rows()[3].is_null("POLYGON_L8"));
    assert!(dataset.rows()[4].is_null("GENDER"));
}

#[test]
fn hourly_export_types_floats_and_blanks() {
    let dataset = parse_csv(&fixture("202403_REACH_HOURLY.csv")).expect("hourly parse failed");

    let row = &dataset.rows()[0];
    assert_eq!(row.get("HOUR"), &Scalar::Int(7));
    assert_eq!(row.get("DAILY_AVERAGE_IMPRESSIONS"), &Scalar::Float(3.87));

    let blank = &dataset.rows()[2];
    for column in ["DAY", "HOUR", "IMPRESSIONS", "DAILY_AVERAGE_USER_REACH"] {
        assert!(blank.is_null(column), "{column} should be null");
    }
}

#[test]
fn nan_marker_reads_as_null() {
    let dataset = parse_csv(&fixture("202401_WORK_AVG_DISTANCE_MONTHLY.csv"))
        .expect("distance parse failed");
    assert!(dataset.rows()[2].is_null("AVG_WORK_DISTANCE"));
    assert_eq!(dataset.rows()[3].get("AVG_WORK_DISTANCE"), &Scalar::Int(980));
}

#[test]
fn infer_scalar_types_integer_literals() {
    assert_eq!(infer_scalar("007"), Scalar::Int(7));
    assert_eq!(infer_scalar("+5"), Scalar::Int(5));
    assert_eq!(infer_scalar("-0"), Scalar::Int(0));
    assert_eq!(infer_scalar(" 42 "), Scalar::Int(42));
    assert_eq!(infer_scalar("-1.5e2"), Scalar::Float(-150.0));
    assert_eq!(infer_scalar("NA"), Scalar::Null);
    assert_eq!(infer_scalar("TRUE"), Scalar::Bool(true));
    assert_eq!(infer_scalar("2024-06-01"), Scalar::Text("2024-06-01".into()));
    assert_eq!(infer_scalar("NON-MALAYSIAN"), Scalar::Text("NON-MALAYSIAN".into()));
}

#[test]
fn numeric_looking_keys_keep_source_text() {
    let dataset = parse_csv(
        b"MONTH,POLYGON_L8,HOUR\n\
          2024-03-01,88651e3,07\n\
          2024-03-01,8865.10, 007 \n\
          2024-03-01,NaN,\n",
    )
    .expect("key parse failed");
    let rows = dataset.rows();

    assert_eq!(rows[0].get("POLYGON_L8"), &Scalar::Float(88651000.0));
    assert_eq!(rows[0].text("POLYGON_L8").as_deref(), Some("88651e3"));
    assert_eq!(rows[0].get("HOUR"), &Scalar::Int(7));
    assert_eq!(rows[0].text("HOUR").as_deref(), Some("07"));

    assert_eq!(rows[1].text("POLYGON_L8").as_deref(), Some("8865.10"));
    assert_eq!(rows[1].text("HOUR").as_deref(), Some("007"));

    assert_eq!(rows[2].text("POLYGON_L8"), None);
    assert_eq!(rows[2].text("HOUR"), None);
    assert_eq!(rows[2].text("MISSING"), None);
}

#[test]
fn in_memory_rows_render_text_from_value() {
    let row: RawRow = [("POLYGON_L8", Scalar::Int(123)), ("DAY", Scalar::from("MONDAY"))]
        .into_iter()
        .collect();
    assert_eq!(row.text("POLYGON_L8").as_deref(), Some("123"));
    assert_eq!(row.text("DAY").as_deref(), Some("MONDAY"));
}

#[test]
fn rows_keep_column_order() {
    let dataset = parse_csv(&fixture("202403_REACH_HOURLY.csv")).expect("hourly parse failed");
    let columns: Vec<&str> = dataset.rows()[0].columns().collect();
    assert_eq!(columns, dataset.column_names());

    let mut row = RawRow::new();
    row.insert("B", 1i64);
    row.insert("A", 2i64);
    row.insert("B", 3i64);
    assert_eq!(row.columns().collect::<Vec<_>>(), ["B", "A"]);
    assert_eq!(row.get("B"), &Scalar::Int(3));
    assert_eq!(row.len(), 2);
}

#[test]
fn rejects_duplicate_header() {
    let err = parse_csv(b"MONTH,MONTH\n2024-01-01,2024-01-01\n").unwrap_err();
    assert!(matches!(err, ParserError::InvalidHeader { index: 1, .. }));
}

#[test]
fn rejects_ragged_rows() {
    let err = parse_csv(b"MONTH,POLYGON_L8\n2024-01-01\n").unwrap_err();
    assert!(matches!(err, ParserError::Csv { line: 2, .. }));
}

#[test]
fn rejects_invalid_utf8() {
    let err = parse_csv(&[0x4d, 0xff, 0xfe, 0x0a]).unwrap_err();
    assert!(matches!(err, ParserError::Utf8(_)));
}

#[test]
fn empty_input_has_no_header() {
    let err = parse_csv(b"").unwrap_err();
    assert!(matches!(err, ParserError::MissingHeader));
}

#[test]
fn strips_byte_order_mark() {
    let dataset = parse_csv("\u{feff}MONTH,POLYGON_L8\n2024-02-01,P1\n".as_bytes())
        .expect("bom parse failed");
    assert_eq!(dataset.column_names()[0], "MONTH");
}

#[test]
fn missing_column_reads_as_null() {
    let row: RawRow = [("MONTH", Scalar::from("2024-06-01"))].into_iter().collect();
    assert!(row.is_null("POLYGON_L8"));
    assert!(Scalar::from(f64::NAN).is_null());
    assert_eq!(Scalar::from(None::<i64>), Scalar::Null);
}
