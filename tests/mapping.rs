use assert_matches::assert_matches;

use ega_metadata::error::EgaError;
use ega_metadata::mapping::{Delimiter, MappingOptions, parse_mapping};

#[test]
fn one_row_per_data_line_with_header_keys() {
    let content = "SAMPLE_ALIAS\tSAMPLE_ACCESSION\tFILE_NAME\n\
                   a\tEGAN1\ta.bam\n\
                   b\tEGAN2\tb.bam\n\
                   c\tEGAN3\tc.bam\n";

    let rows = parse_mapping("Sample_File", content.as_bytes(), &MappingOptions::default()).unwrap();

    assert_eq!(rows.len(), 3);
    for row in &rows {
        let keys: Vec<&str> = row.keys().map(String::as_str).collect();
        assert_eq!(keys, ["SAMPLE_ALIAS", "SAMPLE_ACCESSION", "FILE_NAME"]);
    }
    assert_eq!(rows[2]["SAMPLE_ACCESSION"], "EGAN3");
}

#[test]
fn header_only_file_has_no_rows() {
    let rows = parse_mapping("Empty", "A\tB\n".as_bytes(), &MappingOptions::default()).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn empty_file_has_no_rows() {
    let rows = parse_mapping("Empty", "".as_bytes(), &MappingOptions::default()).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn comma_files_honour_quotes() {
    let content = "RUN,TITLE\nERR1,\"lung, left\"\n";
    let rows = parse_mapping("Run_Title", content.as_bytes(), &MappingOptions::default()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["TITLE"], "lung, left");
}

#[test]
fn configured_columns_read_headerless_files() {
    let mut options = MappingOptions {
        delimiter: Delimiter::Tab,
        ..MappingOptions::default()
    };
    options.columns.insert(
        "Run_Sample".to_string(),
        vec!["RUN".to_string(), "SAMPLE".to_string()],
    );

    let rows = parse_mapping("Run_Sample", "ERR1\tEGAN1\nERR2\tEGAN2\n".as_bytes(), &options).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["RUN"], "ERR1");
    assert_eq!(rows[1]["SAMPLE"], "EGAN2");
}

#[test]
fn lenient_mode_skips_ragged_lines() {
    let options = MappingOptions {
        strict: false,
        ..MappingOptions::default()
    };
    let content = "A\tB\n1\t2\n3\n4\t5\n";

    let rows = parse_mapping("Ragged", content.as_bytes(), &options).unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["A"], "4");
}

#[test]
fn strict_mode_rejects_ragged_lines() {
    let content = "A\tB\n1\t2\n3\n";
    let err = parse_mapping("Ragged", content.as_bytes(), &MappingOptions::default()).unwrap_err();
    assert_matches!(
        err,
        EgaError::MalformedMapping { ref mapping_id, line: 3, .. } if mapping_id == "Ragged"
    );
}

#[test]
fn strict_mode_rejects_repeated_column_names() {
    let content = "A\tA\n1\t2\n";
    let err = parse_mapping("Repeated", content.as_bytes(), &MappingOptions::default()).unwrap_err();
    assert_matches!(err, EgaError::MalformedMapping { line: 1, .. });
}

#[test]
fn lenient_mode_renames_repeated_column_names() {
    let options = MappingOptions {
        strict: false,
        ..MappingOptions::default()
    };
    let content = "A\tA\tB\tA\n1\t2\t3\t4\n";

    let rows = parse_mapping("Repeated", content.as_bytes(), &options).unwrap();

    assert_eq!(rows.len(), 1);
    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys, ["A", "A_2", "B", "A_3"]);
    assert_eq!(rows[0]["A"], "1");
    assert_eq!(rows[0]["A_2"], "2");
    assert_eq!(rows[0]["A_3"], "4");
}

#[test]
fn whitespace_only_lines_are_skipped() {
    let content = "A\tB\n1\t2\n   \n3\t4\n";
    let rows = parse_mapping("Blank", content.as_bytes(), &MappingOptions::default()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["A"], "3");
}
