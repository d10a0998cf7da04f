use super::*;

const SAMPLE: &str = "\
1,3c1
< First line
< Second line
< Third line
---
> First line CHANGED
6a5,6
> Additional line1
> Additional line2
8,9d7
<
< Nineth line
";

#[test]
fn parses_each_operation() {
    let hunks = parse(SAMPLE).unwrap();
    assert_eq!(hunks.len(), 3);

    let change = &hunks[0];
    assert_eq!(change.op, DiffOp::Change);
    let src: Vec<usize> = change.src_lines.iter().map(|l| l.number).collect();
    assert_eq!(src, vec![1, 2, 3]);
    assert_eq!(change.src_lines[1].text, "Second line");
    assert_eq!(change.dst_lines.len(), 1);
    assert_eq!(change.dst_lines[0].number, 1);
    assert_eq!(change.dst_lines[0].text, "First line CHANGED");

    let add = &hunks[1];
    assert_eq!(add.op, DiffOp::Add);
    assert!(add.src_lines.is_empty());
    assert_eq!(add.anchor, 6);
    assert_eq!(add.dst_lines[0].number, 5);
    assert_eq!(add.dst_lines[1].number, 6);
    assert_eq!(add.dst_lines[1].text, "Additional line2");

    let delete = &hunks[2];
    assert_eq!(delete.op, DiffOp::Delete);
    assert!(delete.dst_lines.is_empty());
    assert_eq!(delete.anchor, 7);
    assert_eq!(delete.src_lines[0].text, "");
    assert_eq!(delete.src_lines[1].number, 9);
}

#[test]
fn empty_output_has_no_hunks() {
    assert!(parse("").unwrap().is_empty());
}

#[test]
fn skips_missing_newline_markers() {
    let out = "1c1,2\n< a\n\\ No newline at end of file\n---\n> a\n> b\n\\ No newline at end of file\n";
    let hunks = parse(out).unwrap();
    assert_eq!(hunks.len(), 1);
    assert_eq!(hunks[0].src_lines.len(), 1);
    assert_eq!(hunks[0].dst_lines.len(), 2);
    assert_eq!(hunks[0].dst_lines[1].text, "b");
}

#[test]
fn bare_marker_is_an_empty_line() {
    let hunks = parse("2a3\n>\n").unwrap();
    assert_eq!(hunks[0].dst_lines[0].text, "");
}

#[test]
fn malformed_header_fails() {
    let err = parse("this is not a diff\n").unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
    assert!(parse("1x2\n").is_err());
    assert!(parse("3,1d0\n< a\n< b\n< c\n").is_err());
}

#[test]
fn missing_separator_fails() {
    assert!(parse("1c1\n< old\n> new\n").is_err());
}

#[test]
fn short_block_fails() {
    assert!(parse("1,3d0\n< one\n< two\n").is_err());
    assert!(parse("0a1,2\n> only one\n").is_err());
}

#[test]
fn wrong_marker_fails() {
    assert!(parse("1d0\n> not a source line\n").is_err());
}

#[test]
fn reformatting_preserves_hunk_shape() {
    let hunks = parse(SAMPLE).unwrap();
    let again = parse(&format(&hunks)).unwrap();
    assert_eq!(hunks, again);
}
