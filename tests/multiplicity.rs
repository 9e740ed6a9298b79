use loqum_rs::multiplicity::count_mappings;
use std::io::Cursor;

#[test]
fn counts_each_identifier() {
    let sam = "\
r1\t0\tchr1\t10\t60\t4M\t*\t0\t0\tACGT\tIIII
r2\t0\tchr1\t20\t60\t4M\t*\t0\t0\tACGT\tIIII
r1\t256\tchr2\t30\t0\t4M\t*\t0\t0\tACGT\tIIII
r3\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\tIIII
r1\t256\tchr3\t40\t0\t4M\t*\t0\t0\tACGT\tIIII
";
    let table = count_mappings(Cursor::new(sam)).unwrap();
    assert_eq!(table.total(), 5);
    assert_eq!(table.len(), 3);
    assert_eq!(table.get("r1"), Some(3));
    assert_eq!(table.get("r2"), Some(1));
    assert_eq!(table.get("r3"), Some(1));
    assert_eq!(table.get("r4"), None);
    assert_eq!(table.iter().map(|(_, n)| u64::from(n)).sum::<u64>(), table.total());
    assert_eq!(table.most_common(2), vec![("r1", 3), ("r2", 1)]);
}

/// Headers and lines the record parser would reject are still counted; only
/// the first whitespace-delimited token matters.
#[test]
fn tolerates_headers_and_malformed_lines() {
    let input = "@HD\tVN:1.6\n@SQ\tSN:chr1\tLN:100\nr1 garbage\n\nr1\n";
    let table = count_mappings(Cursor::new(input)).unwrap();
    assert_eq!(table.total(), 4);
    assert_eq!(table.get("@HD"), Some(1));
    assert_eq!(table.get("@SQ"), Some(1));
    assert_eq!(table.get("r1"), Some(2));
}

#[test]
fn empty_input_gives_empty_table() {
    let table = count_mappings(Cursor::new("")).unwrap();
    assert_eq!(table.total(), 0);
    assert!(table.is_empty());
    assert!(table.most_common(5).is_empty());
}
