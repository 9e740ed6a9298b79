use std::io::{BufRead, Write};

const SEQ_COLUMN: usize = 9;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FilterStats {
    pub kept: u64,
    pub dropped: u64,
}

/// Copy `reader` to `writer`, dropping records whose sequence contains `N`.
///
/// Lines with too few fields to carry a sequence (headers) are kept as is.
pub fn filter_ambiguous_reads<R: BufRead, W: Write>(
    mut reader: R,
    mut writer: W,
) -> std::io::Result<FilterStats> {
    let mut stats = FilterStats::default();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let has_ambiguous = line
            .split_whitespace()
            .nth(SEQ_COLUMN)
            .is_some_and(|seq| seq.contains('N'));
        if has_ambiguous {
            stats.dropped += 1;
        } else {
            writer.write_all(line.as_bytes())?;
            stats.kept += 1;
        }
    }
    writer.flush()?;
    Ok(stats)
}
