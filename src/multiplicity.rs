use crate::types::{HashMap, HashMapExt};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// How many times each read name occurs in a file.
///
/// Built once from a full pass and read-only afterwards; memory grows with the
/// number of distinct names, not with the number of lines.
#[derive(Debug, Default, Clone)]
pub struct MultiplicityTable {
    counts: HashMap<String, u32>,
    total: u64,
}

impl MultiplicityTable {
    pub fn get(&self, read_id: &str) -> Option<u32> {
        self.counts.get(read_id).copied()
    }

    /// Number of distinct identifiers.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Lines counted, i.e. the sum of all entries.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// The `n` most frequent identifiers, ties broken by name.
    pub fn most_common(&self, n: usize) -> Vec<(&str, u32)> {
        let mut entries: Vec<(&str, u32)> =
            self.counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Count the first whitespace-delimited token of every line.
///
/// No record parsing happens here, so headers and lines the codec would reject
/// are counted too. Blank lines are skipped.
pub fn count_mappings<R: BufRead>(mut reader: R) -> std::io::Result<MultiplicityTable> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut total = 0u64;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let Some(id) = line.split_whitespace().next() else {
            continue;
        };
        match counts.get_mut(id) {
            Some(n) => *n = n.saturating_add(1),
            None => {
                counts.insert(id.to_string(), 1);
            }
        }
        total += 1;
    }
    Ok(MultiplicityTable { counts, total })
}

pub fn count_mappings_in_file(path: &Path) -> std::io::Result<MultiplicityTable> {
    count_mappings(BufReader::new(File::open(path)?))
}
