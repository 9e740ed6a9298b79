use crate::error::FormatError;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Realistic files hold only a handful of distinct CIGAR strings.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// SAM CIGAR operation codes, in BAM numeric order.
pub const OPERATION_CODES: [char; 9] = ['M', 'I', 'D', 'N', 'S', 'H', 'P', '=', 'X'];

/// Total run length per CIGAR operation code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounts {
    counts: [u64; OPERATION_CODES.len()],
}

impl OperationCounts {
    /// Run length recorded for `op`; zero for codes that never appeared.
    pub fn get(&self, op: char) -> u64 {
        op_index(op).map_or(0, |i| self.counts[i])
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, u64)> + '_ {
        OPERATION_CODES
            .iter()
            .zip(self.counts.iter())
            .filter(|(_, n)| **n > 0)
            .map(|(op, n)| (*op, *n))
    }
}

fn op_index(op: char) -> Option<usize> {
    OPERATION_CODES.iter().position(|&c| c == op)
}

/// Run-length decode a CIGAR string such as `3S10M2I5M`.
///
/// `*` (CIGAR unavailable) decodes to empty counts.
pub fn decode_operations(cigar: &str) -> Result<OperationCounts, FormatError> {
    let mut counts = OperationCounts::default();
    if cigar == "*" {
        return Ok(counts);
    }

    let bytes = cigar.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == start || i == bytes.len() {
            return Err(FormatError::Untokenizable {
                cigar: cigar.to_string(),
                offset: i,
            });
        }
        let Some(idx) = op_index(bytes[i] as char) else {
            return Err(FormatError::Untokenizable {
                cigar: cigar.to_string(),
                offset: i,
            });
        };
        let run: u64 = cigar[start..i]
            .parse()
            .map_err(|_| FormatError::RunLengthOverflow {
                cigar: cigar.to_string(),
            })?;
        counts.counts[idx] = counts.counts[idx].checked_add(run).ok_or_else(|| {
            FormatError::RunLengthOverflow {
                cigar: cigar.to_string(),
            }
        })?;
        i += 1;
    }
    Ok(counts)
}

/// Memoizing front end for [`decode_operations`], owned by whoever extracts features.
pub struct OperationDecoder {
    cache: LruCache<String, OperationCounts>,
}

impl OperationDecoder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// A capacity of zero is bumped to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    pub fn decode(&mut self, cigar: &str) -> Result<OperationCounts, FormatError> {
        if let Some(counts) = self.cache.get(cigar) {
            return Ok(*counts);
        }
        let counts = decode_operations(cigar)?;
        self.cache.put(cigar.to_string(), counts);
        Ok(counts)
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }
}

impl Default for OperationDecoder {
    fn default() -> Self {
        Self::new()
    }
}
