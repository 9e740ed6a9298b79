//! Where the true origin of a simulated read comes from, when it is known.

use crate::error::{ConsistencyError, ParseError, Result};
use crate::record::AlignmentRecord;
use crate::types::{HashMap, HashMapExt, Position};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Prefix of the info lines in a simulator `.aln` file.
pub const ALN_INFO_INDICATOR: char = '>';

const READ_POS_KEY: &str = "READ_POS=";

#[derive(Debug, Default)]
pub enum GroundTruth {
    /// Production data: the `correct` column is left empty.
    #[default]
    None,
    /// Names rewritten as `<index>:READ_POS=<pos>`, optionally with a `/1` mate suffix.
    ReadName,
    /// 1-based positions keyed by read name.
    Positions(HashMap<String, Position>),
}

impl GroundTruth {
    pub fn from_aln_file(path: &Path) -> Result<Self> {
        Ok(Self::Positions(read_aln_positions(BufReader::new(
            File::open(path)?,
        ))?))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn position_for(&self, record: &AlignmentRecord) -> Result<Option<Position>> {
        match self {
            Self::None => Ok(None),
            Self::ReadName => read_name_position(&record.qname).map(Some),
            Self::Positions(positions) => positions
                .get(&record.qname)
                .copied()
                .map(Some)
                .ok_or_else(|| ConsistencyError::MissingTruth(record.qname.clone()).into()),
        }
    }
}

/// Extract the position from a rewritten read name such as `17:READ_POS=1043/1`.
pub fn read_name_position(qname: &str) -> Result<Position> {
    let (_, tail) = qname
        .split_once(READ_POS_KEY)
        .ok_or_else(|| ConsistencyError::MissingTruth(qname.to_string()))?;
    let digits = tail.split('/').next().unwrap_or(tail);
    digits
        .parse()
        .map_err(|_| ParseError::MissingReadPosition(qname.to_string()).into())
}

/// Read `>reference read_id position strand` lines; positions are 0-based on
/// disk and returned 1-based.
pub fn read_aln_positions<R: BufRead>(reader: R) -> Result<HashMap<String, Position>> {
    let mut positions = HashMap::new();
    for line in reader.lines() {
        let line = line?;
        let Some(info) = line.strip_prefix(ALN_INFO_INDICATOR) else {
            continue;
        };
        let fields: Vec<&str> = info.split_whitespace().collect();
        let [_reference, read_id, pos, _strand] = fields.as_slice() else {
            return Err(ParseError::MalformedAlnLine(line.clone()).into());
        };
        let pos: Position = pos
            .parse()
            .map_err(|_| ParseError::MalformedAlnLine(line.clone()))?;
        positions.insert((*read_id).to_string(), pos.saturating_add(1));
    }
    Ok(positions)
}
