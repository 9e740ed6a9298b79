use crate::error::{ConsistencyError, Result};
use crate::multiplicity::MultiplicityTable;
use crate::operations::OperationDecoder;
use crate::quality;
use crate::record::AlignmentRecord;
use crate::types::{MappingQuality, Position};
use serde::Serialize;
use std::io::Write;

/// Column names of the feature table, in row order.
pub const FEATURE_COLUMNS: [&str; 14] = [
    "read_id",
    "map_qual",
    "matches",
    "insertions",
    "deletions",
    "mismatches",
    "n_count",
    "base_qual_slope",
    "base_qual_intercept",
    "base_qual_r_value",
    "base_qual_p_value",
    "base_qual_std_err",
    "mapping_count",
    "correct",
];

/// One mapped record as seen by the recalibration model.
///
/// Field order matches [`FEATURE_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub read_id: String,
    pub map_qual: MappingQuality,
    pub matches: u64,
    pub insertions: u64,
    pub deletions: u64,
    pub mismatches: u64,
    pub n_count: u64,
    pub base_qual_slope: f64,
    pub base_qual_intercept: f64,
    pub base_qual_r_value: f64,
    pub base_qual_p_value: f64,
    pub base_qual_std_err: f64,
    pub mapping_count: u32,
    /// Empty in the table when no ground truth is available.
    pub correct: Option<u8>,
}

pub struct FeatureExtractor<'a> {
    table: &'a MultiplicityTable,
    decoder: OperationDecoder,
}

impl<'a> FeatureExtractor<'a> {
    pub fn new(table: &'a MultiplicityTable) -> Self {
        Self {
            table,
            decoder: OperationDecoder::new(),
        }
    }

    /// `None` for unmapped records; they never reach the model.
    pub fn extract(
        &mut self,
        record: &AlignmentRecord,
        truth: Option<Position>,
    ) -> Result<Option<FeatureRow>> {
        if record.is_unmapped() {
            return Ok(None);
        }

        let ops = self.decoder.decode(&record.cigar)?;
        let trend = quality::fit(&record.qual);
        let mapping_count = self
            .table
            .get(&record.qname)
            .ok_or_else(|| ConsistencyError::MissingMultiplicity(record.qname.clone()))?;

        Ok(Some(FeatureRow {
            read_id: record.qname.clone(),
            map_qual: record.mapq,
            matches: ops.get('M'),
            insertions: ops.get('I'),
            deletions: ops.get('D'),
            mismatches: ops.get('X'),
            n_count: record.seq.bytes().filter(|&b| b == b'N').count() as u64,
            base_qual_slope: trend.slope,
            base_qual_intercept: trend.intercept,
            base_qual_r_value: trend.r_value,
            base_qual_p_value: trend.p_value,
            base_qual_std_err: trend.std_err,
            mapping_count,
            correct: truth.map(|pos| u8::from(pos == record.pos)),
        }))
    }
}

/// CSV writer for feature rows; the header is written on construction so an
/// empty table still carries it.
pub struct FeatureWriter<W: Write> {
    inner: csv::Writer<W>,
    rows: u64,
}

impl<W: Write> FeatureWriter<W> {
    pub fn new(writer: W) -> Result<Self> {
        let mut inner = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        inner.write_record(FEATURE_COLUMNS)?;
        Ok(Self { inner, rows: 0 })
    }

    pub fn write(&mut self, row: &FeatureRow) -> Result<()> {
        self.inner.serialize(row)?;
        self.rows += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<u64> {
        self.inner.flush()?;
        Ok(self.rows)
    }
}
