use crate::error::{ConsistencyError, InputRangeError, ParseError, Result};
use crate::model::{ModelHandle, RecalibrationModel};
use crate::partition::Chunk;
use crate::record::{self, AlignmentRecord};
use crate::types::MappingQuality;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeStats {
    pub headers: u64,
    pub unmapped: u64,
    pub revised: u64,
}

/// Phred-scaled quality for a probability of correct mapping.
///
/// `floor(0.5 - 10 * log10(1 - p))`, saturating at 255.
pub fn phred_from_probability(read_id: &str, p: f64) -> Result<MappingQuality> {
    if !(0.0..1.0).contains(&p) {
        return Err(InputRangeError::Probability {
            read_id: read_id.to_string(),
            value: p,
        }
        .into());
    }
    let q = (0.5 - 10.0 * (1.0 - p).log10()).floor();
    Ok(q.min(f64::from(MappingQuality::MAX)) as MappingQuality)
}

/// Model output rows, read one at a time.
pub struct PredictionReader<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    row: u64,
}

impl<R: Read> PredictionReader<R> {
    /// The first line of `reader` is a header and is skipped.
    pub fn new(reader: R) -> Self {
        let records = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader)
            .into_records();
        Self { records, row: 0 }
    }

    /// Next `(read_id, probability)` pair, or `None` at end of table.
    pub fn next_prediction(&mut self) -> Result<Option<(String, f64)>> {
        let Some(row) = self.records.next() else {
            return Ok(None);
        };
        let row = row?;
        self.row += 1;
        let (Some(id), Some(value)) = (row.get(0), row.get(1)) else {
            return Err(ParseError::MalformedPrediction {
                row: self.row,
                reason: format!("expected at least 2 columns, found {}", row.len()),
            }
            .into());
        };
        let p: f64 = value.trim().parse().map_err(|_| ParseError::MalformedPrediction {
            row: self.row,
            reason: format!("probability {value:?} is not a number"),
        })?;
        Ok(Some((id.to_string(), p)))
    }

    pub fn row(&self) -> u64 {
        self.row
    }
}

/// Rewrite the mapping quality of every mapped record from the predictions stream.
///
/// Headers and unmapped records pass through untouched. Every other record
/// consumes the next prediction, whose read id must match; predictions left
/// over at the end are an error too.
pub fn merge_predictions<R, P, W>(records: R, predictions: P, mut out: W) -> Result<MergeStats>
where
    R: BufRead,
    P: Read,
    W: Write,
{
    let mut predictions = PredictionReader::new(predictions);
    let mut stats = MergeStats::default();

    for line in records.lines() {
        let line = line?;
        if record::is_header(&line) {
            writeln!(out, "{line}")?;
            stats.headers += 1;
            continue;
        }
        let mut record = AlignmentRecord::parse(&line)?;
        if record.is_unmapped() {
            writeln!(out, "{line}")?;
            stats.unmapped += 1;
            continue;
        }

        let Some((read_id, p)) = predictions.next_prediction()? else {
            return Err(ConsistencyError::PredictionsExhausted(record.qname).into());
        };
        if read_id != record.qname {
            return Err(ConsistencyError::Desynchronized {
                row: predictions.row(),
                expected: record.qname,
                found: read_id,
            }
            .into());
        }
        record.mapq = phred_from_probability(&read_id, p)?;
        writeln!(out, "{record}")?;
        stats.revised += 1;
    }

    let mut leftover = 0u64;
    while predictions.next_prediction()?.is_some() {
        leftover += 1;
    }
    if leftover > 0 {
        return Err(ConsistencyError::UnconsumedPredictions(leftover).into());
    }

    out.flush()?;
    Ok(stats)
}

/// Run the model on one chunk and write its revised records to
/// [`Chunk::revised_path`].
pub fn recalibrate_chunk<M>(chunk: &Chunk, model: &M, handle: &ModelHandle) -> Result<MergeStats>
where
    M: RecalibrationModel + ?Sized,
{
    let predictions_path = chunk.predictions_path();
    model.predict(handle, &chunk.features_path, &predictions_path)?;

    let records = BufReader::new(File::open(&chunk.records_path)?);
    let predictions = BufReader::new(File::open(&predictions_path)?);
    let out = BufWriter::new(File::create(chunk.revised_path())?);
    let stats = merge_predictions(records, predictions, out)?;
    tracing::debug!(
        chunk = chunk.index,
        revised = stats.revised,
        unmapped = stats.unmapped,
        "chunk recalibrated"
    );
    Ok(stats)
}
