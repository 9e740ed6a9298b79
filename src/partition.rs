//! Split a record stream into bounded chunks on disk.
//!
//! Each chunk is two files with matching row order: the raw lines (headers
//! included, byte for byte) and the feature table of its mapped records.

use crate::error::Result;
use crate::features::{FeatureExtractor, FeatureWriter};
use crate::multiplicity::MultiplicityTable;
use crate::record::{self, AlignmentRecord};
use crate::truth::GroundTruth;
use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Records per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 50_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub records_path: PathBuf,
    pub features_path: PathBuf,
    /// Data records written, headers excluded.
    pub records: u64,
    pub feature_rows: u64,
}

impl Chunk {
    pub fn predictions_path(&self) -> PathBuf {
        with_suffix(&self.records_path, ".predictions.csv")
    }

    pub fn revised_path(&self) -> PathBuf {
        with_suffix(&self.records_path, ".revised")
    }

    /// Delete every artifact of this chunk that exists.
    pub fn remove(&self) -> std::io::Result<()> {
        for path in [
            &self.records_path,
            &self.features_path,
            &self.predictions_path(),
            &self.revised_path(),
        ] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

pub fn chunk_paths(prefix: &Path, index: usize) -> (PathBuf, PathBuf) {
    let records = with_suffix(prefix, &format!(".{index}"));
    let features = with_suffix(prefix, &format!(".{index}.csv"));
    (records, features)
}

struct OpenChunk {
    chunk: Chunk,
    raw: BufWriter<File>,
    features: FeatureWriter<BufWriter<File>>,
}

impl OpenChunk {
    fn create(prefix: &Path, index: usize) -> Result<Self> {
        let (records_path, features_path) = chunk_paths(prefix, index);
        let raw = BufWriter::new(File::create(&records_path)?);
        let features = FeatureWriter::new(BufWriter::new(File::create(&features_path)?))?;
        Ok(Self {
            chunk: Chunk {
                index,
                records_path,
                features_path,
                records: 0,
                feature_rows: 0,
            },
            raw,
            features,
        })
    }

    fn finish(mut self) -> Result<Chunk> {
        self.raw.flush()?;
        self.chunk.feature_rows = self.features.finish()?;
        Ok(self.chunk)
    }
}

/// Lazy, single-pass sequence of [`Chunk`]s.
///
/// The source is consumed as chunks are pulled; the first error ends the
/// sequence. Removing yielded chunks is the caller's job.
pub struct ChunkPartitioner<'a, R> {
    reader: R,
    extractor: FeatureExtractor<'a>,
    truth: &'a GroundTruth,
    chunk_size: usize,
    prefix: PathBuf,
    next_index: usize,
    // First data line of the next chunk, read while the previous one was full.
    carry: Option<String>,
    done: bool,
}

impl<'a, R: BufRead> ChunkPartitioner<'a, R> {
    pub fn new(
        reader: R,
        table: &'a MultiplicityTable,
        truth: &'a GroundTruth,
        chunk_size: usize,
        prefix: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reader,
            extractor: FeatureExtractor::new(table),
            truth,
            chunk_size: chunk_size.max(1),
            prefix: prefix.into(),
            next_index: 0,
            carry: None,
            done: false,
        }
    }

    fn write_line(&mut self, open: &mut OpenChunk, line: &str) -> Result<()> {
        open.raw.write_all(line.as_bytes())?;
        if record::is_header(line) {
            return Ok(());
        }
        let record = AlignmentRecord::parse(line)?;
        open.chunk.records += 1;
        if record.is_unmapped() {
            return Ok(());
        }
        let truth = self.truth.position_for(&record)?;
        if let Some(row) = self.extractor.extract(&record, truth)? {
            open.features.write(&row)?;
        }
        Ok(())
    }

    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let mut open: Option<OpenChunk> = None;
        if let Some(line) = self.carry.take() {
            let mut chunk = OpenChunk::create(&self.prefix, self.next_index)?;
            self.write_line(&mut chunk, &line)?;
            open = Some(chunk);
        }

        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                break;
            }
            let full = open
                .as_ref()
                .is_some_and(|c| c.chunk.records as usize >= self.chunk_size);
            if full && !record::is_header(&line) {
                self.carry = Some(std::mem::take(&mut line));
                break;
            }
            if open.is_none() {
                open = Some(OpenChunk::create(&self.prefix, self.next_index)?);
            }
            if let Some(chunk) = open.as_mut() {
                self.write_line(chunk, &line)?;
            }
        }

        match open {
            Some(chunk) => {
                self.next_index += 1;
                let chunk = chunk.finish()?;
                tracing::debug!(
                    chunk = chunk.index,
                    records = chunk.records,
                    feature_rows = chunk.feature_rows,
                    "chunk written"
                );
                Ok(Some(chunk))
            }
            None => Ok(None),
        }
    }
}

impl<R: BufRead> Iterator for ChunkPartitioner<'_, R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
