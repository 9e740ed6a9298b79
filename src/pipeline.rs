use crate::error::{ConsistencyError, Error};
use crate::features::{FeatureExtractor, FeatureWriter};
use crate::model::{ModelHandle, RecalibrationModel};
use crate::multiplicity::{self, MultiplicityTable};
use crate::partition::{self, Chunk, ChunkPartitioner};
use crate::recalibrate::{self, MergeStats};
use crate::record::{self, AlignmentRecord};
use crate::truth::GroundTruth;
use anyhow::{anyhow, Result};
use crossfire::mpmc;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const PROGRESS_STEPS: u64 = 10;
const TOP_MAPPED_READS: usize = 5;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Data records per chunk.
    pub chunk_size: usize,
    /// Chunks recalibrated concurrently; output order is unaffected.
    pub threads: usize,
    /// Where chunk files go; defaults to the directory of the output file.
    pub work_dir: Option<PathBuf>,
    /// Leave intermediate files on disk.
    pub keep_chunks: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: partition::DEFAULT_CHUNK_SIZE,
            threads: 1,
            work_dir: None,
            keep_chunks: false,
        }
    }
}

impl PipelineConfig {
    fn chunk_prefix(&self, input: &Path, output: &Path) -> PathBuf {
        let dir = match &self.work_dir {
            Some(dir) => dir.clone(),
            None => output
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        };
        let name = input
            .file_name()
            .map_or_else(|| OsString::from("input"), |n| n.to_os_string());
        dir.join(name)
    }
}

#[derive(Debug, Default)]
pub struct Stats {
    pub total_lines: u64,
    pub distinct_reads: u64,
    pub header_lines: u64,
    pub unmapped_reads: u64,
    pub feature_rows: u64,
    pub revised_reads: u64,
    pub chunks: u64,
}

impl Stats {
    fn add_merge(&mut self, merge: MergeStats) {
        self.header_lines += merge.headers;
        self.unmapped_reads += merge.unmapped;
        self.revised_reads += merge.revised;
    }
}

/// First pass over `input`: how often each read name occurs.
pub fn count_mappings(input: &Path) -> Result<MultiplicityTable> {
    tracing::info!(input = %input.display(), "counting mappings");
    let table = multiplicity::count_mappings_in_file(input)?;
    tracing::info!(
        distinct = table.len(),
        lines = table.total(),
        "read distinct mappings"
    );
    for (read_id, count) in table.most_common(TOP_MAPPED_READS) {
        tracing::info!(read_id, count, "frequently mapped read");
    }
    Ok(table)
}

/// Advisory percent-complete logging every tenth of the input.
struct Progress {
    total: u64,
    step: u64,
}

impl Progress {
    fn new(total: u64) -> Self {
        Self {
            total,
            step: (total / PROGRESS_STEPS).max(1),
        }
    }

    fn tick(&self, line_idx: u64) {
        if self.total > 0 && line_idx % self.step == 0 {
            let percent = (line_idx * 100).div_ceil(self.total);
            tracing::info!(percent, "approx. done");
        }
    }
}

/// Write one feature table for the whole of `input`.
pub fn convert(input: &Path, output: &Path, truth: &GroundTruth) -> Result<Stats> {
    let table = count_mappings(input)?;
    let mut stats = Stats {
        total_lines: table.total(),
        distinct_reads: table.len() as u64,
        ..Stats::default()
    };

    tracing::info!(output = %output.display(), "writing feature table");
    let reader = BufReader::new(File::open(input)?);
    let mut writer = FeatureWriter::new(BufWriter::new(File::create(output)?))?;
    let mut extractor = FeatureExtractor::new(&table);
    let progress = Progress::new(table.total());

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        progress.tick(idx as u64);
        if record::is_header(&line) {
            stats.header_lines += 1;
            continue;
        }
        let record = AlignmentRecord::parse(&line).map_err(Error::from)?;
        if record.is_unmapped() {
            stats.unmapped_reads += 1;
            continue;
        }
        let position = truth.position_for(&record)?;
        if let Some(row) = extractor.extract(&record, position)? {
            writer.write(&row)?;
        }
    }
    stats.feature_rows = writer.finish()?;
    Ok(stats)
}

/// Extract labelled features from `input` and fit the model on them.
pub fn fit<M>(
    input: &Path,
    truth: &GroundTruth,
    model_out: &Path,
    model: &M,
    config: &PipelineConfig,
) -> Result<(ModelHandle, Stats)>
where
    M: RecalibrationModel + ?Sized,
{
    if truth.is_none() {
        return Err(anyhow!("fitting requires a ground-truth source"));
    }
    let features = {
        let mut name = config.chunk_prefix(input, model_out).into_os_string();
        name.push(".train.csv");
        PathBuf::from(name)
    };
    let stats = convert(input, &features, truth)?;
    tracing::info!(features = %features.display(), rows = stats.feature_rows, "fitting model");
    let handle = model.fit(&features, model_out);
    if !config.keep_chunks {
        remove_if_exists(&features)?;
    }
    Ok((handle?, stats))
}

/// Replace mapping qualities in `input` with model predictions, chunk by chunk.
///
/// Chunk outputs are appended to `output` strictly in chunk order, and each
/// chunk's files are removed once appended.
pub fn recalibrate<M>(
    input: &Path,
    handle: &ModelHandle,
    output: &Path,
    model: &M,
    config: &PipelineConfig,
) -> Result<Stats>
where
    M: RecalibrationModel + Sync + ?Sized,
{
    let table = count_mappings(input)?;
    let mut stats = Stats {
        total_lines: table.total(),
        distinct_reads: table.len() as u64,
        ..Stats::default()
    };

    let prefix = config.chunk_prefix(input, output);
    let truth = GroundTruth::None;
    let reader = BufReader::new(File::open(input)?);
    let partitioner = ChunkPartitioner::new(reader, &table, &truth, config.chunk_size, prefix);
    let mut writer = BufWriter::new(File::create(output)?);

    if config.threads > 1 {
        recalibrate_parallel(partitioner, handle, model, config, &mut writer, &mut stats)?;
    } else {
        let expected_chunks = table.total().div_ceil(config.chunk_size.max(1) as u64).max(1);
        for chunk in partitioner {
            let chunk = chunk?;
            let merge = recalibrate::recalibrate_chunk(&chunk, model, handle)?;
            append_chunk(&chunk, &mut writer, config)?;
            stats.add_merge(merge);
            stats.feature_rows += chunk.feature_rows;
            stats.chunks += 1;
            tracing::info!(
                chunk = chunk.index,
                estimated_chunks = expected_chunks,
                "chunk done"
            );
        }
    }

    writer.flush()?;
    Ok(stats)
}

struct WorkItem {
    chunk: Chunk,
}

struct ResultItem {
    chunk: Chunk,
    result: crate::error::Result<MergeStats>,
}

fn recalibrate_parallel<R, M, W>(
    partitioner: ChunkPartitioner<'_, R>,
    handle: &ModelHandle,
    model: &M,
    config: &PipelineConfig,
    writer: &mut W,
    stats: &mut Stats,
) -> Result<()>
where
    R: BufRead + Send,
    M: RecalibrationModel + Sync + ?Sized,
    W: Write,
{
    crossfire::detect_backoff_cfg();
    let worker_count = config.threads;
    let cap = worker_count.saturating_mul(2).max(2);
    let (tx_work, rx_work) = mpmc::bounded_blocking::<WorkItem>(cap);
    let (tx_res, rx_res) = mpmc::unbounded_blocking::<ResultItem>();
    let abort = AtomicBool::new(false);

    thread::scope(|scope| -> Result<()> {
        for _ in 0..worker_count {
            let rx_work = rx_work.clone();
            let tx_res = tx_res.clone();
            let abort = &abort;
            scope.spawn(move || {
                while let Ok(item) = rx_work.recv() {
                    let result = if abort.load(Ordering::Relaxed) {
                        Ok(MergeStats::default())
                    } else {
                        recalibrate::recalibrate_chunk(&item.chunk, model, handle)
                    };
                    let _ = tx_res.send(ResultItem {
                        chunk: item.chunk,
                        result,
                    });
                }
            });
        }
        drop(tx_res);
        drop(rx_work);

        let abort_ref = &abort;
        let producer = scope.spawn(move || -> crate::error::Result<usize> {
            let mut produced = 0usize;
            for chunk in partitioner {
                if abort_ref.load(Ordering::Relaxed) {
                    break;
                }
                let chunk = chunk?;
                if tx_work.send(WorkItem { chunk }).is_err() {
                    break;
                }
                produced += 1;
            }
            Ok(produced)
        });

        let mut pending: BTreeMap<usize, ResultItem> = BTreeMap::new();
        let mut next_idx = 0usize;
        let collected = (|| -> Result<()> {
            while let Ok(res) = rx_res.recv() {
                pending.insert(res.chunk.index, res);
                while let Some(done) = pending.remove(&next_idx) {
                    let merge = done.result?;
                    append_chunk(&done.chunk, writer, config)?;
                    stats.add_merge(merge);
                    stats.feature_rows += done.chunk.feature_rows;
                    stats.chunks += 1;
                    tracing::info!(chunk = done.chunk.index, "chunk done");
                    next_idx += 1;
                }
            }
            Ok(())
        })();
        if collected.is_err() {
            abort.store(true, Ordering::Relaxed);
        }
        // Unblock the producer if it is waiting on a full queue.
        while rx_res.recv().is_ok() {}

        let produced = producer
            .join()
            .map_err(|_| anyhow!("chunk producer panicked"))??;
        collected?;
        ensure_all_appended(next_idx, produced, pending.keys().next().copied())?;
        Ok(())
    })
}

/// Every produced chunk must have been appended, in order.
fn ensure_all_appended(
    appended: usize,
    produced: usize,
    first_pending: Option<usize>,
) -> crate::error::Result<()> {
    if appended != produced {
        return Err(Error::from(ConsistencyError::MissingChunk {
            expected: appended,
            found: first_pending,
        }));
    }
    Ok(())
}

/// Append a chunk's revised records to the output, then drop its files.
fn append_chunk<W: Write>(chunk: &Chunk, writer: &mut W, config: &PipelineConfig) -> Result<()> {
    let mut revised = File::open(chunk.revised_path())?;
    io::copy(&mut revised, writer)?;
    if !config.keep_chunks {
        chunk.remove()?;
        tracing::debug!(chunk = chunk.index, "chunk files removed");
    }
    Ok(())
}

/// Merge an existing predictions table into `input` without chunking.
pub fn replace_quals(input: &Path, predictions: &Path, output: &Path) -> Result<MergeStats> {
    let records = BufReader::new(File::open(input)?);
    let predictions = BufReader::new(File::open(predictions)?);
    let out = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(output)?,
    );
    Ok(recalibrate::merge_predictions(records, predictions, out)?)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
