mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{ChunkArgs, Commands, ModelArgs, TruthArgs};
use loqum_rs::model::{ExternalModel, ModelHandle};
use loqum_rs::{GroundTruth, PipelineConfig, filter, pipeline};
use mimalloc::MiMalloc;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> Result<()> {
    let args = cli::Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            if args.quiet {
                EnvFilter::new("warn")
            } else {
                EnvFilter::new("info")
            }
        });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();

    match args.command {
        Commands::Convert { sam, csv, truth } => {
            let truth = ground_truth(&truth)?;
            let stats = pipeline::convert(&sam, &csv, &truth)?;
            tracing::info!(
                total_lines = stats.total_lines,
                feature_rows = stats.feature_rows,
                unmapped_reads = stats.unmapped_reads,
                "loqum-rs: conversion complete"
            );
        }
        Commands::Fit { sam, model, truth, model_cmd, chunks } => {
            let truth = ground_truth(&truth)?;
            let external = external_model(&model_cmd)?;
            let (handle, stats) =
                pipeline::fit(&sam, &truth, &model, &external, &pipeline_config(chunks))?;
            tracing::info!(
                model = %handle.path().display(),
                feature_rows = stats.feature_rows,
                "loqum-rs: model fitted"
            );
        }
        Commands::Recalibrate { sam, model, output, model_cmd, chunks } => {
            // Only the model's existence matters here; the model command reads it.
            let handle = ModelHandle::open(&model)?;
            let external = external_model(&model_cmd)?;
            let stats =
                pipeline::recalibrate(&sam, &handle, &output, &external, &pipeline_config(chunks))?;
            tracing::info!(
                total_lines = stats.total_lines,
                chunks = stats.chunks,
                revised_reads = stats.revised_reads,
                unmapped_reads = stats.unmapped_reads,
                "loqum-rs: recalibration complete"
            );
        }
        Commands::ReplaceQuals { sam, predictions, output } => {
            let stats = pipeline::replace_quals(&sam, &predictions, &output)?;
            tracing::info!(
                revised_reads = stats.revised,
                unmapped_reads = stats.unmapped,
                "loqum-rs: qualities replaced"
            );
        }
        Commands::FilterN { sam, output } => {
            let reader = BufReader::new(File::open(&sam)?);
            let writer = BufWriter::new(File::create(&output)?);
            let stats = filter::filter_ambiguous_reads(reader, writer)?;
            tracing::info!(kept = stats.kept, dropped = stats.dropped, "loqum-rs: filter complete");
        }
    }
    Ok(())
}

fn ground_truth(args: &TruthArgs) -> Result<GroundTruth> {
    Ok(match &args.aln {
        Some(path) => GroundTruth::from_aln_file(path)?,
        None if args.truth_from_read_id => GroundTruth::ReadName,
        None => GroundTruth::None,
    })
}

fn external_model(args: &ModelArgs) -> Result<ExternalModel> {
    Ok(ExternalModel::from_template(&args.template)?
        .with_timeout(args.timeout.map(Duration::from_secs)))
}

fn pipeline_config(args: ChunkArgs) -> PipelineConfig {
    PipelineConfig {
        chunk_size: args.chunk_size,
        threads: args.threads,
        work_dir: args.work_dir,
        keep_chunks: args.keep_chunks,
    }
}
