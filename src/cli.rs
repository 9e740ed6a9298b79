use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "loqum-rs",
    about = "Recalibrate SAM mapping qualities from per-read alignment features",
    version
)]
pub struct Args {
    /// Set logging level to WARN
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the feature table of a SAM file
    Convert {
        /// Input SAM file
        sam: PathBuf,

        /// Output feature table (CSV)
        csv: PathBuf,

        #[command(flatten)]
        truth: TruthArgs,
    },

    /// Fit the model on features of a SAM file with known read origins
    Fit {
        /// Input SAM file
        sam: PathBuf,

        /// Where the fitted model is saved
        model: PathBuf,

        #[command(flatten)]
        truth: TruthArgs,

        #[command(flatten)]
        model_cmd: ModelArgs,

        #[command(flatten)]
        chunks: ChunkArgs,
    },

    /// Replace mapping qualities with model predictions, chunk by chunk
    Recalibrate {
        /// SAM file with mapping qualities to replace
        sam: PathBuf,

        /// Saved model file
        model: PathBuf,

        /// Output SAM file
        output: PathBuf,

        #[command(flatten)]
        model_cmd: ModelArgs,

        #[command(flatten)]
        chunks: ChunkArgs,
    },

    /// Merge an existing predictions table into a SAM file
    ReplaceQuals {
        sam: PathBuf,

        /// Predictions table (CSV, header row then read_id,probability)
        predictions: PathBuf,

        output: PathBuf,
    },

    /// Drop records whose sequence contains an N
    FilterN { sam: PathBuf, output: PathBuf },
}

#[derive(ClapArgs, Debug)]
pub struct TruthArgs {
    /// Simulator .aln file giving each read's true position
    #[arg(long, value_name = "ALN", conflicts_with = "truth_from_read_id")]
    pub aln: Option<PathBuf>,

    /// Take each read's true position from READ_POS= in its name
    #[arg(long)]
    pub truth_from_read_id: bool,
}

#[derive(ClapArgs, Debug)]
pub struct ModelArgs {
    /// Model command; {mode}, {features}, {model} and {predictions} are substituted
    #[arg(
        long = "model-cmd",
        value_name = "TEMPLATE",
        default_value = "Rscript loqum-internal.R {mode} {features} {model} {predictions}"
    )]
    pub template: String,

    /// Fail if one model invocation runs longer than this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[derive(ClapArgs, Debug)]
pub struct ChunkArgs {
    /// Records per chunk handed to the model
    #[arg(long, default_value_t = loqum_rs::partition::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Number of chunks recalibrated concurrently
    #[arg(short = 'p', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Directory for chunk files (default: next to the output)
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Keep chunk files after use
    #[arg(long)]
    pub keep_chunks: bool,
}
