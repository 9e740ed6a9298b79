//! loqum-rs: learn and apply mapping-quality recalibration for SAM files.
//!
//! Every mapped record is reduced to a fixed row of alignment features (CIGAR
//! run lengths, ambiguous bases, the base-quality trend along the read and how
//! often the read maps). A statistical model, run as an external process, turns
//! those rows into probabilities of correct mapping, which are written back as
//! Phred-scaled mapping qualities in the original record order.
//!
//! Large inputs are processed out of core: the file is split into bounded
//! chunks, and each chunk goes through the model and the merge on its own.
//!
//! # Library usage
//!
//! ```no_run
//! use loqum_rs::{GroundTruth, PipelineConfig, pipeline};
//! use loqum_rs::model::{ExternalModel, ModelHandle};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let model = ExternalModel::from_template("Rscript loqum-internal.R {mode} {features} {model} {predictions}")?;
//! let handle = ModelHandle::open("model.RData")?;
//! let config = PipelineConfig::default();
//! pipeline::recalibrate(Path::new("in.sam"), &handle, Path::new("out.sam"), &model, &config)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod features;
pub mod filter;
pub mod model;
pub mod multiplicity;
pub mod operations;
pub mod partition;
pub mod pipeline;
pub mod quality;
pub mod recalibrate;
pub mod record;
pub mod truth;
pub mod types;

// Flat re-exports for the most commonly used types.
pub use error::{Error, Result};
pub use features::{FEATURE_COLUMNS, FeatureExtractor, FeatureRow};
pub use multiplicity::MultiplicityTable;
pub use operations::{OperationCounts, OperationDecoder};
pub use partition::{Chunk, ChunkPartitioner};
pub use pipeline::PipelineConfig;
pub use quality::QualityTrend;
pub use record::AlignmentRecord;
pub use truth::GroundTruth;
